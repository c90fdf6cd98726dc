//! The entity store: sole owner and writer of farms, applications, crops
//! and activities.
//!
//! Every mutation validates first, then changes the in-memory collections,
//! appends an activity and saves. A failed save does not undo the mutation;
//! it is reported through [`Committed`].

mod applications;
mod crops;
mod farms;

pub use applications::{ApplicationDraft, ApplicationUpdate};
pub use crops::{CropDraft, CropUpdate};
pub use farms::{FarmDraft, FarmRemoval, FarmUpdate};

use chrono::{Local, NaiveDate};
use serde::Serialize;
use tracing::{info, warn};

use crate::activity::ActivityLog;
use crate::config::StoreConfig;
use crate::entity::{Activity, Application, Crop, EntityId, EntityKind, Farm, RecordDate};
use crate::error::{FarmError, FieldError, PersistenceError, Result};
use crate::records::{self, RecordFilter, RecordView};
use crate::storage::{KeyValueStore, PersistenceAdapter, PersistedState, StorageChange, SubscriptionId};

/// Outcome of a mutation that was applied in memory.
///
/// `persist_error` is set when the save that followed failed; the change is
/// still live in memory but may be lost on the next load.
#[derive(Debug)]
pub struct Committed<T> {
    value: T,
    persist_error: Option<PersistenceError>,
}

impl<T> Committed<T> {
    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn into_inner(self) -> T {
        self.value
    }

    pub fn is_persisted(&self) -> bool {
        self.persist_error.is_none()
    }

    pub fn persist_error(&self) -> Option<&PersistenceError> {
        self.persist_error.as_ref()
    }

    /// Treat an unsaved outcome as an error.
    pub fn into_result(self) -> Result<T> {
        match self.persist_error {
            None => Ok(self.value),
            Some(e) => Err(FarmError::Persistence(e)),
        }
    }
}

impl<T> std::ops::Deref for Committed<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

/// A borrowed view of one collection in insertion order
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Listing<'a> {
    Farms(&'a [Farm]),
    Applications(&'a [Application]),
    Crops(&'a [Crop]),
    Activities(&'a [Activity]),
}

impl Listing<'_> {
    pub fn len(&self) -> usize {
        match self {
            Listing::Farms(items) => items.len(),
            Listing::Applications(items) => items.len(),
            Listing::Crops(items) => items.len(),
            Listing::Activities(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct EntityStore<B> {
    adapter: PersistenceAdapter<B>,
    state: PersistedState,
    config: StoreConfig,
}

impl<B: KeyValueStore> EntityStore<B> {
    /// Open a store over `backend`, loading whatever it holds.
    pub fn open(backend: B, config: StoreConfig) -> Self {
        let mut adapter = PersistenceAdapter::new(backend, &config);
        let state = adapter.load();
        info!(
            farms = state.farms.len(),
            applications = state.applications.len(),
            crops = state.crops.len(),
            "opened entity store"
        );
        Self {
            adapter,
            state,
            config,
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn adapter(&self) -> &PersistenceAdapter<B> {
        &self.adapter
    }

    pub fn farms(&self) -> &[Farm] {
        &self.state.farms
    }

    pub fn applications(&self) -> &[Application] {
        &self.state.applications
    }

    pub fn crops(&self) -> &[Crop] {
        &self.state.crops
    }

    pub fn activities(&self) -> &ActivityLog {
        &self.state.activities
    }

    /// The collection for `kind`, in insertion order.
    pub fn list(&self, kind: EntityKind) -> Listing<'_> {
        match kind {
            EntityKind::Farm => Listing::Farms(&self.state.farms),
            EntityKind::Application => Listing::Applications(&self.state.applications),
            EntityKind::Crop => Listing::Crops(&self.state.crops),
            EntityKind::Activity => Listing::Activities(self.state.activities.entries()),
        }
    }

    /// The `n` most recent activities, most recent first.
    pub fn recent_activities(&self, n: usize) -> Vec<&Activity> {
        self.state.activities.recent(n)
    }

    /// Display name of a farm, or the configured unknown-farm label.
    pub fn resolve_farm_name(&self, id: EntityId) -> &str {
        self.state
            .farms
            .iter()
            .find(|f| f.id == id)
            .map(|f| f.name.as_str())
            .unwrap_or(self.config.unknown_farm_label.as_str())
    }

    /// Combined, filtered, newest-first view over applications and crops.
    pub fn project(&self, filter: &RecordFilter) -> Vec<RecordView> {
        records::project(&self.state.applications, &self.state.crops, filter)
    }

    /// Replace all in-memory collections with what storage currently holds.
    pub fn reload(&mut self) {
        let fresh = self.adapter.load();
        self.state = fresh;
        info!("reloaded entity store from storage");
    }

    /// Wipe storage and every in-memory collection.
    pub fn reset(&mut self) -> Committed<()> {
        self.state = PersistedState::empty(self.config.activity_limit);
        let persist_error = self.adapter.clear().err();
        if let Some(ref e) = persist_error {
            warn!(error = %e, "failed to clear storage during reset");
        }
        info!("reset all farm records");
        Committed {
            value: (),
            persist_error,
        }
    }

    /// Pick up writes made by other contexts.
    ///
    /// When any slot changed, the store reloads wholesale before listeners
    /// are told about each changed key.
    pub fn sync_external(&mut self) -> Result<Vec<StorageChange>> {
        let changes = self.adapter.poll_external()?;
        if !changes.is_empty() {
            info!(changed = changes.len(), "storage changed in another context");
            self.reload();
            self.adapter.notify(&changes);
        }
        Ok(changes)
    }

    /// Register a listener told about external changes after each reload.
    pub fn subscribe(&mut self, listener: impl FnMut(&StorageChange) + 'static) -> SubscriptionId {
        self.adapter.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.adapter.unsubscribe(id)
    }

    fn record_activity(&mut self, date: RecordDate, action: String, kind: &str) {
        self.state.activities.append(Activity::new(date, action, kind));
    }

    fn commit<T>(&mut self, value: T) -> Committed<T> {
        let persist_error = self.adapter.save(&self.state).err();
        if let Some(ref e) = persist_error {
            warn!(error = %e, "mutation applied in memory but not persisted");
        }
        Committed {
            value,
            persist_error,
        }
    }
}

pub(crate) fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Next id above both the stored high-water mark and every existing id.
fn allocate_id(high_water: &mut u64, existing: impl Iterator<Item = EntityId>) -> EntityId {
    let id = existing.max().unwrap_or(0).max(*high_water) + 1;
    *high_water = id;
    id
}

fn require_text(field: &'static str, value: &str, errors: &mut Vec<FieldError>) {
    if value.trim().is_empty() {
        errors.push(FieldError::new(field, "is required"));
    }
}

fn require_non_negative(field: &'static str, value: f64, errors: &mut Vec<FieldError>) {
    if !value.is_finite() || value < 0.0 {
        errors.push(FieldError::new(field, "must be a non-negative number"));
    }
}

fn require_date(field: &'static str, raw: &str, errors: &mut Vec<FieldError>) -> Option<RecordDate> {
    if raw.trim().is_empty() {
        errors.push(FieldError::new(field, "is required"));
        return None;
    }
    let parsed = RecordDate::parse(raw);
    if parsed.is_none() {
        errors.push(FieldError::new(field, "must be a date (YYYY-MM-DD)"));
    }
    parsed
}

fn require_farm(
    farms: &[Farm],
    farm_id: Option<EntityId>,
    errors: &mut Vec<FieldError>,
) -> Option<EntityId> {
    match farm_id {
        None => {
            errors.push(FieldError::new("farmId", "is required"));
            None
        }
        Some(id) if !farms.iter().any(|f| f.id == id) => {
            errors.push(FieldError::new("farmId", format!("no farm with id {}", id)));
            None
        }
        Some(id) => Some(id),
    }
}

fn check(errors: Vec<FieldError>) -> Result<()> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(FarmError::Validation(errors))
    }
}
