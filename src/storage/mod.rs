//! Persistence boundary between the entity store and a durable key-value store.
//!
//! Each collection lives in its own slot as a JSON array, plus one metadata
//! slot carrying the schema version and id sequences. The adapter holds no
//! copy of the data; it only serializes and deserializes.

mod file;
mod memory;

pub use file::FileStorage;
pub use memory::{MemoryContext, SharedStorage};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::activity::ActivityLog;
use crate::config::{StorageKeys, StoreConfig};
use crate::entity::{Activity, Application, Crop, Farm};
use crate::error::PersistenceError;

/// Schema version written to the metadata slot.
pub const SCHEMA_VERSION: u32 = 1;

/// A durable string key-value store shared by several execution contexts.
pub trait KeyValueStore {
    fn get(&mut self, key: &str) -> Result<Option<String>, PersistenceError>;

    fn set(&mut self, key: &str, value: &str) -> Result<(), PersistenceError>;

    fn remove(&mut self, key: &str) -> Result<(), PersistenceError>;

    /// Keys changed by some other context since the previous call.
    ///
    /// A context never sees its own writes here.
    fn poll_external_changes(&mut self) -> Result<Vec<String>, PersistenceError>;
}

/// Which persisted slot a key refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Farms,
    Applications,
    Crops,
    Activities,
    Meta,
}

/// Notification that another context modified one of the slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageChange {
    pub key: String,
    pub slot: Slot,
}

/// High-water marks for store-assigned ids, per collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Sequences {
    pub farms: u64,
    pub applications: u64,
    pub crops: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StorageMeta {
    pub schema_version: u32,
    pub sequences: Sequences,
}

impl Default for StorageMeta {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            sequences: Sequences::default(),
        }
    }
}

/// The complete persisted state: four collections and metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistedState {
    pub farms: Vec<Farm>,
    pub applications: Vec<Application>,
    pub crops: Vec<Crop>,
    pub activities: ActivityLog,
    pub meta: StorageMeta,
}

impl PersistedState {
    pub fn empty(activity_limit: usize) -> Self {
        Self {
            farms: Vec::new(),
            applications: Vec::new(),
            crops: Vec::new(),
            activities: ActivityLog::new(activity_limit),
            meta: StorageMeta::default(),
        }
    }
}

pub type SubscriptionId = u64;

type Listener = Box<dyn FnMut(&StorageChange)>;

pub struct PersistenceAdapter<B> {
    backend: B,
    keys: StorageKeys,
    activity_limit: usize,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: SubscriptionId,
}

impl<B: KeyValueStore> PersistenceAdapter<B> {
    pub fn new(backend: B, config: &StoreConfig) -> Self {
        Self {
            backend,
            keys: config.storage_keys(),
            activity_limit: config.activity_limit,
            listeners: Vec::new(),
            next_subscription: 0,
        }
    }

    pub fn keys(&self) -> &StorageKeys {
        &self.keys
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Read every slot. A missing or corrupt slot loads as empty without
    /// affecting the others.
    pub fn load(&mut self) -> PersistedState {
        let farms = self.load_list::<Farm>(Slot::Farms);
        let applications = self.load_list::<Application>(Slot::Applications);
        let crops = self.load_list::<Crop>(Slot::Crops);
        let activities = self.load_list::<Activity>(Slot::Activities);

        let meta_key = self.key(Slot::Meta).to_string();
        let meta = self
            .read_slot::<StorageMeta>(&meta_key)
            .unwrap_or_default();
        if meta.schema_version > SCHEMA_VERSION {
            warn!(
                version = meta.schema_version,
                supported = SCHEMA_VERSION,
                "stored schema is newer than supported, loading best-effort"
            );
        }

        debug!(
            farms = farms.len(),
            applications = applications.len(),
            crops = crops.len(),
            activities = activities.len(),
            "loaded persisted state"
        );

        PersistedState {
            farms,
            applications,
            crops,
            activities: ActivityLog::from_entries(activities, self.activity_limit),
            meta,
        }
    }

    /// Write every slot. Each slot is overwritten independently; failures are
    /// collected and reported together without undoing the successful writes.
    pub fn save(&mut self, state: &PersistedState) -> Result<(), PersistenceError> {
        let meta = StorageMeta {
            schema_version: SCHEMA_VERSION,
            sequences: state.meta.sequences,
        };

        let mut failures = Vec::new();
        let writes = [
            (Slot::Farms, serde_json::to_string(&state.farms)),
            (Slot::Applications, serde_json::to_string(&state.applications)),
            (Slot::Crops, serde_json::to_string(&state.crops)),
            (Slot::Activities, serde_json::to_string(state.activities.entries())),
            (Slot::Meta, serde_json::to_string(&meta)),
        ];

        for (slot, encoded) in writes {
            let key = self.key(slot).to_string();
            let result = encoded
                .map_err(|e| PersistenceError::backend(&key, e))
                .and_then(|json| self.backend.set(&key, &json));
            if let Err(e) = result {
                warn!(key = %key, error = %e, "failed to save slot");
                failures.push(e);
            }
        }

        match failures.len() {
            0 => {
                debug!("saved persisted state");
                Ok(())
            }
            1 => Err(failures.remove(0)),
            _ => Err(PersistenceError::Partial(failures)),
        }
    }

    /// Remove every slot.
    pub fn clear(&mut self) -> Result<(), PersistenceError> {
        let keys: Vec<String> = self.keys.all().iter().map(|k| k.to_string()).collect();
        let mut failures = Vec::new();
        for key in keys {
            if let Err(e) = self.backend.remove(&key) {
                warn!(key = %key, error = %e, "failed to clear slot");
                failures.push(e);
            }
        }
        match failures.len() {
            0 => Ok(()),
            1 => Err(failures.remove(0)),
            _ => Err(PersistenceError::Partial(failures)),
        }
    }

    /// Register a listener for changes made by other contexts.
    pub fn subscribe(&mut self, listener: impl FnMut(&StorageChange) + 'static) -> SubscriptionId {
        let id = self.next_subscription;
        self.next_subscription += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sid, _)| *sid != id);
        self.listeners.len() != before
    }

    /// Drain pending external changes to the slots this adapter owns.
    pub fn poll_external(&mut self) -> Result<Vec<StorageChange>, PersistenceError> {
        let changed = self.backend.poll_external_changes()?;
        let mut changes: Vec<StorageChange> = Vec::new();
        for key in changed {
            if let Some(slot) = self.slot_for(&key) {
                if !changes.iter().any(|c| c.key == key) {
                    changes.push(StorageChange { key, slot });
                }
            }
        }
        Ok(changes)
    }

    /// Deliver changes to every subscribed listener.
    pub fn notify(&mut self, changes: &[StorageChange]) {
        for change in changes {
            for (_, listener) in self.listeners.iter_mut() {
                listener(change);
            }
        }
    }

    pub fn slot_for(&self, key: &str) -> Option<Slot> {
        [
            Slot::Farms,
            Slot::Applications,
            Slot::Crops,
            Slot::Activities,
            Slot::Meta,
        ]
        .into_iter()
        .find(|slot| self.key(*slot) == key)
    }

    fn key(&self, slot: Slot) -> &str {
        match slot {
            Slot::Farms => &self.keys.farms,
            Slot::Applications => &self.keys.applications,
            Slot::Crops => &self.keys.crops,
            Slot::Activities => &self.keys.activities,
            Slot::Meta => &self.keys.meta,
        }
    }

    /// Records are decoded one by one so a single unreadable entry does not
    /// take the rest of the slot with it.
    fn load_list<T: DeserializeOwned>(&mut self, slot: Slot) -> Vec<T> {
        let key = self.key(slot).to_string();
        let Some(values) = self.read_slot::<Vec<serde_json::Value>>(&key) else {
            return Vec::new();
        };

        let mut items = Vec::with_capacity(values.len());
        for (index, value) in values.into_iter().enumerate() {
            match serde_json::from_value(value) {
                Ok(item) => items.push(item),
                Err(e) => warn!(key = %key, index, error = %e, "skipping unreadable record"),
            }
        }
        items
    }

    fn read_slot<T: DeserializeOwned>(&mut self, key: &str) -> Option<T> {
        let raw = match self.backend.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(key = %key, error = %e, "failed to read slot, treating as empty");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key = %key, error = %e, "corrupt slot, treating as empty");
                None
            }
        }
    }
}
