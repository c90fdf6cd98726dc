//! Combined view over applications and crops.
//!
//! Rows are derived on demand from the current collections; nothing here is
//! stored. Farm names are not copied into rows, callers resolve them through
//! the store when displaying.

use chrono::NaiveDate;
use serde::Serialize;

use crate::entity::{Application, Crop, EntityId, RecordDate};

/// Which collection a row came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordSource {
    Application,
    Crop,
}

/// One row of the combined records view.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordView {
    pub source: RecordSource,
    pub id: EntityId,
    /// Lowercase tag: `fertilizer`, `pesticide`, `herbicide` or `crop`
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub quantity_label: String,
    pub date: RecordDate,
    pub farm_id: EntityId,
    pub method_or_variety: String,
    pub notes: String,
}

impl RecordView {
    pub fn from_application(app: &Application) -> Self {
        Self {
            source: RecordSource::Application,
            id: app.id,
            kind: app.kind.tag().to_string(),
            name: app.product_name.clone(),
            quantity_label: format!("{} {}", app.quantity, app.unit),
            date: app.date.clone(),
            farm_id: app.farm_id,
            method_or_variety: app.method.to_string(),
            notes: app.notes.clone().unwrap_or_default(),
        }
    }

    pub fn from_crop(crop: &Crop) -> Self {
        // Zero (or NaN) area shows as blank.
        let quantity_label = if crop.area != 0.0 && !crop.area.is_nan() {
            format!("{} acres", crop.area)
        } else {
            String::new()
        };
        Self {
            source: RecordSource::Crop,
            id: crop.id,
            kind: "crop".to_string(),
            name: crop.crop_name.clone(),
            quantity_label,
            date: crop.plantation_date.clone(),
            farm_id: crop.farm_id,
            method_or_variety: crop.variety.clone().unwrap_or_default(),
            notes: crop.notes.clone().unwrap_or_default(),
        }
    }

    /// Type tag with its first letter capitalised, for display.
    pub fn type_label(&self) -> String {
        let mut chars = self.kind.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}

/// Filter over the records view. All set constraints must hold.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecordFilter {
    pub farm_id: Option<EntityId>,
    /// Inclusive lower bound on the row date
    pub date_from: Option<NaiveDate>,
    /// Inclusive upper bound on the row date
    pub date_to: Option<NaiveDate>,
    /// Exact match against the lowercase type tag
    pub kind: Option<String>,
    /// Case-insensitive substring of the row name
    pub search_text: Option<String>,
}

impl RecordFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.farm_id.is_none()
            && self.date_from.is_none()
            && self.date_to.is_none()
            && self.kind.as_deref().map_or(true, |k| k.trim().is_empty())
            && self.search_text.as_deref().map_or(true, |s| s.trim().is_empty())
    }

    /// Parse a query such as `type:crop farm:2 from:2024-01-01 maize`.
    ///
    /// Recognised prefixes are `farm:`, `from:`, `to:` and `type:`; the
    /// remaining words become the search text. Prefixed values that do not
    /// parse are ignored.
    pub fn parse(raw: &str) -> Self {
        let mut filter = RecordFilter::default();
        let mut remaining = Vec::new();

        for token in raw.split_whitespace() {
            if let Some(value) = token.strip_prefix("farm:") {
                filter.farm_id = value.parse().ok();
            } else if let Some(value) = token.strip_prefix("from:") {
                filter.date_from = RecordDate::parse(value).and_then(|d| d.to_naive());
            } else if let Some(value) = token.strip_prefix("to:") {
                filter.date_to = RecordDate::parse(value).and_then(|d| d.to_naive());
            } else if let Some(value) = token.strip_prefix("type:") {
                filter.kind = Some(value.to_lowercase());
            } else {
                remaining.push(token);
            }
        }

        if !remaining.is_empty() {
            filter.search_text = Some(remaining.join(" "));
        }
        filter
    }

    pub fn matches(&self, row: &RecordView) -> bool {
        if let Some(farm_id) = self.farm_id {
            if row.farm_id != farm_id {
                return false;
            }
        }

        // A date bound excludes rows whose date cannot be read.
        if self.date_from.is_some() || self.date_to.is_some() {
            let Some(date) = row.date.to_naive() else {
                return false;
            };
            if self.date_from.is_some_and(|from| date < from) {
                return false;
            }
            if self.date_to.is_some_and(|to| date > to) {
                return false;
            }
        }

        if let Some(kind) = self.kind.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
            if row.kind != kind.to_lowercase() {
                return false;
            }
        }

        if let Some(text) = self
            .search_text
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
        {
            if !row.name.to_lowercase().contains(&text.to_lowercase()) {
                return false;
            }
        }

        true
    }
}

/// Build the combined view: one row per application and per crop, filtered,
/// newest first. Rows with unreadable dates sort last; ties keep applications
/// before crops in insertion order.
pub fn project(applications: &[Application], crops: &[Crop], filter: &RecordFilter) -> Vec<RecordView> {
    let mut rows: Vec<RecordView> = applications
        .iter()
        .map(RecordView::from_application)
        .chain(crops.iter().map(RecordView::from_crop))
        .filter(|row| filter.matches(row))
        .collect();

    rows.sort_by(|a, b| b.date.sort_key().cmp(&a.date.sort_key()));
    rows
}
