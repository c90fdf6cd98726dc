mod activity;
mod application;
mod crop;
mod farm;

pub use activity::Activity;
pub use application::{Application, ApplicationMethod, ApplicationType, QuantityUnit};
pub use crop::{Crop, CropStatus};
pub use farm::Farm;

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};

/// Store-assigned identity of a farm, application or crop.
pub type EntityId = u64;

/// The entity collections held by the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Farm,
    Application,
    Crop,
    Activity,
}

impl EntityKind {
    pub const ALL: [EntityKind; 4] = [
        EntityKind::Farm,
        EntityKind::Application,
        EntityKind::Crop,
        EntityKind::Activity,
    ];
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityKind::Farm => write!(f, "farm"),
            EntityKind::Application => write!(f, "application"),
            EntityKind::Crop => write!(f, "crop"),
            EntityKind::Activity => write!(f, "activity"),
        }
    }
}

impl std::str::FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "farm" | "farms" => Ok(EntityKind::Farm),
            "application" | "applications" | "app" | "apps" => Ok(EntityKind::Application),
            "crop" | "crops" => Ok(EntityKind::Crop),
            "activity" | "activities" => Ok(EntityKind::Activity),
            _ => Err(format!("Invalid entity type: {}", s)),
        }
    }
}

/// A calendar date as persisted.
///
/// Values written through the store are always `YYYY-MM-DD`, but data
/// loaded from storage may hold anything, so the raw text is kept and
/// parsed on demand.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordDate(String);

impl RecordDate {
    /// Parse user input, accepting `YYYY-MM-DD` or a full RFC 3339 timestamp.
    pub fn parse(raw: &str) -> Option<Self> {
        parse_calendar_date(raw.trim()).map(Self::from)
    }

    /// Wrap raw stored text without validating it.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn to_naive(&self) -> Option<NaiveDate> {
        parse_calendar_date(self.0.trim())
    }

    /// Ordering key; unparseable dates sort as the earliest possible date.
    pub fn sort_key(&self) -> NaiveDate {
        self.to_naive().unwrap_or(NaiveDate::MIN)
    }
}

impl From<NaiveDate> for RecordDate {
    fn from(date: NaiveDate) -> Self {
        Self(date.format("%Y-%m-%d").to_string())
    }
}

impl std::fmt::Display for RecordDate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

fn parse_calendar_date(s: &str) -> Option<NaiveDate> {
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(date);
    }
    DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive())
}

/// Treat blank optional text as absent.
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
