use serde::{Deserialize, Serialize};

use super::{EntityId, RecordDate};

/// A managed land unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Farm {
    pub id: EntityId,
    /// User-supplied business key, unique ignoring case
    pub farm_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Acres
    #[serde(default)]
    pub size: f64,
    #[serde(default)]
    pub date_added: RecordDate,
}

impl Farm {
    /// Case-insensitive comparison against the business key.
    pub fn has_farm_id(&self, farm_id: &str) -> bool {
        self.farm_id.to_lowercase() == farm_id.trim().to_lowercase()
    }
}
