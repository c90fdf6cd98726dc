use serde::{Deserialize, Serialize};

use super::{EntityId, RecordDate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(try_from = "String")]
pub enum CropStatus {
    #[default]
    Active,
    Harvested,
    Failed,
}

impl std::fmt::Display for CropStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CropStatus::Active => write!(f, "Active"),
            CropStatus::Harvested => write!(f, "Harvested"),
            CropStatus::Failed => write!(f, "Failed"),
        }
    }
}

impl TryFrom<String> for CropStatus {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl std::str::FromStr for CropStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "active" => Ok(CropStatus::Active),
            "harvested" => Ok(CropStatus::Harvested),
            "failed" => Ok(CropStatus::Failed),
            _ => Err(format!("Invalid crop status: {}", s)),
        }
    }
}

/// A planting tied to a farm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Crop {
    pub id: EntityId,
    pub crop_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variety: Option<String>,
    pub plantation_date: RecordDate,
    pub harvest_date: RecordDate,
    pub farm_id: EntityId,
    /// Acres planted
    #[serde(default)]
    pub area: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub status: CropStatus,
}
