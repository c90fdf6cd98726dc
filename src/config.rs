use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Default cap on retained activity entries.
pub const DEFAULT_ACTIVITY_LIMIT: usize = 50;

/// Configuration for the entity store and its storage slots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Prefix applied to every storage key
    pub key_prefix: String,
    /// Maximum number of activity entries kept, oldest dropped first
    pub activity_limit: usize,
    /// Label shown for a farm reference that resolves to nothing
    pub unknown_farm_label: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            key_prefix: "fr_".to_string(),
            activity_limit: DEFAULT_ACTIVITY_LIMIT,
            unknown_farm_label: "Unknown Farm".to_string(),
        }
    }
}

impl StoreConfig {
    /// Load a config from a YAML file. Missing fields take their defaults.
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        Self::from_yaml_str(&raw)
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: StoreConfig = serde_yaml::from_str(raw)?;
        Ok(config)
    }

    /// Storage key names derived from the prefix.
    pub fn storage_keys(&self) -> StorageKeys {
        StorageKeys::with_prefix(&self.key_prefix)
    }
}

/// The fixed set of storage slots, one per collection plus metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageKeys {
    pub farms: String,
    pub applications: String,
    pub crops: String,
    pub activities: String,
    pub meta: String,
}

impl StorageKeys {
    pub fn with_prefix(prefix: &str) -> Self {
        Self {
            farms: format!("{}farms", prefix),
            applications: format!("{}apps", prefix),
            crops: format!("{}crops", prefix),
            activities: format!("{}acts", prefix),
            meta: format!("{}meta", prefix),
        }
    }

    pub fn all(&self) -> [&str; 5] {
        [
            &self.farms,
            &self.applications,
            &self.crops,
            &self.activities,
            &self.meta,
        ]
    }

    pub fn contains(&self, key: &str) -> bool {
        self.all().contains(&key)
    }
}
