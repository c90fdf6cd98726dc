use serde::{Deserialize, Serialize};

use super::{EntityId, RecordDate};

/// Deserialized through `FromStr`, so stored values are matched case-insensitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum ApplicationType {
    Fertilizer,
    Pesticide,
    Herbicide,
}

impl ApplicationType {
    /// Lowercase tag used by activities and the records view.
    pub fn tag(&self) -> &'static str {
        match self {
            ApplicationType::Fertilizer => "fertilizer",
            ApplicationType::Pesticide => "pesticide",
            ApplicationType::Herbicide => "herbicide",
        }
    }
}

impl std::fmt::Display for ApplicationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApplicationType::Fertilizer => write!(f, "Fertilizer"),
            ApplicationType::Pesticide => write!(f, "Pesticide"),
            ApplicationType::Herbicide => write!(f, "Herbicide"),
        }
    }
}

impl TryFrom<String> for ApplicationType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl std::str::FromStr for ApplicationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fertilizer" => Ok(ApplicationType::Fertilizer),
            "pesticide" => Ok(ApplicationType::Pesticide),
            "herbicide" => Ok(ApplicationType::Herbicide),
            _ => Err(format!("Invalid application type: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum QuantityUnit {
    Kg,
    Liters,
    Bags,
}

impl std::fmt::Display for QuantityUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QuantityUnit::Kg => write!(f, "kg"),
            QuantityUnit::Liters => write!(f, "liters"),
            QuantityUnit::Bags => write!(f, "bags"),
        }
    }
}

impl TryFrom<String> for QuantityUnit {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl std::str::FromStr for QuantityUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "kg" => Ok(QuantityUnit::Kg),
            "liters" | "litres" | "l" => Ok(QuantityUnit::Liters),
            "bags" | "bag" => Ok(QuantityUnit::Bags),
            _ => Err(format!("Invalid unit: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum ApplicationMethod {
    Spray,
    Granular,
    Liquid,
}

impl std::fmt::Display for ApplicationMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApplicationMethod::Spray => write!(f, "Spray"),
            ApplicationMethod::Granular => write!(f, "Granular"),
            ApplicationMethod::Liquid => write!(f, "Liquid"),
        }
    }
}

impl TryFrom<String> for ApplicationMethod {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl std::str::FromStr for ApplicationMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "spray" => Ok(ApplicationMethod::Spray),
            "granular" => Ok(ApplicationMethod::Granular),
            "liquid" => Ok(ApplicationMethod::Liquid),
            _ => Err(format!("Invalid application method: {}", s)),
        }
    }
}

/// One recorded application of a fertilizer, pesticide or herbicide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub id: EntityId,
    #[serde(rename = "type")]
    pub kind: ApplicationType,
    pub product_name: String,
    pub quantity: f64,
    pub unit: QuantityUnit,
    pub date: RecordDate,
    /// Store id of the farm (weak reference)
    pub farm_id: EntityId,
    pub method: ApplicationMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}
