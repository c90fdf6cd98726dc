use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::RecordDate;

/// Human-readable audit entry produced as a side effect of a mutation.
///
/// Activities never reference entities by id and are never rewritten.
/// Entries stored without an id load as nil and get a content-derived id
/// from [`Activity::legacy_id`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    #[serde(default = "Uuid::nil")]
    pub id: Uuid,
    pub date: RecordDate,
    #[serde(alias = "message")]
    pub action: String,
    /// Free-form tag such as `farm`, `crop` or `fertilizer`
    #[serde(rename = "type", default)]
    pub kind: String,
}

impl Activity {
    pub fn new(date: RecordDate, action: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            date,
            action: action.into(),
            kind: kind.into(),
        }
    }

    /// Stable id for an entry stored without one. `ordinal` separates
    /// entries with identical content.
    pub fn legacy_id(&self, ordinal: usize) -> Uuid {
        let name = format!(
            "{}\u{1f}{}\u{1f}{}\u{1f}{}",
            self.date, self.kind, self.action, ordinal
        );
        Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes())
    }
}
