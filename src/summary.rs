//! Dashboard counts derived from the store.

use chrono::{Duration, NaiveDate};
use serde::Serialize;

use crate::entity::Activity;
use crate::storage::KeyValueStore;
use crate::store::EntityStore;

/// Applications dated within this many days count as recent.
pub const RECENT_APPLICATION_DAYS: i64 = 7;
/// Crops planted within this many days count as new.
pub const RECENT_CROP_DAYS: i64 = 30;
/// Activities shown on the dashboard.
pub const DASHBOARD_ACTIVITIES: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub total_farms: usize,
    pub recent_applications: usize,
    pub recent_crops: usize,
    /// Most recent first
    pub recent_activities: Vec<Activity>,
}

impl<B: KeyValueStore> EntityStore<B> {
    /// Counts relative to `today`. Rows with unreadable dates never count.
    pub fn summary(&self, today: NaiveDate) -> DashboardSummary {
        let app_cutoff = today - Duration::days(RECENT_APPLICATION_DAYS);
        let crop_cutoff = today - Duration::days(RECENT_CROP_DAYS);

        DashboardSummary {
            total_farms: self.farms().len(),
            recent_applications: self
                .applications()
                .iter()
                .filter(|a| a.date.to_naive().is_some_and(|d| d >= app_cutoff))
                .count(),
            recent_crops: self
                .crops()
                .iter()
                .filter(|c| c.plantation_date.to_naive().is_some_and(|d| d >= crop_cutoff))
                .count(),
            recent_activities: self
                .recent_activities(DASHBOARD_ACTIVITIES)
                .into_iter()
                .cloned()
                .collect(),
        }
    }
}
