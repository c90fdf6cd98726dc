use serde::{Deserialize, Serialize};
use tracing::info;

use super::{allocate_id, check, require_non_negative, require_text, today, Committed, EntityStore};
use crate::entity::{non_blank, EntityId, EntityKind, Farm, RecordDate};
use crate::error::{FarmError, FieldError, Result};
use crate::storage::KeyValueStore;

/// Input for creating a farm
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FarmDraft {
    pub name: String,
    pub farm_id: String,
    pub location: Option<String>,
    /// Acres; absent means 0
    pub size: Option<f64>,
}

/// Partial update for a farm
#[derive(Debug, Clone, Default)]
pub struct FarmUpdate {
    pub name: Option<String>,
    pub farm_id: Option<String>,
    pub location: Option<Option<String>>, // Some(None) to clear
    pub size: Option<f64>,
}

/// A deleted farm and how many dependent records went with it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FarmRemoval {
    pub farm: Farm,
    pub applications_removed: usize,
    pub crops_removed: usize,
}

/// `existing` is the id of the farm being updated, excluded from the
/// uniqueness check.
fn validate_farm(farm: &Farm, farms: &[Farm], existing: Option<EntityId>) -> Result<()> {
    let mut errors: Vec<FieldError> = Vec::new();
    require_text("name", &farm.name, &mut errors);
    require_text("farmId", &farm.farm_id, &mut errors);
    require_non_negative("size", farm.size, &mut errors);
    check(errors)?;

    if farms
        .iter()
        .any(|other| Some(other.id) != existing && other.has_farm_id(&farm.farm_id))
    {
        return Err(FarmError::DuplicateFarmId(farm.farm_id.clone()));
    }
    Ok(())
}

impl<B: KeyValueStore> EntityStore<B> {
    pub fn get_farm(&self, id: EntityId) -> Option<&Farm> {
        self.state.farms.iter().find(|f| f.id == id)
    }

    pub fn create_farm(&mut self, draft: FarmDraft) -> Result<Committed<Farm>> {
        let mut farm = Farm {
            id: 0,
            farm_id: draft.farm_id.trim().to_string(),
            name: draft.name.trim().to_string(),
            location: non_blank(draft.location),
            size: draft.size.unwrap_or(0.0),
            date_added: RecordDate::from(today()),
        };
        validate_farm(&farm, &self.state.farms, None)?;

        farm.id = allocate_id(
            &mut self.state.meta.sequences.farms,
            self.state.farms.iter().map(|f| f.id),
        );
        self.state.farms.push(farm.clone());
        self.record_activity(
            farm.date_added.clone(),
            format!("Added farm {}", farm.name),
            "farm",
        );
        info!(id = farm.id, farm_id = %farm.farm_id, "created farm");

        Ok(self.commit(farm))
    }

    pub fn update_farm(&mut self, id: EntityId, patch: FarmUpdate) -> Result<Committed<Farm>> {
        let index = self.farm_index(id)?;
        let mut farm = self.state.farms[index].clone();

        if let Some(name) = patch.name {
            farm.name = name.trim().to_string();
        }
        if let Some(farm_id) = patch.farm_id {
            farm.farm_id = farm_id.trim().to_string();
        }
        if let Some(location) = patch.location {
            farm.location = non_blank(location);
        }
        if let Some(size) = patch.size {
            farm.size = size;
        }
        validate_farm(&farm, &self.state.farms, Some(id))?;

        self.state.farms[index] = farm.clone();
        self.record_activity(
            RecordDate::from(today()),
            format!("Updated farm {}", farm.name),
            "farm",
        );
        info!(id, "updated farm");

        Ok(self.commit(farm))
    }

    /// Delete a farm together with every application and crop pointing at it.
    /// The whole cascade produces a single activity entry and a single save.
    pub fn delete_farm(&mut self, id: EntityId) -> Result<Committed<FarmRemoval>> {
        let index = self.farm_index(id)?;
        let farm = self.state.farms.remove(index);

        let apps_before = self.state.applications.len();
        self.state.applications.retain(|a| a.farm_id != id);
        let applications_removed = apps_before - self.state.applications.len();

        let crops_before = self.state.crops.len();
        self.state.crops.retain(|c| c.farm_id != id);
        let crops_removed = crops_before - self.state.crops.len();

        self.record_activity(
            RecordDate::from(today()),
            format!(
                "Deleted farm {} ({} applications, {} crops removed)",
                farm.name, applications_removed, crops_removed
            ),
            "farm",
        );
        info!(id, applications_removed, crops_removed, "deleted farm");

        Ok(self.commit(FarmRemoval {
            farm,
            applications_removed,
            crops_removed,
        }))
    }

    fn farm_index(&self, id: EntityId) -> Result<usize> {
        self.state
            .farms
            .iter()
            .position(|f| f.id == id)
            .ok_or(FarmError::NotFound {
                kind: EntityKind::Farm,
                id,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;

    #[test]
    fn test_create_assigns_distinct_ids() {
        let (_shared, mut store) = memory_store();
        let codes = ["A", "B", "C", "D"];
        for code in codes {
            store.create_farm(farm_draft(code, code)).unwrap();
        }
        let mut ids: Vec<EntityId> = store.farms().iter().map(|f| f.id).collect();
        assert_eq!(ids.len(), codes.len());
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), codes.len());
    }

    #[test]
    fn test_create_trims_and_defaults() {
        let (_shared, mut store) = memory_store();
        let farm = store
            .create_farm(FarmDraft {
                name: "  Green Acres ".to_string(),
                farm_id: " GA1 ".to_string(),
                location: Some("   ".to_string()),
                size: None,
            })
            .unwrap()
            .into_inner();
        assert_eq!(farm.name, "Green Acres");
        assert_eq!(farm.farm_id, "GA1");
        assert_eq!(farm.location, None);
        assert_eq!(farm.size, 0.0);
        assert!(farm.date_added.to_naive().is_some());
    }

    #[test]
    fn test_duplicate_farm_id_ignores_case() {
        let (_shared, mut store) = memory_store();
        store.create_farm(farm_draft("First", "ga1")).unwrap();
        let before = store.farms().to_vec();
        let activities_before = store.activities().len();

        let err = store.create_farm(farm_draft("Second", "GA1")).unwrap_err();
        assert!(matches!(err, FarmError::DuplicateFarmId(ref id) if id == "GA1"));
        assert_eq!(store.farms(), before.as_slice());
        assert_eq!(store.activities().len(), activities_before);
    }

    #[test]
    fn test_create_reports_every_invalid_field() {
        let (_shared, mut store) = memory_store();
        let err = store
            .create_farm(FarmDraft {
                name: " ".to_string(),
                farm_id: String::new(),
                location: None,
                size: Some(-1.0),
            })
            .unwrap_err();
        let fields: Vec<&str> = err.fields().iter().map(|f| f.field).collect();
        assert_eq!(fields, vec!["name", "farmId", "size"]);
        assert!(store.farms().is_empty());
    }

    #[test]
    fn test_update_applies_only_present_fields() {
        let (_shared, mut store) = memory_store();
        let farm = store
            .create_farm(FarmDraft {
                name: "Old".to_string(),
                farm_id: "F1".to_string(),
                location: Some("Valley".to_string()),
                size: Some(4.0),
            })
            .unwrap()
            .into_inner();

        let updated = store
            .update_farm(
                farm.id,
                FarmUpdate {
                    name: Some("New".to_string()),
                    ..Default::default()
                },
            )
            .unwrap()
            .into_inner();
        assert_eq!(updated.name, "New");
        assert_eq!(updated.location.as_deref(), Some("Valley"));
        assert_eq!(updated.size, 4.0);
        assert_eq!(store.get_farm(farm.id), Some(&updated));
    }

    #[test]
    fn test_update_can_clear_location() {
        let (_shared, mut store) = memory_store();
        let farm = store
            .create_farm(FarmDraft {
                location: Some("Hill".to_string()),
                ..farm_draft("A", "A")
            })
            .unwrap()
            .into_inner();
        let updated = store
            .update_farm(
                farm.id,
                FarmUpdate {
                    location: Some(None),
                    ..Default::default()
                },
            )
            .unwrap()
            .into_inner();
        assert_eq!(updated.location, None);
    }

    #[test]
    fn test_update_rejects_colliding_farm_id_but_allows_own() {
        let (_shared, mut store) = memory_store();
        let a = store.create_farm(farm_draft("A", "AAA")).unwrap().into_inner();
        store.create_farm(farm_draft("B", "BBB")).unwrap();

        let own = store.update_farm(
            a.id,
            FarmUpdate {
                farm_id: Some("aaa".to_string()),
                ..Default::default()
            },
        );
        assert!(own.is_ok());

        let err = store
            .update_farm(
                a.id,
                FarmUpdate {
                    farm_id: Some("bbb".to_string()),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, FarmError::DuplicateFarmId(_)));
        assert_eq!(store.get_farm(a.id).unwrap().farm_id, "aaa");
    }

    #[test]
    fn test_update_rejects_empty_name_without_mutation() {
        let (_shared, mut store) = memory_store();
        let farm = store.create_farm(farm_draft("Keep", "K")).unwrap().into_inner();
        let err = store
            .update_farm(
                farm.id,
                FarmUpdate {
                    name: Some("  ".to_string()),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, FarmError::Validation(_)));
        assert_eq!(store.get_farm(farm.id).unwrap().name, "Keep");
    }

    #[test]
    fn test_update_and_delete_missing_farm() {
        let (_shared, mut store) = memory_store();
        let err = store.update_farm(99, FarmUpdate::default()).unwrap_err();
        assert!(matches!(
            err,
            FarmError::NotFound {
                kind: EntityKind::Farm,
                id: 99
            }
        ));
        assert!(matches!(store.delete_farm(99), Err(FarmError::NotFound { .. })));
        assert!(store.activities().is_empty());
    }

    #[test]
    fn test_delete_cascades_to_dependents_only() {
        let (_shared, mut store) = memory_store();
        let doomed = store.create_farm(farm_draft("Doomed", "D")).unwrap().into_inner();
        let kept = store.create_farm(farm_draft("Kept", "K")).unwrap().into_inner();

        store.create_application(urea_draft(doomed.id, "2024-01-01")).unwrap();
        store.create_application(urea_draft(doomed.id, "2024-01-02")).unwrap();
        store.create_application(urea_draft(kept.id, "2024-01-03")).unwrap();
        store
            .create_crop(maize_draft(doomed.id, "2024-02-01", "2024-06-01"))
            .unwrap();
        store
            .create_crop(maize_draft(kept.id, "2024-02-01", "2024-06-01"))
            .unwrap();

        let activities_before = store.activities().len();
        let removal = store.delete_farm(doomed.id).unwrap().into_inner();

        assert_eq!(removal.farm.id, doomed.id);
        assert_eq!(removal.applications_removed, 2);
        assert_eq!(removal.crops_removed, 1);
        assert!(store.get_farm(doomed.id).is_none());
        assert!(store.applications().iter().all(|a| a.farm_id == kept.id));
        assert_eq!(store.applications().len(), 1);
        assert!(store.crops().iter().all(|c| c.farm_id == kept.id));
        assert_eq!(store.crops().len(), 1);

        assert_eq!(store.activities().len(), activities_before + 1);
        let last = store.recent_activities(1)[0];
        assert!(last.action.contains("Deleted farm Doomed"));
        assert!(last.action.contains("2 applications"));
    }

    #[test]
    fn test_delete_keeps_earlier_activities() {
        let (_shared, mut store) = memory_store();
        let farm = store.create_farm(farm_draft("Gone", "G")).unwrap().into_inner();
        store.delete_farm(farm.id).unwrap();
        let actions: Vec<&str> = store
            .activities()
            .entries()
            .iter()
            .map(|a| a.action.as_str())
            .collect();
        assert_eq!(actions[0], "Added farm Gone");
        assert_eq!(actions.len(), 2);
    }
}
