use serde::Deserialize;
use tracing::info;

use super::{
    allocate_id, check, require_date, require_farm, require_non_negative, require_text, today,
    Committed, EntityStore,
};
use crate::entity::{
    non_blank, Application, ApplicationMethod, ApplicationType, EntityId, EntityKind,
    QuantityUnit, RecordDate,
};
use crate::error::{FarmError, FieldError, Result};
use crate::storage::KeyValueStore;

/// Input for recording an application. Every field except `notes` is
/// required; missing ones are reported together.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApplicationDraft {
    #[serde(rename = "type")]
    pub kind: Option<ApplicationType>,
    pub product_name: String,
    pub quantity: Option<f64>,
    pub unit: Option<QuantityUnit>,
    /// `YYYY-MM-DD`
    pub date: String,
    pub farm_id: Option<EntityId>,
    pub method: Option<ApplicationMethod>,
    pub notes: Option<String>,
}

/// Partial update for an application
#[derive(Debug, Clone, Default)]
pub struct ApplicationUpdate {
    pub kind: Option<ApplicationType>,
    pub product_name: Option<String>,
    pub quantity: Option<f64>,
    pub unit: Option<QuantityUnit>,
    pub date: Option<String>,
    pub farm_id: Option<EntityId>,
    pub method: Option<ApplicationMethod>,
    pub notes: Option<Option<String>>, // Some(None) to clear
}

fn missing(field: &'static str, errors: &mut Vec<FieldError>) {
    errors.push(FieldError::new(field, "is required"));
}

impl<B: KeyValueStore> EntityStore<B> {
    pub fn get_application(&self, id: EntityId) -> Option<&Application> {
        self.state.applications.iter().find(|a| a.id == id)
    }

    pub fn create_application(&mut self, draft: ApplicationDraft) -> Result<Committed<Application>> {
        let mut errors = Vec::new();
        if draft.kind.is_none() {
            missing("type", &mut errors);
        }
        require_text("productName", &draft.product_name, &mut errors);
        match draft.quantity {
            Some(q) => require_non_negative("quantity", q, &mut errors),
            None => missing("quantity", &mut errors),
        }
        if draft.unit.is_none() {
            missing("unit", &mut errors);
        }
        let date = require_date("date", &draft.date, &mut errors);
        let farm_id = require_farm(&self.state.farms, draft.farm_id, &mut errors);
        if draft.method.is_none() {
            missing("method", &mut errors);
        }

        let (Some(kind), Some(quantity), Some(unit), Some(date), Some(farm_id), Some(method)) =
            (draft.kind, draft.quantity, draft.unit, date, farm_id, draft.method)
        else {
            return Err(FarmError::Validation(errors));
        };
        check(errors)?;

        let id = allocate_id(
            &mut self.state.meta.sequences.applications,
            self.state.applications.iter().map(|a| a.id),
        );
        let application = Application {
            id,
            kind,
            product_name: draft.product_name.trim().to_string(),
            quantity,
            unit,
            date,
            farm_id,
            method,
            notes: non_blank(draft.notes),
        };
        self.state.applications.push(application.clone());

        let action = format!(
            "Applied {} to {}",
            application.product_name,
            self.resolve_farm_name(farm_id)
        );
        self.record_activity(application.date.clone(), action, kind.tag());
        info!(id, farm_id, "recorded application");

        Ok(self.commit(application))
    }

    pub fn update_application(
        &mut self,
        id: EntityId,
        patch: ApplicationUpdate,
    ) -> Result<Committed<Application>> {
        let index = self.application_index(id)?;
        let mut app = self.state.applications[index].clone();
        let mut errors = Vec::new();

        if let Some(kind) = patch.kind {
            app.kind = kind;
        }
        if let Some(name) = patch.product_name {
            app.product_name = name.trim().to_string();
        }
        if let Some(quantity) = patch.quantity {
            app.quantity = quantity;
        }
        if let Some(unit) = patch.unit {
            app.unit = unit;
        }
        if let Some(raw) = patch.date {
            if let Some(date) = require_date("date", &raw, &mut errors) {
                app.date = date;
            }
        }
        if let Some(farm_id) = patch.farm_id {
            // Only a changed reference is checked; an existing dangling one
            // is tolerated.
            if let Some(farm_id) = require_farm(&self.state.farms, Some(farm_id), &mut errors) {
                app.farm_id = farm_id;
            }
        }
        if let Some(method) = patch.method {
            app.method = method;
        }
        if let Some(notes) = patch.notes {
            app.notes = non_blank(notes);
        }

        require_text("productName", &app.product_name, &mut errors);
        require_non_negative("quantity", app.quantity, &mut errors);
        if app.date.to_naive().is_none() && !errors.iter().any(|e| e.field == "date") {
            errors.push(FieldError::new("date", "must be a date (YYYY-MM-DD)"));
        }
        check(errors)?;

        self.state.applications[index] = app.clone();
        let action = format!(
            "Updated {} application on {}",
            app.product_name,
            self.resolve_farm_name(app.farm_id)
        );
        self.record_activity(RecordDate::from(today()), action, app.kind.tag());
        info!(id, "updated application");

        Ok(self.commit(app))
    }

    pub fn delete_application(&mut self, id: EntityId) -> Result<Committed<Application>> {
        let index = self.application_index(id)?;
        let app = self.state.applications.remove(index);

        self.record_activity(
            RecordDate::from(today()),
            format!("Deleted {} application", app.product_name),
            app.kind.tag(),
        );
        info!(id, "deleted application");

        Ok(self.commit(app))
    }

    fn application_index(&self, id: EntityId) -> Result<usize> {
        self.state
            .applications
            .iter()
            .position(|a| a.id == id)
            .ok_or(FarmError::NotFound {
                kind: EntityKind::Application,
                id,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;

    #[test]
    fn test_create_application() {
        let (_shared, mut store) = memory_store();
        let farm = store.create_farm(farm_draft("Green Acres", "GA1")).unwrap().into_inner();

        let app = store
            .create_application(ApplicationDraft {
                notes: Some("windy".to_string()),
                ..urea_draft(farm.id, "2024-03-01")
            })
            .unwrap()
            .into_inner();

        assert_eq!(app.kind, ApplicationType::Fertilizer);
        assert_eq!(app.product_name, "Urea");
        assert_eq!(app.date.as_str(), "2024-03-01");
        assert_eq!(app.notes.as_deref(), Some("windy"));
        assert_eq!(store.get_application(app.id), Some(&app));

        let last = store.recent_activities(1)[0];
        assert_eq!(last.action, "Applied Urea to Green Acres");
        assert_eq!(last.kind, "fertilizer");
        assert_eq!(last.date.as_str(), "2024-03-01");
    }

    #[test]
    fn test_create_requires_existing_farm() {
        let (_shared, mut store) = memory_store();
        let err = store.create_application(urea_draft(12, "2024-03-01")).unwrap_err();
        let fields: Vec<&str> = err.fields().iter().map(|f| f.field).collect();
        assert_eq!(fields, vec!["farmId"]);
        assert!(store.applications().is_empty());
        assert!(store.activities().is_empty());
    }

    #[test]
    fn test_create_enumerates_missing_fields() {
        let (_shared, mut store) = memory_store();
        let err = store
            .create_application(ApplicationDraft::default())
            .unwrap_err();
        let fields: Vec<&str> = err.fields().iter().map(|f| f.field).collect();
        assert_eq!(
            fields,
            vec!["type", "productName", "quantity", "unit", "date", "farmId", "method"]
        );
    }

    #[test]
    fn test_create_rejects_bad_quantity_and_date() {
        let (_shared, mut store) = memory_store();
        let farm = store.create_farm(farm_draft("A", "A")).unwrap().into_inner();
        let err = store
            .create_application(ApplicationDraft {
                quantity: Some(-3.0),
                date: "yesterday".to_string(),
                ..urea_draft(farm.id, "")
            })
            .unwrap_err();
        let fields: Vec<&str> = err.fields().iter().map(|f| f.field).collect();
        assert_eq!(fields, vec!["quantity", "date"]);
    }

    #[test]
    fn test_update_revalidates() {
        let (_shared, mut store) = memory_store();
        let farm = store.create_farm(farm_draft("A", "A")).unwrap().into_inner();
        let app = store
            .create_application(urea_draft(farm.id, "2024-03-01"))
            .unwrap()
            .into_inner();

        let err = store
            .update_application(
                app.id,
                ApplicationUpdate {
                    date: Some("31/12/2024".to_string()),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, FarmError::Validation(_)));
        assert_eq!(store.get_application(app.id), Some(&app));

        let err = store
            .update_application(
                app.id,
                ApplicationUpdate {
                    farm_id: Some(404),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert_eq!(err.fields()[0].field, "farmId");
    }

    #[test]
    fn test_update_applies_patch() {
        let (_shared, mut store) = memory_store();
        let a = store.create_farm(farm_draft("A", "A")).unwrap().into_inner();
        let b = store.create_farm(farm_draft("B", "B")).unwrap().into_inner();
        let app = store
            .create_application(ApplicationDraft {
                notes: Some("first pass".to_string()),
                ..urea_draft(a.id, "2024-03-01")
            })
            .unwrap()
            .into_inner();

        let updated = store
            .update_application(
                app.id,
                ApplicationUpdate {
                    kind: Some(ApplicationType::Herbicide),
                    quantity: Some(2.5),
                    unit: Some(QuantityUnit::Liters),
                    farm_id: Some(b.id),
                    notes: Some(None),
                    ..Default::default()
                },
            )
            .unwrap()
            .into_inner();

        assert_eq!(updated.kind, ApplicationType::Herbicide);
        assert_eq!(updated.quantity, 2.5);
        assert_eq!(updated.unit, QuantityUnit::Liters);
        assert_eq!(updated.farm_id, b.id);
        assert_eq!(updated.notes, None);
        assert_eq!(updated.product_name, "Urea");
        assert_eq!(store.recent_activities(1)[0].kind, "herbicide");
    }

    #[test]
    fn test_update_tolerates_dangling_farm_reference() {
        let (shared, _store) = memory_store();
        shared.set_raw(
            "fr_apps",
            r#"[{"id":1,"type":"Pesticide","productName":"Neem","quantity":1.0,"unit":"liters",
                "date":"2024-04-01","farmId":77,"method":"Spray"}]"#,
        );
        let mut store = crate::EntityStore::open(shared.open_context(), crate::StoreConfig::default());

        let updated = store
            .update_application(
                1,
                ApplicationUpdate {
                    quantity: Some(2.0),
                    ..Default::default()
                },
            )
            .unwrap()
            .into_inner();
        assert_eq!(updated.farm_id, 77);
        assert_eq!(store.resolve_farm_name(77), "Unknown Farm");
    }

    #[test]
    fn test_delete_application() {
        let (_shared, mut store) = memory_store();
        let farm = store.create_farm(farm_draft("A", "A")).unwrap().into_inner();
        let app = store
            .create_application(urea_draft(farm.id, "2024-03-01"))
            .unwrap()
            .into_inner();
        let activities_before = store.activities().len();

        let removed = store.delete_application(app.id).unwrap().into_inner();
        assert_eq!(removed, app);
        assert!(store.applications().is_empty());
        assert_eq!(store.activities().len(), activities_before + 1);
        assert!(store.get_farm(farm.id).is_some());

        assert!(matches!(
            store.delete_application(app.id),
            Err(FarmError::NotFound {
                kind: EntityKind::Application,
                ..
            })
        ));
    }
}
