use serde::Deserialize;
use tracing::info;

use super::{
    allocate_id, check, require_date, require_farm, require_non_negative, require_text, today,
    Committed, EntityStore,
};
use crate::entity::{non_blank, Crop, CropStatus, EntityId, EntityKind, RecordDate};
use crate::error::{FarmError, FieldError, Result};
use crate::storage::KeyValueStore;

/// Input for recording a planting
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CropDraft {
    pub crop_name: String,
    pub variety: Option<String>,
    /// `YYYY-MM-DD`
    pub plantation_date: String,
    /// `YYYY-MM-DD`, not before the plantation date
    pub harvest_date: String,
    pub farm_id: Option<EntityId>,
    /// Acres; absent means 0
    pub area: Option<f64>,
    pub notes: Option<String>,
    pub status: Option<CropStatus>,
}

/// Partial update for a crop
#[derive(Debug, Clone, Default)]
pub struct CropUpdate {
    pub crop_name: Option<String>,
    pub variety: Option<Option<String>>,
    pub plantation_date: Option<String>,
    pub harvest_date: Option<String>,
    pub farm_id: Option<EntityId>,
    pub area: Option<f64>,
    pub notes: Option<Option<String>>,
    pub status: Option<CropStatus>,
}

fn check_date_order(plantation: &RecordDate, harvest: &RecordDate, errors: &mut Vec<FieldError>) {
    if let (Some(planted), Some(harvested)) = (plantation.to_naive(), harvest.to_naive()) {
        if planted > harvested {
            errors.push(FieldError::new(
                "harvestDate",
                "must not be before plantationDate",
            ));
        }
    }
}

impl<B: KeyValueStore> EntityStore<B> {
    pub fn get_crop(&self, id: EntityId) -> Option<&Crop> {
        self.state.crops.iter().find(|c| c.id == id)
    }

    pub fn create_crop(&mut self, draft: CropDraft) -> Result<Committed<Crop>> {
        let mut errors = Vec::new();
        require_text("cropName", &draft.crop_name, &mut errors);
        let planted = require_date("plantationDate", &draft.plantation_date, &mut errors);
        let harvest = require_date("harvestDate", &draft.harvest_date, &mut errors);
        if let (Some(p), Some(h)) = (&planted, &harvest) {
            check_date_order(p, h, &mut errors);
        }
        let farm_id = require_farm(&self.state.farms, draft.farm_id, &mut errors);
        let area = draft.area.unwrap_or(0.0);
        require_non_negative("area", area, &mut errors);

        let (Some(plantation_date), Some(harvest_date), Some(farm_id)) = (planted, harvest, farm_id)
        else {
            return Err(FarmError::Validation(errors));
        };
        check(errors)?;

        let id = allocate_id(
            &mut self.state.meta.sequences.crops,
            self.state.crops.iter().map(|c| c.id),
        );
        let crop = Crop {
            id,
            crop_name: draft.crop_name.trim().to_string(),
            variety: non_blank(draft.variety),
            plantation_date,
            harvest_date,
            farm_id,
            area,
            notes: non_blank(draft.notes),
            status: draft.status.unwrap_or_default(),
        };
        self.state.crops.push(crop.clone());

        let action = format!(
            "Planted {} at {}",
            crop.crop_name,
            self.resolve_farm_name(farm_id)
        );
        self.record_activity(crop.plantation_date.clone(), action, "crop");
        info!(id, farm_id, "recorded crop");

        Ok(self.commit(crop))
    }

    pub fn update_crop(&mut self, id: EntityId, patch: CropUpdate) -> Result<Committed<Crop>> {
        let index = self.crop_index(id)?;
        let mut crop = self.state.crops[index].clone();
        let mut errors = Vec::new();

        if let Some(name) = patch.crop_name {
            crop.crop_name = name.trim().to_string();
        }
        if let Some(variety) = patch.variety {
            crop.variety = non_blank(variety);
        }
        if let Some(raw) = patch.plantation_date {
            if let Some(date) = require_date("plantationDate", &raw, &mut errors) {
                crop.plantation_date = date;
            }
        }
        if let Some(raw) = patch.harvest_date {
            if let Some(date) = require_date("harvestDate", &raw, &mut errors) {
                crop.harvest_date = date;
            }
        }
        if let Some(farm_id) = patch.farm_id {
            if let Some(farm_id) = require_farm(&self.state.farms, Some(farm_id), &mut errors) {
                crop.farm_id = farm_id;
            }
        }
        if let Some(area) = patch.area {
            crop.area = area;
        }
        if let Some(notes) = patch.notes {
            crop.notes = non_blank(notes);
        }
        if let Some(status) = patch.status {
            crop.status = status;
        }

        require_text("cropName", &crop.crop_name, &mut errors);
        require_non_negative("area", crop.area, &mut errors);
        for (field, date) in [
            ("plantationDate", &crop.plantation_date),
            ("harvestDate", &crop.harvest_date),
        ] {
            if date.to_naive().is_none() && !errors.iter().any(|e| e.field == field) {
                errors.push(FieldError::new(field, "must be a date (YYYY-MM-DD)"));
            }
        }
        check_date_order(&crop.plantation_date, &crop.harvest_date, &mut errors);
        check(errors)?;

        self.state.crops[index] = crop.clone();
        self.record_activity(
            RecordDate::from(today()),
            format!("Updated crop {}", crop.crop_name),
            "crop",
        );
        info!(id, "updated crop");

        Ok(self.commit(crop))
    }

    pub fn delete_crop(&mut self, id: EntityId) -> Result<Committed<Crop>> {
        let index = self.crop_index(id)?;
        let crop = self.state.crops.remove(index);

        self.record_activity(
            RecordDate::from(today()),
            format!("Deleted crop {}", crop.crop_name),
            "crop",
        );
        info!(id, "deleted crop");

        Ok(self.commit(crop))
    }

    fn crop_index(&self, id: EntityId) -> Result<usize> {
        self.state
            .crops
            .iter()
            .position(|c| c.id == id)
            .ok_or(FarmError::NotFound {
                kind: EntityKind::Crop,
                id,
            })
    }
}
