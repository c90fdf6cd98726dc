use std::env;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Local;
use serde::Serialize;
use tracing::debug;

use super::commands::{
    ApplicationAction, ApplicationFields, CropAction, CropFields, FarmAction, FarmFields,
};
use crate::config::StoreConfig;
use crate::entity::{Application, Crop, EntityId, EntityKind, Farm, RecordDate};
use crate::error::{FarmError, FieldError, Result};
use crate::records::RecordFilter;
use crate::storage::FileStorage;
use crate::store::{
    ApplicationDraft, ApplicationUpdate, CropDraft, CropUpdate, EntityStore, FarmDraft,
    FarmUpdate,
};

/// Name of the data directory looked up from the working directory
pub const DATA_DIR_NAME: &str = ".farm-records";
/// Config file picked up from inside the data directory
pub const CONFIG_FILE_NAME: &str = "config.yaml";

type Store = EntityStore<FileStorage>;

/// Where the CLI keeps its data and configuration.
#[derive(Debug, Clone, Default)]
pub struct StoreLocation {
    pub data_dir: Option<PathBuf>,
    pub config: Option<PathBuf>,
}

impl StoreLocation {
    pub fn new(data_dir: Option<PathBuf>, config: Option<PathBuf>) -> Self {
        Self { data_dir, config }
    }

    fn open(&self) -> Result<Store> {
        let dir = match &self.data_dir {
            Some(dir) => dir.clone(),
            None => find_data_dir(),
        };
        let config = match &self.config {
            Some(path) => StoreConfig::from_yaml_file(path)?,
            None => load_dir_config(&dir)?,
        };
        debug!(dir = %dir.display(), "opening file storage");
        let backend = FileStorage::open(&dir)?;
        Ok(EntityStore::open(backend, config))
    }
}

/// Nearest `.farm-records` walking up from the working directory, or a new
/// one in the working directory.
fn find_data_dir() -> PathBuf {
    let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

    let mut current = cwd.as_path();
    loop {
        let candidate = current.join(DATA_DIR_NAME);
        if candidate.is_dir() {
            return candidate;
        }
        match current.parent() {
            Some(parent) => current = parent,
            None => return cwd.join(DATA_DIR_NAME),
        }
    }
}

fn load_dir_config(dir: &Path) -> Result<StoreConfig> {
    let path = dir.join(CONFIG_FILE_NAME);
    if path.is_file() {
        StoreConfig::from_yaml_file(&path)
    } else {
        Ok(StoreConfig::default())
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Ask before a destructive change. Non-interactive callers must pass `--force`.
fn confirm(prompt: &str, force: bool) -> Result<bool> {
    if force {
        return Ok(true);
    }

    eprintln!("{} [y/N] ", prompt);
    if atty::is(atty::Stream::Stdin) {
        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        Ok(input.trim().eq_ignore_ascii_case("y"))
    } else {
        Err(FarmError::ConfirmationRequired(
            "Use --force to confirm in non-interactive mode".to_string(),
        ))
    }
}

fn parse_bound(field: &'static str, raw: Option<String>) -> Result<Option<chrono::NaiveDate>> {
    match raw {
        None => Ok(None),
        Some(raw) => RecordDate::parse(&raw)
            .and_then(|d| d.to_naive())
            .map(Some)
            .ok_or_else(|| {
                FarmError::Validation(vec![FieldError::new(field, "must be a date (YYYY-MM-DD)")])
            }),
    }
}

fn format_acres(acres: f64) -> String {
    if acres > 0.0 {
        format!(" ({} acres)", acres)
    } else {
        String::new()
    }
}

fn print_farm(farm: &Farm) {
    let location = farm
        .location
        .as_deref()
        .map(|l| format!(" - {}", l))
        .unwrap_or_default();
    println!(
        "  {:03} [{}] {}{}{}",
        farm.id,
        farm.farm_id,
        farm.name,
        location,
        format_acres(farm.size)
    );
}

fn print_application(store: &Store, app: &Application) {
    println!(
        "  {:03} {} [{}] {} {} {} via {} @ {}",
        app.id,
        app.date,
        app.kind,
        app.product_name,
        app.quantity,
        app.unit,
        app.method,
        store.resolve_farm_name(app.farm_id)
    );
    if let Some(notes) = &app.notes {
        println!("      notes: {}", notes);
    }
}

fn print_crop(store: &Store, crop: &Crop) {
    let variety = crop
        .variety
        .as_deref()
        .map(|v| format!(" ({})", v))
        .unwrap_or_default();
    println!(
        "  {:03} [{}] {}{} planted {} harvest {}{} @ {}",
        crop.id,
        crop.status,
        crop.crop_name,
        variety,
        crop.plantation_date,
        crop.harvest_date,
        format_acres(crop.area),
        store.resolve_farm_name(crop.farm_id)
    );
}

pub fn handle_farm(location: &StoreLocation, action: FarmAction) -> Result<()> {
    let mut store = location.open()?;

    match action {
        FarmAction::Add { fields, json } => {
            let FarmFields {
                name,
                farm_id,
                location: place,
                size,
            } = fields;
            let farm = store
                .create_farm(FarmDraft {
                    name: name.unwrap_or_default(),
                    farm_id: farm_id.unwrap_or_default(),
                    location: place,
                    size,
                })?
                .into_result()?;

            if json {
                print_json(&farm)?;
            } else {
                println!("Created farm {:03} [{}] - {}", farm.id, farm.farm_id, farm.name);
            }
        }
        FarmAction::List { json } => {
            let farms = store.farms();
            if json {
                print_json(farms)?;
            } else if farms.is_empty() {
                println!("No farms found.");
            } else {
                println!("Farms:\n");
                for farm in farms {
                    print_farm(farm);
                }
            }
        }
        FarmAction::Update { id, fields, json } => {
            let farm = store
                .update_farm(
                    id,
                    FarmUpdate {
                        name: fields.name,
                        farm_id: fields.farm_id,
                        location: fields.location.map(Some),
                        size: fields.size,
                    },
                )?
                .into_result()?;

            if json {
                print_json(&farm)?;
            } else {
                println!("Updated farm {:03} [{}] - {}", farm.id, farm.farm_id, farm.name);
            }
        }
        FarmAction::Delete { id, force, json } => {
            let farm = store.get_farm(id).ok_or(FarmError::NotFound {
                kind: EntityKind::Farm,
                id,
            })?;
            let prompt = format!(
                "Delete farm {:03} [{}] - {} and all of its applications and crops?",
                farm.id, farm.farm_id, farm.name
            );
            if !confirm(&prompt, force)? {
                println!("Cancelled.");
                return Ok(());
            }

            let removal = store.delete_farm(id)?.into_result()?;
            if json {
                print_json(&removal)?;
            } else {
                println!(
                    "Deleted farm {:03} [{}] - {} ({} applications, {} crops removed)",
                    removal.farm.id,
                    removal.farm.farm_id,
                    removal.farm.name,
                    removal.applications_removed,
                    removal.crops_removed
                );
            }
        }
    }

    Ok(())
}

pub fn handle_application(location: &StoreLocation, action: ApplicationAction) -> Result<()> {
    let mut store = location.open()?;

    match action {
        ApplicationAction::Add { fields, json } => {
            let ApplicationFields {
                kind,
                product,
                quantity,
                unit,
                date,
                farm,
                method,
                notes,
            } = fields;
            let app = store
                .create_application(ApplicationDraft {
                    kind,
                    product_name: product.unwrap_or_default(),
                    quantity,
                    unit,
                    date: date.unwrap_or_default(),
                    farm_id: farm,
                    method,
                    notes,
                })?
                .into_result()?;

            if json {
                print_json(&app)?;
            } else {
                println!(
                    "Recorded {} application {:03} - {} on {}",
                    app.kind.tag(),
                    app.id,
                    app.product_name,
                    store.resolve_farm_name(app.farm_id)
                );
            }
        }
        ApplicationAction::List { farm, json } => {
            let apps: Vec<&Application> = store
                .applications()
                .iter()
                .filter(|a| farm.map_or(true, |id| a.farm_id == id))
                .collect();
            if json {
                print_json(&apps)?;
            } else if apps.is_empty() {
                println!("No applications found.");
            } else {
                println!("Applications:\n");
                for app in apps {
                    print_application(&store, app);
                }
            }
        }
        ApplicationAction::Update { id, fields, json } => {
            let app = store
                .update_application(
                    id,
                    ApplicationUpdate {
                        kind: fields.kind,
                        product_name: fields.product,
                        quantity: fields.quantity,
                        unit: fields.unit,
                        date: fields.date,
                        farm_id: fields.farm,
                        method: fields.method,
                        notes: fields.notes.map(Some),
                    },
                )?
                .into_result()?;

            if json {
                print_json(&app)?;
            } else {
                println!("Updated application {:03} - {}", app.id, app.product_name);
            }
        }
        ApplicationAction::Delete { id, force, json } => {
            let app = store.get_application(id).ok_or(FarmError::NotFound {
                kind: EntityKind::Application,
                id,
            })?;
            let prompt = format!(
                "Delete application {:03} - {} ({})?",
                app.id, app.product_name, app.date
            );
            if !confirm(&prompt, force)? {
                println!("Cancelled.");
                return Ok(());
            }

            let app = store.delete_application(id)?.into_result()?;
            if json {
                print_json(&app)?;
            } else {
                println!("Deleted application {:03} - {}", app.id, app.product_name);
            }
        }
    }

    Ok(())
}

pub fn handle_crop(location: &StoreLocation, action: CropAction) -> Result<()> {
    let mut store = location.open()?;

    match action {
        CropAction::Add { fields, json } => {
            let CropFields {
                name,
                variety,
                planted,
                harvest,
                farm,
                area,
                notes,
                status,
            } = fields;
            let crop = store
                .create_crop(CropDraft {
                    crop_name: name.unwrap_or_default(),
                    variety,
                    plantation_date: planted.unwrap_or_default(),
                    harvest_date: harvest.unwrap_or_default(),
                    farm_id: farm,
                    area,
                    notes,
                    status,
                })?
                .into_result()?;

            if json {
                print_json(&crop)?;
            } else {
                println!(
                    "Recorded crop {:03} - {} on {}",
                    crop.id,
                    crop.crop_name,
                    store.resolve_farm_name(crop.farm_id)
                );
            }
        }
        CropAction::List { farm, json } => {
            let crops: Vec<&Crop> = store
                .crops()
                .iter()
                .filter(|c| farm.map_or(true, |id| c.farm_id == id))
                .collect();
            if json {
                print_json(&crops)?;
            } else if crops.is_empty() {
                println!("No crops found.");
            } else {
                println!("Crops:\n");
                for crop in crops {
                    print_crop(&store, crop);
                }
            }
        }
        CropAction::Update { id, fields, json } => {
            let crop = store
                .update_crop(
                    id,
                    CropUpdate {
                        crop_name: fields.name,
                        variety: fields.variety.map(Some),
                        plantation_date: fields.planted,
                        harvest_date: fields.harvest,
                        farm_id: fields.farm,
                        area: fields.area,
                        notes: fields.notes.map(Some),
                        status: fields.status,
                    },
                )?
                .into_result()?;

            if json {
                print_json(&crop)?;
            } else {
                println!("Updated crop {:03} - {}", crop.id, crop.crop_name);
            }
        }
        CropAction::Delete { id, force, json } => {
            let crop = store.get_crop(id).ok_or(FarmError::NotFound {
                kind: EntityKind::Crop,
                id,
            })?;
            let prompt = format!(
                "Delete crop {:03} - {} (planted {})?",
                crop.id, crop.crop_name, crop.plantation_date
            );
            if !confirm(&prompt, force)? {
                println!("Cancelled.");
                return Ok(());
            }

            let crop = store.delete_crop(id)?.into_result()?;
            if json {
                print_json(&crop)?;
            } else {
                println!("Deleted crop {:03} - {}", crop.id, crop.crop_name);
            }
        }
    }

    Ok(())
}

pub fn handle_records(
    location: &StoreLocation,
    query: Vec<String>,
    farm: Option<EntityId>,
    from: Option<String>,
    to: Option<String>,
    kind: Option<String>,
    json: bool,
) -> Result<()> {
    let store = location.open()?;

    // Explicit flags win over the same constraint written in the query.
    let mut filter = RecordFilter::parse(&query.join(" "));
    if farm.is_some() {
        filter.farm_id = farm;
    }
    if let Some(date) = parse_bound("from", from)? {
        filter.date_from = Some(date);
    }
    if let Some(date) = parse_bound("to", to)? {
        filter.date_to = Some(date);
    }
    if let Some(kind) = kind {
        filter.kind = Some(kind.to_lowercase());
    }

    let rows = store.project(&filter);
    if json {
        return print_json(&rows);
    }
    if rows.is_empty() {
        println!("No records found.");
        return Ok(());
    }

    println!("Records:\n");
    for row in &rows {
        let mut line = format!(
            "  {} {:<10} {:03} {}",
            row.date,
            row.type_label(),
            row.id,
            row.name
        );
        if !row.quantity_label.is_empty() {
            line.push_str(&format!(" | {}", row.quantity_label));
        }
        if !row.method_or_variety.is_empty() {
            line.push_str(&format!(" | {}", row.method_or_variety));
        }
        line.push_str(&format!(" @ {}", store.resolve_farm_name(row.farm_id)));
        println!("{}", line);
        if !row.notes.is_empty() {
            println!("      notes: {}", row.notes);
        }
    }

    Ok(())
}

pub fn handle_activities(location: &StoreLocation, limit: usize, json: bool) -> Result<()> {
    let store = location.open()?;
    let activities = store.recent_activities(limit);

    if json {
        print_json(&activities)?;
    } else if activities.is_empty() {
        println!("No activity yet.");
    } else {
        println!("Recent activity:\n");
        for activity in activities {
            println!("  {} [{}] {}", activity.date, activity.kind, activity.action);
        }
    }

    Ok(())
}

pub fn handle_summary(location: &StoreLocation, json: bool) -> Result<()> {
    let store = location.open()?;
    let summary = store.summary(Local::now().date_naive());

    if json {
        return print_json(&summary);
    }

    println!("Farms: {}", summary.total_farms);
    println!("Applications in the last 7 days: {}", summary.recent_applications);
    println!("Crops planted in the last 30 days: {}", summary.recent_crops);
    if !summary.recent_activities.is_empty() {
        println!("\nRecent activity:\n");
        for activity in &summary.recent_activities {
            println!("  {} {}", activity.date, activity.action);
        }
    }

    Ok(())
}

pub fn handle_reset(location: &StoreLocation, force: bool, json: bool) -> Result<()> {
    let mut store = location.open()?;

    let prompt = format!(
        "Delete all {} farms, {} applications, {} crops and the activity log?",
        store.farms().len(),
        store.applications().len(),
        store.crops().len()
    );
    if !confirm(&prompt, force)? {
        println!("Cancelled.");
        return Ok(());
    }

    store.reset().into_result()?;
    if json {
        print_json(&serde_json::json!({ "reset": true }))?;
    } else {
        println!("All local data cleared.");
    }

    Ok(())
}
