use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn farm_cmd(dir: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_farm-records"));
    cmd.current_dir(dir);
    cmd
}

fn run(dir: &Path, args: &[&str]) -> Output {
    farm_cmd(dir).args(args).output().unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

fn add_farm(dir: &Path, name: &str, code: &str) -> Output {
    run(dir, &["farm", "add", "--name", name, "--farm-id", code, "--size", "12.5"])
}

fn add_urea(dir: &Path, farm: &str, date: &str) -> Output {
    run(
        dir,
        &[
            "application",
            "add",
            "--type",
            "fertilizer",
            "--product",
            "Urea",
            "--quantity",
            "50",
            "--unit",
            "kg",
            "--date",
            date,
            "--farm",
            farm,
            "--method",
            "granular",
        ],
    )
}

fn add_maize(dir: &Path, farm: &str) -> Output {
    run(
        dir,
        &[
            "crop",
            "add",
            "--name",
            "Maize",
            "--planted",
            "2024-02-10",
            "--harvest",
            "2024-07-01",
            "--farm",
            farm,
        ],
    )
}

#[test]
fn test_empty_listing() {
    let tmp = TempDir::new().unwrap();

    let output = run(tmp.path(), &["farm", "list"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("No farms found."));
}

#[test]
fn test_add_and_list_farm() {
    let tmp = TempDir::new().unwrap();

    let output = add_farm(tmp.path(), "Green Acres", "GA1");
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("Created farm 001 [GA1] - Green Acres"));
    assert!(tmp.path().join(".farm-records").join("fr_farms.json").exists());

    let output = run(tmp.path(), &["farm", "list"]);
    let out = stdout(&output);
    assert!(out.contains("Farms:"));
    assert!(out.contains("[GA1] Green Acres (12.5 acres)"));
}

#[test]
fn test_duplicate_farm_id_fails() {
    let tmp = TempDir::new().unwrap();
    add_farm(tmp.path(), "Green Acres", "GA1");

    let output = add_farm(tmp.path(), "Other", "ga1");
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Error: Farm ID 'ga1' is already in use"));
}

#[test]
fn test_missing_fields_are_all_reported() {
    let tmp = TempDir::new().unwrap();

    let output = run(tmp.path(), &["application", "add", "--product", "Urea"]);
    assert!(!output.status.success());
    let err = stderr(&output);
    assert!(err.starts_with("Error: Validation failed"));
    for field in ["type:", "quantity:", "unit:", "date:", "farmId:", "method:"] {
        assert!(err.contains(field), "missing {} in {}", field, err);
    }
}

#[test]
fn test_records_view_and_filters() {
    let tmp = TempDir::new().unwrap();
    add_farm(tmp.path(), "Green Acres", "GA1");
    add_urea(tmp.path(), "1", "2024-03-01");
    add_maize(tmp.path(), "1");

    let output = run(tmp.path(), &["records"]);
    assert!(output.status.success());
    let out = stdout(&output);
    let urea = out.find("Urea").unwrap();
    let maize = out.find("Maize").unwrap();
    assert!(urea < maize, "newest first:\n{}", out);
    assert!(out.contains("50 kg"));
    assert!(out.contains("@ Green Acres"));

    let output = run(tmp.path(), &["records", "type:crop"]);
    let out = stdout(&output);
    assert!(out.contains("Maize"));
    assert!(!out.contains("Urea"));

    let output = run(tmp.path(), &["records", "--from", "2024-02-15"]);
    let out = stdout(&output);
    assert!(out.contains("Urea"));
    assert!(!out.contains("Maize"));

    let output = run(tmp.path(), &["records", "--from", "soon"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("from: must be a date"));
}

#[test]
fn test_delete_farm_cascades() {
    let tmp = TempDir::new().unwrap();
    add_farm(tmp.path(), "Green Acres", "GA1");
    add_farm(tmp.path(), "Hilltop", "H1");
    add_urea(tmp.path(), "1", "2024-03-01");
    add_urea(tmp.path(), "2", "2024-03-02");
    add_maize(tmp.path(), "1");

    let output = run(tmp.path(), &["farm", "delete", "1", "--force"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("(1 applications, 1 crops removed)"));

    let output = run(tmp.path(), &["application", "list", "--json"]);
    let apps: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    let apps = apps.as_array().unwrap();
    assert_eq!(apps.len(), 1);
    assert_eq!(apps[0]["farmId"], 2);

    let output = run(tmp.path(), &["crop", "list"]);
    assert!(stdout(&output).contains("No crops found."));

    let output = run(tmp.path(), &["activities", "--limit", "1"]);
    assert!(stdout(&output).contains("Deleted farm Green Acres"));
}

#[test]
fn test_delete_without_force_in_non_interactive_mode_fails() {
    let tmp = TempDir::new().unwrap();
    add_farm(tmp.path(), "Green Acres", "GA1");

    let output = run(tmp.path(), &["farm", "delete", "1"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Use --force"));

    let output = run(tmp.path(), &["farm", "list", "--json"]);
    let farms: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(farms.as_array().unwrap().len(), 1);
}

#[test]
fn test_delete_unknown_farm_fails() {
    let tmp = TempDir::new().unwrap();

    let output = run(tmp.path(), &["farm", "delete", "7", "--force"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("farm not found: 7"));
}

#[test]
fn test_update_application_json() {
    let tmp = TempDir::new().unwrap();
    add_farm(tmp.path(), "Green Acres", "GA1");
    add_urea(tmp.path(), "1", "2024-03-01");

    let output = run(
        tmp.path(),
        &["app", "update", "1", "--quantity", "75", "--notes", "split dose", "--json"],
    );
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let app: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(app["quantity"], 75.0);
    assert_eq!(app["notes"], "split dose");
    assert_eq!(app["type"], "Fertilizer");
}

#[test]
fn test_reset_clears_everything() {
    let tmp = TempDir::new().unwrap();
    add_farm(tmp.path(), "Green Acres", "GA1");
    add_urea(tmp.path(), "1", "2024-03-01");

    let output = run(tmp.path(), &["reset"]);
    assert!(!output.status.success());

    let output = run(tmp.path(), &["reset", "--force"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("All local data cleared."));

    let output = run(tmp.path(), &["summary", "--json"]);
    let summary: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(summary["totalFarms"], 0);
    assert_eq!(summary["recentActivities"].as_array().unwrap().len(), 0);
}

#[test]
fn test_ids_not_reused_across_runs() {
    let tmp = TempDir::new().unwrap();
    add_farm(tmp.path(), "Green Acres", "GA1");
    add_farm(tmp.path(), "Hilltop", "H1");
    run(tmp.path(), &["farm", "delete", "2", "--force"]);

    let output = add_farm(tmp.path(), "Riverside", "R1");
    assert!(stdout(&output).contains("Created farm 003"));
}

#[test]
fn test_data_dir_found_from_subdirectory() {
    let tmp = TempDir::new().unwrap();
    add_farm(tmp.path(), "Green Acres", "GA1");

    let sub = tmp.path().join("fields").join("north");
    std::fs::create_dir_all(&sub).unwrap();
    let output = run(&sub, &["farm", "list"]);
    assert!(stdout(&output).contains("Green Acres"));
}

#[test]
fn test_explicit_data_dir() {
    let tmp = TempDir::new().unwrap();
    let data = tmp.path().join("records");

    let output = run(
        tmp.path(),
        &["farm", "add", "--name", "A", "--farm-id", "A", "--data-dir", data.to_str().unwrap()],
    );
    assert!(output.status.success());
    assert!(data.join("fr_farms.json").exists());
    assert!(!tmp.path().join(".farm-records").exists());
}
