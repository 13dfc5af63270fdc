//! The `ccat` binary against catalog files on disk.

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use cluster_catalog::catalog_file::CatalogFile;
use cluster_catalog::test_utils::SAMPLE_CATALOG;

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new(catalog: &str) -> Self {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("catalog.toml"), catalog).unwrap();
        Self {
            dir,
        }
    }

    fn catalog(&self) -> PathBuf {
        self.dir.path().join("catalog.toml")
    }

    fn ccat(&self) -> Command {
        let mut cmd = Command::cargo_bin("ccat").unwrap();
        cmd.env("NO_COLOR", "1")
            .env("CCAT_CONFIG_PATH", self.dir.path().join("missing-config.toml"))
            .env_remove("RUST_LOG")
            .arg("--catalog")
            .arg(self.catalog());
        cmd
    }

    fn read(&self) -> CatalogFile {
        read_catalog(&self.catalog())
    }
}

fn read_catalog(path: &Path) -> CatalogFile {
    CatalogFile::parse(&std::fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn test_check_reports_counts() {
    let ws = Workspace::new(SAMPLE_CATALOG);
    ws.ccat()
        .arg("check")
        .assert()
        .success()
        .stdout(predicate::str::contains("4 templates, 3 dependencies, no cycles"));
}

#[test]
fn test_check_rejects_cyclic_catalog() {
    let cyclic = SAMPLE_CATALOG.replace(
        "name = \"Valve\"\nsegment = \"Water\"",
        "name = \"Valve\"\ndepends_on = [\"Pump\"]\nsegment = \"Water\"",
    );
    assert_ne!(cyclic, SAMPLE_CATALOG);

    let ws = Workspace::new(&cyclic);
    ws.ccat()
        .arg("check")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Circular dependency detected"));
}

#[test]
fn test_list_filters_by_segment() {
    let ws = Workspace::new(SAMPLE_CATALOG);
    ws.ccat()
        .args(["list", "--segment", "Water"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Pump"))
        .stdout(predicate::str::contains("Valve"))
        .stdout(predicate::str::contains("Heater").not());
}

#[test]
fn test_list_json() {
    let ws = Workspace::new(SAMPLE_CATALOG);
    let output = ws.ccat().args(["list", "--block-type", "FB", "--json"]).output().unwrap();
    assert!(output.status.success());

    let rows: Vec<serde_json::Value> = serde_json::from_slice(&output.stdout).unwrap();
    let names: Vec<&str> = rows.iter().filter_map(|r| r["name"].as_str()).collect();
    assert_eq!(names, vec!["Heater", "Motor", "Pump"]);
    assert_eq!(rows[2]["depends_on"], serde_json::json!(["Motor", "Valve"]));
}

#[test]
fn test_tree_and_order() {
    let ws = Workspace::new(SAMPLE_CATALOG);
    ws.ccat()
        .args(["tree", "Pump"])
        .assert()
        .success()
        .stdout(predicate::str::contains("├── Motor"))
        .stdout(predicate::str::contains("│   └── Valve"));

    ws.ccat().args(["order", "Pump"]).assert().success().stdout("Valve\nMotor\nPump\n");
}

#[test]
fn test_show_lists_parameters() {
    let ws = Workspace::new(SAMPLE_CATALOG);
    ws.ccat()
        .args(["show", "Pump"])
        .assert()
        .success()
        .stdout(predicate::str::contains("depends on: Motor, Valve"))
        .stdout(predicate::str::contains("parameters: 2"))
        .stdout(predicate::str::contains("Speed"));
}

#[test]
fn test_segments() {
    let ws = Workspace::new(SAMPLE_CATALOG);
    ws.ccat()
        .arg("segments")
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"(?s)Water\s+3.*Power\s+1").unwrap());
}

#[test]
fn test_set_deps_rewrites_catalog() {
    let ws = Workspace::new(SAMPLE_CATALOG);
    ws.ccat().args(["set-deps", "Heater", "Valve", "Motor"]).assert().success();

    let file = ws.read();
    let heater = file.entry("Heater").unwrap();
    assert_eq!(heater.depends_on, vec!["Motor".to_string(), "Valve".to_string()]);
    // Untouched entries keep their content
    assert_eq!(file.entry("Pump").unwrap().parameters.len(), 2);

    ws.ccat()
        .arg("check")
        .assert()
        .success()
        .stdout(predicate::str::contains("5 dependencies"));
}

#[test]
fn test_set_deps_cycle_leaves_file_alone() {
    let ws = Workspace::new(SAMPLE_CATALOG);
    let before = std::fs::read_to_string(ws.catalog()).unwrap();

    ws.ccat()
        .args(["set-deps", "Valve", "Pump"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Circular dependency detected"))
        .stderr(predicate::str::contains("Cycle: Valve → Pump"));

    assert_eq!(std::fs::read_to_string(ws.catalog()).unwrap(), before);
}

#[test]
fn test_set_deps_dry_run_and_clear() {
    let ws = Workspace::new(SAMPLE_CATALOG);
    let before = std::fs::read_to_string(ws.catalog()).unwrap();

    ws.ccat()
        .args(["set-deps", "--dry-run", "Pump"])
        .assert()
        .success()
        .stdout(predicate::str::contains("dry run"));
    assert_eq!(std::fs::read_to_string(ws.catalog()).unwrap(), before);

    ws.ccat().args(["set-deps", "Pump"]).assert().success();
    assert!(ws.read().entry("Pump").unwrap().depends_on.is_empty());
}

#[test]
fn test_unknown_template_name() {
    let ws = Workspace::new(SAMPLE_CATALOG);
    ws.ccat()
        .args(["show", "Gearbox"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Template 'Gearbox' not found"))
        .stderr(predicate::str::contains("ccat list"));
}

#[test]
fn test_missing_catalog_file() {
    let ws = Workspace::new(SAMPLE_CATALOG);
    Command::cargo_bin("ccat")
        .unwrap()
        .env("NO_COLOR", "1")
        .env("CCAT_CONFIG_PATH", ws.dir.path().join("missing-config.toml"))
        .arg("--catalog")
        .arg(ws.dir.path().join("nope.toml"))
        .arg("check")
        .assert()
        .failure()
        .code(1);
}
