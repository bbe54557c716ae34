//! Binary-level tests for the layerstore CLI

use assert_cmd::Command;
use layerstore::{DirStore, FeatureStore, FieldType, Geometry, GeometryKind, LayerSpec, NewFeature};
use predicates::prelude::*;
use tempfile::TempDir;

fn seeded_store() -> TempDir {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let mut store = DirStore::open(temp.path()).expect("Failed to open store");
    let spec = LayerSpec::new("Outbreak_Points", GeometryKind::Point, "EPSG:4326").field("Species", FieldType::Text);
    store.get_or_create(&spec).expect("Failed to create layer");
    store
        .append(
            "Outbreak_Points",
            vec![
                NewFeature::new(Geometry::point(38.74, 9.03)).with("Species", "Cattle"),
                NewFeature::new(Geometry::point(39.5, 8.0)).with("Species", "Goat"),
            ],
        )
        .expect("Failed to append");
    temp
}

#[test]
fn test_list_shows_layers() {
    let temp = seeded_store();
    Command::cargo_bin("layerstore")
        .unwrap()
        .arg("--store")
        .arg(temp.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("Outbreak_Points"));
}

#[test]
fn test_stats_reports_count() {
    let temp = seeded_store();
    Command::cargo_bin("layerstore")
        .unwrap()
        .arg("--store")
        .arg(temp.path())
        .args(["stats", "Outbreak_Points"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Features: 2"));
}

#[test]
fn test_export_writes_geojson() {
    let temp = seeded_store();
    let out = temp.path().join("out.geojson");
    Command::cargo_bin("layerstore")
        .unwrap()
        .arg("--store")
        .arg(temp.path())
        .args(["export", "Outbreak_Points", "--output"])
        .arg(&out)
        .assert()
        .success();

    let content = std::fs::read_to_string(&out).unwrap();
    let json: serde_json::Value = serde_json::from_str(&content).unwrap();
    assert_eq!(json["features"].as_array().unwrap().len(), 2);
    assert_eq!(json["features"][1]["properties"]["Species"], "Goat");
}

#[test]
fn test_show_missing_layer_fails() {
    let temp = seeded_store();
    Command::cargo_bin("layerstore")
        .unwrap()
        .arg("--store")
        .arg(temp.path())
        .args(["show", "Trace_Links"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Layer not found"));
}

#[test]
fn test_list_missing_store_leaves_no_directory() {
    let temp = TempDir::new().unwrap();
    let missing = temp.path().join("not_a_store");
    Command::cargo_bin("layerstore")
        .unwrap()
        .arg("--store")
        .arg(&missing)
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No layer store at"));
    assert!(!missing.exists());
}
