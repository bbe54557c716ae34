//! End-to-end import flow against an on-disk layer store

use std::fs;

use eadst::import::{
    CommitOptions, ImportError, ImportSession, LoadError, Loader, MappingError, RequiredField, RowFailure,
    SessionState,
};
use eadst::{FieldMapping, InMemoryCatalog, ReferenceDb};
use layerstore::{Coord, DirStore, FeatureStore, Geometry, Value};
use tempfile::TempDir;

const OUTBREAK_CSV: &str = "lat,lon,species,breed\n\
                            9.03,38.74,Cattle,Boran\n\
                            X,38.74,Cattle,Boran\n\
                            9.03,38.74,Cattle,UnknownBreed\n";

fn catalog() -> InMemoryCatalog {
    InMemoryCatalog::new().with_species("Cattle", ["Boran", "Holstein"])
}

fn full_mapping() -> FieldMapping {
    FieldMapping::new()
        .with(RequiredField::Latitude, "lat")
        .with(RequiredField::Longitude, "lon")
        .with(RequiredField::Species, "species")
        .with(RequiredField::Breed, "breed")
}

#[test]
fn test_reference_scenario_commits_one_feature() {
    let temp = TempDir::new().unwrap();
    let csv = temp.path().join("outbreaks.csv");
    fs::write(&csv, OUTBREAK_CSV).unwrap();

    let mut session = ImportSession::default();
    session.load(&csv).unwrap();
    session.set_mapping(full_mapping()).unwrap();
    let report = session.validate(&catalog()).unwrap();

    assert!(report.status(0).unwrap().is_valid());
    assert_eq!(report.status(1).unwrap().failure(), Some(&RowFailure::InvalidCoordinates));
    assert!(matches!(
        report.status(2).unwrap().failure(),
        Some(RowFailure::UnknownBreed { breed, .. }) if breed == "UnknownBreed"
    ));

    let mut store = DirStore::open(temp.path().join("2_GIS_Layers")).unwrap();
    let summary = session.commit(&mut store, &CommitOptions::default()).unwrap();
    assert_eq!(summary.committed, 1);
    assert!(summary.created_layer);
    assert_eq!(session.state(), SessionState::Committed);

    // Reopen to read what actually reached disk
    let store = DirStore::open(temp.path().join("2_GIS_Layers")).unwrap();
    let features = store.features("Imported_Outbreaks").unwrap();
    assert_eq!(features.len(), 1);
    assert_eq!(features[0].geometry, Geometry::Point(Coord::new(38.74, 9.03)));
    assert_eq!(features[0].get("breed"), &Value::from("Boran"));
    assert_eq!(features[0].get("lat"), &Value::from("9.03"));
}

#[test]
fn test_missing_file_leaves_session_unchanged() {
    let temp = TempDir::new().unwrap();
    let mut session = ImportSession::default();

    let err = session.load(&temp.path().join("does-not-exist.csv")).unwrap_err();
    assert!(matches!(err, ImportError::Load(LoadError::Unreadable { .. })));
    assert_eq!(session.state(), SessionState::Empty);
    assert!(session.table().is_none());

    // Same after a successful load: the old table survives
    let csv = temp.path().join("ok.csv");
    fs::write(&csv, OUTBREAK_CSV).unwrap();
    session.load(&csv).unwrap();
    session.auto_map().unwrap();
    assert!(session.load(&temp.path().join("gone.csv")).is_err());
    assert_eq!(session.state(), SessionState::Mapped);
    assert_eq!(session.table().map(|t| t.len()), Some(3));
}

#[test]
fn test_unmapped_latitude_is_named() {
    let mut session = ImportSession::default();
    session.load_table(Loader::new().load_str(OUTBREAK_CSV, "inline").unwrap());
    session
        .set_mapping(FieldMapping::new().with(RequiredField::Longitude, "lon"))
        .unwrap();

    let err = session.validate(&catalog()).unwrap_err();
    let ImportError::Mapping(mapping_err) = err else {
        panic!("expected a mapping error");
    };
    assert_eq!(mapping_err, MappingError::Missing(vec![RequiredField::Latitude]));
    assert!(mapping_err.to_string().contains("latitude"));
    assert_eq!(session.state(), SessionState::Mapped);
}

#[test]
fn test_auto_map_then_validate_with_reference_db() {
    let db = ReferenceDb::open_in_memory().unwrap();
    db.add_species("Cattle").unwrap();
    db.add_breed("Cattle", "Boran").unwrap();
    let catalog = db.load_catalog().unwrap();

    let csv = "Latitude,Longitude,Species,Breed,Case_Count\n\
               9.03,38.74,Cattle,Boran,4\n\
               8.98,38.80,Goat,Arsi,2\n";
    let mut session = ImportSession::default();
    session.load_table(Loader::new().load_str(csv, "inline").unwrap());
    let mapping = session.auto_map().unwrap().clone();
    assert_eq!(mapping.get(RequiredField::CaseCount), Some("Case_Count"));

    let report = session.validate(&catalog).unwrap();
    assert_eq!(report.valid_count(), 1);
    assert!(matches!(
        report.status(1).unwrap().failure(),
        Some(RowFailure::UnknownSpecies { species }) if species == "Goat"
    ));
}

#[test]
fn test_annotated_report_lists_reasons() {
    let table = Loader::new().load_str(OUTBREAK_CSV, "inline").unwrap();
    let report = eadst::import::validate(&table, &full_mapping(), &catalog()).unwrap();

    let mut out = Vec::new();
    report.write_annotated(&table, &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    let lines: Vec<&str> = text.lines().collect();

    assert_eq!(lines[0], "lat,lon,species,breed,validation_error");
    assert_eq!(lines[1], "9.03,38.74,Cattle,Boran,");
    assert_eq!(lines[2], "X,38.74,Cattle,Boran,invalid coordinates");
    assert!(lines[3].contains("unknown breed"));
}

#[test]
fn test_second_import_appends_to_existing_layer() {
    let temp = TempDir::new().unwrap();
    let mut store = DirStore::open(temp.path()).unwrap();
    let options = CommitOptions::default();

    for _ in 0..2 {
        let mut session = ImportSession::default();
        session.load_table(Loader::new().load_str(OUTBREAK_CSV, "inline").unwrap());
        session.set_mapping(full_mapping()).unwrap();
        session.validate(&catalog()).unwrap();
        session.commit(&mut store, &options).unwrap();
    }

    assert_eq!(store.features("Imported_Outbreaks").unwrap().len(), 2);
}
