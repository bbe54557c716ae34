//! Writing validated rows to the destination layer

use layerstore::{FeatureStore, FieldType, Geometry, GeometryKind, LayerSpec, NewFeature, Value};
use tracing::{debug, info, warn};

use super::error::CommitError;
use super::table::SourceTable;
use super::validate::ValidationReport;

/// Default destination layer for imported rows
pub const DEFAULT_IMPORT_LAYER: &str = "Imported_Outbreaks";

/// Where and how to commit
#[derive(Debug, Clone)]
pub struct CommitOptions {
    pub layer_name: String,
    /// CRS for a newly created layer
    pub crs: String,
}

impl Default for CommitOptions {
    fn default() -> Self {
        Self {
            layer_name: DEFAULT_IMPORT_LAYER.to_string(),
            crs: crate::project::DEFAULT_CRS.to_string(),
        }
    }
}

/// What a commit did
#[derive(Debug, Clone, PartialEq)]
pub struct CommitSummary {
    pub layer: String,
    pub committed: usize,
    /// True when the layer did not exist before this commit
    pub created_layer: bool,
    /// Source columns the (reused) layer has no field for
    pub dropped_columns: Vec<String>,
}

/// Schema a fresh import layer gets: every source column as text, point geometry
pub fn layer_spec_for(table: &SourceTable, options: &CommitOptions) -> LayerSpec {
    table
        .columns()
        .iter()
        .fold(LayerSpec::new(&options.layer_name, GeometryKind::Point, &options.crs), |spec, col| {
            spec.field(col, FieldType::Text)
        })
}

/// Append the valid rows of `report` to the destination layer as points
/// (x = longitude, y = latitude) with every column copied as text.
///
/// The batch goes to the store in one append, so a rejected write leaves the
/// layer untouched.
pub fn commit(
    table: &SourceTable,
    report: &ValidationReport,
    store: &mut dyn FeatureStore,
    options: &CommitOptions,
) -> Result<CommitSummary, CommitError> {
    debug!(layer = %options.layer_name, valid = report.valid_count(), "commit: called");
    if report.valid_count() == 0 {
        return Err(CommitError::NoValidRows);
    }

    let rejected = |source: layerstore::StoreError| CommitError::Rejected {
        layer: options.layer_name.clone(),
        source,
    };

    let existed = store.find_layer(&options.layer_name).map_err(rejected)?.is_some();
    let layer = store
        .get_or_create(&layer_spec_for(table, options))
        .map_err(rejected)?;
    if layer.geometry != GeometryKind::Point {
        return Err(CommitError::NotPointLayer {
            layer: layer.name,
            actual: layer.geometry,
        });
    }

    let (kept, dropped): (Vec<(usize, &String)>, Vec<(usize, &String)>) =
        table.columns().iter().enumerate().partition(|(_, c)| layer.has_field(c));
    let dropped_columns: Vec<String> = dropped.into_iter().map(|(_, c)| c.clone()).collect();
    if !dropped_columns.is_empty() {
        warn!(layer = %layer.name, columns = ?dropped_columns, "Existing layer lacks fields for some columns; not copied");
    }

    let features: Vec<NewFeature> = report
        .valid_rows()
        .filter_map(|valid| {
            let row = table.row(valid.index)?;
            let feature = kept.iter().fold(
                NewFeature::new(Geometry::point(valid.longitude, valid.latitude)),
                |feature, (i, name)| feature.with(name.as_str(), Value::Text(row[*i].clone())),
            );
            Some(feature)
        })
        .collect();

    let ids = store.append(&layer.name, features).map_err(rejected)?;

    info!(layer = %layer.name, committed = ids.len(), created = !existed, "Committed import");
    Ok(CommitSummary {
        layer: layer.name,
        committed: ids.len(),
        created_layer: !existed,
        dropped_columns,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::InMemoryCatalog;
    use crate::import::{FieldMapping, Loader, RequiredField, validate};
    use layerstore::{MemoryStore, StoreError};

    fn scenario() -> (SourceTable, ValidationReport) {
        let table = Loader::new()
            .load_str(
                "lat,lon,species,breed\n9.03,38.74,Cattle,Boran\nX,38.74,Cattle,Boran\n9.03,38.74,Cattle,UnknownBreed\n",
                "mem",
            )
            .unwrap();
        let mapping = FieldMapping::new()
            .with(RequiredField::Latitude, "lat")
            .with(RequiredField::Longitude, "lon")
            .with(RequiredField::Species, "species")
            .with(RequiredField::Breed, "breed");
        let catalog = InMemoryCatalog::new().with_species("Cattle", ["Boran", "Holstein"]);
        let report = validate(&table, &mapping, &catalog).unwrap();
        (table, report)
    }

    #[test]
    fn test_commit_writes_only_valid_rows() {
        let (table, report) = scenario();
        let mut store = MemoryStore::new();

        let summary = commit(&table, &report, &mut store, &CommitOptions::default()).unwrap();
        assert_eq!(summary.committed, 1);
        assert!(summary.created_layer);
        assert!(summary.dropped_columns.is_empty());

        let features = store.features(DEFAULT_IMPORT_LAYER).unwrap();
        assert_eq!(features.len(), report.valid_count());
        assert_eq!(features[0].geometry, Geometry::point(38.74, 9.03));
        assert_eq!(features[0].get("breed").as_text(), Some("Boran"));
        assert_eq!(features[0].get("lat").as_text(), Some("9.03"));

        let layer = store.find_layer(DEFAULT_IMPORT_LAYER).unwrap().unwrap();
        assert_eq!(layer.fields.len(), 4);
        assert!(layer.fields.iter().all(|f| f.field_type == FieldType::Text));
    }

    #[test]
    fn test_commit_reuses_layer_and_drops_unknown_columns() {
        let (table, report) = scenario();
        let mut store = MemoryStore::new();
        let existing = LayerSpec::new(DEFAULT_IMPORT_LAYER, GeometryKind::Point, "EPSG:4326")
            .field("species", FieldType::Text)
            .field("breed", FieldType::Text);
        store.get_or_create(&existing).unwrap();

        let summary = commit(&table, &report, &mut store, &CommitOptions::default()).unwrap();
        assert!(!summary.created_layer);
        assert_eq!(summary.dropped_columns, vec!["lat".to_string(), "lon".to_string()]);

        let features = store.features(DEFAULT_IMPORT_LAYER).unwrap();
        assert_eq!(features.len(), 1);
        assert!(features[0].get("lat").is_null());
        assert_eq!(features[0].get("species").as_text(), Some("Cattle"));
    }

    #[test]
    fn test_commit_rejected_by_schema_writes_nothing() {
        let (table, report) = scenario();
        let mut store = MemoryStore::new();
        let existing = LayerSpec::new(DEFAULT_IMPORT_LAYER, GeometryKind::Point, "EPSG:4326")
            .field("species", FieldType::Integer);
        store.get_or_create(&existing).unwrap();

        let err = commit(&table, &report, &mut store, &CommitOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            CommitError::Rejected {
                source: StoreError::TypeMismatch { .. },
                ..
            }
        ));
        assert!(store.features(DEFAULT_IMPORT_LAYER).unwrap().is_empty());
    }

    #[test]
    fn test_commit_refuses_line_layer() {
        let (table, report) = scenario();
        let mut store = MemoryStore::new();
        store
            .get_or_create(&LayerSpec::new(DEFAULT_IMPORT_LAYER, GeometryKind::LineString, "EPSG:4326"))
            .unwrap();
        let err = commit(&table, &report, &mut store, &CommitOptions::default()).unwrap_err();
        assert!(matches!(err, CommitError::NotPointLayer { .. }));
    }

    #[test]
    fn test_commit_with_no_valid_rows_is_noop() {
        let table = Loader::new().load_str("lat,lon\nX,Y\n", "mem").unwrap();
        let mapping = FieldMapping::new()
            .with(RequiredField::Latitude, "lat")
            .with(RequiredField::Longitude, "lon");
        let report = validate(&table, &mapping, &InMemoryCatalog::new()).unwrap();
        let mut store = MemoryStore::new();

        let err = commit(&table, &report, &mut store, &CommitOptions::default()).unwrap_err();
        assert!(matches!(err, CommitError::NoValidRows));
        assert!(store.layer_names().unwrap().is_empty());
    }
}
