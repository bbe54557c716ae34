//! FeatureStore trait and the directory-backed implementation

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::StoreError;
use crate::feature::{Bounds, Feature, FeatureId, LayerInfo, LayerSpec, NewFeature};

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

const LAYER_FILE: &str = "layer.json";
const FEATURES_FILE: &str = "features.jsonl";

/// A collection of named layers that features can be appended to
pub trait FeatureStore {
    /// Look up a layer by name
    fn find_layer(&self, name: &str) -> StoreResult<Option<LayerInfo>>;

    /// Return the named layer, creating it from `spec` if absent.
    ///
    /// An existing layer is returned unchanged, even when its schema differs from `spec`.
    fn get_or_create(&mut self, spec: &LayerSpec) -> StoreResult<LayerInfo>;

    /// Append features to a layer. Every feature is checked against the layer
    /// before anything is written; on error nothing is appended.
    fn append(&mut self, layer: &str, features: Vec<NewFeature>) -> StoreResult<Vec<FeatureId>>;

    /// All features of a layer in append order
    fn features(&self, layer: &str) -> StoreResult<Vec<Feature>>;

    /// Names of all layers, sorted
    fn layer_names(&self) -> StoreResult<Vec<String>>;
}

/// Summary of a layer's contents
#[derive(Debug, Clone)]
pub struct LayerStats {
    pub feature_count: usize,
    pub bounds: Option<Bounds>,
}

/// Compute feature count and extent of a layer
pub fn layer_stats(store: &dyn FeatureStore, layer: &str) -> StoreResult<LayerStats> {
    let features = store.features(layer)?;
    Ok(LayerStats {
        feature_count: features.len(),
        bounds: Bounds::of(features.iter().map(|f| &f.geometry)),
    })
}

/// Reject names that are empty or could escape the store directory
pub(crate) fn check_name(name: &str) -> StoreResult<()> {
    let bad = name.trim().is_empty()
        || name.starts_with('.')
        || name.contains(['/', '\\', '\0'])
        || name.contains("..");
    if bad {
        return Err(StoreError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Layers stored one directory each:
///
/// ```text
/// <base>/
/// └── {layer_name}/
///     ├── layer.json       # LayerInfo
///     └── features.jsonl   # one Feature per line
/// ```
pub struct DirStore {
    base_path: PathBuf,
}

impl DirStore {
    /// Open or create a layer store at the given path
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let base_path = path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path)?;
        debug!(?base_path, "Opened layer store");
        Ok(Self { base_path })
    }

    /// Open a store that must already exist; never touches the filesystem
    pub fn open_existing(path: impl AsRef<Path>) -> StoreResult<Self> {
        let base_path = path.as_ref().to_path_buf();
        if !base_path.is_dir() {
            return Err(StoreError::StoreNotFound(base_path));
        }
        debug!(?base_path, "Opened existing layer store");
        Ok(Self { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn layer_dir(&self, name: &str) -> StoreResult<PathBuf> {
        check_name(name)?;
        Ok(self.base_path.join(name))
    }

    fn read_features(&self, name: &str, path: &Path) -> StoreResult<Vec<Feature>> {
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(path)?;
        content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(n, line)| {
                serde_json::from_str(line).map_err(|e| StoreError::Corrupt {
                    layer: name.to_string(),
                    message: format!("line {}: {}", n + 1, e),
                })
            })
            .collect()
    }
}

/// Write to a sibling temp file, then rename over the target
fn write_atomic(path: &Path, content: &[u8]) -> StoreResult<()> {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, content)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

impl FeatureStore for DirStore {
    fn find_layer(&self, name: &str) -> StoreResult<Option<LayerInfo>> {
        let layer_file = self.layer_dir(name)?.join(LAYER_FILE);
        if !layer_file.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&layer_file)?;
        let info = serde_json::from_str(&content).map_err(|e| StoreError::Corrupt {
            layer: name.to_string(),
            message: e.to_string(),
        })?;
        Ok(Some(info))
    }

    fn get_or_create(&mut self, spec: &LayerSpec) -> StoreResult<LayerInfo> {
        if let Some(existing) = self.find_layer(&spec.name)? {
            debug!(layer = %spec.name, "Reusing existing layer");
            return Ok(existing);
        }

        let dir = self.layer_dir(&spec.name)?;
        fs::create_dir_all(&dir)?;
        let info = LayerInfo::from_spec(spec);
        write_atomic(&dir.join(LAYER_FILE), serde_json::to_string_pretty(&info)?.as_bytes())?;
        fs::File::create(dir.join(FEATURES_FILE))?;

        info!(layer = %spec.name, geometry = %spec.geometry, fields = spec.fields.len(), "Created layer");
        Ok(info)
    }

    fn append(&mut self, layer: &str, features: Vec<NewFeature>) -> StoreResult<Vec<FeatureId>> {
        let info = self
            .find_layer(layer)?
            .ok_or_else(|| StoreError::LayerNotFound(layer.to_string()))?;
        for feature in &features {
            info.check(feature)?;
        }
        if features.is_empty() {
            return Ok(Vec::new());
        }

        let path = self.layer_dir(layer)?.join(FEATURES_FILE);
        let existing = self.read_features(layer, &path)?;
        let mut next_id = existing.iter().map(|f| f.id).max().unwrap_or(0) + 1;

        let mut content = if path.exists() { fs::read(&path)? } else { Vec::new() };
        if content.last().is_some_and(|b| *b != b'\n') {
            content.push(b'\n');
        }

        let mut ids = Vec::with_capacity(features.len());
        for feature in features {
            let feature = feature.into_feature(next_id);
            content.extend_from_slice(serde_json::to_string(&feature)?.as_bytes());
            content.push(b'\n');
            ids.push(next_id);
            next_id += 1;
        }
        write_atomic(&path, &content)?;

        debug!(layer, appended = ids.len(), "Appended features");
        Ok(ids)
    }

    fn features(&self, layer: &str) -> StoreResult<Vec<Feature>> {
        if self.find_layer(layer)?.is_none() {
            return Err(StoreError::LayerNotFound(layer.to_string()));
        }
        let path = self.layer_dir(layer)?.join(FEATURES_FILE);
        self.read_features(layer, &path)
    }

    fn layer_names(&self) -> StoreResult<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.base_path)? {
            let entry = entry?;
            if entry.path().join(LAYER_FILE).is_file()
                && let Some(name) = entry.file_name().to_str()
            {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::{FieldType, Geometry, GeometryKind};
    use tempfile::TempDir;

    fn points_spec() -> LayerSpec {
        LayerSpec::new("Imported_Outbreaks", GeometryKind::Point, "EPSG:4326")
            .field("species", FieldType::Text)
            .field("breed", FieldType::Text)
    }

    #[test]
    fn test_get_or_create_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let mut store = DirStore::open(temp.path()).unwrap();

        let first = store.get_or_create(&points_spec()).unwrap();
        let other_schema = LayerSpec::new("Imported_Outbreaks", GeometryKind::Point, "EPSG:20137")
            .field("something_else", FieldType::Integer);
        let second = store.get_or_create(&other_schema).unwrap();

        assert_eq!(first, second);
        assert_eq!(second.crs, "EPSG:4326");
        assert_eq!(store.layer_names().unwrap(), vec!["Imported_Outbreaks".to_string()]);
    }

    #[test]
    fn test_open_existing_does_not_create() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("no_such_store");
        assert!(matches!(
            DirStore::open_existing(&missing),
            Err(StoreError::StoreNotFound(ref p)) if p == &missing
        ));
        assert!(!missing.exists());

        DirStore::open(&missing).unwrap();
        let store = DirStore::open_existing(&missing).unwrap();
        assert!(store.layer_names().unwrap().is_empty());
    }

    #[test]
    fn test_append_and_read_back() {
        let temp = TempDir::new().unwrap();
        let mut store = DirStore::open(temp.path()).unwrap();
        store.get_or_create(&points_spec()).unwrap();

        let ids = store
            .append(
                "Imported_Outbreaks",
                vec![
                    NewFeature::new(Geometry::point(38.74, 9.03)).with("species", "Cattle"),
                    NewFeature::new(Geometry::point(39.0, 8.5)).with("breed", "Boran"),
                ],
            )
            .unwrap();
        assert_eq!(ids, vec![1, 2]);

        let more = store
            .append("Imported_Outbreaks", vec![NewFeature::new(Geometry::point(1.0, 1.0))])
            .unwrap();
        assert_eq!(more, vec![3]);

        // Reopen to make sure everything went to disk
        let store = DirStore::open(temp.path()).unwrap();
        let features = store.features("Imported_Outbreaks").unwrap();
        assert_eq!(features.len(), 3);
        assert_eq!(features[0].geometry, Geometry::point(38.74, 9.03));
        assert_eq!(features[0].get("species").as_text(), Some("Cattle"));
        assert_eq!(features[2].id, 3);
    }

    #[test]
    fn test_rejected_batch_writes_nothing() {
        let temp = TempDir::new().unwrap();
        let mut store = DirStore::open(temp.path()).unwrap();
        store.get_or_create(&points_spec()).unwrap();

        let err = store
            .append(
                "Imported_Outbreaks",
                vec![
                    NewFeature::new(Geometry::point(38.74, 9.03)).with("species", "Cattle"),
                    NewFeature::new(Geometry::point(38.74, 9.03)).with("colour", "red"),
                ],
            )
            .unwrap_err();
        assert!(err.is_schema_rejection());
        assert!(store.features("Imported_Outbreaks").unwrap().is_empty());
    }

    #[test]
    fn test_append_to_missing_layer() {
        let temp = TempDir::new().unwrap();
        let mut store = DirStore::open(temp.path()).unwrap();
        let err = store
            .append("Nope", vec![NewFeature::new(Geometry::point(0.0, 0.0))])
            .unwrap_err();
        assert!(matches!(err, StoreError::LayerNotFound(_)));
        assert!(matches!(store.features("Nope"), Err(StoreError::LayerNotFound(_))));
    }

    #[test]
    fn test_invalid_names_rejected() {
        let temp = TempDir::new().unwrap();
        let mut store = DirStore::open(temp.path()).unwrap();
        for name in ["", "../escape", "a/b", ".hidden"] {
            let spec = LayerSpec::new(name, GeometryKind::Point, "EPSG:4326");
            assert!(matches!(store.get_or_create(&spec), Err(StoreError::InvalidName(_))), "{name}");
        }
    }

    #[test]
    fn test_corrupt_line_reported() {
        let temp = TempDir::new().unwrap();
        let mut store = DirStore::open(temp.path()).unwrap();
        store.get_or_create(&points_spec()).unwrap();
        fs::write(temp.path().join("Imported_Outbreaks").join(FEATURES_FILE), "{not json}\n").unwrap();

        let err = store.features("Imported_Outbreaks").unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { ref message, .. } if message.starts_with("line 1")));
    }

    #[test]
    fn test_layer_stats() {
        let temp = TempDir::new().unwrap();
        let mut store = DirStore::open(temp.path()).unwrap();
        store.get_or_create(&points_spec()).unwrap();
        store
            .append(
                "Imported_Outbreaks",
                vec![
                    NewFeature::new(Geometry::point(38.0, 9.0)),
                    NewFeature::new(Geometry::point(40.0, 7.0)),
                ],
            )
            .unwrap();

        let stats = layer_stats(&store, "Imported_Outbreaks").unwrap();
        assert_eq!(stats.feature_count, 2);
        let b = stats.bounds.unwrap();
        assert_eq!((b.min_x, b.min_y, b.max_x, b.max_y), (38.0, 7.0, 40.0, 9.0));
    }
}
