//! In-memory FeatureStore, for tests and embedding

use std::collections::BTreeMap;

use crate::error::StoreError;
use crate::feature::{Feature, FeatureId, LayerInfo, LayerSpec, NewFeature};
use crate::store::{FeatureStore, StoreResult, check_name};

#[derive(Debug, Default)]
struct MemLayer {
    info: Option<LayerInfo>,
    features: Vec<Feature>,
}

/// A FeatureStore that keeps everything in process memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    layers: BTreeMap<String, MemLayer>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FeatureStore for MemoryStore {
    fn find_layer(&self, name: &str) -> StoreResult<Option<LayerInfo>> {
        Ok(self.layers.get(name).and_then(|l| l.info.clone()))
    }

    fn get_or_create(&mut self, spec: &LayerSpec) -> StoreResult<LayerInfo> {
        check_name(&spec.name)?;
        let layer = self.layers.entry(spec.name.clone()).or_default();
        Ok(layer.info.get_or_insert_with(|| LayerInfo::from_spec(spec)).clone())
    }

    fn append(&mut self, layer: &str, features: Vec<NewFeature>) -> StoreResult<Vec<FeatureId>> {
        let entry = self
            .layers
            .get_mut(layer)
            .ok_or_else(|| StoreError::LayerNotFound(layer.to_string()))?;
        let info = entry
            .info
            .as_ref()
            .ok_or_else(|| StoreError::LayerNotFound(layer.to_string()))?;
        for feature in &features {
            info.check(feature)?;
        }

        let mut next_id = entry.features.last().map(|f| f.id).unwrap_or(0) + 1;
        let mut ids = Vec::with_capacity(features.len());
        for feature in features {
            entry.features.push(feature.into_feature(next_id));
            ids.push(next_id);
            next_id += 1;
        }
        Ok(ids)
    }

    fn features(&self, layer: &str) -> StoreResult<Vec<Feature>> {
        self.layers
            .get(layer)
            .filter(|l| l.info.is_some())
            .map(|l| l.features.clone())
            .ok_or_else(|| StoreError::LayerNotFound(layer.to_string()))
    }

    fn layer_names(&self) -> StoreResult<Vec<String>> {
        Ok(self
            .layers
            .iter()
            .filter(|(_, l)| l.info.is_some())
            .map(|(name, _)| name.clone())
            .collect())
    }
}
