//! Descriptive epidemiology over layer features

pub mod attack_rate;
pub mod epicurve;

use chrono::NaiveDate;
use layerstore::{FeatureStore, LayerInfo, StoreError};
use thiserror::Error;

pub use attack_rate::{AttackRateRow, OVERALL_GROUP, attack_rates, compute_attack_rates};
pub use epicurve::{EpiBin, EpiCurve, MAX_BINS, TimeUnit, bin_dates, epicurve};

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Layer not found: {0}")]
    LayerNotFound(String),

    #[error("Layer {layer} has no field named {field}")]
    UnknownField { layer: String, field: String },

    #[error("No valid dates in field {field} of layer {layer}")]
    NoDates { layer: String, field: String },

    #[error("Unknown time unit {0:?} (expected day, week or month)")]
    UnknownTimeUnit(String),

    #[error("Dates from {first} to {last} need {bins} {unit} bins (limit {limit}); check for a mistyped year")]
    TooManyBins {
        unit: TimeUnit,
        first: NaiveDate,
        last: NaiveDate,
        bins: usize,
        limit: usize,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Look up a layer and make sure every named field is in its schema
fn layer_with_fields(store: &dyn FeatureStore, layer: &str, fields: &[&str]) -> Result<LayerInfo, AnalysisError> {
    let info = store
        .find_layer(layer)?
        .ok_or_else(|| AnalysisError::LayerNotFound(layer.to_string()))?;
    if let Some(missing) = fields.iter().find(|f| !info.has_field(f)) {
        return Err(AnalysisError::UnknownField {
            layer: layer.to_string(),
            field: missing.to_string(),
        });
    }
    Ok(info)
}
