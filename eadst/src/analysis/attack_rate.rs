//! Attack rates, overall or stratified by an attribute

use layerstore::{Feature, FeatureStore};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info};

use super::{AnalysisError, layer_with_fields};

/// Group label of the unstratified result
pub const OVERALL_GROUP: &str = "Overall";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttackRateRow {
    pub group: String,
    pub cases: f64,
    pub population: f64,
    /// Percentage; None when the population is zero
    pub rate: Option<f64>,
}

impl AttackRateRow {
    fn new(group: String, cases: f64, population: f64) -> Self {
        let rate = (population > 0.0).then(|| cases * 100.0 / population);
        Self {
            group,
            cases,
            population,
            rate,
        }
    }
}

/// Sum cases and population per group and derive the attack rate.
///
/// Non-numeric or missing counts are treated as zero. Without `stratify` the
/// result is a single [`OVERALL_GROUP`] row; with it, one row per distinct
/// non-null value, sorted by value.
pub fn compute_attack_rates(
    features: &[Feature],
    cases_field: &str,
    population_field: &str,
    stratify: Option<&str>,
) -> Vec<AttackRateRow> {
    let counts = |f: &Feature| {
        (
            f.get(cases_field).as_f64().unwrap_or(0.0),
            f.get(population_field).as_f64().unwrap_or(0.0),
        )
    };

    let Some(stratify) = stratify else {
        let (cases, population) = features
            .iter()
            .map(counts)
            .fold((0.0, 0.0), |(c, p), (fc, fp)| (c + fc, p + fp));
        return vec![AttackRateRow::new(OVERALL_GROUP.to_string(), cases, population)];
    };

    let mut groups: BTreeMap<String, (f64, f64)> = BTreeMap::new();
    for feature in features {
        let key = feature.get(stratify);
        if key.is_null() {
            continue;
        }
        let (cases, population) = counts(feature);
        let entry = groups.entry(key.to_string()).or_default();
        entry.0 += cases;
        entry.1 += population;
    }
    groups
        .into_iter()
        .map(|(group, (cases, population))| AttackRateRow::new(group, cases, population))
        .collect()
}

/// Attack rates over the features of `layer`
pub fn attack_rates(
    store: &dyn FeatureStore,
    layer: &str,
    cases_field: &str,
    population_field: &str,
    stratify: Option<&str>,
) -> Result<Vec<AttackRateRow>, AnalysisError> {
    debug!(%layer, %cases_field, %population_field, ?stratify, "attack_rates: called");
    let mut fields = vec![cases_field, population_field];
    fields.extend(stratify);
    layer_with_fields(store, layer, &fields)?;

    let rows = compute_attack_rates(&store.features(layer)?, cases_field, population_field, stratify);
    info!(%layer, groups = rows.len(), "Computed attack rates");
    Ok(rows)
}
