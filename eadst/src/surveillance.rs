//! Surveillance scheme design (nine-element plan) and costing

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// File suffix of saved schemes
pub const SCHEME_EXTENSION: &str = ".eadss.json";

pub const STAFF_DAILY_RATE: &str = "staff_daily_rate";
pub const COST_PER_KM: &str = "cost_per_km";
pub const COST_ELISA_TEST: &str = "cost_elisa_test";

#[derive(Debug, Error)]
pub enum SchemeError {
    #[error("Scheme is incomplete, missing: {}", .0.join(", "))]
    Incomplete(Vec<&'static str>),

    #[error("Scheme file I/O failed at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid scheme file {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// A surveillance plan covering the nine design elements
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurveillanceScheme {
    pub objective: String,
    pub context: String,
    pub inference_group: String,
    pub unit_selection: String,
    pub measurements: String,
    pub tools: String,
    pub number_units: String,
    pub frequency: String,
    pub data_recording: String,
}

impl SurveillanceScheme {
    /// Element keys with their prompts, in plan order
    pub const ELEMENTS: [(&'static str, &'static str); 9] = [
        ("objective", "Surveillance Objective"),
        ("context", "Surveillance Context"),
        ("inference_group", "Inference Group"),
        ("unit_selection", "Unit Selection"),
        ("measurements", "Measurements"),
        ("tools", "Measurement Tools"),
        ("number_units", "Number of Units"),
        ("frequency", "Frequency & Duration"),
        ("data_recording", "Data Recording"),
    ];

    pub fn element(&self, key: &str) -> Option<&str> {
        let value = match key {
            "objective" => &self.objective,
            "context" => &self.context,
            "inference_group" => &self.inference_group,
            "unit_selection" => &self.unit_selection,
            "measurements" => &self.measurements,
            "tools" => &self.tools,
            "number_units" => &self.number_units,
            "frequency" => &self.frequency,
            "data_recording" => &self.data_recording,
            _ => return None,
        };
        Some(value.as_str())
    }

    pub fn element_mut(&mut self, key: &str) -> Option<&mut String> {
        match key {
            "objective" => Some(&mut self.objective),
            "context" => Some(&mut self.context),
            "inference_group" => Some(&mut self.inference_group),
            "unit_selection" => Some(&mut self.unit_selection),
            "measurements" => Some(&mut self.measurements),
            "tools" => Some(&mut self.tools),
            "number_units" => Some(&mut self.number_units),
            "frequency" => Some(&mut self.frequency),
            "data_recording" => Some(&mut self.data_recording),
            _ => None,
        }
    }

    /// Keys of the elements left blank
    pub fn missing_elements(&self) -> Vec<&'static str> {
        Self::ELEMENTS
            .iter()
            .map(|(key, _)| *key)
            .filter(|key| self.element(key).is_none_or(|v| v.trim().is_empty()))
            .collect()
    }

    pub fn check(&self) -> Result<(), SchemeError> {
        let missing = self.missing_elements();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(SchemeError::Incomplete(missing))
        }
    }

    /// Write the scheme as pretty JSON; only complete schemes are saved
    pub fn save(&self, path: &Path) -> Result<(), SchemeError> {
        self.check()?;
        let content = serde_json::to_string_pretty(self).map_err(|source| SchemeError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, content).map_err(|source| SchemeError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), "Saved surveillance scheme");
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, SchemeError> {
        debug!(path = %path.display(), "SurveillanceScheme::load: called");
        let content = fs::read_to_string(path).map_err(|source| SchemeError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| SchemeError::Json {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Append the scheme suffix unless the path already has it
pub fn scheme_path(path: &Path) -> PathBuf {
    let name = path.to_string_lossy();
    if name.ends_with(SCHEME_EXTENSION) {
        path.to_path_buf()
    } else {
        PathBuf::from(format!("{}{}", name, SCHEME_EXTENSION))
    }
}

/// Unit costs used for costing
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EconomicParameters {
    pub staff_daily_rate: f64,
    pub cost_per_km: f64,
    pub cost_elisa_test: f64,
}

impl Default for EconomicParameters {
    fn default() -> Self {
        Self {
            staff_daily_rate: 40.0,
            cost_per_km: 0.50,
            cost_elisa_test: 5.0,
        }
    }
}

impl EconomicParameters {
    /// Read known keys from a parameter table; absent keys keep their defaults
    pub fn from_map(map: &BTreeMap<String, f64>) -> Self {
        let defaults = Self::default();
        let get = |key: &str, default: f64| map.get(key).copied().unwrap_or(default);
        Self {
            staff_daily_rate: get(STAFF_DAILY_RATE, defaults.staff_daily_rate),
            cost_per_km: get(COST_PER_KM, defaults.cost_per_km),
            cost_elisa_test: get(COST_ELISA_TEST, defaults.cost_elisa_test),
        }
    }

    pub fn to_map(&self) -> BTreeMap<String, f64> {
        BTreeMap::from([
            (STAFF_DAILY_RATE.to_string(), self.staff_daily_rate),
            (COST_PER_KM.to_string(), self.cost_per_km),
            (COST_ELISA_TEST.to_string(), self.cost_elisa_test),
        ])
    }
}

/// Resource quantities of a surveillance round
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CostQuantities {
    pub staff_days: f64,
    pub distance_km: f64,
    pub lab_tests: f64,
}

impl Default for CostQuantities {
    fn default() -> Self {
        Self {
            staff_days: 10.0,
            distance_km: 500.0,
            lab_tests: 200.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CostEstimate {
    pub personnel: f64,
    pub logistics: f64,
    pub laboratory: f64,
    pub total: f64,
}

pub fn estimate_cost(quantities: &CostQuantities, params: &EconomicParameters) -> CostEstimate {
    let personnel = quantities.staff_days * params.staff_daily_rate;
    let logistics = quantities.distance_km * params.cost_per_km;
    let laboratory = quantities.lab_tests * params.cost_elisa_test;
    CostEstimate {
        personnel,
        logistics,
        laboratory,
        total: personnel + logistics + laboratory,
    }
}
