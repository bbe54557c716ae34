//! Required-field to source-column mapping

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use super::error::MappingError;
use super::table::SourceTable;

/// Semantic fields the import flow knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequiredField {
    Latitude,
    Longitude,
    Species,
    Breed,
    CaseCount,
}

impl RequiredField {
    /// All fields, in mapping-table order
    pub const ALL: [RequiredField; 5] = [
        RequiredField::Latitude,
        RequiredField::Longitude,
        RequiredField::Species,
        RequiredField::Breed,
        RequiredField::CaseCount,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Latitude => "latitude",
            Self::Longitude => "longitude",
            Self::Species => "species",
            Self::Breed => "breed",
            Self::CaseCount => "case_count",
        }
    }
}

impl fmt::Display for RequiredField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RequiredField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = normalize(s);
        Self::ALL
            .into_iter()
            .find(|f| normalize(f.name()) == wanted)
            .ok_or_else(|| {
                format!(
                    "unknown field {:?} (expected one of: {})",
                    s,
                    Self::ALL.map(|f| f.name()).join(", ")
                )
            })
    }
}

/// Lower-case and drop `_`, `-` and spaces so "Case Count" matches "case_count"
fn normalize(s: &str) -> String {
    s.chars()
        .filter(|c| !matches!(c, '_' | '-' | ' '))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Which source column feeds each required field; absent means unmapped
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMapping {
    columns: BTreeMap<RequiredField, String>,
}

impl FieldMapping {
    /// Empty mapping (everything unmapped)
    pub fn new() -> Self {
        Self::default()
    }

    /// Guess a mapping from column names: for each field, the first column
    /// whose normalized name contains the normalized field name.
    pub fn auto(columns: &[String]) -> Self {
        let normalized: Vec<String> = columns.iter().map(|c| normalize(c)).collect();
        let mut mapping = Self::new();
        for field in RequiredField::ALL {
            let needle = normalize(field.name());
            if let Some(pos) = normalized.iter().position(|c| c.contains(&needle)) {
                debug!(%field, column = %columns[pos], "FieldMapping::auto: matched");
                mapping.columns.insert(field, columns[pos].clone());
            }
        }
        mapping
    }

    /// Map a field to a column (builder style)
    pub fn with(mut self, field: RequiredField, column: impl Into<String>) -> Self {
        self.columns.insert(field, column.into());
        self
    }

    /// Override one entry; `None` unmaps the field
    pub fn set(&mut self, field: RequiredField, column: Option<String>) {
        match column {
            Some(column) => {
                self.columns.insert(field, column);
            }
            None => {
                self.columns.remove(&field);
            }
        }
    }

    pub fn get(&self, field: RequiredField) -> Option<&str> {
        self.columns.get(&field).map(String::as_str)
    }

    pub fn is_mapped(&self, field: RequiredField) -> bool {
        self.columns.contains_key(&field)
    }

    /// Mapped entries in field order
    pub fn entries(&self) -> impl Iterator<Item = (RequiredField, &str)> {
        self.columns.iter().map(|(f, c)| (*f, c.as_str()))
    }

    /// Check the mapping can drive validation against `table`: latitude and
    /// longitude mapped, every mapped column present.
    pub fn check(&self, table: &SourceTable) -> Result<(), MappingError> {
        let missing: Vec<RequiredField> = [RequiredField::Latitude, RequiredField::Longitude]
            .into_iter()
            .filter(|f| !self.is_mapped(*f))
            .collect();
        if !missing.is_empty() {
            return Err(MappingError::Missing(missing));
        }
        for (field, column) in self.entries() {
            if !table.has_column(column) {
                return Err(MappingError::UnknownColumn {
                    field,
                    column: column.to_string(),
                });
            }
        }
        Ok(())
    }
}
