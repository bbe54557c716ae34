//! Import flow error types

use layerstore::{GeometryKind, StoreError};
use thiserror::Error;

use super::mapping::RequiredField;
use super::session::SessionState;

/// The source file could not be turned into a table
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Cannot read {origin}: {source}")]
    Unreadable {
        origin: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{origin} is not valid UTF-8: {source}")]
    Encoding {
        origin: String,
        #[source]
        source: std::string::FromUtf8Error,
    },

    #[error("No tabular data in {0}")]
    Empty(String),

    #[error("Malformed CSV in {origin}: {message}")]
    Malformed { origin: String, message: String },

    #[error("Duplicate column {column:?} in {origin}")]
    DuplicateColumn { origin: String, column: String },

    #[error("Blank column name at position {position} in {origin}")]
    BlankColumn { origin: String, position: usize },
}

/// The field mapping cannot be used for validation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MappingError {
    #[error("Required fields not mapped: {}", join_fields(.0))]
    Missing(Vec<RequiredField>),

    #[error("Field {field} is mapped to {column:?}, which is not a column of the loaded table")]
    UnknownColumn { field: RequiredField, column: String },
}

fn join_fields(fields: &[RequiredField]) -> String {
    fields.iter().map(|f| f.name()).collect::<Vec<_>>().join(", ")
}

impl MappingError {
    /// Required fields reported as missing
    pub fn missing_fields(&self) -> &[RequiredField] {
        match self {
            MappingError::Missing(fields) => fields,
            MappingError::UnknownColumn { .. } => &[],
        }
    }
}

/// Why a single row was rejected. Recorded per row, never raised.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RowFailure {
    #[error("invalid coordinates")]
    InvalidCoordinates,

    #[error("unknown species: {species}")]
    UnknownSpecies { species: String },

    #[error("unknown breed: {breed} (species {species})")]
    UnknownBreed { species: String, breed: String },
}

/// The destination layer refused the batch
#[derive(Debug, Error)]
pub enum CommitError {
    #[error("No valid rows to commit")]
    NoValidRows,

    #[error("Layer {layer} holds {actual} features, imported rows need a point layer")]
    NotPointLayer { layer: String, actual: GeometryKind },

    #[error("Layer {layer} rejected the write: {source}")]
    Rejected {
        layer: String,
        #[source]
        source: StoreError,
    },
}

/// Any failure of an import session stage
#[derive(Debug, Error)]
pub enum ImportError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Mapping(#[from] MappingError),

    #[error(transparent)]
    Commit(#[from] CommitError),

    #[error("Cannot {action} while the import session is {state}")]
    Stage { action: &'static str, state: SessionState },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_mapping_names_fields() {
        let err = MappingError::Missing(vec![RequiredField::Latitude, RequiredField::Longitude]);
        assert_eq!(err.to_string(), "Required fields not mapped: latitude, longitude");
        assert_eq!(err.missing_fields(), &[RequiredField::Latitude, RequiredField::Longitude]);
    }

    #[test]
    fn test_row_failure_messages() {
        assert_eq!(RowFailure::InvalidCoordinates.to_string(), "invalid coordinates");
        let err = RowFailure::UnknownBreed {
            species: "Cattle".to_string(),
            breed: "UnknownBreed".to_string(),
        };
        assert!(err.to_string().starts_with("unknown breed"));
    }
}
