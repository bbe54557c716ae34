//! Layer store error types

use thiserror::Error;

use crate::feature::{FieldType, GeometryKind};

/// Errors that can occur while reading or writing layers
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Layer not found: {0}")]
    LayerNotFound(String),

    #[error("No layer store at {}", .0.display())]
    StoreNotFound(std::path::PathBuf),

    #[error("Invalid layer name: {0:?}")]
    InvalidName(String),

    #[error("Layer {layer} holds {expected} geometries, got {actual}")]
    GeometryMismatch {
        layer: String,
        expected: GeometryKind,
        actual: GeometryKind,
    },

    #[error("Layer {layer} has no field named {field}")]
    UnknownField { layer: String, field: String },

    #[error("Field {field} of layer {layer} expects {expected}, got {value}")]
    TypeMismatch {
        layer: String,
        field: String,
        expected: FieldType,
        value: String,
    },

    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("Corrupt layer data in {layer}: {message}")]
    Corrupt { layer: String, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StoreError {
    /// Check if the store refused the write because of the layer schema
    pub fn is_schema_rejection(&self) -> bool {
        matches!(
            self,
            StoreError::GeometryMismatch { .. }
                | StoreError::UnknownField { .. }
                | StoreError::TypeMismatch { .. }
                | StoreError::InvalidGeometry(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_schema_rejection() {
        let err = StoreError::UnknownField {
            layer: "Outbreak_Points".to_string(),
            field: "Colour".to_string(),
        };
        assert!(err.is_schema_rejection());

        let err = StoreError::LayerNotFound("Trace_Links".to_string());
        assert!(!err.is_schema_rejection());

        let err = StoreError::Io(std::io::Error::other("disk full"));
        assert!(!err.is_schema_rejection());
    }

    #[test]
    fn test_display_names_layer_and_field() {
        let err = StoreError::TypeMismatch {
            layer: "Outbreak_Points".to_string(),
            field: "Cases".to_string(),
            expected: FieldType::Integer,
            value: "\"many\"".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("Outbreak_Points"));
        assert!(msg.contains("Cases"));
        assert!(msg.contains("integer"));
    }
}
