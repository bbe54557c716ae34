//! LayerStore - named spatial feature layers on disk
//!
//! A layer is a collection of point or line features sharing one attribute
//! schema and one coordinate reference system. Layers are created once
//! (get-or-create) and then only appended to.
//!
//! # Architecture
//!
//! ```text
//! 2_GIS_Layers/
//! └── {layer_name}/
//!     ├── layer.json       # name, geometry kind, crs, fields
//!     └── features.jsonl   # one feature per line
//! ```
//!
//! # Example
//!
//! ```ignore
//! use layerstore::{DirStore, FeatureStore, FieldType, Geometry, GeometryKind, LayerSpec, NewFeature};
//!
//! let mut store = DirStore::open("2_GIS_Layers")?;
//! let spec = LayerSpec::new("Outbreak_Points", GeometryKind::Point, "EPSG:4326")
//!     .field("Species", FieldType::Text);
//! store.get_or_create(&spec)?;
//! store.append("Outbreak_Points", vec![NewFeature::new(Geometry::point(38.74, 9.03)).with("Species", "Cattle")])?;
//! ```

pub mod cli;
pub mod config;
mod error;
mod feature;
pub mod geojson;
mod memory;
mod store;

pub use error::StoreError;
pub use feature::{
    Bounds, Coord, Feature, FeatureId, FieldDef, FieldType, Geometry, GeometryKind, LayerInfo, LayerSpec, NewFeature,
    Value, parse_timestamp,
};
pub use memory::MemoryStore;
pub use store::{DirStore, FeatureStore, LayerStats, StoreResult, layer_stats};
