//! Manual outbreak record entry

use chrono::{DateTime, Utc};
use layerstore::{Coord, FeatureId, FeatureStore, FieldType, Geometry, GeometryKind, LayerSpec, NewFeature, StoreError};
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::catalog::ReferenceCatalog;

/// Layer holding manually entered outbreak points
pub const OUTBREAK_LAYER: &str = "Outbreak_Points";

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("{field} must not be negative, got {value}")]
    NegativeCount { field: &'static str, value: i64 },

    #[error("Unknown species: {0}")]
    UnknownSpecies(String),

    #[error("Unknown breed {breed} for species {species}")]
    UnknownBreed { species: String, breed: String },

    #[error("A breed needs a species")]
    BreedWithoutSpecies,

    #[error("Failed to store record: {0}")]
    Store(#[from] StoreError),
}

/// Schema of the outbreak point layer
pub fn outbreak_layer_spec(crs: &str) -> LayerSpec {
    LayerSpec::new(OUTBREAK_LAYER, GeometryKind::Point, crs)
        .field("Event_ID", FieldType::Text)
        .field("Species", FieldType::Text)
        .field("Breed", FieldType::Text)
        .field("Event_Date", FieldType::DateTime)
        .field("Cases", FieldType::Integer)
        .field("Pop_At_Risk", FieldType::Integer)
        .field("Notes", FieldType::Text)
}

/// One outbreak observation at a premise
#[derive(Debug, Clone, PartialEq)]
pub struct OutbreakRecord {
    pub species: Option<String>,
    pub breed: Option<String>,
    /// Defaults to the time of entry
    pub event_date: Option<DateTime<Utc>>,
    pub cases: i64,
    pub pop_at_risk: i64,
    pub notes: String,
}

impl Default for OutbreakRecord {
    fn default() -> Self {
        Self {
            species: None,
            breed: None,
            event_date: None,
            cases: 1,
            pop_at_risk: 1,
            notes: String::new(),
        }
    }
}

impl OutbreakRecord {
    /// Check counts and the species/breed pair
    pub fn check(&self, catalog: &dyn ReferenceCatalog) -> Result<(), RecordError> {
        for (field, value) in [("Cases", self.cases), ("Pop_At_Risk", self.pop_at_risk)] {
            if value < 0 {
                return Err(RecordError::NegativeCount { field, value });
            }
        }

        match (&self.species, &self.breed) {
            (None, Some(_)) => Err(RecordError::BreedWithoutSpecies),
            (None, None) => Ok(()),
            (Some(species), breed) => {
                let breeds = catalog
                    .lookup(species)
                    .ok_or_else(|| RecordError::UnknownSpecies(species.clone()))?;
                match breed {
                    Some(breed) if !breeds.contains(breed) => Err(RecordError::UnknownBreed {
                        species: species.clone(),
                        breed: breed.clone(),
                    }),
                    _ => Ok(()),
                }
            }
        }
    }
}

/// A stored record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddedRecord {
    pub id: FeatureId,
    pub event_id: Uuid,
}

/// Append `record` at `location` to the outbreak layer, creating the layer if needed
pub fn add_record(
    store: &mut dyn FeatureStore,
    catalog: &dyn ReferenceCatalog,
    location: Coord,
    record: &OutbreakRecord,
    crs: &str,
) -> Result<AddedRecord, RecordError> {
    debug!(x = location.x, y = location.y, "add_record: called");
    record.check(catalog)?;

    let layer = store.get_or_create(&outbreak_layer_spec(crs))?;
    let event_id = Uuid::new_v4();
    let feature = NewFeature::new(Geometry::Point(location))
        .with("Event_ID", event_id.to_string())
        .with("Species", record.species.clone().unwrap_or_default())
        .with("Breed", record.breed.clone().unwrap_or_default())
        .with("Event_Date", record.event_date.unwrap_or_else(Utc::now))
        .with("Cases", record.cases)
        .with("Pop_At_Risk", record.pop_at_risk)
        .with("Notes", record.notes.clone());

    let ids = store.append(&layer.name, vec![feature])?;
    let id = ids.first().copied().ok_or_else(|| StoreError::Corrupt {
        layer: layer.name.clone(),
        message: "append returned no id".to_string(),
    })?;
    info!(layer = %layer.name, %event_id, id, "Added outbreak record");
    Ok(AddedRecord { id, event_id })
}
