//! Per-row validation of a mapped source table

use std::io::Write;
use tracing::{debug, info};

use super::error::{MappingError, RowFailure};
use super::mapping::{FieldMapping, RequiredField};
use super::table::SourceTable;
use crate::catalog::ReferenceCatalog;

/// Column appended by [`ValidationReport::write_annotated`]
pub const VALIDATION_ERROR_COLUMN: &str = "validation_error";

/// Outcome for one source row
#[derive(Debug, Clone, PartialEq)]
pub enum RowStatus {
    /// Row passed every check; carries the parsed point
    Valid { longitude: f64, latitude: f64 },
    Invalid(RowFailure),
}

impl RowStatus {
    pub fn is_valid(&self) -> bool {
        matches!(self, RowStatus::Valid { .. })
    }

    pub fn failure(&self) -> Option<&RowFailure> {
        match self {
            RowStatus::Invalid(f) => Some(f),
            RowStatus::Valid { .. } => None,
        }
    }
}

/// Per-row results of one validation run, indexed like the source rows
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationReport {
    statuses: Vec<RowStatus>,
}

/// A row that passed validation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValidRow {
    pub index: usize,
    pub longitude: f64,
    pub latitude: f64,
}

impl ValidationReport {
    pub fn statuses(&self) -> &[RowStatus] {
        &self.statuses
    }

    pub fn status(&self, index: usize) -> Option<&RowStatus> {
        self.statuses.get(index)
    }

    pub fn total(&self) -> usize {
        self.statuses.len()
    }

    pub fn valid_count(&self) -> usize {
        self.statuses.iter().filter(|s| s.is_valid()).count()
    }

    pub fn invalid_count(&self) -> usize {
        self.total() - self.valid_count()
    }

    /// Valid rows in source order
    pub fn valid_rows(&self) -> impl Iterator<Item = ValidRow> + '_ {
        self.statuses.iter().enumerate().filter_map(|(index, s)| match s {
            RowStatus::Valid { longitude, latitude } => Some(ValidRow {
                index,
                longitude: *longitude,
                latitude: *latitude,
            }),
            RowStatus::Invalid(_) => None,
        })
    }

    /// Invalid rows with their reasons, in source order
    pub fn failures(&self) -> impl Iterator<Item = (usize, &RowFailure)> {
        self.statuses
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.failure().map(|f| (i, f)))
    }

    /// Write the source table back out with a trailing `validation_error`
    /// column: empty for valid rows, the reason otherwise.
    pub fn write_annotated<W: Write>(&self, table: &SourceTable, writer: W) -> csv::Result<()> {
        let mut out = csv::Writer::from_writer(writer);
        let mut header: Vec<&str> = table.columns().iter().map(String::as_str).collect();
        header.push(VALIDATION_ERROR_COLUMN);
        out.write_record(&header)?;

        for (index, row) in table.rows().enumerate() {
            let reason = self
                .status(index)
                .and_then(RowStatus::failure)
                .map(ToString::to_string)
                .unwrap_or_default();
            let mut record: Vec<&str> = row.iter().map(String::as_str).collect();
            record.push(&reason);
            out.write_record(&record)?;
        }
        out.flush()?;
        Ok(())
    }
}

/// Parse a coordinate cell; surrounding whitespace is ignored, non-finite values rejected
pub fn parse_coordinate(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Validate every row of `table` under `mapping`.
///
/// Per row: coordinates must parse; then, if species and breed are both
/// mapped, the species must be in `catalog` and the breed among its breeds.
/// The first failing check decides the reason.
pub fn validate(
    table: &SourceTable,
    mapping: &FieldMapping,
    catalog: &dyn ReferenceCatalog,
) -> Result<ValidationReport, MappingError> {
    debug!(origin = table.origin(), rows = table.len(), "validate: called");
    mapping.check(table)?;

    let col = |field: RequiredField| mapping.get(field).and_then(|c| table.column_index(c));
    // check() guarantees both coordinate columns exist
    let (Some(lat_col), Some(lon_col)) = (col(RequiredField::Latitude), col(RequiredField::Longitude)) else {
        return Err(MappingError::Missing(vec![RequiredField::Latitude, RequiredField::Longitude]));
    };
    let species_breed = col(RequiredField::Species).zip(col(RequiredField::Breed));

    let statuses: Vec<RowStatus> = table
        .rows()
        .map(|row| {
            let (Some(latitude), Some(longitude)) = (parse_coordinate(&row[lat_col]), parse_coordinate(&row[lon_col]))
            else {
                return RowStatus::Invalid(RowFailure::InvalidCoordinates);
            };

            if let Some((species_col, breed_col)) = species_breed {
                let species = &row[species_col];
                let breed = &row[breed_col];
                match catalog.lookup(species) {
                    None => {
                        return RowStatus::Invalid(RowFailure::UnknownSpecies {
                            species: species.clone(),
                        });
                    }
                    Some(breeds) if !breeds.contains(breed.as_str()) => {
                        return RowStatus::Invalid(RowFailure::UnknownBreed {
                            species: species.clone(),
                            breed: breed.clone(),
                        });
                    }
                    Some(_) => {}
                }
            }

            RowStatus::Valid { longitude, latitude }
        })
        .collect();

    let report = ValidationReport { statuses };
    info!(
        origin = table.origin(),
        valid = report.valid_count(),
        invalid = report.invalid_count(),
        "Validation complete"
    );
    Ok(report)
}
