//! Tabular import flow
//!
//! A delimited file becomes a [`SourceTable`]; a [`FieldMapping`] says which
//! columns hold latitude, longitude, species, breed and case count;
//! [`validate`] checks every row against a
//! [`ReferenceCatalog`](crate::catalog::ReferenceCatalog); [`commit`] appends
//! the valid rows to a point layer. [`ImportSession`] runs the stages in order
//! and keeps their results.
//!
//! ```text
//! Empty ──load──▶ Loaded ──map──▶ Mapped ──validate──▶ Validated ──commit──▶ Committed
//!   ▲                                ▲                     │
//!   └──────── load (any state) ──────┴──── remap ──────────┘
//! ```

mod commit;
mod error;
mod mapping;
mod session;
mod table;
mod validate;

pub use commit::{CommitOptions, CommitSummary, DEFAULT_IMPORT_LAYER, commit, layer_spec_for};
pub use error::{CommitError, ImportError, LoadError, MappingError, RowFailure};
pub use mapping::{FieldMapping, RequiredField};
pub use session::{ImportSession, SessionState};
pub use table::{Loader, SourceTable};
pub use validate::{RowStatus, VALIDATION_ERROR_COLUMN, ValidRow, ValidationReport, parse_coordinate, validate};
