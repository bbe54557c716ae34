//! EADST - Emergency Animal Disease Support Toolkit
//!
//! Field epidemiology for animal disease outbreak investigations: bring
//! outbreak data in, record and link premises, and describe the outbreak.
//!
//! # Core Concepts
//!
//! - **Validated Import**: Tabular data passes Load → Map → Validate → Commit;
//!   only valid rows reach a layer, and every invalid row carries its reason
//! - **Reference Catalog**: Species and breeds come from a local SQLite data
//!   standard, so field data is checked against one vocabulary
//! - **Layers on Disk**: Points and trace links live in a project's
//!   `2_GIS_Layers` directory via [`layerstore`]
//!
//! # Modules
//!
//! - [`import`] - Tabular import flow and session state machine
//! - [`catalog`] - Species/breed lookup used by validation
//! - [`refdb`] - SQLite reference database
//! - [`records`] - Manual outbreak point entry
//! - [`trace_links`] - Trace-back / trace-forward links between premises
//! - [`analysis`] - Epidemic curves and attack rates
//! - [`surveillance`] - Surveillance scheme design and costing
//! - [`project`] - Investigation project directories
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod analysis;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod import;
pub mod project;
pub mod records;
pub mod refdb;
pub mod surveillance;
pub mod trace_links;

// Re-export commonly used types
pub use catalog::{BreedSet, InMemoryCatalog, ReferenceCatalog};
pub use config::Config;
pub use import::{
    CommitOptions, CommitSummary, FieldMapping, ImportError, ImportSession, Loader, RequiredField, SessionState,
    SourceTable, ValidationReport,
};
pub use project::{DEFAULT_CRS, Project};
pub use refdb::ReferenceDb;
