//! One import session: load → map → validate → commit

use layerstore::FeatureStore;
use std::fmt;
use std::path::Path;
use tracing::{debug, info};

use super::commit::{CommitOptions, CommitSummary, commit};
use super::error::{ImportError, MappingError};
use super::mapping::{FieldMapping, RequiredField};
use super::table::{Loader, SourceTable};
use super::validate::{ValidationReport, validate};
use crate::catalog::ReferenceCatalog;

/// Where a session is in the flow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Empty,
    Loaded,
    Mapped,
    Validated,
    Committed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionState::Empty => "empty",
            SessionState::Loaded => "loaded",
            SessionState::Mapped => "mapped",
            SessionState::Validated => "validated",
            SessionState::Committed => "committed",
        };
        f.write_str(s)
    }
}

/// Owns the table, mapping and latest validation of a single import.
///
/// Each stage runs synchronously when called. A successful load discards
/// everything from the previous file; a failed stage leaves the session as
/// it was.
#[derive(Debug)]
pub struct ImportSession {
    loader: Loader,
    state: SessionState,
    table: Option<SourceTable>,
    mapping: FieldMapping,
    report: Option<ValidationReport>,
    last_commit: Option<CommitSummary>,
}

impl Default for ImportSession {
    fn default() -> Self {
        Self::new(Loader::default())
    }
}

impl ImportSession {
    pub fn new(loader: Loader) -> Self {
        Self {
            loader,
            state: SessionState::Empty,
            table: None,
            mapping: FieldMapping::new(),
            report: None,
            last_commit: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn table(&self) -> Option<&SourceTable> {
        self.table.as_ref()
    }

    pub fn mapping(&self) -> &FieldMapping {
        &self.mapping
    }

    /// Result of the latest validate, cleared by load and mapping changes
    pub fn report(&self) -> Option<&ValidationReport> {
        self.report.as_ref()
    }

    pub fn last_commit(&self) -> Option<&CommitSummary> {
        self.last_commit.as_ref()
    }

    /// Load a file, replacing any previous table and results
    pub fn load(&mut self, path: &Path) -> Result<&SourceTable, ImportError> {
        debug!(path = %path.display(), state = %self.state, "ImportSession::load: called");
        let table = self.loader.load_path(path)?;
        Ok(self.load_table(table))
    }

    /// Start over from an already-parsed table
    pub fn load_table(&mut self, table: SourceTable) -> &SourceTable {
        self.mapping = FieldMapping::new();
        self.report = None;
        self.last_commit = None;
        self.state = SessionState::Loaded;
        self.table.insert(table)
    }

    /// Guess the mapping from the column names
    pub fn auto_map(&mut self) -> Result<&FieldMapping, ImportError> {
        let table = self.table_in("auto-map", &[SessionState::Loaded])?;
        self.mapping = FieldMapping::auto(table.columns());
        info!(mapped = self.mapping.entries().count(), "Auto-mapped fields");
        self.state = SessionState::Mapped;
        Ok(&self.mapping)
    }

    /// Replace the whole mapping
    pub fn set_mapping(&mut self, mapping: FieldMapping) -> Result<(), ImportError> {
        let table = self.table_in("map fields", &[SessionState::Loaded, SessionState::Mapped, SessionState::Validated])?;
        check_columns(&mapping, table)?;
        self.mapping = mapping;
        self.report = None;
        self.state = SessionState::Mapped;
        Ok(())
    }

    /// Override one entry; `None` unmaps the field
    pub fn set_field(&mut self, field: RequiredField, column: Option<&str>) -> Result<(), ImportError> {
        let mut mapping = self.mapping.clone();
        mapping.set(field, column.map(str::to_string));
        self.set_mapping(mapping)
    }

    /// Validate every row against `catalog`; rerunning replaces the previous report
    pub fn validate(&mut self, catalog: &dyn ReferenceCatalog) -> Result<&ValidationReport, ImportError> {
        let table = self.table_in("validate", &[SessionState::Mapped, SessionState::Validated])?;
        let report = validate(table, &self.mapping, catalog)?;
        self.state = SessionState::Validated;
        Ok(self.report.insert(report))
    }

    /// Commit the valid rows of the latest validation
    pub fn commit(&mut self, store: &mut dyn FeatureStore, options: &CommitOptions) -> Result<CommitSummary, ImportError> {
        let table = self.table_in("commit", &[SessionState::Validated])?;
        let report = self.report.as_ref().ok_or(ImportError::Stage {
            action: "commit",
            state: self.state,
        })?;
        let summary = commit(table, report, store, options)?;
        self.state = SessionState::Committed;
        self.last_commit = Some(summary.clone());
        Ok(summary)
    }

    fn table_in(&self, action: &'static str, allowed: &[SessionState]) -> Result<&SourceTable, ImportError> {
        match &self.table {
            Some(table) if allowed.contains(&self.state) => Ok(table),
            _ => Err(ImportError::Stage {
                action,
                state: self.state,
            }),
        }
    }
}

/// Every mapped column must exist; coordinate completeness waits for validate
fn check_columns(mapping: &FieldMapping, table: &SourceTable) -> Result<(), MappingError> {
    match mapping.entries().find(|(_, column)| !table.has_column(column)) {
        Some((field, column)) => Err(MappingError::UnknownColumn {
            field,
            column: column.to_string(),
        }),
        None => Ok(()),
    }
}
