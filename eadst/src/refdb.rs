//! SQLite reference database: species/breed data standard and economic parameters

use rusqlite::{Connection, OptionalExtension, params};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::catalog::{BreedSet, InMemoryCatalog};

/// File name of the reference database
pub const DB_FILE_NAME: &str = "data_standard.db";

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS species(name TEXT PRIMARY KEY NOT NULL);
CREATE TABLE IF NOT EXISTS breeds(
    species TEXT NOT NULL REFERENCES species(name),
    name TEXT NOT NULL,
    PRIMARY KEY(species, name)
);
CREATE TABLE IF NOT EXISTS economic_parameters(key TEXT PRIMARY KEY NOT NULL, value REAL NOT NULL);
"#;

#[derive(Debug, Error)]
pub enum RefDbError {
    #[error("Cannot open reference database {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Failed to create directory for {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Species not in reference database: {0}")]
    UnknownSpecies(String),

    #[error("Name must not be blank")]
    BlankName,

    #[error("Reference database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Handle on the reference database
#[derive(Debug)]
pub struct ReferenceDb {
    conn: Connection,
}

impl ReferenceDb {
    /// Open (or create) the database file, creating the schema if missing
    pub fn open(path: &Path) -> Result<Self, RefDbError> {
        debug!(path = %path.display(), "ReferenceDb::open: called");
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|source| RefDbError::CreateDir {
                path: path.to_path_buf(),
                source,
            })?;
        }
        let conn = Connection::open(path).map_err(|source| RefDbError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self, RefDbError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, RefDbError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Register a species; existing species are left alone
    pub fn add_species(&self, name: &str) -> Result<(), RefDbError> {
        if name.trim().is_empty() {
            return Err(RefDbError::BlankName);
        }
        self.conn
            .execute("INSERT OR IGNORE INTO species(name) VALUES(?1)", params![name])?;
        Ok(())
    }

    /// Register a breed under a known species
    pub fn add_breed(&self, species: &str, breed: &str) -> Result<(), RefDbError> {
        if breed.trim().is_empty() {
            return Err(RefDbError::BlankName);
        }
        if !self.has_species(species)? {
            return Err(RefDbError::UnknownSpecies(species.to_string()));
        }
        self.conn.execute(
            "INSERT OR IGNORE INTO breeds(species, name) VALUES(?1, ?2)",
            params![species, breed],
        )?;
        Ok(())
    }

    fn has_species(&self, species: &str) -> Result<bool, RefDbError> {
        let found = self
            .conn
            .query_row("SELECT 1 FROM species WHERE name = ?1", params![species], |_| Ok(()))
            .optional()?;
        Ok(found.is_some())
    }

    /// All species, sorted
    pub fn list_species(&self) -> Result<Vec<String>, RefDbError> {
        let mut stmt = self.conn.prepare("SELECT name FROM species ORDER BY name")?;
        let rows = stmt.query_map([], |r| r.get::<_, String>(0))?;
        Ok(rows.collect::<Result<_, _>>()?)
    }

    /// Breeds of one species; None when the species is unknown
    pub fn breeds_for(&self, species: &str) -> Result<Option<BreedSet>, RefDbError> {
        if !self.has_species(species)? {
            return Ok(None);
        }
        let mut stmt = self.conn.prepare("SELECT name FROM breeds WHERE species = ?1")?;
        let rows = stmt.query_map(params![species], |r| r.get::<_, String>(0))?;
        Ok(Some(rows.collect::<Result<_, _>>()?))
    }

    /// Snapshot the species/breed tables for validation
    pub fn load_catalog(&self) -> Result<InMemoryCatalog, RefDbError> {
        let mut catalog = InMemoryCatalog::new();
        for species in self.list_species()? {
            catalog.insert(&species, Vec::<String>::new());
        }
        let mut stmt = self.conn.prepare("SELECT species, name FROM breeds")?;
        let rows = stmt.query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?)))?;
        for row in rows {
            let (species, breed) = row?;
            catalog.insert(&species, [breed]);
        }
        info!(species = catalog.len(), "Loaded reference catalog");
        Ok(catalog)
    }

    /// Every stored economic parameter
    pub fn economic_parameters(&self) -> Result<BTreeMap<String, f64>, RefDbError> {
        let mut stmt = self
            .conn
            .prepare("SELECT key, value FROM economic_parameters ORDER BY key")?;
        let rows = stmt.query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, f64>(1)?)))?;
        Ok(rows.collect::<Result<_, _>>()?)
    }

    /// Upsert one parameter
    pub fn set_parameter(&self, key: &str, value: f64) -> Result<(), RefDbError> {
        if key.trim().is_empty() {
            return Err(RefDbError::BlankName);
        }
        self.conn.execute(
            "INSERT INTO economic_parameters(key, value) VALUES(?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    /// Upsert many parameters in one transaction
    pub fn save_economic_parameters(&mut self, parameters: &BTreeMap<String, f64>) -> Result<(), RefDbError> {
        if parameters.keys().any(|k| k.trim().is_empty()) {
            return Err(RefDbError::BlankName);
        }
        let tx = self.conn.transaction()?;
        for (key, value) in parameters {
            tx.execute(
                "INSERT INTO economic_parameters(key, value) VALUES(?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![key, value],
            )?;
        }
        tx.commit()?;
        info!(count = parameters.len(), "Saved economic parameters");
        Ok(())
    }
}
