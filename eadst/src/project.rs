//! Investigation project directories

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// CRS used when none is given
pub const DEFAULT_CRS: &str = "EPSG:4326";

/// Project metadata file inside the project directory
pub const PROJECT_FILE: &str = "eadst-project.yml";

pub const DATA_DIR: &str = "1_Data";
pub const LAYERS_DIR: &str = "2_GIS_Layers";
pub const OUTPUTS_DIR: &str = "3_Analysis_Outputs";
pub const REPORTS_DIR: &str = "4_Reports_and_Maps";

const SUB_DIRS: [&str; 4] = [DATA_DIR, LAYERS_DIR, OUTPUTS_DIR, REPORTS_DIR];

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("Project name is required")]
    MissingName,

    #[error("Invalid project name {0:?}: must not contain path separators")]
    InvalidName(String),

    #[error("A project folder named {name:?} already exists in {}", .parent.display())]
    AlreadyExists { name: String, parent: PathBuf },

    #[error("Not a project directory (no eadst-project.yml): {}", .0.display())]
    NotAProject(PathBuf),

    #[error("Project I/O failed at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid project file {}: {source}", .path.display())]
    Format {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Contents of the project file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectInfo {
    pub name: String,
    pub crs: String,
    #[serde(rename = "created-at")]
    pub created_at: DateTime<Utc>,
}

/// An opened project directory
#[derive(Debug, Clone)]
pub struct Project {
    root: PathBuf,
    info: ProjectInfo,
}

impl Project {
    /// Create `<parent>/<name>` with the standard sub-directories and project file.
    /// Refuses to touch an existing directory.
    pub fn create(parent: &Path, name: &str, crs: &str) -> Result<Self, ProjectError> {
        debug!(parent = %parent.display(), %name, %crs, "Project::create: called");
        let name = name.trim();
        if name.is_empty() {
            return Err(ProjectError::MissingName);
        }
        if name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(ProjectError::InvalidName(name.to_string()));
        }

        let root = parent.join(name);
        if root.exists() {
            return Err(ProjectError::AlreadyExists {
                name: name.to_string(),
                parent: parent.to_path_buf(),
            });
        }

        for sub in SUB_DIRS {
            let dir = root.join(sub);
            fs::create_dir_all(&dir).map_err(|source| ProjectError::Io { path: dir, source })?;
        }

        let info = ProjectInfo {
            name: name.to_string(),
            crs: if crs.trim().is_empty() { DEFAULT_CRS } else { crs }.to_string(),
            created_at: Utc::now(),
        };
        let file = root.join(PROJECT_FILE);
        let content = serde_yaml::to_string(&info).map_err(|source| ProjectError::Format {
            path: file.clone(),
            source,
        })?;
        fs::write(&file, content).map_err(|source| ProjectError::Io { path: file, source })?;

        info!(project = %info.name, root = %root.display(), "Created project");
        Ok(Self { root, info })
    }

    /// Open an existing project directory
    pub fn open(root: &Path) -> Result<Self, ProjectError> {
        let file = root.join(PROJECT_FILE);
        if !file.is_file() {
            return Err(ProjectError::NotAProject(root.to_path_buf()));
        }
        let content = fs::read_to_string(&file).map_err(|source| ProjectError::Io {
            path: file.clone(),
            source,
        })?;
        let info: ProjectInfo =
            serde_yaml::from_str(&content).map_err(|source| ProjectError::Format { path: file, source })?;
        debug!(project = %info.name, "Project::open: loaded");
        Ok(Self {
            root: root.to_path_buf(),
            info,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn info(&self) -> &ProjectInfo {
        &self.info
    }

    pub fn crs(&self) -> &str {
        &self.info.crs
    }

    /// Where the project's layer store lives
    pub fn layers_dir(&self) -> PathBuf {
        self.root.join(LAYERS_DIR)
    }

    pub fn data_dir(&self) -> PathBuf {
        self.root.join(DATA_DIR)
    }

    pub fn outputs_dir(&self) -> PathBuf {
        self.root.join(OUTPUTS_DIR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_create_project_layout() {
        let temp = TempDir::new().unwrap();
        let project = Project::create(temp.path(), "FMD_Gondar_Oct2024", "EPSG:20137").unwrap();

        for sub in SUB_DIRS {
            assert!(project.root().join(sub).is_dir(), "missing {}", sub);
        }
        assert!(project.root().join(PROJECT_FILE).is_file());
        assert_eq!(project.crs(), "EPSG:20137");
        assert_eq!(project.layers_dir(), temp.path().join("FMD_Gondar_Oct2024").join(LAYERS_DIR));
    }

    #[test]
    fn test_open_reads_back_info() {
        let temp = TempDir::new().unwrap();
        let created = Project::create(temp.path(), "Anthrax", "").unwrap();
        let opened = Project::open(created.root()).unwrap();
        assert_eq!(opened.info(), created.info());
        assert_eq!(opened.crs(), DEFAULT_CRS);
    }

    #[test]
    fn test_create_refuses_existing_directory() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("Existing")).unwrap();
        let err = Project::create(temp.path(), "Existing", DEFAULT_CRS).unwrap_err();
        assert!(matches!(err, ProjectError::AlreadyExists { .. }));
        assert!(!temp.path().join("Existing").join(LAYERS_DIR).exists());
    }

    #[test]
    fn test_create_rejects_bad_names() {
        let temp = TempDir::new().unwrap();
        assert!(matches!(
            Project::create(temp.path(), "  ", DEFAULT_CRS),
            Err(ProjectError::MissingName)
        ));
        assert!(matches!(
            Project::create(temp.path(), "a/b", DEFAULT_CRS),
            Err(ProjectError::InvalidName(_))
        ));
    }

    #[test]
    fn test_open_non_project() {
        let temp = TempDir::new().unwrap();
        assert!(matches!(Project::open(temp.path()), Err(ProjectError::NotAProject(_))));
    }
}
