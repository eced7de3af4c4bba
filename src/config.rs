//! Resolved runtime settings.
//!
//! Values come from CLI flags with environment fallbacks (see `cli`); this
//! module fills in platform defaults and validates what a pass needs.

use directories::ProjectDirs;
use std::path::{Path, PathBuf};

use crate::error::{Result, SyncError};

const DB_FILE: &str = "ops.sqlite";
const EXPORT_SUBDIR: &str = "exports";

/// Where the store lives and where exports go.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreConfig {
    pub db_path: PathBuf,
    pub export_dir: PathBuf,
    pub save_csv: bool,
}

impl StoreConfig {
    /// Fill unset paths: the export directory sits beside the database, and
    /// the database defaults to the platform data directory.
    pub fn resolve(db: Option<PathBuf>, export_dir: Option<PathBuf>, save_csv: bool) -> Result<Self> {
        let db_path = match db {
            Some(path) => path,
            None => default_data_dir()?.join(DB_FILE),
        };
        let export_dir = export_dir.unwrap_or_else(|| {
            db_path
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .join(EXPORT_SUBDIR)
        });
        Ok(Self {
            db_path,
            export_dir,
            save_csv,
        })
    }
}

fn default_data_dir() -> Result<PathBuf> {
    ProjectDirs::from("", "", "carpark-sync")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or(SyncError::MissingConfig {
            name: "database path",
            flag: "db",
            env: "OPS_DB",
        })
}

/// The DataMall account key, required before any request is made.
pub fn require_api_key(key: Option<&str>) -> Result<String> {
    match key.map(str::trim) {
        Some(key) if !key.is_empty() => Ok(key.to_string()),
        _ => Err(SyncError::MissingConfig {
            name: "DataMall API key",
            flag: "api-key",
            env: "API_KEY",
        }),
    }
}
