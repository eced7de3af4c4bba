//! Error types for a reconciliation pass.
//!
//! Variants are grouped by where in the pass they occur: configuration,
//! fetching, the store transaction, and the post-commit collaborators.
//! Per-record defects are not errors; they are counted in `PassStats`.

use std::path::PathBuf;

use rusqlite::Error as SqliteError;
use thiserror::Error;

pub type Result<T, E = SyncError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum SyncError {
    /// A required setting is absent. Raised before any fetch.
    #[error("missing {name} (set --{flag} or {env})")]
    MissingConfig {
        name: &'static str,
        flag: &'static str,
        env: &'static str,
    },

    /// Building the HTTP client failed.
    #[error("failed to create HTTP client")]
    HttpClient(#[source] reqwest::Error),

    /// The request could not be sent or its body could not be read.
    #[error("failed to fetch {url}")]
    FetchRequest {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The feed answered with a non-success status.
    #[error("feed returned HTTP {status} for {url}")]
    FetchStatus { url: String, status: u16 },

    /// The feed answered with something that is not a record page.
    #[error("malformed payload from {origin}")]
    MalformedPayload {
        origin: String,
        #[source]
        source: serde_json::Error,
    },

    /// Reading a local payload file failed.
    #[error("failed to read payload {path:?}")]
    ReadPayload {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Creating the parent directory of the store failed.
    #[error("failed to create directory {path:?}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Opening or configuring the SQLite store failed.
    #[error("failed to open store at {path}")]
    OpenStore {
        path: String,
        #[source]
        source: SqliteError,
    },

    /// Flushing and closing the store connection failed.
    #[error("failed to close store at {path}")]
    CloseStore {
        path: String,
        #[source]
        source: SqliteError,
    },

    /// Creating a table or index failed.
    #[error("failed to create schema for {table}")]
    Schema {
        table: &'static str,
        #[source]
        source: SqliteError,
    },

    /// The exclusive write transaction could not be started.
    #[error("failed to begin reconciliation transaction")]
    BeginTransaction(#[source] SqliteError),

    /// Writing one record failed; the whole pass was rolled back.
    #[error("failed to write {entity_id}/{category}")]
    WriteRecord {
        entity_id: String,
        category: String,
        #[source]
        source: SqliteError,
    },

    /// Deleting stale rows failed; the whole pass was rolled back.
    #[error("failed to evict stale rows with prefix {prefix}")]
    Evict {
        prefix: String,
        #[source]
        source: SqliteError,
    },

    /// Committing the pass failed; nothing was applied.
    #[error("failed to commit reconciliation transaction")]
    Commit(#[source] SqliteError),

    /// Rebuilding the denormalized snapshot failed.
    #[error("failed to rebuild snapshot table")]
    Rebuild(#[source] SqliteError),

    /// A read query against the store failed.
    #[error("store query failed")]
    Query(#[source] SqliteError),

    /// Writing the export file failed.
    #[error("failed to write export {path:?}")]
    ExportWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Encoding export rows failed.
    #[error("failed to encode export {path:?}")]
    ExportEncode {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}
