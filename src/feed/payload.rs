use std::fs;
use std::path::PathBuf;
use tracing::info;

use super::client::AGENCY;
use super::record::{Payload, RawRecord};
use super::Fetch;
use crate::error::{Result, SyncError};

/// A feed snapshot saved to disk, replayed instead of calling DataMall.
pub struct PayloadFile {
    path: PathBuf,
}

impl PayloadFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Fetch for PayloadFile {
    fn fetch(&self) -> Result<Vec<RawRecord>> {
        let text = fs::read_to_string(&self.path).map_err(|source| SyncError::ReadPayload {
            path: self.path.clone(),
            source,
        })?;
        let payload: Payload =
            serde_json::from_str(&text).map_err(|source| SyncError::MalformedPayload {
                origin: self.path.display().to_string(),
                source,
            })?;

        let mut rows = payload.into_records();
        let total = rows.len();
        rows.retain(|r| r.is_agency(AGENCY));
        info!(path = %self.path.display(), total, kept = rows.len(), "loaded payload");
        Ok(rows)
    }
}
