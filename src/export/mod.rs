//! Post-commit export of the store to an external sink.

pub mod csv_dir;

pub use csv_dir::*;

use crate::error::Result;
use crate::store::Store;

/// Serializes current store state somewhere outside the store.
///
/// Returns the key of the written object, if one was produced.
pub trait Exporter {
    fn export(&self, store: &Store, label: &str) -> Result<Option<String>>;
}
