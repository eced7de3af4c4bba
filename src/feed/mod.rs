//! Upstream feed access: the DataMall client and saved payload replays.

pub mod client;
pub mod payload;
pub mod record;

pub use client::*;
pub use payload::*;
pub use record::*;

use crate::error::Result;

/// Produces the complete current snapshot of this feed's records.
///
/// Implementations either return every record or fail; a partial result
/// would make the reconciler evict rows that are still live.
pub trait Fetch {
    fn fetch(&self) -> Result<Vec<RawRecord>>;
}
