//! The SQLite store: schema, reconciliation and derived snapshots.

pub mod merge;
pub mod reconcile;
pub mod schema_gen;
pub mod snapshot;
pub mod sqlite;

pub use merge::*;
pub use reconcile::*;
pub use snapshot::*;
pub use sqlite::*;
