pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod feed;
pub mod normalize;
pub mod pass;
pub mod schema;
pub mod store;
pub mod timestamp;

pub use cli::{Cli, Commands};
pub use error::{Result, SyncError};
pub use pass::{PassOutcome, Pipeline};
pub use store::{PassStats, Reconciler, Store};
pub use timestamp::Timestamp;
