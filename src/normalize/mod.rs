//! Raw feed rows to validated, projected records.

pub mod ids;
pub mod location;
pub mod projection;
pub mod record;

pub use ids::*;
pub use location::*;
pub use projection::*;
pub use record::*;
