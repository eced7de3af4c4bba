//! Field-level merge rules for upserts.
//!
//! A present incoming value replaces the stored one; an absent incoming
//! value never erases what is stored.

use serde::Serialize;

/// Merge one nullable field.
pub fn merge<T>(existing: Option<T>, incoming: Option<T>) -> Option<T> {
    incoming.or(existing)
}

/// Metadata row for one carpark.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EntityInfo {
    pub entity_id: String,
    pub address: Option<String>,
    pub x: Option<String>,
    pub y: Option<String>,
}

impl EntityInfo {
    /// Apply `incoming` on top of `self`, field by field.
    pub fn merged_with(&self, incoming: &EntityInfo) -> EntityInfo {
        EntityInfo {
            entity_id: self.entity_id.clone(),
            address: merge(self.address.clone(), incoming.address.clone()),
            x: merge(self.x.clone(), incoming.x.clone()),
            y: merge(self.y.clone(), incoming.y.clone()),
        }
    }
}
