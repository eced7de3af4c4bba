/// Namespace prefix for rows owned by the mall feed.
pub const MALL_PREFIX: &str = "MALL";

/// Map an upstream carpark id into the store's key namespace.
///
/// Returns an empty string when the trimmed id is empty; callers skip such
/// records.
pub fn derive_entity_id(prefix: &str, raw: &str) -> String {
    let id = raw.trim();
    if id.is_empty() {
        return String::new();
    }
    format!("{}{}", prefix, id).to_uppercase()
}
