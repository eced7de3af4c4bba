/// A WGS84 position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Parse the feed's combined `"lat lon"` field.
///
/// Exactly two whitespace-separated finite numbers are required; anything
/// else yields `None`.
pub fn parse_location(s: &str) -> Option<LatLon> {
    let mut parts = s.split_whitespace();
    let lat = parts.next()?.parse::<f64>().ok()?;
    let lon = parts.next()?.parse::<f64>().ok()?;
    if parts.next().is_some() || !lat.is_finite() || !lon.is_finite() {
        return None;
    }
    Some(LatLon::new(lat, lon))
}
