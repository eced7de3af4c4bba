use serde::Serialize;
use tracing::debug;

use super::ids::derive_entity_id;
use super::location::{parse_location, LatLon};
use super::projection::Projection;
use crate::feed::{RawRecord, Scalar};
use crate::timestamp::Timestamp;

/// A validated availability row ready for reconciliation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedRecord {
    pub entity_id: String,
    pub category: String,
    pub available_count: i64,
    /// Total lots, when the feed reports it.
    pub capacity: Option<i64>,
    /// Measurement time, when the feed reports it. The pass timestamp is
    /// used otherwise.
    pub observed_at: Option<Timestamp>,
    pub address: Option<String>,
    /// Projected easting, fixed 3 decimals.
    pub x: Option<String>,
    /// Projected northing, fixed 3 decimals.
    pub y: Option<String>,
}

impl NormalizedRecord {
    /// A record with only the key and count set.
    pub fn new(entity_id: impl Into<String>, category: impl Into<String>, count: i64) -> Self {
        Self {
            entity_id: entity_id.into(),
            category: category.into(),
            available_count: count,
            capacity: None,
            observed_at: None,
            address: None,
            x: None,
            y: None,
        }
    }

    /// Records with an empty key are skipped by the reconciler.
    pub fn has_key(&self) -> bool {
        !self.entity_id.is_empty() && !self.category.is_empty()
    }
}

/// Turns raw feed rows into [`NormalizedRecord`]s for one namespace.
pub struct Normalizer<P> {
    prefix: String,
    projection: P,
}

impl<P: Projection> Normalizer<P> {
    pub fn new(prefix: impl Into<String>, projection: P) -> Self {
        Self {
            prefix: prefix.into(),
            projection,
        }
    }

    /// Normalize one row, or `None` when its id or lot type is unusable.
    pub fn normalize(&self, raw: &RawRecord) -> Option<NormalizedRecord> {
        let raw_id = raw.carpark_id.as_ref().map(Scalar::to_text).unwrap_or_default();
        let entity_id = derive_entity_id(&self.prefix, &raw_id);
        if entity_id.is_empty() {
            return None;
        }

        let category = raw.lot_type.as_deref().unwrap_or("").trim().to_uppercase();
        if category.is_empty() {
            return None;
        }

        let available_count = raw
            .available_lots
            .as_ref()
            .and_then(Scalar::as_i64)
            .unwrap_or(0)
            .max(0);

        let (x, y) = match coordinates(raw) {
            Some(point) => {
                let p = self.projection.project(point);
                (Some(format!("{:.3}", p.x)), Some(format!("{:.3}", p.y)))
            }
            None => (None, None),
        };

        Some(NormalizedRecord {
            entity_id,
            category,
            available_count,
            capacity: None,
            observed_at: None,
            address: compose_address(raw.development.as_deref(), raw.area.as_deref()),
            x,
            y,
        })
    }

    /// Normalize a batch, returning the usable records and the skip count.
    pub fn normalize_all(&self, raws: &[RawRecord]) -> (Vec<NormalizedRecord>, usize) {
        let mut records = Vec::with_capacity(raws.len());
        let mut skipped = 0;
        for raw in raws {
            match self.normalize(raw) {
                Some(record) => records.push(record),
                None => {
                    debug!(carpark_id = ?raw.carpark_id, lot_type = ?raw.lot_type, "skipping record");
                    skipped += 1;
                }
            }
        }
        (records, skipped)
    }
}

/// Explicit latitude/longitude first, then the combined location string.
fn coordinates(raw: &RawRecord) -> Option<LatLon> {
    let lat = raw.latitude.as_ref().and_then(Scalar::as_f64);
    let lon = raw.longitude.as_ref().and_then(Scalar::as_f64);
    match (lat, lon) {
        (Some(lat), Some(lon)) => Some(LatLon::new(lat, lon)),
        _ => raw.location.as_deref().and_then(parse_location),
    }
}

/// `"name (area)"`, or whichever part is present.
pub fn compose_address(name: Option<&str>, area: Option<&str>) -> Option<String> {
    let name = name.map(str::trim).filter(|s| !s.is_empty());
    let area = area.map(str::trim).filter(|s| !s.is_empty());
    match (name, area) {
        (Some(name), Some(area)) => Some(format!("{} ({})", name, area)),
        (Some(one), None) | (None, Some(one)) => Some(one.to_string()),
        (None, None) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::ids::MALL_PREFIX;
    use crate::normalize::projection::{PlanarPoint, Svy21};
    use rstest::rstest;

    /// Projects by scaling, so expected text is easy to read.
    struct Scale;

    impl Projection for Scale {
        fn project(&self, point: LatLon) -> PlanarPoint {
            PlanarPoint {
                x: point.lon * 1000.0,
                y: point.lat * 1000.0,
            }
        }
    }

    fn raw(id: &str, lot_type: &str, lots: &str) -> RawRecord {
        RawRecord {
            carpark_id: Some(Scalar::from(id)),
            lot_type: Some(lot_type.to_string()),
            available_lots: Some(Scalar::from(lots)),
            agency: Some("LTA".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_normalize_basic_fields() {
        let normalizer = Normalizer::new(MALL_PREFIX, Scale);
        let mut input = raw(" 12a ", " c ", "37");
        input.development = Some("Suntec City".to_string());
        input.area = Some("Marina".to_string());
        input.location = Some("1.29 103.85".to_string());

        let record = normalizer.normalize(&input).unwrap();
        assert_eq!(record.entity_id, "MALL12A");
        assert_eq!(record.category, "C");
        assert_eq!(record.available_count, 37);
        assert_eq!(record.address.as_deref(), Some("Suntec City (Marina)"));
        assert_eq!(record.x.as_deref(), Some("103850.000"));
        assert_eq!(record.y.as_deref(), Some("1290.000"));
        assert_eq!(record.capacity, None);
    }

    #[test]
    fn test_numeric_carpark_id() {
        let normalizer = Normalizer::new(MALL_PREFIX, Scale);
        let mut input = raw("", "Y", "1");
        input.carpark_id = Some(Scalar::from(7));
        assert_eq!(normalizer.normalize(&input).unwrap().entity_id, "MALL7");
    }

    #[rstest]
    #[case("", "C")]
    #[case("  ", "C")]
    #[case("1", "")]
    #[case("1", "   ")]
    fn test_unusable_key_is_skipped(#[case] id: &str, #[case] lot_type: &str) {
        let normalizer = Normalizer::new(MALL_PREFIX, Scale);
        assert_eq!(normalizer.normalize(&raw(id, lot_type, "5")), None);
    }

    #[rstest]
    #[case("", 0)]
    #[case("n/a", 0)]
    #[case("-3", 0)]
    #[case(" 8 ", 8)]
    fn test_count_falls_back_to_zero(#[case] lots: &str, #[case] expected: i64) {
        let normalizer = Normalizer::new(MALL_PREFIX, Scale);
        let record = normalizer.normalize(&raw("1", "C", lots)).unwrap();
        assert_eq!(record.available_count, expected);
    }

    #[test]
    fn test_missing_count_field_is_zero() {
        let normalizer = Normalizer::new(MALL_PREFIX, Scale);
        let mut input = raw("1", "C", "0");
        input.available_lots = None;
        assert_eq!(normalizer.normalize(&input).unwrap().available_count, 0);
    }

    #[test]
    fn test_explicit_coordinates_win_over_location() {
        let normalizer = Normalizer::new(MALL_PREFIX, Scale);
        let mut input = raw("1", "C", "1");
        input.latitude = Some(Scalar::from("1.5"));
        input.longitude = Some(Scalar::from("104"));
        input.location = Some("1.29 103.85".to_string());

        let record = normalizer.normalize(&input).unwrap();
        assert_eq!(record.x.as_deref(), Some("104000.000"));
        assert_eq!(record.y.as_deref(), Some("1500.000"));
    }

    #[test]
    fn test_half_explicit_coordinates_fall_back_to_location() {
        let normalizer = Normalizer::new(MALL_PREFIX, Scale);
        let mut input = raw("1", "C", "1");
        input.latitude = Some(Scalar::from("1.5"));
        input.location = Some("1.29 103.85".to_string());

        let record = normalizer.normalize(&input).unwrap();
        assert_eq!(record.y.as_deref(), Some("1290.000"));
    }

    #[test]
    fn test_no_coordinates_gives_nulls() {
        let normalizer = Normalizer::new(MALL_PREFIX, Scale);
        let mut input = raw("1", "C", "1");
        input.location = Some("somewhere".to_string());

        let record = normalizer.normalize(&input).unwrap();
        assert_eq!((record.x, record.y), (None, None));
    }

    #[test]
    fn test_location_fallback_matches_explicit_fields() {
        let normalizer = Normalizer::new(MALL_PREFIX, Svy21::new());

        let mut combined = raw("1", "C", "1");
        combined.location = Some("1.29 103.85".to_string());

        let mut explicit = raw("1", "C", "1");
        explicit.latitude = Some(Scalar::from("1.29"));
        explicit.longitude = Some(Scalar::from("103.85"));

        assert_eq!(normalizer.normalize(&combined), normalizer.normalize(&explicit));
        assert_eq!(
            normalizer.normalize(&combined).unwrap().x.as_deref(),
            Some("29856.500")
        );
    }

    #[rstest]
    #[case(Some("Plaza"), Some("Orchard"), Some("Plaza (Orchard)"))]
    #[case(Some(" Plaza "), None, Some("Plaza"))]
    #[case(Some(""), Some("Orchard"), Some("Orchard"))]
    #[case(None, Some("  "), None)]
    #[case(None, None, None)]
    fn test_compose_address(
        #[case] name: Option<&str>,
        #[case] area: Option<&str>,
        #[case] expected: Option<&str>,
    ) {
        assert_eq!(compose_address(name, area).as_deref(), expected);
    }

    #[test]
    fn test_normalize_all_counts_skips() {
        let normalizer = Normalizer::new(MALL_PREFIX, Scale);
        let raws = vec![raw("1", "C", "1"), raw("2", "", "1"), raw("", "C", "1")];
        let (records, skipped) = normalizer.normalize_all(&raws);
        assert_eq!(records.len(), 1);
        assert_eq!(skipped, 2);
    }
}
