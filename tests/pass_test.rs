//! End-to-end passes: saved DataMall payload -> store -> snapshot -> CSV.

use std::fs;
use std::path::Path;
use tempfile::TempDir;

use carpark_sync::export::CsvExporter;
use carpark_sync::feed::PayloadFile;
use carpark_sync::normalize::{Normalizer, Svy21, MALL_PREFIX};
use carpark_sync::store::{JoinSnapshot, Reconciler, Store};
use carpark_sync::{Pipeline, SyncError, Timestamp};

// =============================================================================
// Helpers
// =============================================================================

fn pipeline(export_dir: Option<&Path>) -> Pipeline<Svy21> {
    let pipeline = Pipeline::new(
        Normalizer::new(MALL_PREFIX, Svy21::new()),
        Reconciler::new(MALL_PREFIX),
        Box::new(JoinSnapshot),
    );
    match export_dir {
        Some(dir) => pipeline.with_exporter(Box::new(CsvExporter::new(dir))),
        None => pipeline,
    }
}

fn write_payload(dir: &Path, name: &str, json: &str) -> PayloadFile {
    let path = dir.join(name);
    fs::write(&path, json).expect("Failed to write payload");
    PayloadFile::new(path)
}

fn ts(s: &str) -> Timestamp {
    Timestamp::parse(s).unwrap()
}

const PAYLOAD: &str = r#"{
  "odata.metadata": "http://datamall2.mytransport.sg/ltaodataservice/$metadata#CarParkAvailability",
  "value": [
    {"CarParkID": "1", "Area": "Marina", "Development": "Suntec City",
     "Location": "1.29375 103.85718", "AvailableLots": 442, "LotType": "C", "Agency": "LTA"},
    {"CarParkID": "1", "Area": "Marina", "Development": "Suntec City",
     "Location": "1.29375 103.85718", "AvailableLots": "12", "LotType": "Y", "Agency": "LTA"},
    {"CarParkID": "2", "Area": "Orchard", "Development": "",
     "Location": "", "AvailableLots": null, "LotType": "C", "Agency": "LTA"},
    {"CarParkID": "3", "Area": "Orchard", "Development": "Plaza",
     "Location": "1.30 103.83", "AvailableLots": 5, "LotType": "", "Agency": "LTA"},
    {"CarParkID": "A10", "Area": "", "Development": "BLK 1",
     "Location": "1.31 103.86", "AvailableLots": 20, "LotType": "C", "Agency": "HDB"}
  ]
}"#;

// =============================================================================
// Tests
// =============================================================================

#[test]
fn test_full_pass_from_payload() {
    let dir = TempDir::new().unwrap();
    let mut store = Store::open(&dir.path().join("ops.sqlite")).unwrap();
    let feed = write_payload(dir.path(), "payload.json", PAYLOAD);
    let exports = dir.path().join("exports");

    let outcome = pipeline(Some(&exports))
        .run(&mut store, &feed, ts("2025-02-01T08:00:00Z"))
        .unwrap();

    // the HDB row is filtered out by agency, the lot-type-less row skipped
    assert_eq!(outcome.records_seen, 4);
    assert_eq!(outcome.records_skipped, 1);
    assert_eq!(outcome.stats.upserted, 3);
    assert_eq!(outcome.sample.len(), 3);

    let suntec = store.entity_info("MALL1").unwrap().unwrap();
    assert_eq!(suntec.address.as_deref(), Some("Suntec City (Marina)"));
    assert!(suntec.x.is_some() && suntec.y.is_some());

    let orchard = store.entity_info("MALL2").unwrap().unwrap();
    assert_eq!(orchard.address.as_deref(), Some("Orchard"));
    assert_eq!((orchard.x, orchard.y), (None, None));
    assert_eq!(
        store.availability("MALL2", "C").unwrap().unwrap().available_count,
        0
    );

    let key = outcome.export_key.expect("export key");
    assert!(key.ends_with("lot_update_combined_20250201-080000.csv"));
    let csv = fs::read_to_string(key).unwrap();
    assert_eq!(csv.lines().count(), 4);
    assert!(csv.contains("MALL1,Y,12,"));
}

#[test]
fn test_location_fallback_matches_explicit_coordinates() {
    let dir = TempDir::new().unwrap();
    let combined = write_payload(
        dir.path(),
        "combined.json",
        r#"[{"CarParkID": "1", "Location": "1.29 103.85", "AvailableLots": 1,
             "LotType": "C", "Agency": "LTA"}]"#,
    );
    let explicit = write_payload(
        dir.path(),
        "explicit.json",
        r#"[{"CarParkID": "1", "Latitude": 1.29, "Longitude": 103.85, "AvailableLots": 1,
             "LotType": "C", "Agency": "LTA"}]"#,
    );

    let mut first = Store::open_in_memory().unwrap();
    let mut second = Store::open_in_memory().unwrap();
    let now = ts("2025-02-01T08:00:00Z");
    pipeline(None).run(&mut first, &combined, now).unwrap();
    pipeline(None).run(&mut second, &explicit, now).unwrap();

    let a = first.entity_info("MALL1").unwrap().unwrap();
    let b = second.entity_info("MALL1").unwrap().unwrap();
    assert_eq!(a, b);
    assert_eq!(a.x.as_deref(), Some("29856.500"));
    assert_eq!(a.y.as_deref(), Some("30267.171"));
}

#[test]
fn test_second_pass_mirrors_feed() {
    let dir = TempDir::new().unwrap();
    let mut store = Store::open_in_memory().unwrap();
    let first = write_payload(dir.path(), "first.json", PAYLOAD);
    pipeline(None)
        .run(&mut store, &first, ts("2025-02-01T08:00:00Z"))
        .unwrap();

    let second = write_payload(
        dir.path(),
        "second.json",
        r#"{"value": [{"CarParkID": "1", "AvailableLots": 400, "LotType": "C", "Agency": "LTA"}]}"#,
    );
    let outcome = pipeline(None)
        .run(&mut store, &second, ts("2025-02-01T08:05:00Z"))
        .unwrap();

    assert_eq!(outcome.stats.evicted, 2);
    let rows = store.availability_rows().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].available_count, 400);

    // the joined snapshot follows the committed state
    let joined: i64 = store
        .connection()
        .query_row("SELECT COUNT(*) FROM carpark_availability_join", [], |r| r.get(0))
        .unwrap();
    assert_eq!(joined, 1);

    // metadata from the first pass is kept
    let info = store.entity_info("MALL1").unwrap().unwrap();
    assert_eq!(info.address.as_deref(), Some("Suntec City (Marina)"));
}

#[test]
fn test_malformed_payload_fails_before_any_write() {
    let dir = TempDir::new().unwrap();
    let mut store = Store::open_in_memory().unwrap();
    let feed = write_payload(dir.path(), "bad.json", "{\"value\": [1, 2");

    let result = pipeline(None).run(&mut store, &feed, ts("2025-02-01T08:00:00Z"));

    assert!(result.is_err());
    assert!(store.availability_rows().unwrap().is_empty());
    assert_eq!(store.history_count().unwrap(), 0);
}

#[test]
fn test_error_envelope_keeps_existing_rows() {
    let dir = TempDir::new().unwrap();
    let mut store = Store::open_in_memory().unwrap();
    let first = write_payload(dir.path(), "first.json", PAYLOAD);
    pipeline(None)
        .run(&mut store, &first, ts("2025-02-01T08:00:00Z"))
        .unwrap();
    let before = store.availability_rows().unwrap();
    let history = store.history_count().unwrap();

    let envelope = write_payload(
        dir.path(),
        "fault.json",
        r#"{"fault": {"faultstring": "Rate limit quota violation"}}"#,
    );
    let result = pipeline(None).run(&mut store, &envelope, ts("2025-02-01T08:05:00Z"));

    assert!(matches!(result, Err(SyncError::MalformedPayload { .. })));
    assert_eq!(store.availability_rows().unwrap(), before);
    assert_eq!(store.history_count().unwrap(), history);
}
