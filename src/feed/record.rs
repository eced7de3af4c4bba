use serde::{Deserialize, Serialize};
use serde_json::Number;

/// One carpark/lot-type row as DataMall publishes it.
///
/// Every field is optional: the feed omits keys freely, and the normalizer
/// decides what is usable.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct RawRecord {
    #[serde(rename = "CarParkID", default)]
    pub carpark_id: Option<Scalar>,
    #[serde(rename = "Area", default)]
    pub area: Option<String>,
    #[serde(rename = "Development", default)]
    pub development: Option<String>,
    /// Combined `"lat lon"` string.
    #[serde(rename = "Location", default)]
    pub location: Option<String>,
    #[serde(rename = "AvailableLots", default)]
    pub available_lots: Option<Scalar>,
    #[serde(rename = "LotType", default)]
    pub lot_type: Option<String>,
    #[serde(rename = "Agency", default)]
    pub agency: Option<String>,
    #[serde(rename = "Latitude", default)]
    pub latitude: Option<Scalar>,
    #[serde(rename = "Longitude", default)]
    pub longitude: Option<Scalar>,
}

impl RawRecord {
    /// True when the record belongs to the given agency (case-insensitive).
    pub fn is_agency(&self, agency: &str) -> bool {
        self.agency
            .as_deref()
            .is_some_and(|a| a.trim().eq_ignore_ascii_case(agency))
    }
}

/// A JSON value the feed sends either as a number or as a string.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Scalar {
    Number(Number),
    Text(String),
}

impl Scalar {
    pub fn to_text(&self) -> String {
        match self {
            Scalar::Number(n) => n.to_string(),
            Scalar::Text(s) => s.clone(),
        }
    }

    /// Integer value; whole floats are accepted, fractional ones are not.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Scalar::Number(n) => n.as_i64().or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                    .map(|f| f as i64)
            }),
            Scalar::Text(s) => s.trim().parse().ok(),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        let value = match self {
            Scalar::Number(n) => n.as_f64(),
            Scalar::Text(s) => s.trim().parse::<f64>().ok(),
        };
        value.filter(|f| f.is_finite())
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::Text(s.to_string())
    }
}

impl From<i64> for Scalar {
    fn from(n: i64) -> Self {
        Scalar::Number(n.into())
    }
}

/// One page of the feed: `{"value": [...]}`.
///
/// `value` is required; an error envelope without it does not parse.
#[derive(Debug, Deserialize)]
pub struct Page {
    pub value: Vec<RawRecord>,
}

/// A saved payload: either a full page object or a bare record array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Payload {
    Records(Vec<RawRecord>),
    Page(Page),
}

impl Payload {
    pub fn into_records(self) -> Vec<RawRecord> {
        match self {
            Payload::Records(records) => records,
            Payload::Page(page) => page.value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_datamall_row() {
        let json = r#"{
            "CarParkID": "1",
            "Area": "Marina",
            "Development": "Suntec City",
            "Location": "1.29375 103.85718",
            "AvailableLots": 442,
            "LotType": "C",
            "Agency": "LTA"
        }"#;
        let record: RawRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.carpark_id, Some(Scalar::from("1")));
        assert_eq!(record.available_lots.as_ref().and_then(Scalar::as_i64), Some(442));
        assert_eq!(record.latitude, None);
        assert!(record.is_agency("lta"));
    }

    #[test]
    fn test_scalar_parsing() {
        assert_eq!(Scalar::from(" 12 ").as_i64(), Some(12));
        assert_eq!(Scalar::from("twelve").as_i64(), None);
        assert_eq!(Scalar::Number(Number::from_f64(5.0).unwrap()).as_i64(), Some(5));
        assert_eq!(Scalar::Number(Number::from_f64(5.5).unwrap()).as_i64(), None);
        assert_eq!(Scalar::from("1.29").as_f64(), Some(1.29));
        assert_eq!(Scalar::from("NaN").as_f64(), None);
        assert_eq!(Scalar::from(7).to_text(), "7");
    }

    #[test]
    fn test_payload_shapes() {
        let page: Payload = serde_json::from_str(r#"{"value": [{"LotType": "C"}]}"#).unwrap();
        assert_eq!(page.into_records().len(), 1);

        let bare: Payload = serde_json::from_str(r#"[{"LotType": "C"}, {}]"#).unwrap();
        assert_eq!(bare.into_records().len(), 2);
    }
}
