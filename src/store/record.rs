//! Institution record model and normalization from raw endpoint objects

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Identifier assigned by the source system
///
/// Treated as opaque: two ids are the same institution only when their text
/// forms are equal. A digit string in canonical form (no leading zeros) is
/// stored as `Numeric`, so `"42"` and `42` collide while `"0042"` stays
/// `Text` and keeps its own key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InstitutionId {
    Numeric(u64),
    Text(String),
}

impl InstitutionId {
    /// Parses an identifier from a raw JSON value
    ///
    /// Returns `None` for values that cannot serve as a key (null, booleans,
    /// arrays, objects, blank strings).
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => Some(match n.as_u64() {
                Some(id) => InstitutionId::Numeric(id),
                None => InstitutionId::Text(n.to_string()),
            }),
            Value::String(s) => {
                let s = s.trim();
                if s.is_empty() {
                    return None;
                }
                if s.bytes().all(|b| b.is_ascii_digit()) {
                    if let Ok(id) = s.parse::<u64>() {
                        if id.to_string() == s {
                            return Some(InstitutionId::Numeric(id));
                        }
                    }
                }
                Some(InstitutionId::Text(s.to_string()))
            }
            _ => None,
        }
    }

    /// The deduplication key
    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for InstitutionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstitutionId::Numeric(id) => write!(f, "{}", id),
            InstitutionId::Text(id) => f.write_str(id),
        }
    }
}

/// A normalized institution as persisted in the output file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstitutionRecord {
    pub id: InstitutionId,
    pub name: String,
    pub country: String,
    pub query_found: String,
    pub extraction_date: NaiveDate,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(
        rename = "organizationType",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub organization_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
}

impl InstitutionRecord {
    /// Builds a record from one raw object returned by the endpoint
    ///
    /// # Arguments
    ///
    /// * `raw` - A single element of the endpoint's result list
    /// * `default_country` - Country used when the object carries none
    /// * `query` - The query that surfaced this object
    /// * `extraction_date` - UTC day of capture
    ///
    /// # Returns
    ///
    /// `None` when the value is not an object, has no usable `id`, or has a
    /// blank name.
    pub fn from_raw(
        raw: &Value,
        default_country: &str,
        query: &str,
        extraction_date: NaiveDate,
    ) -> Option<Self> {
        let obj = raw.as_object()?;
        let id = InstitutionId::from_value(obj.get("id")?)?;
        let name = text_field(obj, "name")?;

        Some(Self {
            id,
            name,
            country: text_field(obj, "country").unwrap_or_else(|| default_country.to_string()),
            query_found: query.to_string(),
            extraction_date,
            kind: text_field(obj, "type"),
            organization_type: text_field(obj, "organizationType"),
            city: text_field(obj, "city"),
            state: text_field(obj, "state"),
            website: text_field(obj, "website"),
            domain: text_field(obj, "domain"),
        })
    }

    /// Case-insensitive sort key used by snapshots
    pub fn sort_key(&self) -> String {
        self.name.to_lowercase()
    }
}

/// Reads a scalar field as trimmed text; blank values count as absent
fn text_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    let text = match obj.get(key)? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 11, 25).unwrap()
    }

    #[test]
    fn test_digit_string_id_becomes_numeric() {
        assert_eq!(
            InstitutionId::from_value(&json!("123")),
            Some(InstitutionId::Numeric(123))
        );
        assert_eq!(
            InstitutionId::from_value(&json!("00123")),
            Some(InstitutionId::Text("00123".to_string()))
        );
        assert_eq!(
            InstitutionId::from_value(&json!(77)),
            Some(InstitutionId::Numeric(77))
        );
        assert_eq!(
            InstitutionId::from_value(&json!("abc-1")),
            Some(InstitutionId::Text("abc-1".to_string()))
        );
        assert_eq!(InstitutionId::from_value(&json!(null)), None);
        assert_eq!(InstitutionId::from_value(&json!("  ")), None);
    }

    #[test]
    fn test_from_raw_trims_and_defaults_country() {
        let raw = json!({
            "id": "42",
            "name": "  Oak Elementary ",
            "type": " SCHOOL ",
            "city": "Springfield",
            "website": "",
        });
        let record = InstitutionRecord::from_raw(&raw, "US", "oak", date()).unwrap();

        assert_eq!(record.id, InstitutionId::Numeric(42));
        assert_eq!(record.name, "Oak Elementary");
        assert_eq!(record.country, "US");
        assert_eq!(record.kind.as_deref(), Some("SCHOOL"));
        assert_eq!(record.city.as_deref(), Some("Springfield"));
        assert_eq!(record.website, None);
        assert_eq!(record.query_found, "oak");
    }

    #[test]
    fn test_from_raw_keeps_source_country() {
        let raw = json!({"id": 1, "name": "Maple Academy", "country": "CA"});
        let record = InstitutionRecord::from_raw(&raw, "US", "", date()).unwrap();
        assert_eq!(record.country, "CA");
    }

    #[test]
    fn test_from_raw_rejects_unusable_objects() {
        assert!(InstitutionRecord::from_raw(&json!("x"), "US", "", date()).is_none());
        assert!(InstitutionRecord::from_raw(&json!({"name": "No Id"}), "US", "", date()).is_none());
        assert!(InstitutionRecord::from_raw(&json!({"id": 3, "name": "  "}), "US", "", date()).is_none());
    }

    #[test]
    fn test_serialized_shape() {
        let raw = json!({"id": 9, "name": "Pine High", "organizationType": "HIGH_SCHOOL"});
        let record = InstitutionRecord::from_raw(&raw, "US", "pi", date()).unwrap();
        let value = serde_json::to_value(&record).unwrap();

        assert_eq!(value["id"], json!(9));
        assert_eq!(value["organizationType"], json!("HIGH_SCHOOL"));
        assert_eq!(value["extraction_date"], json!("2025-11-25"));
        assert!(value.get("type").is_none());
        assert!(value.get("city").is_none());
    }
}
