//! Raw trip records as delivered by a data source.
//!
//! The remote wire format is loosely typed: fields go missing, numbers arrive
//! as strings and vice versa. Every field is therefore optional and decoded
//! leniently: a value of the wrong type becomes `None` instead of failing the
//! whole record. Only records that are not JSON objects are dropped.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::SourceError;

/// Trip start timestamp as sent by the source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawTimestamp {
    /// Epoch milliseconds.
    Millis(i64),
    /// Text (RFC 3339 or `YYYY-MM-DD HH:MM:SS`).
    Text(String),
}

/// Expected trip duration as sent by the source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawDuration {
    /// Plain seconds.
    Seconds(f64),
    /// `HH:MM:SS`, `MM:SS`, or a numeric string.
    Text(String),
}

/// One unvalidated trip record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawTrip {
    /// Source identifier, if the source has one.
    #[serde(deserialize_with = "lenient_string")]
    pub id: Option<String>,
    /// Driver display name.
    #[serde(deserialize_with = "lenient_string")]
    pub driver: Option<String>,
    /// Origin descriptor.
    #[serde(alias = "from", alias = "departure", deserialize_with = "lenient_string")]
    pub origin: Option<String>,
    /// Destination descriptor.
    #[serde(alias = "to", alias = "arrival", deserialize_with = "lenient_string")]
    pub destination: Option<String>,
    /// Explicit `"lat, lng"` for the origin.
    #[serde(deserialize_with = "lenient_string")]
    pub origin_coord: Option<String>,
    /// Explicit `"lat, lng"` for the destination.
    #[serde(deserialize_with = "lenient_string")]
    pub destination_coord: Option<String>,
    /// Trip start.
    #[serde(alias = "departureTime", deserialize_with = "lenient_timestamp")]
    pub start_time: Option<RawTimestamp>,
    /// Historical average duration.
    #[serde(alias = "duration", deserialize_with = "lenient_duration")]
    pub avg_duration: Option<RawDuration>,
    /// Free-form status flag.
    #[serde(deserialize_with = "lenient_string")]
    pub status: Option<String>,
    /// Explicit arrival flag.
    #[serde(deserialize_with = "lenient_bool")]
    pub arrived: Option<bool>,
    /// Route length.
    #[serde(deserialize_with = "lenient_f64")]
    pub distance_km: Option<f64>,
    /// Delay already known to the source.
    #[serde(deserialize_with = "lenient_f64")]
    pub delay_sec: Option<f64>,
    /// Cargo descriptor.
    #[serde(deserialize_with = "lenient_string")]
    pub cargo: Option<String>,
    /// Temperature reading.
    #[serde(deserialize_with = "lenient_string")]
    pub temperature: Option<String>,
}

/// Parses a JSON payload into raw trips.
///
/// Accepts either a top-level array or an object wrapping the array under
/// `data`, `trips` or `items`. Non-object elements are skipped.
///
/// # Errors
///
/// [`SourceError::Parse`] for invalid JSON and [`SourceError::Shape`] when no
/// trip array can be found.
///
/// # Examples
///
/// ```
/// use u_fleet::registry::parse_raw_trips;
///
/// let trips = parse_raw_trips(r#"[{"origin": "LG1", "destination": "평택항", "distanceKm": "n/a"}]"#).unwrap();
/// assert_eq!(trips.len(), 1);
/// assert_eq!(trips[0].origin.as_deref(), Some("LG1"));
/// assert_eq!(trips[0].distance_km, None);
/// ```
pub fn parse_raw_trips(payload: &str) -> Result<Vec<RawTrip>, SourceError> {
    let value: Value = serde_json::from_str(payload)?;
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => ["data", "trips", "items"]
            .iter()
            .find_map(|key| match map.remove(*key) {
                Some(Value::Array(items)) => Some(items),
                _ => None,
            })
            .ok_or_else(|| SourceError::Shape("object without a trip array".into()))?,
        other => {
            return Err(SourceError::Shape(format!(
                "expected an array, got {}",
                json_kind(&other)
            )))
        }
    };

    let total = items.len();
    let trips: Vec<RawTrip> = items
        .into_iter()
        .filter(Value::is_object)
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect();
    if trips.len() < total {
        warn!(skipped = total - trips.len(), total, "skipped non-object trip records");
    }
    Ok(trips)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn lenient_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn lenient_f64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
    .filter(|v: &f64| v.is_finite()))
}

fn lenient_bool<'de, D: Deserializer<'de>>(d: D) -> Result<Option<bool>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Bool(b) => Some(b),
        Value::Number(n) => n.as_i64().map(|i| i != 0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "y" | "yes" | "1" => Some(true),
            "false" | "n" | "no" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    })
}

fn lenient_timestamp<'de, D: Deserializer<'de>>(d: D) -> Result<Option<RawTimestamp>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))
            .map(RawTimestamp::Millis),
        Value::String(s) => Some(RawTimestamp::Text(s)),
        _ => None,
    })
}

fn lenient_duration<'de, D: Deserializer<'de>>(d: D) -> Result<Option<RawDuration>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Number(n) => n.as_f64().map(RawDuration::Seconds),
        Value::String(s) => Some(RawDuration::Text(s)),
        _ => None,
    })
}
