//! Raw record → [`Vehicle`] normalization.
//!
//! # Repairs
//!
//! | Problem                      | Repair                                   |
//! |------------------------------|------------------------------------------|
//! | missing/invalid coordinates  | landmark table, then default coordinate  |
//! | unparseable duration         | configured default duration              |
//! | duration ≤ 0                 | clamped to [`MIN_DURATION_SEC`]          |
//! | unparseable start time       | build time ("just departed")             |
//! | negative delay               | clamped to 0                             |
//! | missing id                   | derived from origin, destination, start  |
//! | duplicate id                 | first record wins                        |
//!
//! Each repair is logged; none of them fails the build.

use std::collections::HashSet;

use chrono::{DateTime, FixedOffset, NaiveDateTime, Offset, TimeZone, Utc};
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::error::VehicleError;
use crate::evaluation::{classify, progress};
use crate::geo::CoordinateResolver;
use crate::models::Vehicle;

use super::raw::{RawDuration, RawTimestamp, RawTrip};

/// Smallest base duration a normalized vehicle may carry.
pub const MIN_DURATION_SEC: f64 = 1.0;

/// Default trip duration when the record has none (one hour).
pub const DEFAULT_DURATION_SEC: f64 = 3600.0;

/// Integer timestamps below this are taken as epoch seconds, not millis.
const SECONDS_CUTOFF: i64 = 100_000_000_000;

const NAIVE_FORMATS: [&str; 5] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

const ARRIVED_STATUSES: [&str; 11] = [
    "arrived",
    "arrival",
    "complete",
    "completed",
    "delivered",
    "done",
    "도착",
    "도착완료",
    "완료",
    "운행완료",
    "배송완료",
];

/// Parses a duration into seconds.
///
/// Accepts plain seconds, `HH:MM:SS`, `MM:SS` and numeric strings. Returns
/// `None` for anything unparseable, negative, or zero.
///
/// # Examples
///
/// ```
/// use u_fleet::registry::{parse_duration, RawDuration};
///
/// assert_eq!(parse_duration(&RawDuration::Text("01:30:00".into())), Some(5400.0));
/// assert_eq!(parse_duration(&RawDuration::Text("45:10".into())), Some(2710.0));
/// assert_eq!(parse_duration(&RawDuration::Seconds(90.0)), Some(90.0));
/// assert_eq!(parse_duration(&RawDuration::Text("soon".into())), None);
/// ```
pub fn parse_duration(raw: &RawDuration) -> Option<f64> {
    let secs = match raw {
        RawDuration::Seconds(s) => *s,
        RawDuration::Text(text) => {
            let parts: Vec<f64> = text
                .trim()
                .split(':')
                .map(|p| p.trim().parse::<f64>())
                .collect::<Result<_, _>>()
                .ok()?;
            if parts.iter().any(|p| !p.is_finite() || *p < 0.0) {
                return None;
            }
            match parts.as_slice() {
                [h, m, s] => h * 3600.0 + m * 60.0 + s,
                [m, s] => m * 60.0 + s,
                [s] => *s,
                _ => return None,
            }
        }
    };
    (secs.is_finite() && secs > 0.0).then_some(secs)
}

/// Parses a start timestamp into epoch milliseconds.
///
/// Naive date-times (no zone) are interpreted in `offset`.
pub fn parse_timestamp(raw: &RawTimestamp, offset: FixedOffset) -> Option<i64> {
    match raw {
        RawTimestamp::Millis(v) => normalize_epoch(*v),
        RawTimestamp::Text(text) => {
            let text = text.trim();
            if let Ok(v) = text.parse::<i64>() {
                return normalize_epoch(v);
            }
            if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
                return Some(dt.timestamp_millis());
            }
            NAIVE_FORMATS.iter().find_map(|fmt| {
                let naive = NaiveDateTime::parse_from_str(text, fmt).ok()?;
                offset
                    .from_local_datetime(&naive)
                    .single()
                    .map(|dt| dt.timestamp_millis())
            })
        }
    }
}

/// Epoch seconds or milliseconds to milliseconds; `None` outside the
/// representable date range.
fn normalize_epoch(v: i64) -> Option<i64> {
    let ms = if v.unsigned_abs() < SECONDS_CUTOFF.unsigned_abs() {
        v.checked_mul(1000)?
    } else {
        v
    };
    DateTime::<Utc>::from_timestamp_millis(ms).map(|dt| dt.timestamp_millis())
}

/// Returns `true` if a free-form status flag means "arrived".
pub fn is_arrived_status(status: &str) -> bool {
    let s = status.trim().to_lowercase();
    ARRIVED_STATUSES.contains(&s.as_str())
}

/// Builds registry snapshots from raw records.
///
/// # Examples
///
/// ```
/// use u_fleet::registry::{RegistryBuilder, parse_raw_trips};
/// use u_fleet::geo::CoordinateResolver;
///
/// let now = 1_700_000_900_000;
/// let raw = parse_raw_trips(r#"[{
///     "id": "D-1", "origin": "LG1_선진화", "destination": "평택항",
///     "startTime": 1700000000000, "avgDuration": "00:30:00"
/// }]"#).unwrap();
///
/// let vehicles = RegistryBuilder::new(CoordinateResolver::default()).build(&raw, now);
/// assert_eq!(vehicles.len(), 1);
/// assert_eq!(vehicles[0].base_duration_sec(), 1800.0);
/// ```
#[derive(Debug, Clone)]
pub struct RegistryBuilder {
    resolver: CoordinateResolver,
    default_duration_sec: f64,
    utc_offset: FixedOffset,
}

impl RegistryBuilder {
    /// Creates a builder with a one-hour default duration and a +09:00
    /// offset for naive timestamps.
    pub fn new(resolver: CoordinateResolver) -> Self {
        Self {
            resolver,
            default_duration_sec: DEFAULT_DURATION_SEC,
            utc_offset: kst(),
        }
    }

    /// Creates a builder from engine configuration.
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            resolver: config.resolver(),
            default_duration_sec: config.default_duration_sec.max(MIN_DURATION_SEC),
            utc_offset: config.utc_offset(),
        }
    }

    /// Sets the fallback duration for records without a parseable one.
    pub fn with_default_duration(mut self, secs: f64) -> Self {
        if secs.is_finite() {
            self.default_duration_sec = secs.max(MIN_DURATION_SEC);
        }
        self
    }

    /// Sets the offset applied to naive timestamps.
    pub fn with_utc_offset(mut self, offset: FixedOffset) -> Self {
        self.utc_offset = offset;
        self
    }

    /// The resolver used for endpoints.
    pub fn resolver(&self) -> &CoordinateResolver {
        &self.resolver
    }

    /// Normalizes every record. Output order follows input order with
    /// duplicate ids and records without any endpoint removed.
    pub fn build(&self, records: &[RawTrip], now_ms: i64) -> Vec<Vehicle> {
        let mut seen = HashSet::with_capacity(records.len());
        let mut vehicles = Vec::with_capacity(records.len());
        let mut no_endpoints = 0usize;

        for record in records {
            if is_blank(&record.origin) && is_blank(&record.destination) {
                no_endpoints += 1;
                continue;
            }
            let vehicle = match self.normalize(record, now_ms) {
                Ok(v) => v,
                Err(e) => {
                    warn!(error = %e, "dropping trip record");
                    continue;
                }
            };
            if !seen.insert(vehicle.id().to_string()) {
                warn!(id = vehicle.id(), "duplicate trip id, keeping first record");
                continue;
            }
            vehicles.push(vehicle);
        }
        if no_endpoints > 0 {
            warn!(skipped = no_endpoints, "skipped trip records without endpoints");
        }
        vehicles
    }

    /// Normalizes a single record.
    ///
    /// All data problems are repaired; an error here means the repairs
    /// themselves produced an invalid entity.
    pub fn normalize(&self, record: &RawTrip, now_ms: i64) -> Result<Vehicle, VehicleError> {
        let origin = record.origin.as_deref().unwrap_or_default();
        let dest = record.destination.as_deref().unwrap_or_default();
        let start = self.resolver.resolve(origin, record.origin_coord.as_deref());
        let destination = self
            .resolver
            .resolve(dest, record.destination_coord.as_deref());

        let id = match record.id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => derive_id(record),
        };

        let base_duration_sec = match record.avg_duration.as_ref() {
            Some(raw) => parse_duration(raw).unwrap_or_else(|| {
                warn!(id = %id, duration = ?raw, "invalid duration, using default");
                self.default_duration_sec
            }),
            None => {
                debug!(id = %id, "no duration, using default");
                self.default_duration_sec
            }
        }
        .max(MIN_DURATION_SEC);

        let start_time_ms = record
            .start_time
            .as_ref()
            .and_then(|t| parse_timestamp(t, self.utc_offset))
            .unwrap_or_else(|| {
                warn!(
                    id = %id,
                    start = ?record.start_time,
                    "invalid start time, assuming just departed"
                );
                now_ms
            });

        let delay_sec = match record.delay_sec {
            Some(d) if d < 0.0 => {
                warn!(id = %id, delay = d, "negative delay clamped to zero");
                0.0
            }
            Some(d) => d,
            None => 0.0,
        };

        let arrived = record.arrived.unwrap_or(false)
            || record.status.as_deref().is_some_and(is_arrived_status);

        let mut vehicle = Vehicle::new(id, start, destination, base_duration_sec, start_time_ms)?
            .with_delay(delay_sec)?
            .with_arrived_signal(arrived);
        if let Some(km) = record.distance_km {
            vehicle = vehicle.with_distance_km(km);
        }
        if let Some(driver) = &record.driver {
            vehicle = vehicle.with_driver(driver.trim());
        }
        if let Some(cargo) = &record.cargo {
            vehicle = vehicle.with_cargo(cargo.as_str());
        }
        if let Some(temperature) = &record.temperature {
            vehicle = vehicle.with_temperature(temperature.as_str());
        }

        let state = classify(&vehicle, progress(&vehicle, now_ms), arrived);
        Ok(vehicle.with_lifecycle_state(state))
    }
}

/// Builds a registry with the default builder settings.
pub fn build_registry(
    records: &[RawTrip],
    resolver: &CoordinateResolver,
    now_ms: i64,
) -> Vec<Vehicle> {
    RegistryBuilder::new(resolver.clone()).build(records, now_ms)
}

fn is_blank(field: &Option<String>) -> bool {
    field.as_deref().map_or(true, |s| s.trim().is_empty())
}

/// Deterministic id from the raw (unparsed) fields, so it is identical on
/// every refresh even when parsing falls back.
fn derive_id(record: &RawTrip) -> String {
    let start = match &record.start_time {
        Some(RawTimestamp::Millis(ms)) => ms.to_string(),
        Some(RawTimestamp::Text(text)) => text.trim().to_string(),
        None => "?".to_string(),
    };
    format!(
        "{}->{}@{}",
        record.origin.as_deref().unwrap_or_default().trim(),
        record.destination.as_deref().unwrap_or_default().trim(),
        start
    )
}

/// Fixed offset for whole hours east of UTC; out-of-range values fall back
/// to UTC.
pub(crate) fn offset_from_hours(hours: i32) -> FixedOffset {
    FixedOffset::east_opt(hours.saturating_mul(3600)).unwrap_or_else(|| Utc.fix())
}

fn kst() -> FixedOffset {
    offset_from_hours(9)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LifecycleState;

    const NOW: i64 = 1_700_000_900_000;

    fn builder() -> RegistryBuilder {
        RegistryBuilder::new(CoordinateResolver::default())
    }

    fn trip(id: &str) -> RawTrip {
        RawTrip {
            id: Some(id.into()),
            origin: Some("LG1_선진화".into()),
            destination: Some("평택항".into()),
            start_time: Some(RawTimestamp::Millis(NOW - 900_000)),
            avg_duration: Some(RawDuration::Text("00:30:00".into())),
            ..RawTrip::default()
        }
    }

    #[test]
    fn test_duration_formats() {
        assert_eq!(parse_duration(&RawDuration::Text("00:30:00".into())), Some(1800.0));
        assert_eq!(parse_duration(&RawDuration::Text(" 2:00:30 ".into())), Some(7230.0));
        assert_eq!(parse_duration(&RawDuration::Text("600".into())), Some(600.0));
        assert_eq!(parse_duration(&RawDuration::Text("00:00:00".into())), None);
        assert_eq!(parse_duration(&RawDuration::Text("1:2:3:4".into())), None);
        assert_eq!(parse_duration(&RawDuration::Text("-1:00".into())), None);
        assert_eq!(parse_duration(&RawDuration::Text("".into())), None);
        assert_eq!(parse_duration(&RawDuration::Seconds(-3.0)), None);
    }

    #[test]
    fn test_timestamp_formats() {
        let kst = kst();
        let expected = 1_709_251_200_000; // 2024-03-01T00:00:00Z
        assert_eq!(
            parse_timestamp(&RawTimestamp::Text("2024-03-01 09:00:00".into()), kst),
            Some(expected)
        );
        assert_eq!(
            parse_timestamp(&RawTimestamp::Text("2024-03-01T00:00:00Z".into()), kst),
            Some(expected)
        );
        assert_eq!(
            parse_timestamp(&RawTimestamp::Text("2024-03-01T09:00:00".into()), kst),
            Some(expected)
        );
        assert_eq!(
            parse_timestamp(&RawTimestamp::Millis(expected), kst),
            Some(expected)
        );
        assert_eq!(
            parse_timestamp(&RawTimestamp::Millis(1_709_251_200), kst),
            Some(expected)
        );
        assert_eq!(
            parse_timestamp(&RawTimestamp::Text("yesterday".into()), kst),
            None
        );
        assert_eq!(parse_timestamp(&RawTimestamp::Millis(i64::MIN), kst), None);
        assert_eq!(parse_timestamp(&RawTimestamp::Millis(i64::MAX), kst), None);
        assert_eq!(
            parse_timestamp(&RawTimestamp::Text("-9223372036854775808".into()), kst),
            None
        );
    }

    #[test]
    fn test_extreme_epoch_degrades_to_now() {
        let trips = crate::registry::parse_raw_trips(
            r#"[{"id": "X", "origin": "LG1", "destination": "평택항",
                 "startTime": -9223372036854775808}]"#,
        )
        .expect("valid");
        let vehicles = builder().build(&trips, NOW);
        assert_eq!(vehicles.len(), 1);
        assert_eq!(vehicles[0].start_time_ms(), NOW);
    }

    #[test]
    fn test_arrived_status() {
        assert!(is_arrived_status("Arrived"));
        assert!(is_arrived_status(" 도착완료 "));
        assert!(!is_arrived_status("미도착"));
        assert!(!is_arrived_status("운행중"));
    }

    #[test]
    fn test_normalize_halfway() {
        let v = builder().normalize(&trip("D-1"), NOW).expect("valid");
        assert_eq!(v.id(), "D-1");
        assert_eq!(v.base_duration_sec(), 1800.0);
        assert_eq!(v.start_time_ms(), NOW - 900_000);
        assert_eq!(v.start().label(), "LG1_선진화");
        assert_eq!(v.lifecycle_state(), LifecycleState::Moving);
    }

    #[test]
    fn test_normalize_seeds_arrived_from_elapsed() {
        let mut t = trip("D-2");
        t.start_time = Some(RawTimestamp::Millis(NOW - 3_600_000));
        let v = builder().normalize(&t, NOW).expect("valid");
        assert_eq!(v.lifecycle_state(), LifecycleState::Arrived);
        assert!(!v.arrived_signal());
    }

    #[test]
    fn test_normalize_seeds_arrived_from_status() {
        let mut t = trip("D-3");
        t.status = Some("도착".into());
        let v = builder().normalize(&t, NOW).expect("valid");
        assert!(v.arrived_signal());
        assert_eq!(v.lifecycle_state(), LifecycleState::Arrived);
    }

    #[test]
    fn test_normalize_delay_seeds_delayed() {
        let mut t = trip("D-4");
        t.delay_sec = Some(300.0);
        let v = builder().normalize(&t, NOW).expect("valid");
        assert_eq!(v.delay_sec(), 300.0);
        assert_eq!(v.lifecycle_state(), LifecycleState::Delayed);
    }

    #[test]
    fn test_normalize_repairs() {
        let t = RawTrip {
            avg_duration: Some(RawDuration::Text("??".into())),
            start_time: Some(RawTimestamp::Text("garbage".into())),
            delay_sec: Some(-50.0),
            ..RawTrip::default()
        };
        let v = builder()
            .with_default_duration(1200.0)
            .normalize(&t, NOW)
            .expect("repaired");
        assert_eq!(v.base_duration_sec(), 1200.0);
        assert_eq!(v.start_time_ms(), NOW);
        assert_eq!(v.delay_sec(), 0.0);
        assert_eq!(v.id(), "->@garbage");
        assert!(builder().resolver().is_default(v.start()));
    }

    #[test]
    fn test_derived_id_is_stable() {
        let mut t = trip("x");
        t.id = None;
        let a = builder().normalize(&t, NOW).expect("valid");
        let b = builder().normalize(&t, NOW + 30_000).expect("valid");
        assert_eq!(a.id(), b.id());
        assert_eq!(a.id(), format!("LG1_선진화->평택항@{}", NOW - 900_000));
    }

    #[test]
    fn test_build_drops_duplicates() {
        let vehicles = builder().build(&[trip("A"), trip("B"), trip("A")], NOW);
        let ids: Vec<&str> = vehicles.iter().map(|v| v.id()).collect();
        assert_eq!(ids, vec!["A", "B"]);
    }

    #[test]
    fn test_build_skips_records_without_endpoints() {
        let blank = RawTrip {
            id: Some("X".into()),
            origin: Some("  ".into()),
            ..RawTrip::default()
        };
        let mut one_sided = trip("B");
        one_sided.destination = None;
        let vehicles = builder().build(&[blank, trip("A"), one_sided], NOW);
        let ids: Vec<&str> = vehicles.iter().map(|v| v.id()).collect();
        assert_eq!(ids, vec!["A", "B"]);
    }

    #[test]
    fn test_build_registry_helper() {
        let vehicles = build_registry(&[trip("A")], &CoordinateResolver::default(), NOW);
        assert_eq!(vehicles.len(), 1);
    }

    #[test]
    fn test_distance_override() {
        let mut t = trip("A");
        t.distance_km = Some(31.0);
        let v = builder().normalize(&t, NOW).expect("valid");
        assert_eq!(v.total_distance_km(), 31.0);
    }
}
