//! Seeded synthetic fleet.
//!
//! # Algorithm
//!
//! Every slot shuttles between two endpoints forever. A slot's plan (trip
//! duration, dwell, phase) is drawn once from a seeded [`StdRng`]; the trip a
//! slot is on at `now` then follows from arithmetic alone:
//!
//! ```text
//! cycle      = floor((now + phase) / (duration + dwell))
//! start      = cycle * (duration + dwell) - phase
//! direction  = A → B on even cycles, B → A on odd cycles
//! ```
//!
//! The reported id is `SIM-<slot>-<cycle>`, stable for the whole trip and
//! identical across refreshes.

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::SourceError;
use crate::geo::Coordinate;
use crate::registry::{RawDuration, RawTimestamp, RawTrip};

use super::TripSource;

const DRIVERS: [&str; 8] = [
    "김민준", "이서연", "박지훈", "최수아", "정우진", "강하은", "조현우", "윤지민",
];

const CARGO: [&str; 4] = ["OLED panels", "Washing machines", "Air conditioners", "Spare parts"];

const TEMPERATURES: [&str; 4] = ["4°C", "12°C", "18°C", "22°C"];

/// Upper bound for trip duration and dwell, seconds (one week).
pub const MAX_SYNTHETIC_SPAN_SEC: u64 = 7 * 24 * 3600;

/// Synthetic fleet parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticConfig {
    /// Number of concurrently simulated vehicles.
    pub fleet_size: usize,
    /// RNG seed.
    pub seed: u64,
    /// Shortest trip, seconds.
    pub min_duration_sec: u64,
    /// Longest trip, seconds.
    pub max_duration_sec: u64,
    /// Pause at each endpoint between trips, seconds.
    pub dwell_sec: u64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            fleet_size: 6,
            seed: 42,
            min_duration_sec: 1200,
            max_duration_sec: 3600,
            dwell_sec: 300,
        }
    }
}

impl SyntheticConfig {
    /// Sets the fleet size.
    pub fn with_fleet_size(mut self, n: usize) -> Self {
        self.fleet_size = n;
        self
    }

    /// Sets the RNG seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Sets the trip duration range in seconds.
    pub fn with_duration_range(mut self, min_sec: u64, max_sec: u64) -> Self {
        self.min_duration_sec = min_sec;
        self.max_duration_sec = max_sec;
        self
    }

    /// Sets the dwell time in seconds.
    pub fn with_dwell(mut self, secs: u64) -> Self {
        self.dwell_sec = secs;
        self
    }
}

#[derive(Debug, Clone)]
struct SlotPlan {
    duration_sec: u64,
    cycle_ms: i64,
    phase_ms: i64,
    driver: &'static str,
}

/// Deterministic demo fleet shuttling between two endpoints.
///
/// # Examples
///
/// ```
/// use u_fleet::geo::Coordinate;
/// use u_fleet::source::{SyntheticConfig, SyntheticSource};
///
/// let a = Coordinate::new(36.9921, 127.0857, "LG").unwrap();
/// let b = Coordinate::new(37.2636, 127.0286, "선진화").unwrap();
/// let source = SyntheticSource::new(SyntheticConfig::default(), a, b);
///
/// let trips = source.trips_at(1_700_000_000_000);
/// assert_eq!(trips.len(), 6);
/// assert!(trips[0].id.as_deref().unwrap().starts_with("SIM-0-"));
/// ```
#[derive(Debug, Clone)]
pub struct SyntheticSource {
    endpoints: (Coordinate, Coordinate),
    slots: Vec<SlotPlan>,
}

impl SyntheticSource {
    /// Draws a fleet plan from `config` between endpoints `a` and `b`.
    pub fn new(config: SyntheticConfig, a: Coordinate, b: Coordinate) -> Self {
        let mut rng = StdRng::seed_from_u64(config.seed);
        let min = config.min_duration_sec.clamp(1, MAX_SYNTHETIC_SPAN_SEC);
        let max = config.max_duration_sec.clamp(min, MAX_SYNTHETIC_SPAN_SEC);
        let dwell_sec = config.dwell_sec.min(MAX_SYNTHETIC_SPAN_SEC);

        let slots = (0..config.fleet_size)
            .map(|i| {
                let duration_sec = rng.random_range(min..=max);
                let cycle_ms = ((duration_sec + dwell_sec) * 1000) as i64;
                let phase_ms = rng.random_range(0..cycle_ms);
                SlotPlan {
                    duration_sec,
                    cycle_ms,
                    phase_ms,
                    driver: DRIVERS[i % DRIVERS.len()],
                }
            })
            .collect();

        Self {
            endpoints: (a, b),
            slots,
        }
    }

    /// Number of simulated vehicles.
    pub fn fleet_size(&self) -> usize {
        self.slots.len()
    }

    /// The records every slot reports at `now_ms`.
    pub fn trips_at(&self, now_ms: i64) -> Vec<RawTrip> {
        self.slots
            .iter()
            .enumerate()
            .map(|(slot, plan)| self.trip_for(slot, plan, now_ms))
            .collect()
    }

    fn trip_for(&self, slot: usize, plan: &SlotPlan, now_ms: i64) -> RawTrip {
        let cycle = now_ms.saturating_add(plan.phase_ms).div_euclid(plan.cycle_ms);
        let start_ms = cycle * plan.cycle_ms - plan.phase_ms;
        let (from, to) = if cycle.rem_euclid(2) == 0 {
            (&self.endpoints.0, &self.endpoints.1)
        } else {
            (&self.endpoints.1, &self.endpoints.0)
        };
        let pick = cycle.rem_euclid(4) as usize;

        RawTrip {
            id: Some(format!("SIM-{slot}-{cycle}")),
            driver: Some(plan.driver.to_string()),
            origin: Some(from.label().to_string()),
            destination: Some(to.label().to_string()),
            origin_coord: Some(format!("{:.6}, {:.6}", from.lat(), from.lng())),
            destination_coord: Some(format!("{:.6}, {:.6}", to.lat(), to.lng())),
            start_time: Some(RawTimestamp::Millis(start_ms)),
            avg_duration: Some(RawDuration::Text(hms(plan.duration_sec))),
            cargo: Some(CARGO[pick % CARGO.len()].to_string()),
            temperature: Some(TEMPERATURES[pick % TEMPERATURES.len()].to_string()),
            ..RawTrip::default()
        }
    }
}

#[async_trait]
impl TripSource for SyntheticSource {
    fn name(&self) -> &str {
        "synthetic"
    }

    async fn fetch(&self, now_ms: i64) -> Result<Vec<RawTrip>, SourceError> {
        Ok(self.trips_at(now_ms))
    }

    fn is_synthetic(&self) -> bool {
        true
    }
}

fn hms(secs: u64) -> String {
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::CoordinateResolver;
    use crate::registry::{parse_duration, RegistryBuilder};

    const NOW: i64 = 1_700_000_000_000;

    fn source(config: SyntheticConfig) -> SyntheticSource {
        SyntheticSource::new(
            config,
            Coordinate::new(36.9921, 127.0857, "LG").expect("valid"),
            Coordinate::new(37.2636, 127.0286, "선진화").expect("valid"),
        )
    }

    #[test]
    fn test_hms() {
        assert_eq!(hms(0), "00:00:00");
        assert_eq!(hms(3725), "01:02:05");
    }

    #[test]
    fn test_huge_spans_are_clamped() {
        let s = source(
            SyntheticConfig::default()
                .with_duration_range(u64::MAX - 1, u64::MAX)
                .with_dwell(u64::MAX),
        );
        let trips = s.trips_at(NOW);
        assert_eq!(trips.len(), 6);
        let secs = parse_duration(trips[0].avg_duration.as_ref().expect("set")).expect("valid");
        assert_eq!(secs, MAX_SYNTHETIC_SPAN_SEC as f64);
    }

    #[test]
    fn test_same_seed_same_fleet() {
        let a = source(SyntheticConfig::default()).trips_at(NOW);
        let b = source(SyntheticConfig::default()).trips_at(NOW);
        assert_eq!(a, b);
    }

    #[test]
    fn test_ids_stable_within_trip() {
        let s = source(
            SyntheticConfig::default()
                .with_fleet_size(1)
                .with_duration_range(1200, 1200),
        );
        let start = match s.trips_at(NOW)[0].start_time {
            Some(RawTimestamp::Millis(ms)) => ms,
            _ => panic!("millis expected"),
        };
        assert!(start <= NOW && NOW - start < 1_500_000);

        let id = s.trips_at(start)[0].id.clone();
        assert_eq!(s.trips_at(start + 1_499_999)[0].id, id);
        assert_ne!(s.trips_at(start + 1_500_000)[0].id, id);
    }

    #[test]
    fn test_direction_alternates() {
        let s = source(
            SyntheticConfig::default()
                .with_fleet_size(1)
                .with_duration_range(600, 600)
                .with_dwell(0),
        );
        let a = &s.trips_at(NOW)[0];
        let b = &s.trips_at(NOW + 600_000)[0];
        assert_ne!(a.id, b.id);
        assert_eq!(a.origin, b.destination);
        assert_eq!(a.destination, b.origin);
    }

    #[test]
    fn test_durations_in_range() {
        let s = source(SyntheticConfig::default().with_fleet_size(20));
        for trip in s.trips_at(NOW) {
            let d = parse_duration(trip.avg_duration.as_ref().expect("set")).expect("valid");
            assert!((1200.0..=3600.0).contains(&d));
        }
    }

    #[test]
    fn test_records_normalize_to_endpoints() {
        let s = source(SyntheticConfig::default());
        let vehicles =
            RegistryBuilder::new(CoordinateResolver::default()).build(&s.trips_at(NOW), NOW);
        assert_eq!(vehicles.len(), 6);
        for v in &vehicles {
            assert!(v.start().label() == "LG" || v.start().label() == "선진화");
            let lat = v.start().lat();
            assert!((lat - 36.9921).abs() < 1e-6 || (lat - 37.2636).abs() < 1e-6);
        }
    }

    #[test]
    fn test_empty_fleet() {
        let s = source(SyntheticConfig::default().with_fleet_size(0));
        assert_eq!(s.fleet_size(), 0);
        assert!(s.trips_at(NOW).is_empty());
    }

    #[test]
    fn test_inverted_range_is_repaired() {
        let s = source(SyntheticConfig::default().with_duration_range(900, 100));
        for trip in s.trips_at(NOW) {
            assert_eq!(trip.avg_duration, Some(RawDuration::Text("00:15:00".into())));
        }
    }
}
