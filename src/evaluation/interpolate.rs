//! Time-based position interpolation.
//!
//! # Model
//!
//! ```text
//! progress = clamp((now - start_time) / effective_duration, 0, 1)
//! lat      = start.lat + (dest.lat - start.lat) * progress
//! lng      = start.lng + (dest.lng - start.lng) * progress
//! ```
//!
//! Both axes are interpolated independently in degrees. Routes span tens of
//! kilometres, where the straight lat/lng segment and the great circle are
//! visually identical, and fixtures depend on the linear form.
//!
//! Position is always derived from absolute elapsed time, never accumulated
//! per tick, so skipped frames cannot cause drift.

use serde::{Deserialize, Serialize};

use crate::models::Vehicle;

/// Interpolated vehicle position at an instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lng: f64,
    /// Fraction of the trip completed, in [0, 1].
    pub progress: f64,
}

/// Fraction of the trip completed at `now_ms`, clamped to [0, 1].
///
/// # Examples
///
/// ```
/// use u_fleet::geo::Coordinate;
/// use u_fleet::models::Vehicle;
/// use u_fleet::evaluation::progress;
///
/// let now = 1_700_000_000_000;
/// let v = Vehicle::new(
///     "T-1",
///     Coordinate::new(37.0, 127.0, "A").unwrap(),
///     Coordinate::new(37.2, 127.2, "B").unwrap(),
///     1800.0,
///     now - 900_000,
/// ).unwrap();
/// assert!((progress(&v, now) - 0.5).abs() < 1e-12);
/// ```
pub fn progress(vehicle: &Vehicle, now_ms: i64) -> f64 {
    let elapsed_sec = now_ms.saturating_sub(vehicle.start_time_ms()) as f64 / 1000.0;
    (elapsed_sec / vehicle.effective_duration_sec()).clamp(0.0, 1.0)
}

/// Position of `vehicle` at `now_ms`.
///
/// Returns the exact start point at progress 0 and the exact destination at
/// progress 1. A vehicle carrying the source's arrived signal is pinned to
/// its destination.
///
/// # Examples
///
/// ```
/// use u_fleet::geo::Coordinate;
/// use u_fleet::models::Vehicle;
/// use u_fleet::evaluation::interpolate;
///
/// let v = Vehicle::new(
///     "T-1",
///     Coordinate::new(37.0, 127.0, "A").unwrap(),
///     Coordinate::new(37.2, 127.4, "B").unwrap(),
///     100.0,
///     0,
/// ).unwrap();
/// let p = interpolate(&v, 25_000);
/// assert!((p.lat - 37.05).abs() < 1e-9);
/// assert!((p.lng - 127.1).abs() < 1e-9);
/// assert_eq!(interpolate(&v, 100_000).lat, 37.2);
/// ```
pub fn interpolate(vehicle: &Vehicle, now_ms: i64) -> Position {
    let start = vehicle.start();
    let dest = vehicle.destination();

    let p = if vehicle.arrived_signal() {
        1.0
    } else {
        progress(vehicle, now_ms)
    };

    if p <= 0.0 {
        Position {
            lat: start.lat(),
            lng: start.lng(),
            progress: 0.0,
        }
    } else if p >= 1.0 {
        Position {
            lat: dest.lat(),
            lng: dest.lng(),
            progress: 1.0,
        }
    } else {
        Position {
            lat: start.lat() + (dest.lat() - start.lat()) * p,
            lng: start.lng() + (dest.lng() - start.lng()) * p,
            progress: p,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::Coordinate;

    const NOW: i64 = 1_700_000_000_000;

    fn vehicle(start_ms: i64, duration: f64) -> Vehicle {
        Vehicle::new(
            "T",
            Coordinate::new(37.0, 127.0, "A").expect("valid"),
            Coordinate::new(37.3, 126.7, "B").expect("valid"),
            duration,
            start_ms,
        )
        .expect("valid")
    }

    #[test]
    fn test_fifteen_minutes_into_half_hour_trip() {
        let v = vehicle(NOW - 900_000, 1800.0);
        let p = interpolate(&v, NOW);
        assert!((p.progress - 0.5).abs() < 1e-12);
        assert!((p.lat - 37.15).abs() < 1e-9);
        assert!((p.lng - 126.85).abs() < 1e-9);
    }

    #[test]
    fn test_boundaries_are_exact() {
        let v = vehicle(NOW, 1800.0);
        let at_start = interpolate(&v, NOW);
        assert_eq!(at_start.progress, 0.0);
        assert_eq!((at_start.lat, at_start.lng), (37.0, 127.0));

        let at_end = interpolate(&v, NOW + 1_800_000);
        assert_eq!(at_end.progress, 1.0);
        assert_eq!((at_end.lat, at_end.lng), (37.3, 126.7));
        assert_eq!(at_end, interpolate(&v, NOW + 1_800_000));
    }

    #[test]
    fn test_clamped_before_start_and_after_end() {
        let v = vehicle(NOW, 60.0);
        assert_eq!(progress(&v, NOW - 10_000), 0.0);
        assert_eq!(progress(&v, NOW + 3_600_000), 1.0);
    }

    #[test]
    fn test_delay_slows_progress() {
        let v = vehicle(NOW - 900_000, 1800.0);
        let delayed = v.delayed_by(900.0).expect("valid");
        assert!(progress(&delayed, NOW) < progress(&v, NOW));
        assert!((progress(&delayed, NOW) - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_arrived_signal_pins_destination() {
        let v = vehicle(NOW, 1800.0).with_arrived_signal(true);
        let p = interpolate(&v, NOW);
        assert_eq!(p.progress, 1.0);
        assert_eq!((p.lat, p.lng), (37.3, 126.7));
    }
}
