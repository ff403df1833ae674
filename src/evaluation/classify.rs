//! Lifecycle classification.

use serde::Serialize;

use crate::models::{LifecycleState, Vehicle};

use super::interpolate::{interpolate, Position};

/// Classifies a vehicle from its progress and the external arrived flag.
///
/// `Arrived` wins whenever either signal says so; otherwise any accumulated
/// delay makes the vehicle `Delayed`.
///
/// # Examples
///
/// ```
/// use u_fleet::geo::Coordinate;
/// use u_fleet::models::{LifecycleState, Vehicle};
/// use u_fleet::evaluation::classify;
///
/// let v = Vehicle::new(
///     "T-1",
///     Coordinate::new(37.0, 127.0, "A").unwrap(),
///     Coordinate::new(37.2, 127.2, "B").unwrap(),
///     600.0,
///     0,
/// ).unwrap();
/// assert_eq!(classify(&v, 0.4, false), LifecycleState::Moving);
/// assert_eq!(classify(&v, 1.0, false), LifecycleState::Arrived);
/// assert_eq!(classify(&v, 0.1, true), LifecycleState::Arrived);
/// ```
pub fn classify(vehicle: &Vehicle, progress: f64, external_arrived: bool) -> LifecycleState {
    if external_arrived || progress >= 1.0 {
        LifecycleState::Arrived
    } else if vehicle.delay_sec() > 0.0 {
        LifecycleState::Delayed
    } else {
        LifecycleState::Moving
    }
}

/// A vehicle evaluated at one instant: position plus classification.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct VehicleState<'a> {
    /// The underlying entity.
    pub vehicle: &'a Vehicle,
    /// Interpolated position.
    pub position: Position,
    /// Lifecycle state at this instant.
    pub state: LifecycleState,
}

impl<'a> VehicleState<'a> {
    /// Interpolates and classifies `vehicle` at `now_ms`.
    pub fn evaluate(vehicle: &'a Vehicle, now_ms: i64) -> Self {
        let position = interpolate(vehicle, now_ms);
        let state = classify(vehicle, position.progress, vehicle.arrived_signal());
        Self {
            vehicle,
            position,
            state,
        }
    }

    /// Progress shortcut.
    pub fn progress(&self) -> f64 {
        self.position.progress
    }

    /// Returns `true` if the vehicle may be featured in a detail view.
    pub fn is_focus_eligible(&self) -> bool {
        self.state != LifecycleState::Arrived && self.position.progress < 1.0
    }
}

/// Evaluates every vehicle at `now_ms`.
pub fn evaluate_all(vehicles: &[Vehicle], now_ms: i64) -> Vec<VehicleState<'_>> {
    vehicles
        .iter()
        .map(|v| VehicleState::evaluate(v, now_ms))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::Coordinate;

    fn vehicle() -> Vehicle {
        Vehicle::new(
            "T",
            Coordinate::new(37.0, 127.0, "A").expect("valid"),
            Coordinate::new(37.1, 127.1, "B").expect("valid"),
            1000.0,
            0,
        )
        .expect("valid")
    }

    #[test]
    fn test_classify_moving_and_delayed() {
        let v = vehicle();
        assert_eq!(classify(&v, 0.5, false), LifecycleState::Moving);
        let d = v.delayed_by(10.0).expect("valid");
        assert_eq!(classify(&d, 0.5, false), LifecycleState::Delayed);
    }

    #[test]
    fn test_classify_arrived_regardless_of_delay() {
        let d = vehicle().delayed_by(10.0).expect("valid");
        assert_eq!(classify(&d, 1.0, false), LifecycleState::Arrived);
        assert_eq!(classify(&d, 0.2, true), LifecycleState::Arrived);
    }

    #[test]
    fn test_classify_ignores_seeded_state() {
        let v = vehicle().with_lifecycle_state(LifecycleState::Arrived);
        assert_eq!(classify(&v, 0.5, false), LifecycleState::Moving);
    }

    #[test]
    fn test_evaluate() {
        let v = vehicle();
        let s = VehicleState::evaluate(&v, 500_000);
        assert!((s.progress() - 0.5).abs() < 1e-12);
        assert_eq!(s.state, LifecycleState::Moving);
        assert!(s.is_focus_eligible());

        let done = VehicleState::evaluate(&v, 1_000_000);
        assert_eq!(done.state, LifecycleState::Arrived);
        assert!(!done.is_focus_eligible());
    }

    #[test]
    fn test_evaluate_all() {
        let vs = vec![vehicle(), vehicle()];
        assert_eq!(evaluate_all(&vs, 0).len(), 2);
    }
}
