//! Injected delays that must survive registry refreshes.
//!
//! A refresh rebuilds every vehicle from source records, which know nothing
//! about delays injected locally. The ledger remembers the total delay per
//! trip id and re-applies it, so `delay_sec` never decreases across swaps.

use std::collections::HashMap;

use tracing::{debug, info};

use crate::error::TrackingError;
use crate::evaluation::{classify, progress};
use crate::models::{LifecycleState, Vehicle};

use super::RegistrySnapshot;

/// Total injected delay per vehicle id.
#[derive(Debug, Clone, Default)]
pub struct DelayLedger {
    delays: HashMap<String, f64>,
}

impl DelayLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded total delay for `id`, if any.
    pub fn delay_for(&self, id: &str) -> Option<f64> {
        self.delays.get(id).copied()
    }

    /// Number of tracked ids.
    pub fn len(&self) -> usize {
        self.delays.len()
    }

    /// Returns `true` if nothing is tracked.
    pub fn is_empty(&self) -> bool {
        self.delays.is_empty()
    }

    /// Injects `extra_sec` of delay into vehicle `id`.
    ///
    /// Returns the new snapshot (generation + 1) and the replacement vehicle.
    ///
    /// # Errors
    ///
    /// - [`TrackingError::InvalidDelay`] unless `extra_sec` is positive and finite
    /// - [`TrackingError::UnknownVehicle`] if `id` is not in the snapshot
    /// - [`TrackingError::VehicleArrived`] if the vehicle is already arrived at
    ///   `now_ms`
    pub fn inject(
        &mut self,
        snapshot: &RegistrySnapshot,
        id: &str,
        extra_sec: f64,
        now_ms: i64,
    ) -> Result<(RegistrySnapshot, Vehicle), TrackingError> {
        if !extra_sec.is_finite() || extra_sec <= 0.0 {
            return Err(TrackingError::InvalidDelay(extra_sec));
        }
        let current = snapshot
            .get(id)
            .ok_or_else(|| TrackingError::UnknownVehicle(id.to_string()))?;
        let state = classify(current, progress(current, now_ms), current.arrived_signal());
        if state == LifecycleState::Arrived {
            return Err(TrackingError::VehicleArrived(id.to_string()));
        }

        let delayed = current.delayed_by(extra_sec)?;
        let state = classify(&delayed, progress(&delayed, now_ms), delayed.arrived_signal());
        let replacement = delayed.with_lifecycle_state(state);

        let next = snapshot
            .with_replaced(replacement.clone())
            .ok_or_else(|| TrackingError::UnknownVehicle(id.to_string()))?;
        self.delays.insert(id.to_string(), replacement.delay_sec());
        info!(
            id,
            extra_sec,
            total_delay_sec = replacement.delay_sec(),
            "delay injected"
        );
        Ok((next, replacement))
    }

    /// Drops entries whose trip is absent from `vehicles`.
    ///
    /// Call only with an authoritative batch; a fallback fleet says nothing
    /// about which real trips still exist.
    pub fn prune(&mut self, vehicles: &[Vehicle]) {
        let before = self.delays.len();
        self.delays
            .retain(|id, _| vehicles.iter().any(|v| v.id() == id.as_str()));
        if self.delays.len() < before {
            debug!(dropped = before - self.delays.len(), "pruned finished trips from ledger");
        }
    }

    /// Re-applies recorded delays to freshly built vehicles.
    ///
    /// The larger of the source delay and the recorded delay wins. Entries
    /// for trips missing from `vehicles` are kept; see [`DelayLedger::prune`].
    pub fn apply(&self, vehicles: Vec<Vehicle>, now_ms: i64) -> Vec<Vehicle> {
        vehicles
            .into_iter()
            .map(|v| {
                let recorded = match self.delays.get(v.id()) {
                    Some(&recorded) if recorded > v.delay_sec() => recorded,
                    _ => return v,
                };
                match v.clone().with_delay(recorded) {
                    Ok(delayed) => {
                        debug!(id = delayed.id(), delay_sec = recorded, "re-applied delay");
                        let p = progress(&delayed, now_ms);
                        let state = classify(&delayed, p, delayed.arrived_signal());
                        delayed.with_lifecycle_state(state)
                    }
                    Err(_) => v,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::Coordinate;
    use crate::registry::SourceMode;

    const NOW: i64 = 10_000_000;

    fn vehicle(id: &str, start_ms: i64) -> Vehicle {
        Vehicle::new(
            id,
            Coordinate::new(37.0, 127.0, "A").expect("valid"),
            Coordinate::new(37.1, 127.0, "B").expect("valid"),
            1800.0,
            start_ms,
        )
        .expect("valid")
    }

    fn snapshot() -> RegistrySnapshot {
        RegistrySnapshot::new(
            vec![vehicle("moving", NOW - 900_000), vehicle("done", NOW - 3_600_000)],
            SourceMode::Live,
            NOW,
            1,
        )
    }

    #[test]
    fn test_inject_replaces_and_records() {
        let mut ledger = DelayLedger::new();
        let (next, v) = ledger
            .inject(&snapshot(), "moving", 900.0, NOW)
            .expect("valid");
        assert_eq!(v.delay_sec(), 900.0);
        assert_eq!(v.lifecycle_state(), LifecycleState::Delayed);
        assert_eq!(next.generation(), 2);
        assert_eq!(ledger.delay_for("moving"), Some(900.0));
    }

    #[test]
    fn test_inject_accumulates() {
        let mut ledger = DelayLedger::new();
        let (s1, _) = ledger.inject(&snapshot(), "moving", 100.0, NOW).expect("valid");
        let (_, v) = ledger.inject(&s1, "moving", 50.0, NOW).expect("valid");
        assert_eq!(v.delay_sec(), 150.0);
        assert_eq!(ledger.delay_for("moving"), Some(150.0));
    }

    #[test]
    fn test_inject_errors() {
        let mut ledger = DelayLedger::new();
        let s = snapshot();
        assert!(matches!(
            ledger.inject(&s, "moving", 0.0, NOW),
            Err(TrackingError::InvalidDelay(_))
        ));
        assert!(matches!(
            ledger.inject(&s, "ghost", 10.0, NOW),
            Err(TrackingError::UnknownVehicle(_))
        ));
        assert!(matches!(
            ledger.inject(&s, "done", 10.0, NOW),
            Err(TrackingError::VehicleArrived(_))
        ));
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_apply_survives_refresh() {
        let mut ledger = DelayLedger::new();
        ledger.inject(&snapshot(), "moving", 900.0, NOW).expect("valid");

        let rebuilt = vec![vehicle("moving", NOW - 900_000), vehicle("new", NOW)];
        let applied = ledger.apply(rebuilt, NOW);
        assert_eq!(applied[0].delay_sec(), 900.0);
        assert_eq!(applied[0].lifecycle_state(), LifecycleState::Delayed);
        assert_eq!(applied[1].delay_sec(), 0.0);
    }

    #[test]
    fn test_apply_source_delay_wins_when_larger() {
        let mut ledger = DelayLedger::new();
        ledger.inject(&snapshot(), "moving", 100.0, NOW).expect("valid");
        let from_source = vehicle("moving", NOW - 900_000)
            .with_delay(500.0)
            .expect("valid");
        let applied = ledger.apply(vec![from_source], NOW);
        assert_eq!(applied[0].delay_sec(), 500.0);
    }

    #[test]
    fn test_apply_keeps_entries_for_missing_trips() {
        let mut ledger = DelayLedger::new();
        ledger.inject(&snapshot(), "moving", 100.0, NOW).expect("valid");
        let applied = ledger.apply(vec![vehicle("other", NOW)], NOW);
        assert_eq!(applied[0].delay_sec(), 0.0);
        assert_eq!(ledger.delay_for("moving"), Some(100.0));
    }

    #[test]
    fn test_prune_drops_finished_trips() {
        let mut ledger = DelayLedger::new();
        ledger.inject(&snapshot(), "moving", 100.0, NOW).expect("valid");
        ledger.prune(&[vehicle("moving", NOW)]);
        assert_eq!(ledger.len(), 1);
        ledger.prune(&[vehicle("other", NOW)]);
        assert!(ledger.is_empty());
    }
}
