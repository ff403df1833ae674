//! Simulated traffic incidents.

use rand::Rng;

use crate::models::Vehicle;

use super::classify::VehicleState;

/// Delay a simulated incident adds, in seconds (15 minutes).
pub const DEFAULT_INCIDENT_DELAY_SEC: f64 = 900.0;

/// Picks a random vehicle that is currently on the road to receive an
/// incident delay.
///
/// Vehicles that have not departed yet or have arrived are never picked.
/// Returns `None` if no vehicle qualifies.
pub fn pick_incident_target<'a, R: Rng + ?Sized>(
    states: &[VehicleState<'a>],
    rng: &mut R,
) -> Option<&'a Vehicle> {
    let candidates: Vec<&'a Vehicle> = states
        .iter()
        .filter(|s| s.is_focus_eligible() && s.progress() > 0.0)
        .map(|s| s.vehicle)
        .collect();
    if candidates.is_empty() {
        return None;
    }
    let i = rng.random_range(0..candidates.len());
    Some(candidates[i])
}
