//! Focus selection: which vehicle per direction gets the detail panel.
//!
//! # Rule
//!
//! Within each group, among vehicles that are not arrived and have
//! `progress < 1`, pick the highest progress (closest to arrival). Ties go to
//! the earliest `start_time_ms`, then to the smallest id, so the result is a
//! pure function of the snapshot and the instant.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::Vehicle;

use super::classify::VehicleState;

/// How vehicles are partitioned into direction groups.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupBy {
    /// By origin label (direction of travel).
    #[default]
    Origin,
    /// By destination label.
    Destination,
    /// By `origin → destination` pair.
    Route,
}

impl GroupBy {
    /// Group key for `vehicle`.
    pub fn key(&self, vehicle: &Vehicle) -> String {
        match self {
            GroupBy::Origin => vehicle.start().label().to_string(),
            GroupBy::Destination => vehicle.destination().label().to_string(),
            GroupBy::Route => format!(
                "{} → {}",
                vehicle.start().label(),
                vehicle.destination().label()
            ),
        }
    }
}

/// Selects the focus vehicle id per group.
///
/// Every group that has at least one vehicle in `states` appears in the
/// result; groups without an eligible vehicle map to `None`.
///
/// # Examples
///
/// ```
/// use u_fleet::geo::Coordinate;
/// use u_fleet::models::Vehicle;
/// use u_fleet::evaluation::{evaluate_all, select_focus, GroupBy};
///
/// let a = Coordinate::new(37.0, 127.0, "Plant").unwrap();
/// let b = Coordinate::new(37.2, 127.2, "Port").unwrap();
/// let now = 1_000_000;
/// let fleet = vec![
///     Vehicle::new("slow", a.clone(), b.clone(), 1000.0, now - 300_000).unwrap(),
///     Vehicle::new("fast", a.clone(), b.clone(), 1000.0, now - 700_000).unwrap(),
/// ];
/// let states = evaluate_all(&fleet, now);
/// let focus = select_focus(&states, |v| GroupBy::Origin.key(v));
/// assert_eq!(focus["Plant"].as_deref(), Some("fast"));
/// ```
pub fn select_focus<F>(
    states: &[VehicleState<'_>],
    grouping_key: F,
) -> BTreeMap<String, Option<String>>
where
    F: Fn(&Vehicle) -> String,
{
    let mut best: BTreeMap<String, Option<&VehicleState<'_>>> = BTreeMap::new();

    for state in states {
        let slot = best.entry(grouping_key(state.vehicle)).or_insert(None);
        if !state.is_focus_eligible() {
            continue;
        }
        let replace = match *slot {
            Some(current) => compare(state, current) == Ordering::Greater,
            None => true,
        };
        if replace {
            *slot = Some(state);
        }
    }

    best.into_iter()
        .map(|(group, s)| (group, s.map(|s| s.vehicle.id().to_string())))
        .collect()
}

/// `Greater` means `a` is the better focus candidate.
fn compare(a: &VehicleState<'_>, b: &VehicleState<'_>) -> Ordering {
    a.progress()
        .total_cmp(&b.progress())
        .then_with(|| b.vehicle.start_time_ms().cmp(&a.vehicle.start_time_ms()))
        .then_with(|| b.vehicle.id().cmp(a.vehicle.id()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::evaluate_all;
    use crate::geo::Coordinate;

    const NOW: i64 = 10_000_000;

    fn vehicle(id: &str, origin: &str, start_ms: i64, duration: f64) -> Vehicle {
        Vehicle::new(
            id,
            Coordinate::new(37.0, 127.0, origin).expect("valid"),
            Coordinate::new(37.2, 127.2, "Dest").expect("valid"),
            duration,
            start_ms,
        )
        .expect("valid")
    }

    fn origin(v: &Vehicle) -> String {
        GroupBy::Origin.key(v)
    }

    #[test]
    fn test_highest_progress_wins() {
        // progress 0.3 vs 0.7
        let fleet = vec![
            vehicle("p30", "A", NOW - 300_000, 1000.0),
            vehicle("p70", "A", NOW - 700_000, 1000.0),
        ];
        let focus = select_focus(&evaluate_all(&fleet, NOW), origin);
        assert_eq!(focus.len(), 1);
        assert_eq!(focus["A"].as_deref(), Some("p70"));
    }

    #[test]
    fn test_tie_goes_to_earlier_start() {
        // both at progress 0.5, different durations
        let fleet = vec![
            vehicle("late", "A", NOW - 500_000, 1000.0),
            vehicle("early", "A", NOW - 1_000_000, 2000.0),
        ];
        let focus = select_focus(&evaluate_all(&fleet, NOW), origin);
        assert_eq!(focus["A"].as_deref(), Some("early"));
    }

    #[test]
    fn test_full_tie_goes_to_smaller_id() {
        let fleet = vec![
            vehicle("b", "A", NOW - 500_000, 1000.0),
            vehicle("a", "A", NOW - 500_000, 1000.0),
        ];
        let forward = select_focus(&evaluate_all(&fleet, NOW), origin);
        let reversed: Vec<Vehicle> = fleet.into_iter().rev().collect();
        let backward = select_focus(&evaluate_all(&reversed, NOW), origin);
        assert_eq!(forward["A"].as_deref(), Some("a"));
        assert_eq!(forward, backward);
    }

    #[test]
    fn test_arrived_excluded_and_empty_group_is_none() {
        let fleet = vec![
            vehicle("done", "A", NOW - 2_000_000, 1000.0),
            vehicle("signal", "A", NOW, 1000.0).with_arrived_signal(true),
            vehicle("b1", "B", NOW - 100_000, 1000.0),
        ];
        let focus = select_focus(&evaluate_all(&fleet, NOW), origin);
        assert_eq!(focus["A"], None);
        assert_eq!(focus["B"].as_deref(), Some("b1"));
    }

    #[test]
    fn test_groups_are_independent() {
        let fleet = vec![
            vehicle("a1", "A", NOW - 100_000, 1000.0),
            vehicle("b1", "B", NOW - 900_000, 1000.0),
            vehicle("a2", "A", NOW - 200_000, 1000.0),
        ];
        let focus = select_focus(&evaluate_all(&fleet, NOW), origin);
        assert_eq!(focus["A"].as_deref(), Some("a2"));
        assert_eq!(focus["B"].as_deref(), Some("b1"));
    }

    #[test]
    fn test_not_yet_started_is_eligible() {
        let fleet = vec![vehicle("future", "A", NOW + 60_000, 1000.0)];
        let focus = select_focus(&evaluate_all(&fleet, NOW), origin);
        assert_eq!(focus["A"].as_deref(), Some("future"));
    }

    #[test]
    fn test_group_by_keys() {
        let v = vehicle("x", "Plant", 0, 10.0);
        assert_eq!(GroupBy::Origin.key(&v), "Plant");
        assert_eq!(GroupBy::Destination.key(&v), "Dest");
        assert_eq!(GroupBy::Route.key(&v), "Plant → Dest");
    }

    #[test]
    fn test_empty_input() {
        assert!(select_focus(&[], origin).is_empty());
    }
}
