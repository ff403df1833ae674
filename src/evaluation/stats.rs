//! Per-group duration statistics.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::Vehicle;

use super::classify::VehicleState;

/// Average trip duration for a group, tagged with its provenance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum DurationEstimate {
    /// Averaged over vehicles currently on the road.
    Measured {
        /// Mean effective duration in seconds.
        avg_sec: f64,
        /// Number of vehicles averaged.
        samples: usize,
    },
    /// No vehicle on the road; the configured default is reported.
    Default {
        /// The default duration in seconds.
        avg_sec: f64,
    },
}

impl DurationEstimate {
    /// The duration regardless of provenance.
    pub fn avg_sec(&self) -> f64 {
        match *self {
            DurationEstimate::Measured { avg_sec, .. } | DurationEstimate::Default { avg_sec } => {
                avg_sec
            }
        }
    }

    /// Returns `true` for a measured value.
    pub fn is_measured(&self) -> bool {
        matches!(self, DurationEstimate::Measured { .. })
    }
}

/// Average effective duration of moving (or delayed) vehicles per group.
///
/// Groups whose vehicles have all arrived report
/// [`DurationEstimate::Default`] with `default_sec`.
pub fn average_duration_by_group<F>(
    states: &[VehicleState<'_>],
    grouping_key: F,
    default_sec: f64,
) -> BTreeMap<String, DurationEstimate>
where
    F: Fn(&Vehicle) -> String,
{
    let mut sums: BTreeMap<String, (f64, usize)> = BTreeMap::new();
    for s in states {
        let entry = sums.entry(grouping_key(s.vehicle)).or_insert((0.0, 0));
        if s.state.is_moving() {
            entry.0 += s.vehicle.effective_duration_sec();
            entry.1 += 1;
        }
    }

    sums.into_iter()
        .map(|(group, (sum, n))| {
            let estimate = if n == 0 {
                DurationEstimate::Default {
                    avg_sec: default_sec,
                }
            } else {
                DurationEstimate::Measured {
                    avg_sec: sum / n as f64,
                    samples: n,
                }
            };
            (group, estimate)
        })
        .collect()
}
