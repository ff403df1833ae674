//! Immutable registry snapshots.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::Vehicle;

/// Where the vehicles of a snapshot came from.
///
/// Operators use this to tell whether the display shows real data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceMode {
    /// Records from the configured data source.
    Live,
    /// The configured source is itself a synthetic generator.
    Synthetic,
    /// The configured source failed; synthetic data is shown instead.
    Fallback {
        /// Why the primary source was abandoned.
        reason: String,
    },
}

impl SourceMode {
    /// Returns `true` for [`SourceMode::Fallback`].
    pub fn is_fallback(&self) -> bool {
        matches!(self, SourceMode::Fallback { .. })
    }
}

impl fmt::Display for SourceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceMode::Live => f.write_str("live"),
            SourceMode::Synthetic => f.write_str("synthetic"),
            SourceMode::Fallback { reason } => write!(f, "fallback ({reason})"),
        }
    }
}

/// The full set of vehicles valid between two refreshes.
///
/// Snapshots are never modified; changes produce a new snapshot with a
/// higher generation (see [`RegistrySnapshot::with_replaced`]).
///
/// # Examples
///
/// ```
/// use u_fleet::registry::{RegistrySnapshot, SourceMode};
///
/// let empty = RegistrySnapshot::empty();
/// assert!(empty.is_empty());
/// assert_eq!(empty.generation(), 0);
/// assert_eq!(empty.mode(), &SourceMode::Live);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RegistrySnapshot {
    vehicles: Vec<Vehicle>,
    mode: SourceMode,
    built_at_ms: i64,
    generation: u64,
}

impl RegistrySnapshot {
    /// Creates a snapshot.
    pub fn new(
        vehicles: Vec<Vehicle>,
        mode: SourceMode,
        built_at_ms: i64,
        generation: u64,
    ) -> Self {
        Self {
            vehicles,
            mode,
            built_at_ms,
            generation,
        }
    }

    /// A snapshot with no vehicles, used before the first refresh.
    pub fn empty() -> Self {
        Self::new(Vec::new(), SourceMode::Live, 0, 0)
    }

    /// All vehicles.
    pub fn vehicles(&self) -> &[Vehicle] {
        &self.vehicles
    }

    /// Looks up a vehicle by id.
    pub fn get(&self, id: &str) -> Option<&Vehicle> {
        self.vehicles.iter().find(|v| v.id() == id)
    }

    /// Returns `true` if a vehicle with this id exists.
    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Data provenance.
    pub fn mode(&self) -> &SourceMode {
        &self.mode
    }

    /// When the snapshot was built, epoch milliseconds.
    pub fn built_at_ms(&self) -> i64 {
        self.built_at_ms
    }

    /// Monotonic counter, incremented on every swap.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Number of vehicles.
    pub fn len(&self) -> usize {
        self.vehicles.len()
    }

    /// Returns `true` if there are no vehicles.
    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }

    /// Returns a new snapshot where the vehicle sharing `replacement`'s id is
    /// swapped for `replacement`.
    ///
    /// Returns `None` if no such vehicle exists.
    pub fn with_replaced(&self, replacement: Vehicle) -> Option<Self> {
        let pos = self.vehicles.iter().position(|v| v.id() == replacement.id())?;
        let mut vehicles = self.vehicles.clone();
        vehicles[pos] = replacement;
        Some(Self {
            vehicles,
            mode: self.mode.clone(),
            built_at_ms: self.built_at_ms,
            generation: self.generation + 1,
        })
    }
}

impl Default for RegistrySnapshot {
    fn default() -> Self {
        Self::empty()
    }
}
