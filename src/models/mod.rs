//! Domain model types for fleet tracking.
//!
//! Provides the vehicle entity with its lifecycle state and the derived
//! marker and focus-summary projections that collaborators consume.

mod marker;
mod vehicle;

pub use marker::{FocusSummary, Marker, RenderHint};
pub use vehicle::{LifecycleState, Vehicle};
