//! Per-tick evaluation: pure functions of a snapshot and an instant.
//!
//! - [`interpolate`] / [`progress`] — straight-line position from elapsed time
//! - [`classify`] — Moving / Delayed / Arrived
//! - [`select_focus`] — one featured vehicle per direction group
//! - [`average_duration_by_group`] — measured-or-default duration statistics
//! - [`build_frame`] — everything above assembled into a [`Frame`]
//! - [`pick_incident_target`] — random target for simulated incidents

mod classify;
mod focus;
mod frame;
mod incident;
mod interpolate;
mod stats;

pub use classify::{classify, evaluate_all, VehicleState};
pub use focus::{select_focus, GroupBy};
pub use frame::{build_frame, frame_from_payload, summarize, Frame, FrameSettings};
pub use incident::{pick_incident_target, DEFAULT_INCIDENT_DELAY_SEC};
pub use interpolate::{interpolate, progress, Position};
pub use stats::{average_duration_by_group, DurationEstimate};
