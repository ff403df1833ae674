//! Scheduling: the tick loop, the refresh loop and their seams.
//!
//! - [`TrackingService`] / [`TrackingHandle`] — start, control and stop the engine
//! - [`Refresher`] — one registry refresh, with fallback and delay carry-over
//! - [`Clock`] — wall-clock seam ([`SystemClock`], [`ManualClock`])
//! - [`MarkerSink`] / [`DetailSink`] — output collaborators

mod clock;
mod refresh;
mod service;
mod sink;

pub use clock::{Clock, ManualClock, SystemClock};
pub use refresh::{RefreshOutcome, RefreshStatus, Refresher};
pub use service::{TrackingHandle, TrackingService};
pub use sink::{DetailSink, LogSink, MarkerSink, NullSink};
