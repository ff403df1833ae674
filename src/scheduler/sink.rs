//! Output collaborators.
//!
//! The map renderer and the detail panel live outside this crate. They are
//! reached through two narrow traits, called once per tick from the tick
//! loop; implementations must return quickly.

use std::collections::BTreeMap;

use tracing::{debug, trace};

use crate::models::{FocusSummary, Marker};
use crate::registry::SourceMode;

/// Receives the full marker list every tick.
pub trait MarkerSink: Send + Sync {
    /// Replaces whatever was shown with `markers`.
    fn publish_markers(&self, markers: &[Marker], mode: &SourceMode);
}

/// Receives the focus summaries every tick.
pub trait DetailSink: Send + Sync {
    /// Replaces the detail panels; `None` hides a group's panel.
    fn publish_focus(&self, focus: &BTreeMap<String, Option<FocusSummary>>);
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl MarkerSink for NullSink {
    fn publish_markers(&self, _markers: &[Marker], _mode: &SourceMode) {}
}

impl DetailSink for NullSink {
    fn publish_focus(&self, _focus: &BTreeMap<String, Option<FocusSummary>>) {}
}

/// Writes output to the `tracing` log.
///
/// Markers go out at `trace`, focus summaries at `debug`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl MarkerSink for LogSink {
    fn publish_markers(&self, markers: &[Marker], mode: &SourceMode) {
        for m in markers {
            trace!(
                id = %m.id,
                lat = m.lat,
                lng = m.lng,
                progress = m.progress,
                focused = m.is_focused,
                "marker"
            );
        }
        trace!(count = markers.len(), mode = %mode, "markers published");
    }
}

impl DetailSink for LogSink {
    fn publish_focus(&self, focus: &BTreeMap<String, Option<FocusSummary>>) {
        for (group, summary) in focus {
            match summary {
                Some(s) => debug!(
                    group = %group,
                    vehicle = %s.vehicle_id,
                    progress_percent = s.progress_percent,
                    remaining_seconds = s.remaining_seconds,
                    remaining_km = s.remaining_km,
                    "focus"
                ),
                None => debug!(group = %group, "no vehicle in focus"),
            }
        }
    }
}
