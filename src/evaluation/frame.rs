//! Per-tick frame assembly.
//!
//! A [`Frame`] is everything the collaborators need for one tick: vehicle and
//! facility markers, the focus summary per direction group, and the
//! per-group duration statistics. It is built from a registry snapshot and an
//! instant only, so any tick can be reproduced exactly.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

use crate::config::EngineConfig;
use crate::error::SourceError;
use crate::geo::{initial_bearing_deg, Facility};
use crate::models::{FocusSummary, Marker, RenderHint, Vehicle};
use crate::registry::{
    parse_raw_trips, RegistryBuilder, RegistrySnapshot, SourceMode, DEFAULT_DURATION_SEC,
};

use super::classify::{evaluate_all, VehicleState};
use super::focus::{select_focus, GroupBy};
use super::stats::{average_duration_by_group, DurationEstimate};

/// Static inputs to frame assembly.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameSettings {
    /// Facility markers appended to every frame.
    pub facilities: Vec<Facility>,
    /// Groups reported even when no vehicle belongs to them.
    pub known_groups: Vec<String>,
    /// Direction grouping.
    pub group_by: GroupBy,
    /// Duration reported for groups with nothing on the road.
    pub default_duration_sec: f64,
}

impl FrameSettings {
    /// Extracts frame settings from engine configuration.
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            facilities: config.facilities.clone(),
            known_groups: config.known_groups.clone(),
            group_by: config.group_by,
            default_duration_sec: config.default_duration_sec,
        }
    }
}

impl Default for FrameSettings {
    fn default() -> Self {
        Self {
            facilities: Vec::new(),
            known_groups: Vec::new(),
            group_by: GroupBy::Origin,
            default_duration_sec: DEFAULT_DURATION_SEC,
        }
    }
}

/// The output of one tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Frame {
    /// Instant the frame was computed for, epoch milliseconds.
    pub computed_at_ms: i64,
    /// Generation of the snapshot the frame was computed from.
    pub generation: u64,
    /// Data provenance of that snapshot.
    pub mode: SourceMode,
    /// Vehicle markers followed by facility markers.
    pub markers: Vec<Marker>,
    /// Focus summary per direction group; `None` means no detail panel.
    pub focus: BTreeMap<String, Option<FocusSummary>>,
    /// Average trip duration per direction group.
    pub durations: BTreeMap<String, DurationEstimate>,
}

impl Frame {
    /// A frame with nothing in it, published before the first tick.
    pub fn empty() -> Self {
        Self {
            computed_at_ms: 0,
            generation: 0,
            mode: SourceMode::Live,
            markers: Vec::new(),
            focus: BTreeMap::new(),
            durations: BTreeMap::new(),
        }
    }

    /// Markers that represent vehicles.
    pub fn vehicle_markers(&self) -> impl Iterator<Item = &Marker> {
        self.markers.iter().filter(|m| !m.is_facility())
    }

    /// Marker for `id`, if present.
    pub fn marker(&self, id: &str) -> Option<&Marker> {
        self.markers.iter().find(|m| m.id == id)
    }

    /// Ids of all focused vehicles.
    pub fn focused_ids(&self) -> Vec<&str> {
        self.focus
            .values()
            .flatten()
            .map(|s| s.vehicle_id.as_str())
            .collect()
    }
}

impl Default for Frame {
    fn default() -> Self {
        Self::empty()
    }
}

/// Builds the frame for `snapshot` at `now_ms`.
///
/// # Examples
///
/// ```
/// use u_fleet::evaluation::{build_frame, FrameSettings};
/// use u_fleet::registry::RegistrySnapshot;
///
/// let frame = build_frame(&RegistrySnapshot::empty(), 0, &FrameSettings::default());
/// assert!(frame.markers.is_empty());
/// assert!(frame.focus.is_empty());
/// ```
pub fn build_frame(snapshot: &RegistrySnapshot, now_ms: i64, settings: &FrameSettings) -> Frame {
    let states = evaluate_all(snapshot.vehicles(), now_ms);
    let key = |v: &Vehicle| settings.group_by.key(v);

    let mut focus_ids = select_focus(&states, key);
    for group in &settings.known_groups {
        focus_ids.entry(group.clone()).or_insert(None);
    }

    let focused: HashSet<&str> = focus_ids.values().flatten().map(String::as_str).collect();
    let mut markers = Vec::with_capacity(states.len() + settings.facilities.len());
    markers.extend(
        states
            .iter()
            .map(|s| vehicle_marker(s, focused.contains(s.vehicle.id()))),
    );
    markers.extend(settings.facilities.iter().map(facility_marker));

    let focus = focus_ids
        .into_iter()
        .map(|(group, id)| {
            let summary = id
                .and_then(|id| states.iter().find(|s| s.vehicle.id() == id))
                .map(|s| summarize(s, now_ms));
            (group, summary)
        })
        .collect();

    let mut durations = average_duration_by_group(&states, key, settings.default_duration_sec);
    for group in &settings.known_groups {
        durations
            .entry(group.clone())
            .or_insert(DurationEstimate::Default {
                avg_sec: settings.default_duration_sec,
            });
    }

    Frame {
        computed_at_ms: now_ms,
        generation: snapshot.generation(),
        mode: snapshot.mode().clone(),
        markers,
        focus,
        durations,
    }
}

/// One-shot frame from a raw JSON payload, without a running service.
///
/// Used by stateless front ends that fetch trip data themselves.
///
/// # Errors
///
/// Whatever [`parse_raw_trips`] rejects.
pub fn frame_from_payload(
    payload: &str,
    now_ms: i64,
    config: &EngineConfig,
) -> Result<Frame, SourceError> {
    let records = parse_raw_trips(payload)?;
    let vehicles = RegistryBuilder::from_config(config).build(&records, now_ms);
    let snapshot = RegistrySnapshot::new(vehicles, SourceMode::Live, now_ms, 1);
    Ok(build_frame(
        &snapshot,
        now_ms,
        &FrameSettings::from_config(config),
    ))
}

/// Detail-panel summary for an evaluated vehicle.
pub fn summarize(state: &VehicleState<'_>, now_ms: i64) -> FocusSummary {
    let v = state.vehicle;
    let p = state.progress();
    let eta = v.eta_ms();
    FocusSummary {
        vehicle_id: v.id().to_string(),
        departure_label: v.start().label().to_string(),
        arrival_label: v.destination().label().to_string(),
        progress_percent: p * 100.0,
        eta_timestamp_ms: eta,
        remaining_seconds: eta.saturating_sub(now_ms).max(0) as f64 / 1000.0,
        remaining_km: v.total_distance_km() * (1.0 - p),
    }
}

fn vehicle_marker(state: &VehicleState<'_>, is_focused: bool) -> Marker {
    let v = state.vehicle;
    let (start, dest) = (v.start(), v.destination());
    Marker {
        id: v.id().to_string(),
        lat: state.position.lat,
        lng: state.position.lng,
        progress: state.position.progress,
        is_focused,
        render_hint: RenderHint::Vehicle {
            state: state.state,
            heading_deg: initial_bearing_deg(start.lat(), start.lng(), dest.lat(), dest.lng()),
            flip: dest.lng() < start.lng(),
        },
    }
}

fn facility_marker(facility: &Facility) -> Marker {
    Marker {
        id: facility.id.clone(),
        lat: facility.position.lat(),
        lng: facility.position.lng(),
        progress: 0.0,
        is_focused: false,
        render_hint: RenderHint::Facility,
    }
}
