//! Derived per-tick projections handed to collaborators.
//!
//! Renderers and detail panels only ever see these types, never
//! [`Vehicle`](super::Vehicle) itself.

use serde::{Deserialize, Serialize};

use super::LifecycleState;

/// How a marker should be drawn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum RenderHint {
    /// Static facility (depot, plant, hub).
    Facility,
    /// A vehicle on or at the end of its route.
    Vehicle {
        /// Current lifecycle state (icon selector).
        state: LifecycleState,
        /// Initial bearing from start to destination, degrees from north.
        heading_deg: f64,
        /// `true` when travelling westward; sprite-based renderers mirror
        /// the icon horizontally.
        flip: bool,
    },
}

/// One point on the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Marker {
    /// Vehicle or facility id.
    pub id: String,
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lng: f64,
    /// Trip progress in [0, 1]; 0 for facilities.
    pub progress: f64,
    /// Whether this vehicle is the focus of its direction group.
    pub is_focused: bool,
    /// Drawing hint.
    pub render_hint: RenderHint,
}

impl Marker {
    /// Returns `true` for facility markers.
    pub fn is_facility(&self) -> bool {
        matches!(self.render_hint, RenderHint::Facility)
    }
}

/// Read-only detail panel content for a focused vehicle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FocusSummary {
    /// Focused vehicle.
    pub vehicle_id: String,
    /// Start label.
    pub departure_label: String,
    /// Destination label.
    pub arrival_label: String,
    /// Progress as a percentage in [0, 100].
    pub progress_percent: f64,
    /// Expected arrival, epoch milliseconds.
    #[serde(rename = "etaTimestamp")]
    pub eta_timestamp_ms: i64,
    /// Seconds until the expected arrival, never negative.
    pub remaining_seconds: f64,
    /// Remaining route distance in kilometres.
    pub remaining_km: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_hint_json_shape() {
        let hint = RenderHint::Vehicle {
            state: LifecycleState::Delayed,
            heading_deg: 90.0,
            flip: false,
        };
        let json = serde_json::to_value(&hint).expect("serializable");
        assert_eq!(json["kind"], "vehicle");
        assert_eq!(json["state"], "delayed");
        assert_eq!(json["headingDeg"], 90.0);

        let facility = serde_json::to_value(RenderHint::Facility).expect("serializable");
        assert_eq!(facility["kind"], "facility");
    }

    #[test]
    fn test_summary_field_names() {
        let s = FocusSummary {
            vehicle_id: "T-1".into(),
            departure_label: "A".into(),
            arrival_label: "B".into(),
            progress_percent: 50.0,
            eta_timestamp_ms: 1_000,
            remaining_seconds: 1.0,
            remaining_km: 2.0,
        };
        let json = serde_json::to_value(&s).expect("serializable");
        assert_eq!(json["vehicleId"], "T-1");
        assert_eq!(json["etaTimestamp"], 1_000);
        assert_eq!(json["remainingKm"], 2.0);
    }

    #[test]
    fn test_is_facility() {
        let m = Marker {
            id: "F".into(),
            lat: 0.0,
            lng: 0.0,
            progress: 0.0,
            is_focused: false,
            render_hint: RenderHint::Facility,
        };
        assert!(m.is_facility());
    }
}
