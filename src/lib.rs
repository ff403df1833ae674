//! # u-fleet
//!
//! Fleet position simulation and live tracking. Turns sparse delivery records
//! (start time, endpoints, average duration) into continuously moving map
//! markers, and elects one featured vehicle per direction of travel.
//!
//! ## Modules
//!
//! - [`geo`] — Coordinates, great-circle helpers, location resolution
//! - [`models`] — Domain types (Vehicle, Marker, FocusSummary)
//! - [`registry`] — Raw records, normalization, immutable snapshots, delay ledger
//! - [`evaluation`] — Interpolation, classification, focus selection, frames
//! - [`source`] — Trip sources (synthetic, static, HTTP) and fallback policy
//! - [`scheduler`] — Tick and refresh loops behind a start/stop service
//! - [`config`] — Engine configuration
//! - [`error`] — Error types
//!
//! ## Example
//!
//! ```
//! use u_fleet::evaluation::{build_frame, FrameSettings};
//! use u_fleet::geo::CoordinateResolver;
//! use u_fleet::registry::{parse_raw_trips, RegistryBuilder, RegistrySnapshot, SourceMode};
//!
//! let now = 1_700_000_900_000;
//! let raw = parse_raw_trips(r#"[{
//!     "id": "D-1", "origin": "LG1_선진화", "destination": "평택항",
//!     "startTime": 1700000000000, "avgDuration": "00:30:00"
//! }]"#).unwrap();
//!
//! let vehicles = RegistryBuilder::new(CoordinateResolver::default()).build(&raw, now);
//! let snapshot = RegistrySnapshot::new(vehicles, SourceMode::Live, now, 1);
//! let frame = build_frame(&snapshot, now, &FrameSettings::default());
//!
//! let marker = frame.marker("D-1").unwrap();
//! assert!((marker.progress - 0.5).abs() < 1e-9);
//! assert!(marker.is_focused);
//! ```

pub mod config;
pub mod error;
pub mod evaluation;
pub mod geo;
pub mod models;
pub mod registry;
pub mod scheduler;
pub mod source;

#[cfg(feature = "wasm")]
pub mod wasm;
