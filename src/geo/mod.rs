//! Geocoordinates and location resolution.
//!
//! Provides the coordinate type shared by every component, great-circle
//! helpers used for display-only metrics, and the resolver that turns raw
//! location descriptors into coordinates.

mod distance;
mod resolver;

pub use distance::{haversine_km, initial_bearing_deg, EARTH_RADIUS_KM};
pub use resolver::{default_landmarks, parse_coord_pair, CoordinateResolver, Landmark};

use serde::{Deserialize, Serialize};

/// A labeled WGS84 point.
///
/// # Examples
///
/// ```
/// use u_fleet::geo::Coordinate;
///
/// let c = Coordinate::new(37.5665, 126.9780, "Seoul").unwrap();
/// assert_eq!(c.label(), "Seoul");
/// assert!(Coordinate::new(91.0, 0.0, "bad").is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    lat: f64,
    lng: f64,
    label: String,
}

impl Coordinate {
    /// Creates a coordinate.
    ///
    /// Returns `None` if either value is non-finite or out of range
    /// (lat ∈ [-90, 90], lng ∈ [-180, 180]).
    pub fn new(lat: f64, lng: f64, label: impl Into<String>) -> Option<Self> {
        let c = Self {
            lat,
            lng,
            label: label.into(),
        };
        c.is_valid().then_some(c)
    }

    /// Returns `true` if latitude and longitude are finite and in range.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }

    /// Latitude in degrees.
    pub fn lat(&self) -> f64 {
        self.lat
    }

    /// Longitude in degrees.
    pub fn lng(&self) -> f64 {
        self.lng
    }

    /// Display label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns a copy of this point carrying a different label.
    pub fn relabeled(&self, label: impl Into<String>) -> Self {
        Self {
            lat: self.lat,
            lng: self.lng,
            label: label.into(),
        }
    }

    /// Great-circle distance to another point in kilometres.
    pub fn distance_km(&self, other: &Coordinate) -> f64 {
        haversine_km(self.lat, self.lng, other.lat, other.lng)
    }
}

/// A static, non-vehicle point that is always rendered (depot, plant, hub).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Facility {
    /// Marker identifier.
    pub id: String,
    /// Facility position; its label is the display name.
    pub position: Coordinate,
}

impl Facility {
    /// Creates a facility.
    pub fn new(id: impl Into<String>, position: Coordinate) -> Self {
        Self {
            id: id.into(),
            position,
        }
    }
}
