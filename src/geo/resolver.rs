//! Location descriptor resolution.
//!
//! # Fallback chain
//!
//! 1. An explicit `"lat, lng"` pair, if it parses as two non-zero, finite,
//!    in-range floats.
//! 2. The first landmark whose key is a substring of the input, or whose key
//!    contains the input. Table order decides ties.
//! 3. The default coordinate.
//!
//! Every step labels the result with the raw input so the display never loses
//! the original name, even when precision degrades.

use serde::{Deserialize, Serialize};
use tracing::trace;

use super::Coordinate;

/// Label used when the raw location is blank.
const UNKNOWN_LABEL: &str = "unknown";

/// A named point in the landmark table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    /// Match key (substring-compared against raw locations).
    pub key: String,
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lng: f64,
}

impl Landmark {
    /// Creates a landmark entry.
    pub fn new(key: impl Into<String>, lat: f64, lng: f64) -> Self {
        Self {
            key: key.into(),
            lat,
            lng,
        }
    }

    fn matches(&self, input: &str) -> bool {
        !self.key.is_empty() && (input.contains(self.key.as_str()) || self.key.contains(input))
    }
}

/// Built-in landmark table.
///
/// Order is significant: `"LG1_선진화"` contains both the `LG` and `선진화`
/// keys and must resolve to the LG plant.
pub fn default_landmarks() -> Vec<Landmark> {
    vec![
        Landmark::new("LG", 36.9921, 127.0857),
        Landmark::new("선진화", 37.2636, 127.0286),
        Landmark::new("평택항", 36.9664, 126.8373),
        Landmark::new("인천", 37.4563, 126.7052),
        Landmark::new("부산", 35.1028, 129.0403),
        Landmark::new("본사", 37.4979, 127.0276),
    ]
}

/// Parses an explicit `"lat, lng"` pair.
///
/// Returns `None` unless both components are finite, non-zero and in range.
/// `"0.000000, 0.000000"` is the source's placeholder for "no fix" and is
/// therefore rejected.
///
/// # Examples
///
/// ```
/// use u_fleet::geo::parse_coord_pair;
///
/// assert_eq!(parse_coord_pair("37.5, 127.1"), Some((37.5, 127.1)));
/// assert_eq!(parse_coord_pair("0.000000, 0.000000"), None);
/// assert_eq!(parse_coord_pair("north"), None);
/// ```
pub fn parse_coord_pair(raw: &str) -> Option<(f64, f64)> {
    let mut parts = raw.split(',');
    let lat: f64 = parts.next()?.trim().parse().ok()?;
    let lng: f64 = parts.next()?.trim().parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    if lat == 0.0 || lng == 0.0 {
        return None;
    }
    Coordinate::new(lat, lng, "").map(|c| (c.lat(), c.lng()))
}

/// Resolves raw location descriptors to coordinates. Never fails.
///
/// # Examples
///
/// ```
/// use u_fleet::geo::CoordinateResolver;
///
/// let resolver = CoordinateResolver::default();
///
/// let lg = resolver.resolve("LG1_선진화", None);
/// assert_eq!(lg.label(), "LG1_선진화");
/// assert!((lg.lat() - 36.9921).abs() < 1e-9);
///
/// let explicit = resolver.resolve("Yard 7", Some("37.1, 127.2"));
/// assert_eq!((explicit.lat(), explicit.lng()), (37.1, 127.2));
/// ```
#[derive(Debug, Clone)]
pub struct CoordinateResolver {
    landmarks: Vec<Landmark>,
    default: Coordinate,
}

impl CoordinateResolver {
    /// Creates a resolver from an ordered landmark table and a default point.
    pub fn new(landmarks: Vec<Landmark>, default: Coordinate) -> Self {
        Self { landmarks, default }
    }

    /// Returns the landmark table in match order.
    pub fn landmarks(&self) -> &[Landmark] {
        &self.landmarks
    }

    /// Returns the default ("unknown location") point.
    pub fn default_coordinate(&self) -> &Coordinate {
        &self.default
    }

    /// Resolves a raw location, preferring `explicit_pair` when it is valid.
    pub fn resolve(&self, raw_location: &str, explicit_pair: Option<&str>) -> Coordinate {
        let name = raw_location.trim();
        let label = if name.is_empty() { UNKNOWN_LABEL } else { name };

        if let Some((lat, lng)) = explicit_pair.and_then(parse_coord_pair) {
            return Coordinate { lat, lng, label: label.to_string() };
        }

        if let Some(landmark) = self.lookup(name) {
            if let Some(c) = Coordinate::new(landmark.lat, landmark.lng, label) {
                return c;
            }
        }

        trace!(location = %label, "no landmark match, using default coordinate");
        self.default.relabeled(label)
    }

    /// Returns the first landmark matching `name`, if any.
    pub fn lookup(&self, name: &str) -> Option<&Landmark> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        self.landmarks.iter().find(|l| l.matches(name))
    }

    /// Returns `true` if `coordinate` is this resolver's default point.
    pub fn is_default(&self, coordinate: &Coordinate) -> bool {
        coordinate.lat() == self.default.lat() && coordinate.lng() == self.default.lng()
    }
}

impl Default for CoordinateResolver {
    fn default() -> Self {
        Self::new(default_landmarks(), default_coordinate())
    }
}

/// Seoul City Hall, used when nothing else matches.
pub(crate) fn default_coordinate() -> Coordinate {
    Coordinate {
        lat: 37.5665,
        lng: 126.9780,
        label: UNKNOWN_LABEL.to_string(),
    }
}
