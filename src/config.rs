//! Engine configuration.
//!
//! Every field has a default, so a config file only names what it changes:
//!
//! ```json
//! { "refresh_interval_ms": 10000, "http": { "url": "https://example.invalid/trips" } }
//! ```

use std::path::Path;
use std::time::Duration;

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::evaluation::{GroupBy, DEFAULT_INCIDENT_DELAY_SEC};
use crate::geo::{default_landmarks, Coordinate, CoordinateResolver, Facility, Landmark};
use crate::registry::{offset_from_hours, DEFAULT_DURATION_SEC};
use crate::source::{SyntheticConfig, SyntheticSource, MAX_SYNTHETIC_SPAN_SEC};

/// Remote source settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Endpoint returning a JSON array of trip records.
    pub url: String,
}

/// Configuration for the tracking engine.
///
/// # Examples
///
/// ```
/// use u_fleet::config::EngineConfig;
///
/// let config = EngineConfig::default()
///     .with_tick_interval_ms(50)
///     .with_refresh_interval_ms(10_000);
/// assert!(config.validate().is_ok());
/// assert_eq!(config.fetch_timeout().as_millis(), 10_000);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Tick period in milliseconds (~30 Hz by default).
    pub tick_interval_ms: u64,
    /// Refresh period in milliseconds.
    pub refresh_interval_ms: u64,
    /// Fetch timeout in milliseconds; defaults to the refresh interval.
    pub fetch_timeout_ms: Option<u64>,
    /// Trip duration used when a record has none.
    pub default_duration_sec: f64,
    /// Delay added by a simulated incident.
    pub incident_delay_sec: f64,
    /// Offset applied to timestamps without a zone, whole hours east of UTC.
    pub utc_offset_hours: i32,
    /// Direction grouping for focus selection.
    pub group_by: GroupBy,
    /// Groups reported even when empty.
    pub known_groups: Vec<String>,
    /// Static markers.
    pub facilities: Vec<Facility>,
    /// Landmark table override, in match order.
    pub landmarks: Option<Vec<Landmark>>,
    /// Fallback point override.
    pub default_coordinate: Option<Coordinate>,
    /// Synthetic fleet parameters.
    pub synthetic: SyntheticConfig,
    /// Remote source; `None` runs on synthetic data.
    pub http: Option<HttpConfig>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 33,
            refresh_interval_ms: 30_000,
            fetch_timeout_ms: None,
            default_duration_sec: DEFAULT_DURATION_SEC,
            incident_delay_sec: DEFAULT_INCIDENT_DELAY_SEC,
            utc_offset_hours: 9,
            group_by: GroupBy::Origin,
            known_groups: vec!["LG".into(), "선진화".into()],
            facilities: default_facilities(),
            landmarks: None,
            default_coordinate: None,
            synthetic: SyntheticConfig::default(),
            http: None,
        }
    }
}

impl EngineConfig {
    /// Parses a JSON config; missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Parse`] for malformed JSON, [`ConfigError::Invalid`]
    /// if [`validate`](Self::validate) rejects the result.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a JSON config file.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Io`] if the file cannot be read, otherwise as
    /// [`from_json_str`](Self::from_json_str).
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Sets the tick period.
    pub fn with_tick_interval_ms(mut self, ms: u64) -> Self {
        self.tick_interval_ms = ms;
        self
    }

    /// Sets the refresh period.
    pub fn with_refresh_interval_ms(mut self, ms: u64) -> Self {
        self.refresh_interval_ms = ms;
        self
    }

    /// Sets an explicit fetch timeout.
    pub fn with_fetch_timeout_ms(mut self, ms: u64) -> Self {
        self.fetch_timeout_ms = Some(ms);
        self
    }

    /// Sets the default trip duration.
    pub fn with_default_duration_sec(mut self, secs: f64) -> Self {
        self.default_duration_sec = secs;
        self
    }

    /// Sets the simulated incident delay.
    pub fn with_incident_delay_sec(mut self, secs: f64) -> Self {
        self.incident_delay_sec = secs;
        self
    }

    /// Sets the offset for zone-less timestamps.
    pub fn with_utc_offset_hours(mut self, hours: i32) -> Self {
        self.utc_offset_hours = hours;
        self
    }

    /// Sets the direction grouping.
    pub fn with_group_by(mut self, group_by: GroupBy) -> Self {
        self.group_by = group_by;
        self
    }

    /// Sets the always-reported groups.
    pub fn with_known_groups(mut self, groups: Vec<String>) -> Self {
        self.known_groups = groups;
        self
    }

    /// Sets the facility markers.
    pub fn with_facilities(mut self, facilities: Vec<Facility>) -> Self {
        self.facilities = facilities;
        self
    }

    /// Overrides the landmark table.
    pub fn with_landmarks(mut self, landmarks: Vec<Landmark>) -> Self {
        self.landmarks = Some(landmarks);
        self
    }

    /// Overrides the fallback point.
    pub fn with_default_coordinate(mut self, coordinate: Coordinate) -> Self {
        self.default_coordinate = Some(coordinate);
        self
    }

    /// Sets synthetic fleet parameters.
    pub fn with_synthetic(mut self, synthetic: SyntheticConfig) -> Self {
        self.synthetic = synthetic;
        self
    }

    /// Configures a remote source.
    pub fn with_http_url(mut self, url: impl Into<String>) -> Self {
        self.http = Some(HttpConfig { url: url.into() });
        self
    }

    /// Tick period.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Refresh period.
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }

    /// Fetch timeout, bounded by the refresh interval.
    pub fn fetch_timeout(&self) -> Duration {
        let ms = self
            .fetch_timeout_ms
            .unwrap_or(self.refresh_interval_ms)
            .min(self.refresh_interval_ms);
        Duration::from_millis(ms)
    }

    /// Offset for zone-less timestamps.
    pub fn utc_offset(&self) -> FixedOffset {
        offset_from_hours(self.utc_offset_hours)
    }

    /// Builds the coordinate resolver.
    pub fn resolver(&self) -> CoordinateResolver {
        let defaults = CoordinateResolver::default();
        CoordinateResolver::new(
            self.landmarks.clone().unwrap_or_else(default_landmarks),
            self.default_coordinate
                .clone()
                .unwrap_or_else(|| defaults.default_coordinate().clone()),
        )
    }

    /// Builds the synthetic source, shuttling between the first two
    /// facilities. Missing ones are filled from the built-in plant and center.
    pub fn synthetic_source(&self) -> SyntheticSource {
        let fallback = || CoordinateResolver::default().default_coordinate().clone();
        let mut endpoints = self
            .facilities
            .iter()
            .map(|f| f.position.clone())
            .chain(default_facilities().into_iter().map(|f| f.position));
        let a = endpoints.next().unwrap_or_else(fallback);
        let b = endpoints.next().unwrap_or_else(fallback);
        SyntheticSource::new(self.synthetic.clone(), a, b)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_interval_ms == 0 {
            return Err(invalid("tick_interval_ms", "must be positive"));
        }
        if self.refresh_interval_ms == 0 {
            return Err(invalid("refresh_interval_ms", "must be positive"));
        }
        if self.fetch_timeout_ms == Some(0) {
            return Err(invalid("fetch_timeout_ms", "must be positive"));
        }
        if !(self.default_duration_sec.is_finite() && self.default_duration_sec > 0.0) {
            return Err(invalid("default_duration_sec", "must be positive and finite"));
        }
        if !(self.incident_delay_sec.is_finite() && self.incident_delay_sec > 0.0) {
            return Err(invalid("incident_delay_sec", "must be positive and finite"));
        }
        if !(-14..=14).contains(&self.utc_offset_hours) {
            return Err(invalid("utc_offset_hours", "must be within -14..=14"));
        }
        if let Some(f) = self.facilities.iter().find(|f| !f.position.is_valid()) {
            return Err(invalid("facilities", format!("{} is out of range", f.id)));
        }
        if let Some(l) = self
            .landmarks
            .iter()
            .flatten()
            .find(|l| Coordinate::new(l.lat, l.lng, "").is_none())
        {
            return Err(invalid("landmarks", format!("{} is out of range", l.key)));
        }
        if self.default_coordinate.as_ref().is_some_and(|c| !c.is_valid()) {
            return Err(invalid("default_coordinate", "out of range"));
        }
        if self.synthetic.min_duration_sec == 0
            || self.synthetic.min_duration_sec > self.synthetic.max_duration_sec
        {
            return Err(invalid(
                "synthetic",
                "need 0 < min_duration_sec <= max_duration_sec",
            ));
        }
        if self.synthetic.max_duration_sec > MAX_SYNTHETIC_SPAN_SEC
            || self.synthetic.dwell_sec > MAX_SYNTHETIC_SPAN_SEC
        {
            return Err(invalid(
                "synthetic",
                format!("durations and dwell must not exceed {MAX_SYNTHETIC_SPAN_SEC}s"),
            ));
        }
        if self.http.as_ref().is_some_and(|h| h.url.trim().is_empty()) {
            return Err(invalid("http.url", "must not be empty"));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

fn default_facilities() -> Vec<Facility> {
    default_landmarks()
        .into_iter()
        .take(2)
        .filter_map(|l| {
            let id = format!("facility-{}", l.key);
            Coordinate::new(l.lat, l.lng, l.key).map(|c| Facility::new(id, c))
        })
        .collect()
}
