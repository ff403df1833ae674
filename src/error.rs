//! Error types.

use std::time::Duration;

use thiserror::Error;

/// Rejected vehicle construction.
///
/// These are invariant violations: the registry builder repairs them before
/// calling [`Vehicle::new`](crate::models::Vehicle::new), so seeing one at
/// runtime means a caller bypassed normalization.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum VehicleError {
    /// The vehicle id is empty.
    #[error("vehicle id must not be empty")]
    EmptyId,
    /// Base duration is not a positive finite number.
    #[error("base duration must be positive and finite (got {value})")]
    InvalidDuration {
        /// Offending value in seconds.
        value: f64,
    },
    /// Delay is negative or non-finite.
    #[error("delay must be non-negative and finite (got {value})")]
    InvalidDelay {
        /// Offending value in seconds.
        value: f64,
    },
}

/// Failure to obtain raw trip records from a data source.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Transport-level failure.
    #[error("request failed: {0}")]
    Request(String),
    /// The source did not answer in time.
    #[error("source timed out after {0:?}")]
    Timeout(Duration),
    /// The payload is not valid JSON.
    #[error("malformed payload: {0}")]
    Parse(#[from] serde_json::Error),
    /// The payload is JSON but not a list of trips.
    #[error("unexpected payload shape: {0}")]
    Shape(String),
}

/// Errors returned by the running tracking service.
#[derive(Debug, Error)]
pub enum TrackingError {
    /// No vehicle with this id exists in the current snapshot.
    #[error("unknown vehicle: {0}")]
    UnknownVehicle(String),
    /// The vehicle has already arrived and can no longer be delayed.
    #[error("vehicle {0} has already arrived")]
    VehicleArrived(String),
    /// Delay injections must be positive and finite.
    #[error("delay must be positive and finite (got {0})")]
    InvalidDelay(f64),
    /// Replacement entity construction failed.
    #[error(transparent)]
    Vehicle(#[from] VehicleError),
    /// The service has been stopped.
    #[error("tracking service is stopped")]
    Stopped,
}

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("cannot read config: {0}")]
    Io(#[from] std::io::Error),
    /// The config is not valid JSON for [`EngineConfig`](crate::config::EngineConfig).
    #[error("cannot parse config: {0}")]
    Parse(#[from] serde_json::Error),
    /// A field holds an unusable value.
    #[error("invalid config field `{field}`: {reason}")]
    Invalid {
        /// Field name.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(
            VehicleError::InvalidDuration { value: 0.0 }.to_string(),
            "base duration must be positive and finite (got 0)"
        );
        assert_eq!(
            TrackingError::UnknownVehicle("T-1".into()).to_string(),
            "unknown vehicle: T-1"
        );
        let e = ConfigError::Invalid {
            field: "tick_interval_ms",
            reason: "must be positive".into(),
        };
        assert_eq!(
            e.to_string(),
            "invalid config field `tick_interval_ms`: must be positive"
        );
    }

    #[test]
    fn test_vehicle_error_converts() {
        let e: TrackingError = VehicleError::EmptyId.into();
        assert!(matches!(e, TrackingError::Vehicle(VehicleError::EmptyId)));
    }
}
