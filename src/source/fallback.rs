//! Degrade-to-synthetic policy.
//!
//! | Primary result             | Outcome                                   |
//! |----------------------------|-------------------------------------------|
//! | records                    | records, [`SourceMode::Live`]             |
//! | error                      | synthetic records, [`SourceMode::Fallback`] |
//! | timeout, previous snapshot | [`Fetched::Stale`] (keep the old one)     |
//! | timeout, nothing yet       | synthetic records, [`SourceMode::Fallback`] |
//!
//! A primary that is itself synthetic reports [`SourceMode::Synthetic`].

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::SourceError;
use crate::registry::{RawTrip, SourceMode};

use super::{SyntheticSource, TripSource};

/// Result of a guarded fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum Fetched {
    /// New records and where they came from.
    Records {
        /// Raw records to normalize.
        records: Vec<RawTrip>,
        /// Provenance of `records`.
        mode: SourceMode,
    },
    /// The primary timed out; the caller should keep its previous snapshot.
    Stale,
}

/// Wraps a primary source with a timeout and a synthetic fallback.
#[derive(Clone)]
pub struct FallbackSource {
    primary: Arc<dyn TripSource>,
    synthetic: SyntheticSource,
    timeout: Option<Duration>,
}

impl FallbackSource {
    /// Creates the policy around `primary`.
    pub fn new(primary: Arc<dyn TripSource>, synthetic: SyntheticSource) -> Self {
        Self {
            primary,
            synthetic,
            timeout: None,
        }
    }

    /// Bounds every primary fetch by `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Name of the primary source.
    pub fn primary_name(&self) -> &str {
        self.primary.name()
    }

    /// Fetches from the primary, degrading per the module table.
    ///
    /// `has_previous` tells whether the caller has a snapshot it could keep.
    pub async fn fetch(&self, now_ms: i64, has_previous: bool) -> Fetched {
        let attempt = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.primary.fetch(now_ms))
                .await
                .unwrap_or(Err(SourceError::Timeout(limit))),
            None => self.primary.fetch(now_ms).await,
        };

        match attempt {
            Ok(records) => {
                let mode = if self.primary.is_synthetic() {
                    SourceMode::Synthetic
                } else {
                    SourceMode::Live
                };
                debug!(source = self.primary.name(), records = records.len(), "fetched");
                Fetched::Records { records, mode }
            }
            Err(SourceError::Timeout(limit)) if has_previous => {
                warn!(
                    source = self.primary.name(),
                    timeout_ms = limit.as_millis() as u64,
                    "fetch timed out, keeping previous snapshot"
                );
                Fetched::Stale
            }
            Err(e) => {
                warn!(
                    source = self.primary.name(),
                    error = %e,
                    "source unavailable, falling back to synthetic fleet"
                );
                Fetched::Records {
                    records: self.synthetic.trips_at(now_ms),
                    mode: SourceMode::Fallback {
                        reason: e.to_string(),
                    },
                }
            }
        }
    }
}

impl std::fmt::Debug for FallbackSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallbackSource")
            .field("primary", &self.primary.name())
            .field("synthetic_fleet", &self.synthetic.fleet_size())
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::Coordinate;
    use crate::source::{StaticSource, SyntheticConfig};
    use async_trait::async_trait;

    struct Failing;

    #[async_trait]
    impl TripSource for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        async fn fetch(&self, _now_ms: i64) -> Result<Vec<RawTrip>, SourceError> {
            Err(SourceError::Request("connection refused".into()))
        }
    }

    struct TimesOut;

    #[async_trait]
    impl TripSource for TimesOut {
        fn name(&self) -> &str {
            "times-out"
        }

        async fn fetch(&self, _now_ms: i64) -> Result<Vec<RawTrip>, SourceError> {
            Err(SourceError::Timeout(Duration::from_secs(30)))
        }
    }

    struct Slow;

    #[async_trait]
    impl TripSource for Slow {
        fn name(&self) -> &str {
            "slow"
        }

        async fn fetch(&self, _now_ms: i64) -> Result<Vec<RawTrip>, SourceError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(Vec::new())
        }
    }

    fn synthetic() -> SyntheticSource {
        SyntheticSource::new(
            SyntheticConfig::default().with_fleet_size(3),
            Coordinate::new(36.9921, 127.0857, "LG").expect("valid"),
            Coordinate::new(37.2636, 127.0286, "선진화").expect("valid"),
        )
    }

    #[tokio::test]
    async fn test_live_records() {
        let primary = StaticSource::from_json(r#"[{"id": "A", "origin": "LG"}]"#).expect("valid");
        let source = FallbackSource::new(Arc::new(primary), synthetic());
        match source.fetch(0, false).await {
            Fetched::Records { records, mode } => {
                assert_eq!(records.len(), 1);
                assert_eq!(mode, SourceMode::Live);
            }
            Fetched::Stale => panic!("expected records"),
        }
    }

    #[tokio::test]
    async fn test_synthetic_primary_mode() {
        let source = FallbackSource::new(Arc::new(synthetic()), synthetic());
        match source.fetch(0, false).await {
            Fetched::Records { mode, .. } => assert_eq!(mode, SourceMode::Synthetic),
            Fetched::Stale => panic!("expected records"),
        }
    }

    #[tokio::test]
    async fn test_error_falls_back() {
        let source = FallbackSource::new(Arc::new(Failing), synthetic());
        match source.fetch(0, true).await {
            Fetched::Records { records, mode } => {
                assert_eq!(records.len(), 3);
                assert!(mode.is_fallback());
                assert!(mode.to_string().contains("connection refused"));
            }
            Fetched::Stale => panic!("errors never keep stale data"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_keeps_previous() {
        let source =
            FallbackSource::new(Arc::new(Slow), synthetic()).with_timeout(Duration::from_secs(5));
        assert_eq!(source.fetch(0, true).await, Fetched::Stale);
    }

    #[tokio::test]
    async fn test_primary_timeout_keeps_previous() {
        let source = FallbackSource::new(Arc::new(TimesOut), synthetic())
            .with_timeout(Duration::from_secs(60));
        assert_eq!(source.fetch(0, true).await, Fetched::Stale);

        let unguarded = FallbackSource::new(Arc::new(TimesOut), synthetic());
        assert_eq!(unguarded.fetch(0, true).await, Fetched::Stale);
        match unguarded.fetch(0, false).await {
            Fetched::Records { mode, .. } => assert!(mode.is_fallback()),
            Fetched::Stale => panic!("nothing to keep"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_without_previous_falls_back() {
        let source =
            FallbackSource::new(Arc::new(Slow), synthetic()).with_timeout(Duration::from_secs(5));
        match source.fetch(0, false).await {
            Fetched::Records { mode, .. } => assert!(mode.is_fallback()),
            Fetched::Stale => panic!("nothing to keep"),
        }
    }
}
