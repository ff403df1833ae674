//! Fixed-document source.

use async_trait::async_trait;

use crate::error::SourceError;
use crate::registry::{parse_raw_trips, RawTrip};

use super::TripSource;

/// Serves the same records on every fetch.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    records: Vec<RawTrip>,
}

impl StaticSource {
    /// Wraps already-decoded records.
    pub fn from_records(records: Vec<RawTrip>) -> Self {
        Self { records }
    }

    /// Decodes a JSON payload once, up front.
    ///
    /// # Errors
    ///
    /// Whatever [`parse_raw_trips`] rejects.
    pub fn from_json(payload: &str) -> Result<Self, SourceError> {
        Ok(Self::from_records(parse_raw_trips(payload)?))
    }

    /// The served records.
    pub fn records(&self) -> &[RawTrip] {
        &self.records
    }
}

#[async_trait]
impl TripSource for StaticSource {
    fn name(&self) -> &str {
        "static"
    }

    async fn fetch(&self, _now_ms: i64) -> Result<Vec<RawTrip>, SourceError> {
        Ok(self.records.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_serves_payload() {
        let source = StaticSource::from_json(r#"[{"id": "A", "origin": "LG"}]"#).expect("valid");
        let trips = source.fetch(0).await.expect("static never fails");
        assert_eq!(trips.len(), 1);
        assert_eq!(source.records()[0].id.as_deref(), Some("A"));
        assert!(!source.is_synthetic());
    }

    #[test]
    fn test_rejects_bad_payload() {
        assert!(StaticSource::from_json("{").is_err());
    }
}
