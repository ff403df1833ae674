//! Remote JSON endpoint.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::error::SourceError;
use crate::registry::{parse_raw_trips, RawTrip};

use super::TripSource;

/// Fetches trip records with an HTTP GET.
///
/// The body must be a JSON array of trip records, or an object wrapping one
/// (see [`parse_raw_trips`]).
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl HttpSource {
    /// Creates a source for `url` with a per-request timeout.
    ///
    /// # Errors
    ///
    /// [`SourceError::Request`] if the HTTP client cannot be built.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SourceError::Request(e.to_string()))?;
        Ok(Self {
            client,
            url: url.into(),
            timeout,
        })
    }

    /// The endpoint URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    fn map_error(&self, e: reqwest::Error) -> SourceError {
        if e.is_timeout() {
            SourceError::Timeout(self.timeout)
        } else {
            SourceError::Request(e.to_string())
        }
    }
}

#[async_trait]
impl TripSource for HttpSource {
    fn name(&self) -> &str {
        "http"
    }

    async fn fetch(&self, _now_ms: i64) -> Result<Vec<RawTrip>, SourceError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| self.map_error(e))?;
        let body = response.text().await.map_err(|e| self.map_error(e))?;
        debug!(url = %self.url, bytes = body.len(), "fetched trip payload");
        parse_raw_trips(&body)
    }
}
