//! Trip data sources.
//!
//! A [`TripSource`] produces raw trip records on demand. The engine never
//! talks to a collaborator directly; it is handed a source at construction.
//!
//! - [`SyntheticSource`] — seeded, deterministic demo fleet
//! - [`StaticSource`] — a fixed document (tests, offline replay)
//! - `HttpSource` — remote JSON endpoint (feature `http`)
//! - [`FallbackSource`] — degrade-to-synthetic policy around any primary

mod fallback;
#[cfg(feature = "http")]
mod http;
mod static_source;
mod synthetic;

use async_trait::async_trait;

use crate::error::SourceError;
use crate::registry::RawTrip;

pub use fallback::{FallbackSource, Fetched};
#[cfg(feature = "http")]
pub use http::HttpSource;
pub use static_source::StaticSource;
pub use synthetic::{SyntheticConfig, SyntheticSource, MAX_SYNTHETIC_SPAN_SEC};

/// Supplies raw trip records.
///
/// Implementations must be cheap to call repeatedly; the refresh loop calls
/// [`fetch`](TripSource::fetch) once per refresh interval.
#[async_trait]
pub trait TripSource: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Fetches the current trip records as of `now_ms`.
    async fn fetch(&self, now_ms: i64) -> Result<Vec<RawTrip>, SourceError>;

    /// Returns `true` if the records are fabricated.
    fn is_synthetic(&self) -> bool {
        false
    }
}
