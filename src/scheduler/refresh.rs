//! Registry refresh.
//!
//! A [`Refresher`] owns everything a refresh needs: the guarded source, the
//! normalizing builder and the delay ledger. It is driven from a single task,
//! so delay injections and refreshes never interleave.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::error::TrackingError;
use crate::models::Vehicle;
use crate::registry::{DelayLedger, RegistryBuilder, RegistrySnapshot, SourceMode};
use crate::source::{FallbackSource, Fetched, TripSource};

/// What a refresh did.
#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    /// A new snapshot replaces the previous one.
    Swapped(RegistrySnapshot),
    /// The source timed out; the previous snapshot stays in use.
    KeptStale,
}

/// Summary of the snapshot in use after a refresh.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RefreshStatus {
    /// Snapshot generation.
    pub generation: u64,
    /// Number of vehicles.
    pub vehicles: usize,
    /// Data provenance.
    pub mode: SourceMode,
    /// `true` if the refresh failed to replace the snapshot.
    pub kept_stale: bool,
}

impl RefreshStatus {
    /// Status describing `snapshot`.
    pub fn of(snapshot: &RegistrySnapshot, kept_stale: bool) -> Self {
        Self {
            generation: snapshot.generation(),
            vehicles: snapshot.len(),
            mode: snapshot.mode().clone(),
            kept_stale,
        }
    }
}

/// Rebuilds registry snapshots from a source.
#[derive(Debug)]
pub struct Refresher {
    source: FallbackSource,
    builder: RegistryBuilder,
    ledger: DelayLedger,
}

impl Refresher {
    /// Creates a refresher.
    pub fn new(source: FallbackSource, builder: RegistryBuilder) -> Self {
        Self {
            source,
            builder,
            ledger: DelayLedger::new(),
        }
    }

    /// Creates a refresher for `primary` using engine configuration for the
    /// timeout, the synthetic fallback and normalization.
    pub fn from_config(config: &EngineConfig, primary: Arc<dyn TripSource>) -> Self {
        let source = FallbackSource::new(primary, config.synthetic_source())
            .with_timeout(config.fetch_timeout());
        Self::new(source, RegistryBuilder::from_config(config))
    }

    /// Injected delays.
    pub fn ledger(&self) -> &DelayLedger {
        &self.ledger
    }

    /// Fetches and rebuilds.
    ///
    /// The new snapshot's generation is one above `previous`. Recorded delays
    /// are re-applied to trips that still exist. Fallback batches never prune
    /// the ledger, so delays survive a source outage.
    pub async fn refresh(&mut self, previous: &RegistrySnapshot, now_ms: i64) -> RefreshOutcome {
        let has_previous = previous.generation() > 0;
        match self.source.fetch(now_ms, has_previous).await {
            Fetched::Stale => RefreshOutcome::KeptStale,
            Fetched::Records { records, mode } => {
                let built = self.builder.build(&records, now_ms);
                if !mode.is_fallback() {
                    self.ledger.prune(&built);
                }
                let vehicles = self.ledger.apply(built, now_ms);
                if vehicles.len() < records.len() {
                    warn!(
                        dropped = records.len() - vehicles.len(),
                        "some trip records were not registered"
                    );
                }
                let generation = previous.generation() + 1;
                info!(
                    source = self.source.primary_name(),
                    vehicles = vehicles.len(),
                    mode = %mode,
                    generation,
                    "registry refreshed"
                );
                RefreshOutcome::Swapped(RegistrySnapshot::new(vehicles, mode, now_ms, generation))
            }
        }
    }

    /// Injects a delay into `snapshot`; see [`DelayLedger::inject`].
    ///
    /// # Errors
    ///
    /// As [`DelayLedger::inject`].
    pub fn add_delay(
        &mut self,
        snapshot: &RegistrySnapshot,
        id: &str,
        extra_sec: f64,
        now_ms: i64,
    ) -> Result<(RegistrySnapshot, Vehicle), TrackingError> {
        self.ledger.inject(snapshot, id, extra_sec, now_ms)
    }
}
