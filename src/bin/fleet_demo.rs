//! Runs the tracking engine and logs what a map would show.
//!
//! ```text
//! RUST_LOG=u_fleet=debug cargo run --features demo --bin fleet-demo -- [config.json]
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use u_fleet::config::EngineConfig;
use u_fleet::scheduler::{LogSink, TrackingService};

const REPORT_EVERY: Duration = Duration::from_secs(5);
const INCIDENT_EVERY: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => EngineConfig::from_path(&path)
            .with_context(|| format!("loading config from {path}"))?,
        None => EngineConfig::default(),
    };

    let handle = TrackingService::from_config(config)?
        .with_marker_sink(Arc::new(LogSink))
        .with_detail_sink(Arc::new(LogSink))
        .start()
        .await?;

    let mut rng = StdRng::from_os_rng();
    let mut report = tokio::time::interval(REPORT_EVERY);
    let mut incidents = tokio::time::interval(INCIDENT_EVERY);
    incidents.tick().await;

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = &mut shutdown => {
                if let Err(e) = result {
                    warn!(error = %e, "cannot listen for ctrl-c, shutting down");
                }
                break;
            }
            _ = report.tick() => {
                let frame = handle.latest_frame();
                let focused = frame.focused_ids().join(", ");
                info!(
                    generation = frame.generation,
                    mode = %frame.mode,
                    vehicles = frame.vehicle_markers().count(),
                    focused = %focused,
                    "frame"
                );
            }
            _ = incidents.tick() => match handle.inject_incident(&mut rng).await {
                Ok(Some(v)) => info!(id = v.id(), total_delay_sec = v.delay_sec(), "incident"),
                Ok(None) => debug!("no vehicle on the road for an incident"),
                Err(e) => warn!(error = %e, "incident injection failed"),
            },
        }
    }

    handle.stop().await;
    Ok(())
}
