//! The running engine: tick loop and refresh loop.
//!
//! # Tasks
//!
//! | Task    | Period           | Owns                         | Publishes           |
//! |---------|------------------|------------------------------|---------------------|
//! | tick    | ~33 ms           | frame settings, sinks        | [`Frame`]s          |
//! | refresh | tens of seconds  | [`Refresher`], command queue | [`RegistrySnapshot`]s |
//!
//! Snapshots travel through a `watch` channel as `Arc`s: the refresh task
//! sends a whole new snapshot, the tick task clones whichever `Arc` is
//! current. A tick therefore sees either the old or the new registry, never
//! a mix. Missed ticks are skipped, not replayed; positions depend on the
//! clock only, so a late tick is simply a later frame.
//!
//! Delay injection and manual refreshes are commands to the refresh task,
//! which serializes them with scheduled refreshes.

use std::sync::Arc;

use rand::Rng;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::config::EngineConfig;
use crate::error::{ConfigError, TrackingError};
use crate::evaluation::{build_frame, evaluate_all, pick_incident_target, Frame, FrameSettings};
use crate::models::Vehicle;
use crate::registry::RegistrySnapshot;
use crate::source::TripSource;

use super::clock::{Clock, SystemClock};
use super::refresh::{RefreshOutcome, RefreshStatus, Refresher};
use super::sink::{DetailSink, MarkerSink, NullSink};

const COMMAND_QUEUE: usize = 32;

enum Command {
    AddDelay {
        id: String,
        extra_sec: f64,
        reply: oneshot::Sender<Result<Vehicle, TrackingError>>,
    },
    Refresh {
        reply: oneshot::Sender<RefreshStatus>,
    },
}

/// An engine ready to start.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use u_fleet::config::EngineConfig;
/// use u_fleet::scheduler::TrackingService;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let config = EngineConfig::default();
/// let source = Arc::new(config.synthetic_source());
/// let handle = TrackingService::new(config, source).start().await.unwrap();
/// assert_eq!(handle.snapshot().len(), 6);
/// handle.stop().await;
/// # }
/// ```
pub struct TrackingService {
    config: EngineConfig,
    source: Arc<dyn TripSource>,
    clock: Arc<dyn Clock>,
    marker_sink: Arc<dyn MarkerSink>,
    detail_sink: Arc<dyn DetailSink>,
}

impl TrackingService {
    /// Creates a service reading from `source`, with the system clock and
    /// no output sinks.
    pub fn new(config: EngineConfig, source: Arc<dyn TripSource>) -> Self {
        Self {
            config,
            source,
            clock: Arc::new(SystemClock),
            marker_sink: Arc::new(NullSink),
            detail_sink: Arc::new(NullSink),
        }
    }

    /// Creates a service with the source named by the configuration: the
    /// HTTP endpoint if one is set, synthetic data otherwise.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Invalid`] if the configuration does not validate or
    /// the HTTP client cannot be built.
    pub fn from_config(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let source: Arc<dyn TripSource> = match &config.http {
            #[cfg(feature = "http")]
            Some(http) => {
                let source = crate::source::HttpSource::new(&http.url, config.fetch_timeout())
                    .map_err(|e| ConfigError::Invalid {
                        field: "http.url",
                        reason: e.to_string(),
                    })?;
                Arc::new(source)
            }
            #[cfg(not(feature = "http"))]
            Some(http) => {
                warn!(url = %http.url, "built without the `http` feature, using synthetic data");
                Arc::new(config.synthetic_source())
            }
            None => Arc::new(config.synthetic_source()),
        };
        Ok(Self::new(config, source))
    }

    /// Replaces the clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Sets the map-rendering collaborator.
    pub fn with_marker_sink(mut self, sink: Arc<dyn MarkerSink>) -> Self {
        self.marker_sink = sink;
        self
    }

    /// Sets the detail-panel collaborator.
    pub fn with_detail_sink(mut self, sink: Arc<dyn DetailSink>) -> Self {
        self.detail_sink = sink;
        self
    }

    /// Performs the initial refresh, then spawns the tick and refresh tasks.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Invalid`] if the configuration does not validate.
    pub async fn start(self) -> Result<TrackingHandle, ConfigError> {
        self.config.validate()?;
        let Self {
            config,
            source,
            clock,
            marker_sink,
            detail_sink,
        } = self;

        let mut refresher = Refresher::from_config(&config, source);
        let initial = match refresher
            .refresh(&RegistrySnapshot::empty(), clock.now_ms())
            .await
        {
            RefreshOutcome::Swapped(snapshot) => snapshot,
            RefreshOutcome::KeptStale => RegistrySnapshot::empty(),
        };
        info!(
            vehicles = initial.len(),
            mode = %initial.mode(),
            tick_ms = config.tick_interval_ms,
            refresh_ms = config.refresh_interval_ms,
            "tracking service starting"
        );

        let (snapshot_tx, snapshot_rx) = watch::channel(Arc::new(initial));
        let (frame_tx, frame_rx) = watch::channel(Arc::new(Frame::empty()));
        let (command_tx, command_rx) = mpsc::channel(COMMAND_QUEUE);
        let cancel = CancellationToken::new();

        let tick = TickLoop {
            snapshots: snapshot_rx.clone(),
            frames: frame_tx,
            settings: FrameSettings::from_config(&config),
            clock: Arc::clone(&clock),
            marker_sink,
            detail_sink,
        };
        let refresh = RefreshLoop {
            refresher,
            snapshots: snapshot_tx,
            commands: command_rx,
            clock: Arc::clone(&clock),
        };

        let tasks = vec![
            tokio::spawn(tick.run(config.tick_interval(), cancel.clone())),
            tokio::spawn(refresh.run(config.refresh_interval(), cancel.clone())),
        ];

        Ok(TrackingHandle {
            snapshots: snapshot_rx,
            frames: frame_rx,
            commands: command_tx,
            cancel,
            tasks,
            clock,
            incident_delay_sec: config.incident_delay_sec,
        })
    }
}

/// Control surface of a running service.
///
/// Dropping the handle cancels both tasks without waiting for them; call
/// [`stop`](Self::stop) for a deterministic shutdown.
pub struct TrackingHandle {
    snapshots: watch::Receiver<Arc<RegistrySnapshot>>,
    frames: watch::Receiver<Arc<Frame>>,
    commands: mpsc::Sender<Command>,
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
    clock: Arc<dyn Clock>,
    incident_delay_sec: f64,
}

impl TrackingHandle {
    /// The registry snapshot currently in use.
    pub fn snapshot(&self) -> Arc<RegistrySnapshot> {
        Arc::clone(&self.snapshots.borrow())
    }

    /// Subscribes to snapshot swaps.
    pub fn snapshots(&self) -> watch::Receiver<Arc<RegistrySnapshot>> {
        self.snapshots.clone()
    }

    /// The most recent frame; [`Frame::empty`] before the first tick.
    pub fn latest_frame(&self) -> Arc<Frame> {
        Arc::clone(&self.frames.borrow())
    }

    /// Subscribes to frames.
    pub fn frames(&self) -> watch::Receiver<Arc<Frame>> {
        self.frames.clone()
    }

    /// Returns `true` until the service is stopped.
    pub fn is_running(&self) -> bool {
        !self.cancel.is_cancelled()
    }

    /// Adds `extra_sec` of delay to vehicle `id`.
    ///
    /// Returns the replacement vehicle; the next tick shows it reclassified.
    ///
    /// # Errors
    ///
    /// [`TrackingError::InvalidDelay`], [`TrackingError::UnknownVehicle`],
    /// [`TrackingError::VehicleArrived`], or [`TrackingError::Stopped`] once
    /// the service is stopped.
    pub async fn add_delay(&self, id: &str, extra_sec: f64) -> Result<Vehicle, TrackingError> {
        let (reply, response) = oneshot::channel();
        self.send(Command::AddDelay {
            id: id.to_string(),
            extra_sec,
            reply,
        })
        .await?;
        response.await.map_err(|_| TrackingError::Stopped)?
    }

    /// Refreshes the registry now instead of waiting for the next interval.
    ///
    /// # Errors
    ///
    /// [`TrackingError::Stopped`] once the service is stopped.
    pub async fn refresh_now(&self) -> Result<RefreshStatus, TrackingError> {
        let (reply, response) = oneshot::channel();
        self.send(Command::Refresh { reply }).await?;
        response.await.map_err(|_| TrackingError::Stopped)
    }

    /// Delays a random on-road vehicle by the configured incident delay.
    ///
    /// Returns `Ok(None)` when no vehicle is on the road.
    ///
    /// # Errors
    ///
    /// As [`add_delay`](Self::add_delay).
    pub async fn inject_incident<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
    ) -> Result<Option<Vehicle>, TrackingError> {
        let target = {
            let snapshot = self.snapshot();
            let states = evaluate_all(snapshot.vehicles(), self.clock.now_ms());
            pick_incident_target(&states, rng).map(|v| v.id().to_string())
        };
        match target {
            Some(id) => {
                let vehicle = self.add_delay(&id, self.incident_delay_sec).await?;
                info!(id = %id, delay_sec = self.incident_delay_sec, "incident simulated");
                Ok(Some(vehicle))
            }
            None => Ok(None),
        }
    }

    /// Stops both tasks and waits for them to finish.
    pub async fn stop(mut self) {
        self.cancel.cancel();
        for task in std::mem::take(&mut self.tasks) {
            if let Err(e) = task.await {
                warn!(error = %e, "scheduler task ended abnormally");
            }
        }
        info!("tracking service stopped");
    }

    async fn send(&self, command: Command) -> Result<(), TrackingError> {
        if self.cancel.is_cancelled() {
            return Err(TrackingError::Stopped);
        }
        self.commands
            .send(command)
            .await
            .map_err(|_| TrackingError::Stopped)
    }
}

impl Drop for TrackingHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

struct TickLoop {
    snapshots: watch::Receiver<Arc<RegistrySnapshot>>,
    frames: watch::Sender<Arc<Frame>>,
    settings: FrameSettings,
    clock: Arc<dyn Clock>,
    marker_sink: Arc<dyn MarkerSink>,
    detail_sink: Arc<dyn DetailSink>,
}

impl TickLoop {
    async fn run(self, period: std::time::Duration, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = interval.tick() => self.tick(),
            }
        }
        debug!("tick loop stopped");
    }

    fn tick(&self) {
        let snapshot = Arc::clone(&self.snapshots.borrow());
        let frame = build_frame(&snapshot, self.clock.now_ms(), &self.settings);
        self.marker_sink.publish_markers(&frame.markers, &frame.mode);
        self.detail_sink.publish_focus(&frame.focus);
        trace!(
            generation = frame.generation,
            markers = frame.markers.len(),
            "tick"
        );
        self.frames.send_replace(Arc::new(frame));
    }
}

struct RefreshLoop {
    refresher: Refresher,
    snapshots: watch::Sender<Arc<RegistrySnapshot>>,
    commands: mpsc::Receiver<Command>,
    clock: Arc<dyn Clock>,
}

impl RefreshLoop {
    async fn run(mut self, period: std::time::Duration, cancel: CancellationToken) {
        // The initial refresh happened before spawning.
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                Some(command) = self.commands.recv() => match command {
                    Command::AddDelay { id, extra_sec, reply } => {
                        let result = self.add_delay(&id, extra_sec);
                        let _ = reply.send(result);
                    }
                    Command::Refresh { reply } => {
                        tokio::select! {
                            biased;
                            _ = cancel.cancelled() => break,
                            status = self.refresh() => {
                                let _ = reply.send(status);
                            }
                        }
                    }
                },
                _ = interval.tick() => {
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => break,
                        _ = self.refresh() => {}
                    }
                }
            }
        }
        debug!("refresh loop stopped");
    }

    async fn refresh(&mut self) -> RefreshStatus {
        let previous = Arc::clone(&self.snapshots.borrow());
        match self.refresher.refresh(&previous, self.clock.now_ms()).await {
            RefreshOutcome::Swapped(next) => {
                let status = RefreshStatus::of(&next, false);
                self.snapshots.send_replace(Arc::new(next));
                status
            }
            RefreshOutcome::KeptStale => RefreshStatus::of(&previous, true),
        }
    }

    fn add_delay(&mut self, id: &str, extra_sec: f64) -> Result<Vehicle, TrackingError> {
        let current = Arc::clone(&self.snapshots.borrow());
        let (next, vehicle) =
            self.refresher
                .add_delay(&current, id, extra_sec, self.clock.now_ms())?;
        self.snapshots.send_replace(Arc::new(next));
        Ok(vehicle)
    }
}
