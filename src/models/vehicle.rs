//! Vehicle entity and lifecycle state.

use serde::{Deserialize, Serialize};

use crate::error::VehicleError;
use crate::geo::Coordinate;

/// Lifecycle classification of a trip.
///
/// `Delayed` is a sub-state of `Moving`: the vehicle is still on the road,
/// only against an inflated duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    /// En route on schedule.
    Moving,
    /// En route with accumulated delay.
    Delayed,
    /// At the destination.
    Arrived,
}

impl LifecycleState {
    /// Returns `true` for `Moving` and `Delayed`.
    pub fn is_moving(self) -> bool {
        !matches!(self, LifecycleState::Arrived)
    }
}

/// One trip/dispatch record, immutable once built.
///
/// Updates (delay injection) produce a replacement entity via
/// [`Vehicle::delayed_by`]; nothing mutates a vehicle that is already part of
/// a registry snapshot.
///
/// # Examples
///
/// ```
/// use u_fleet::geo::Coordinate;
/// use u_fleet::models::Vehicle;
///
/// let a = Coordinate::new(37.0, 127.0, "Plant").unwrap();
/// let b = Coordinate::new(37.2, 127.0, "Hub").unwrap();
/// let v = Vehicle::new("T-1", a, b, 1800.0, 1_700_000_000_000)
///     .unwrap()
///     .with_driver("Kim");
/// assert_eq!(v.id(), "T-1");
/// assert_eq!(v.effective_duration_sec(), 1800.0);
/// assert_eq!(v.eta_ms(), 1_700_000_000_000 + 1_800_000);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Vehicle {
    id: String,
    driver: String,
    start: Coordinate,
    destination: Coordinate,
    total_distance_km: f64,
    base_duration_sec: f64,
    start_time_ms: i64,
    delay_sec: f64,
    lifecycle_state: LifecycleState,
    arrived_signal: bool,
    cargo: Option<String>,
    temperature: Option<String>,
}

impl Vehicle {
    /// Creates a vehicle with no delay in the `Moving` state.
    ///
    /// The total distance defaults to the great-circle distance between the
    /// endpoints.
    ///
    /// # Errors
    ///
    /// [`VehicleError::EmptyId`] for a blank id and
    /// [`VehicleError::InvalidDuration`] unless `base_duration_sec` is a
    /// positive finite number.
    pub fn new(
        id: impl Into<String>,
        start: Coordinate,
        destination: Coordinate,
        base_duration_sec: f64,
        start_time_ms: i64,
    ) -> Result<Self, VehicleError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(VehicleError::EmptyId);
        }
        if !base_duration_sec.is_finite() || base_duration_sec <= 0.0 {
            return Err(VehicleError::InvalidDuration {
                value: base_duration_sec,
            });
        }
        let total_distance_km = start.distance_km(&destination);
        Ok(Self {
            id,
            driver: String::new(),
            start,
            destination,
            total_distance_km,
            base_duration_sec,
            start_time_ms,
            delay_sec: 0.0,
            lifecycle_state: LifecycleState::Moving,
            arrived_signal: false,
            cargo: None,
            temperature: None,
        })
    }

    /// Sets the driver display name.
    pub fn with_driver(mut self, driver: impl Into<String>) -> Self {
        self.driver = driver.into();
        self
    }

    /// Overrides the informational route distance.
    ///
    /// Ignored unless `km` is finite and non-negative.
    pub fn with_distance_km(mut self, km: f64) -> Self {
        if km.is_finite() && km >= 0.0 {
            self.total_distance_km = km;
        }
        self
    }

    /// Sets the accumulated delay.
    ///
    /// # Errors
    ///
    /// [`VehicleError::InvalidDelay`] for negative or non-finite values.
    pub fn with_delay(mut self, delay_sec: f64) -> Result<Self, VehicleError> {
        if !delay_sec.is_finite() || delay_sec < 0.0 {
            return Err(VehicleError::InvalidDelay { value: delay_sec });
        }
        self.delay_sec = delay_sec;
        Ok(self)
    }

    /// Marks the trip as reported arrived by the source.
    pub fn with_arrived_signal(mut self, arrived: bool) -> Self {
        self.arrived_signal = arrived;
        self
    }

    /// Sets the seeded lifecycle state.
    pub fn with_lifecycle_state(mut self, state: LifecycleState) -> Self {
        self.lifecycle_state = state;
        self
    }

    /// Sets the cargo descriptor.
    pub fn with_cargo(mut self, cargo: impl Into<String>) -> Self {
        self.cargo = Some(cargo.into());
        self
    }

    /// Sets the temperature reading.
    pub fn with_temperature(mut self, temperature: impl Into<String>) -> Self {
        self.temperature = Some(temperature.into());
        self
    }

    /// Returns a replacement entity with `extra_sec` more delay.
    ///
    /// # Errors
    ///
    /// [`VehicleError::InvalidDelay`] unless `extra_sec` is positive and finite.
    pub fn delayed_by(&self, extra_sec: f64) -> Result<Self, VehicleError> {
        if !extra_sec.is_finite() || extra_sec <= 0.0 {
            return Err(VehicleError::InvalidDelay { value: extra_sec });
        }
        self.clone().with_delay(self.delay_sec + extra_sec)
    }

    /// Stable identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Driver display name (may be empty).
    pub fn driver(&self) -> &str {
        &self.driver
    }

    /// Departure point.
    pub fn start(&self) -> &Coordinate {
        &self.start
    }

    /// Destination point.
    pub fn destination(&self) -> &Coordinate {
        &self.destination
    }

    /// Route length used for "distance remaining" display.
    pub fn total_distance_km(&self) -> f64 {
        self.total_distance_km
    }

    /// Expected duration without delay.
    pub fn base_duration_sec(&self) -> f64 {
        self.base_duration_sec
    }

    /// Trip start, epoch milliseconds.
    pub fn start_time_ms(&self) -> i64 {
        self.start_time_ms
    }

    /// Accumulated delay.
    pub fn delay_sec(&self) -> f64 {
        self.delay_sec
    }

    /// Base duration plus delay. Always positive.
    pub fn effective_duration_sec(&self) -> f64 {
        self.base_duration_sec + self.delay_sec
    }

    /// Expected arrival, epoch milliseconds.
    pub fn eta_ms(&self) -> i64 {
        self.start_time_ms + (self.effective_duration_sec() * 1000.0).round() as i64
    }

    /// State seeded at construction. The tick loop reclassifies every frame;
    /// see [`classify`](crate::evaluation::classify).
    pub fn lifecycle_state(&self) -> LifecycleState {
        self.lifecycle_state
    }

    /// Whether the source reported this trip as arrived.
    pub fn arrived_signal(&self) -> bool {
        self.arrived_signal
    }

    /// Cargo descriptor, if any.
    pub fn cargo(&self) -> Option<&str> {
        self.cargo.as_deref()
    }

    /// Temperature reading, if any.
    pub fn temperature(&self) -> Option<&str> {
        self.temperature.as_deref()
    }
}
