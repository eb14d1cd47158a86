//! Synthetic infrastructure metrics.
//!
//! A [`MetricsSimulator`] owns five smoothed baselines that follow a bounded
//! multiplicative random walk, plus a spike timer that transiently amplifies
//! them. Every sample yields a [`MetricsReading`] whose [`Status`] is derived
//! from the error rate and response time.

pub mod clock;
pub mod engine;

pub use self::clock::{Clock, ManualClock, WallClock};
pub use self::engine::MetricsSimulator;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Health status attached to every reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Operational,
    Degraded,
    Down,
    Maintenance,
}

impl Status {
    /// Derive the status of a non-maintenance reading.
    pub fn from_metrics(error_rate: f64, response_time: f64) -> Self {
        if error_rate > 15.0 || response_time > 2000.0 {
            Status::Down
        } else if error_rate > 5.0 || response_time > 1200.0 {
            Status::Degraded
        } else {
            Status::Operational
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::Operational => write!(f, "operational"),
            Status::Degraded => write!(f, "degraded"),
            Status::Down => write!(f, "down"),
            Status::Maintenance => write!(f, "maintenance"),
        }
    }
}

/// One sample of the simulated system. This is also the wire shape of
/// `GET /metrics/live`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsReading {
    pub status: Status,
    pub cpu: f64,
    pub ram: f64,
    pub response_time: f64,
    pub error_rate: f64,
    pub db_latency: f64,
    pub timestamp: DateTime<Utc>,
}

/// Random-walk parameters for one baseline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriftBounds {
    /// Maximum relative change per step.
    pub variation: f64,
    pub min: f64,
    pub max: f64,
}

impl DriftBounds {
    pub const fn new(variation: f64, min: f64, max: f64) -> Self {
        Self { variation, min, max }
    }
}

pub const CPU_DRIFT: DriftBounds = DriftBounds::new(0.15, 10.0, 90.0);
pub const RAM_DRIFT: DriftBounds = DriftBounds::new(0.12, 20.0, 85.0);
pub const RESPONSE_TIME_DRIFT: DriftBounds = DriftBounds::new(0.2, 50.0, 2000.0);
pub const ERROR_RATE_DRIFT: DriftBounds = DriftBounds::new(0.25, 0.0, 20.0);
pub const DB_LATENCY_DRIFT: DriftBounds = DriftBounds::new(0.15, 10.0, 200.0);

/// Persisted state of one simulator instance.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatorState {
    pub cpu: f64,
    pub ram: f64,
    pub response_time: f64,
    pub error_rate: f64,
    pub db_latency: f64,
    pub spike_active: bool,
    pub spike_end_time: Option<DateTime<Utc>>,
}

impl Default for SimulatorState {
    fn default() -> Self {
        Self {
            cpu: 30.0,
            ram: 45.0,
            response_time: 150.0,
            error_rate: 0.5,
            db_latency: 25.0,
            spike_active: false,
            spike_end_time: None,
        }
    }
}

/// Round to two decimal places.
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
