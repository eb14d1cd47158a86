use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, trace};

use crate::simulator::clock::{Clock, WallClock};
use crate::simulator::{
    round2, DriftBounds, MetricsReading, SimulatorState, Status, CPU_DRIFT, DB_LATENCY_DRIFT,
    ERROR_RATE_DRIFT, RAM_DRIFT, RESPONSE_TIME_DRIFT,
};

/// Probability that an idle simulator starts a spike on a given sample.
pub const SPIKE_PROBABILITY: f64 = 0.05;

/// Spike duration range, in seconds.
pub const SPIKE_DURATION_SECS: (f64, f64) = (10.0, 30.0);

/// Simulated metrics source with injectable clock and RNG.
pub struct MetricsSimulator<C = WallClock, R = StdRng> {
    state: SimulatorState,
    clock: C,
    rng: R,
}

impl MetricsSimulator<WallClock, StdRng> {
    /// Wall clock, RNG seeded from OS entropy.
    pub fn from_entropy() -> Self {
        Self::new(WallClock, StdRng::from_entropy())
    }

    /// Wall clock, reproducible RNG.
    pub fn seeded(seed: u64) -> Self {
        Self::new(WallClock, StdRng::seed_from_u64(seed))
    }
}

impl<C: Clock, R: Rng> MetricsSimulator<C, R> {
    pub fn new(clock: C, rng: R) -> Self {
        Self {
            state: SimulatorState::default(),
            clock,
            rng,
        }
    }

    /// Start from an explicit state instead of the default baselines.
    pub fn with_state(mut self, state: SimulatorState) -> Self {
        self.state = state;
        self
    }

    pub fn state(&self) -> &SimulatorState {
        &self.state
    }

    /// Produce the next reading.
    ///
    /// With `maintenance_enabled` the reading is drawn from fixed quiet ranges
    /// and the persisted baselines are left untouched.
    pub fn sample(&mut self, maintenance_enabled: bool) -> MetricsReading {
        let now = self.clock.now();
        if maintenance_enabled {
            return self.maintenance_reading(now);
        }

        let spike = self.check_spike(now);

        self.state.cpu = drift(self.state.cpu, CPU_DRIFT, &mut self.rng);
        self.state.ram = drift(self.state.ram, RAM_DRIFT, &mut self.rng);
        self.state.response_time =
            drift(self.state.response_time, RESPONSE_TIME_DRIFT, &mut self.rng);
        self.state.error_rate = drift(self.state.error_rate, ERROR_RATE_DRIFT, &mut self.rng);
        self.state.db_latency = drift(self.state.db_latency, DB_LATENCY_DRIFT, &mut self.rng);

        let (cpu, ram, response_time, error_rate, db_latency) = if spike {
            (
                (self.state.cpu * self.rng.gen_range(1.5..=2.5)).min(95.0),
                (self.state.ram * self.rng.gen_range(1.3..=1.8)).min(90.0),
                (self.state.response_time * self.rng.gen_range(2.0..=4.0)).min(2000.0),
                (self.state.error_rate * self.rng.gen_range(3.0..=6.0)).min(20.0),
                (self.state.db_latency * self.rng.gen_range(2.0..=3.0)).min(200.0),
            )
        } else {
            (
                self.state.cpu,
                self.state.ram,
                self.state.response_time,
                self.state.error_rate,
                self.state.db_latency,
            )
        };

        let reading = MetricsReading {
            status: Status::from_metrics(error_rate, response_time),
            cpu: round2(cpu),
            ram: round2(ram),
            response_time: round2(response_time),
            error_rate: round2(error_rate),
            db_latency: round2(db_latency),
            timestamp: now,
        };
        trace!(status = %reading.status, spike, "sampled metrics");
        reading
    }

    fn maintenance_reading(&mut self, now: DateTime<Utc>) -> MetricsReading {
        MetricsReading {
            status: Status::Maintenance,
            cpu: round2(self.rng.gen_range(10.0..=30.0)),
            ram: round2(self.rng.gen_range(20.0..=40.0)),
            response_time: round2(self.rng.gen_range(200.0..=500.0)),
            error_rate: round2(self.rng.gen_range(0.0..=2.0)),
            db_latency: round2(self.rng.gen_range(30.0..=60.0)),
            timestamp: now,
        }
    }

    /// Start or expire a spike. Returns whether a spike is active afterwards.
    pub(crate) fn check_spike(&mut self, now: DateTime<Utc>) -> bool {
        if !self.state.spike_active && self.rng.gen::<f64>() < SPIKE_PROBABILITY {
            let (lo, hi) = SPIKE_DURATION_SECS;
            let secs: f64 = self.rng.gen_range(lo..=hi);
            let end = now + Duration::milliseconds((secs * 1000.0).round() as i64);
            self.state.spike_active = true;
            self.state.spike_end_time = Some(end);
            debug!(until = %end, "spike started");
            return true;
        }

        if self.state.spike_active {
            if let Some(end) = self.state.spike_end_time {
                if now > end {
                    self.state.spike_active = false;
                    debug!("spike cleared");
                }
            }
        }
        self.state.spike_active
    }
}

/// One step of the bounded multiplicative random walk.
pub fn drift<R: Rng>(value: f64, bounds: DriftBounds, rng: &mut R) -> f64 {
    let change = rng.gen_range(-bounds.variation..=bounds.variation) * value;
    round2((value + change).clamp(bounds.min, bounds.max))
}
