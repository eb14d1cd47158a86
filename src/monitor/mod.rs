//! Live sampling: maintenance flag -> simulator -> incident deriver.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::detect::engine::record_incident;
use crate::detect::IncidentManager;
use crate::maintenance::MaintenanceStore;
use crate::simulator::{MetricsReading, MetricsSimulator};

/// Shared handle to the one simulator of this process.
#[derive(Clone)]
pub struct LiveMetrics {
    simulator: Arc<Mutex<MetricsSimulator>>,
    maintenance: MaintenanceStore,
    incidents: IncidentManager,
}

impl LiveMetrics {
    pub fn new(
        simulator: MetricsSimulator,
        maintenance: MaintenanceStore,
        incidents: IncidentManager,
    ) -> Self {
        Self {
            simulator: Arc::new(Mutex::new(simulator)),
            maintenance,
            incidents,
        }
    }

    /// Take one sample and record an incident if it warrants one.
    ///
    /// The simulator stays locked until the incident step finishes, so
    /// concurrent callers observe samples and dedup checks in one order.
    /// Incident storage errors are returned; the maintenance flag never fails.
    pub async fn sample(&self) -> Result<MetricsReading> {
        let store = self.maintenance.clone();
        let maintenance = match tokio::task::spawn_blocking(move || store.is_enabled_or_default()).await {
            Ok(enabled) => enabled,
            Err(e) => {
                warn!(error = %e, "maintenance lookup task failed, assuming disabled");
                false
            }
        };

        let mut simulator = self.simulator.lock().await;
        let reading = simulator.sample(maintenance);

        let incidents = self.incidents.clone();
        let for_deriver = reading.clone();
        tokio::task::spawn_blocking(move || record_incident(&for_deriver, &incidents)).await??;
        drop(simulator);

        Ok(reading)
    }
}

/// Background poller. Samples every `period` so incidents are derived even
/// when nobody is watching the dashboard.
pub async fn run_monitor_loop(live: LiveMetrics, period: Duration) {
    info!(period_secs = period.as_secs(), "metrics poller started");

    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        interval.tick().await;
        match live.sample().await {
            Ok(reading) => {
                debug!(
                    status = %reading.status,
                    error_rate = reading.error_rate,
                    response_time = reading.response_time,
                    "poller sample"
                );
            }
            Err(e) => {
                error!("Failed to sample metrics: {}", e);
            }
        }
    }
}
