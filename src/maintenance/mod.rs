//! Maintenance-mode flag, persisted as a single row.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::storage::{decode_ts, encode_ts, Pool};

/// Snapshot of the maintenance row. Also the `GET /maintenance` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaintenanceState {
    pub enabled: bool,
    pub eta_minutes: Option<i64>,
    pub enabled_at: Option<DateTime<Utc>>,
}

#[derive(Clone)]
pub struct MaintenanceStore {
    pool: Pool,
}

impl MaintenanceStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Current state, creating the default disabled row on first access.
    pub fn get(&self) -> Result<MaintenanceState> {
        let conn = self.pool.get()?;
        let row = conn
            .query_row(
                "SELECT enabled, eta_minutes, enabled_at FROM maintenance_state
                 ORDER BY id LIMIT 1",
                [],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)? != 0,
                        row.get::<_, i64>(1)?,
                        row.get::<_, Option<String>>(2)?,
                    ))
                },
            )
            .optional()?;

        match row {
            Some((enabled, eta, enabled_at)) => Ok(MaintenanceState {
                enabled,
                eta_minutes: Some(eta),
                enabled_at: enabled_at.as_deref().map(decode_ts).transpose()?,
            }),
            None => {
                conn.execute(
                    "INSERT INTO maintenance_state (enabled, eta_minutes) VALUES (0, 0)",
                    [],
                )
                .context("failed to initialise maintenance state")?;
                Ok(MaintenanceState {
                    enabled: false,
                    eta_minutes: Some(0),
                    enabled_at: None,
                })
            }
        }
    }

    /// Flag consulted before every sample. Falls back to disabled when the
    /// store cannot be read.
    pub fn is_enabled_or_default(&self) -> bool {
        match self.get() {
            Ok(state) => state.enabled,
            Err(e) => {
                warn!(error = %e, "maintenance state unavailable, assuming disabled");
                false
            }
        }
    }

    pub fn enable(&self, eta_minutes: i64) -> Result<MaintenanceState> {
        if eta_minutes < 0 {
            bail!("eta_minutes must not be negative (got {eta_minutes})");
        }
        let now = Utc::now();
        self.write(true, eta_minutes, Some(now))?;
        info!(eta_minutes, "maintenance mode enabled");
        Ok(MaintenanceState {
            enabled: true,
            eta_minutes: Some(eta_minutes),
            enabled_at: Some(now),
        })
    }

    pub fn disable(&self) -> Result<MaintenanceState> {
        self.write(false, 0, None)?;
        info!("maintenance mode disabled");
        Ok(MaintenanceState {
            enabled: false,
            eta_minutes: Some(0),
            enabled_at: None,
        })
    }

    fn write(&self, enabled: bool, eta_minutes: i64, enabled_at: Option<DateTime<Utc>>) -> Result<()> {
        // Ensure the row exists.
        self.get()?;
        let conn = self.pool.get()?;
        conn.execute(
            "UPDATE maintenance_state SET enabled = ?1, eta_minutes = ?2, enabled_at = ?3
             WHERE id = (SELECT id FROM maintenance_state ORDER BY id LIMIT 1)",
            params![enabled as i64, eta_minutes, enabled_at.map(encode_ts)],
        )
        .context("failed to update maintenance state")?;
        Ok(())
    }
}
