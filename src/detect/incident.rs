use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, OptionalExtension, Row};

use crate::detect::{
    Incident, IncidentHistory, IncidentStatus, IncidentStore, NewIncident, Severity,
};
use crate::storage::{decode_ts, encode_ts, Pool};

/// Default page size for incident listings.
pub const DEFAULT_LIST_LIMIT: usize = 50;

/// SQLite-backed incident store.
#[derive(Clone)]
pub struct IncidentManager {
    pool: Pool,
}

impl IncidentManager {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Newest incidents first.
    pub fn list_recent(&self, limit: usize) -> Result<Vec<Incident>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT id, timestamp, severity, message, status FROM incidents
             ORDER BY timestamp DESC, id DESC LIMIT ?1",
        )?;

        let rows = stmt.query_map([limit as i64], row_to_incident)?;
        let mut incidents = Vec::new();
        for r in rows {
            incidents.push(r?);
        }
        Ok(incidents)
    }

    /// Operator-created incident, always active and stamped now.
    pub fn create_manual(&self, severity: Severity, message: &str) -> Result<Incident> {
        self.insert(&NewIncident {
            timestamp: Utc::now(),
            severity,
            message: message.to_string(),
            status: IncidentStatus::Active,
        })
    }
}

impl IncidentHistory for IncidentManager {
    fn find_recent(&self, needle: &str, since: DateTime<Utc>) -> Result<Option<Incident>> {
        let conn = self.pool.get()?;
        let incident = conn
            .query_row(
                "SELECT id, timestamp, severity, message, status FROM incidents
                 WHERE instr(message, ?1) > 0 AND timestamp > ?2
                 ORDER BY timestamp DESC LIMIT 1",
                params![needle, encode_ts(since)],
                row_to_incident,
            )
            .optional()
            .context("failed to query incident history")?;
        Ok(incident)
    }
}

impl IncidentStore for IncidentManager {
    fn insert(&self, incident: &NewIncident) -> Result<Incident> {
        let stamp = encode_ts(incident.timestamp);
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO incidents (timestamp, severity, message, status) VALUES (?1, ?2, ?3, ?4)",
            params![
                stamp,
                incident.severity.as_str(),
                incident.message,
                incident.status.as_str()
            ],
        )
        .context("failed to insert incident")?;

        Ok(Incident {
            id: conn.last_insert_rowid(),
            timestamp: decode_ts(&stamp)?,
            severity: incident.severity,
            message: incident.message.clone(),
            status: incident.status,
        })
    }
}

fn row_to_incident(row: &Row<'_>) -> rusqlite::Result<Incident> {
    let ts: String = row.get(1)?;
    let severity: String = row.get(2)?;
    let status: String = row.get(4)?;

    Ok(Incident {
        id: row.get(0)?,
        timestamp: decode_ts(&ts).map_err(|e| conversion_error(1, e.into()))?,
        severity: severity
            .parse::<Severity>()
            .map_err(|e| conversion_error(2, Box::new(e)))?,
        message: row.get(3)?,
        status: status
            .parse::<IncidentStatus>()
            .map_err(|e| conversion_error(4, Box::new(e)))?,
    })
}

fn conversion_error(
    idx: usize,
    err: Box<dyn std::error::Error + Send + Sync + 'static>,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, err)
}
