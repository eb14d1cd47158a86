//! Threshold-driven incident detection and incident storage.

pub mod engine;
pub mod incident;
pub mod rules;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use self::engine::derive_incident;
pub use self::incident::IncidentManager;

#[derive(Debug, Error)]
pub enum DetectError {
    #[error("unknown severity '{0}' (expected low, medium, high or critical)")]
    UnknownSeverity(String),
    #[error("unknown incident status '{0}' (expected active or resolved)")]
    UnknownStatus(String),
}

/// Severity levels for incidents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

impl std::str::FromStr for Severity {
    type Err = DetectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            "critical" => Ok(Severity::Critical),
            _ => Err(DetectError::UnknownSeverity(s.to_string())),
        }
    }
}

/// Lifecycle state of an incident.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IncidentStatus {
    Active,
    Resolved,
}

impl IncidentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IncidentStatus::Active => "active",
            IncidentStatus::Resolved => "resolved",
        }
    }
}

impl std::str::FromStr for IncidentStatus {
    type Err = DetectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(IncidentStatus::Active),
            "resolved" => Ok(IncidentStatus::Resolved),
            _ => Err(DetectError::UnknownStatus(s.to_string())),
        }
    }
}

/// A persisted incident.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub severity: Severity,
    pub message: String,
    pub status: IncidentStatus,
}

/// An incident that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewIncident {
    pub timestamp: DateTime<Utc>,
    pub severity: Severity,
    pub message: String,
    pub status: IncidentStatus,
}

/// Read side of incident storage, used for deduplication.
pub trait IncidentHistory {
    /// Any incident whose message contains `needle` and whose timestamp is
    /// strictly after `since`.
    fn find_recent(&self, needle: &str, since: DateTime<Utc>) -> anyhow::Result<Option<Incident>>;
}

/// Write side of incident storage.
pub trait IncidentStore: IncidentHistory {
    fn insert(&self, incident: &NewIncident) -> anyhow::Result<Incident>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_parse_and_display() {
        assert_eq!("Critical".parse::<Severity>().unwrap(), Severity::Critical);
        assert_eq!(Severity::Medium.to_string(), "medium");
        assert!("urgent".parse::<Severity>().is_err());
        assert!(Severity::Critical > Severity::High);
    }

    #[test]
    fn test_incident_serializes_lowercase() {
        let incident = Incident {
            id: 7,
            timestamp: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
            severity: Severity::High,
            message: "High latency detected: 2100ms".to_string(),
            status: IncidentStatus::Active,
        };
        let json = serde_json::to_value(&incident).unwrap();
        assert_eq!(json["severity"], "high");
        assert_eq!(json["status"], "active");
        assert_eq!(json["id"], 7);
    }
}
