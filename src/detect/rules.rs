//! Ordered incident tiers.
//!
//! Tiers are evaluated top to bottom and the first match wins, even when a
//! later tier also matches. A reading with both a critical error rate and a
//! very high latency only ever produces the error-rate incident.

use chrono::Duration;

use crate::detect::Severity;
use crate::simulator::MetricsReading;

/// One tier of the incident priority chain.
pub struct IncidentRule {
    pub name: &'static str,
    pub severity: Severity,
    /// Substring that identifies incidents raised by this tier.
    pub dedup_key: &'static str,
    pub window_minutes: i64,
    pub matches: fn(&MetricsReading) -> bool,
    pub message: fn(&MetricsReading) -> String,
}

impl IncidentRule {
    /// Recency window within which a matching incident suppresses a new one.
    pub fn window(&self) -> Duration {
        Duration::minutes(self.window_minutes)
    }
}

fn error_rate_spike(r: &MetricsReading) -> bool {
    r.error_rate > 15.0
}

fn error_rate_spike_message(r: &MetricsReading) -> String {
    format!("Error rate spike detected: {:.2}%", r.error_rate)
}

fn high_latency(r: &MetricsReading) -> bool {
    r.response_time > 2000.0
}

fn high_latency_message(r: &MetricsReading) -> String {
    format!("High latency detected: {:.0}ms", r.response_time)
}

fn degraded(r: &MetricsReading) -> bool {
    r.error_rate > 5.0 || r.response_time > 1200.0
}

fn degraded_message(r: &MetricsReading) -> String {
    format!(
        "Degraded performance: Error rate {:.2}%, Response time {:.0}ms",
        r.error_rate, r.response_time
    )
}

/// The priority chain, highest priority first.
pub const RULES: &[IncidentRule] = &[
    IncidentRule {
        name: "error-rate-spike",
        severity: Severity::Critical,
        dedup_key: "Error rate spike",
        window_minutes: 5,
        matches: error_rate_spike,
        message: error_rate_spike_message,
    },
    IncidentRule {
        name: "high-latency",
        severity: Severity::High,
        dedup_key: "High latency detected",
        window_minutes: 5,
        matches: high_latency,
        message: high_latency_message,
    },
    IncidentRule {
        name: "degraded-performance",
        severity: Severity::Medium,
        dedup_key: "Degraded performance",
        window_minutes: 10,
        matches: degraded,
        message: degraded_message,
    },
];

/// The first tier matching `reading`, if any.
pub fn first_match(reading: &MetricsReading) -> Option<&'static IncidentRule> {
    RULES.iter().find(|rule| (rule.matches)(reading))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulator::Status;
    use chrono::DateTime;

    fn reading(error_rate: f64, response_time: f64) -> MetricsReading {
        MetricsReading {
            status: Status::from_metrics(error_rate, response_time),
            cpu: 40.0,
            ram: 50.0,
            response_time,
            error_rate,
            db_latency: 30.0,
            timestamp: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
        }
    }

    #[test]
    fn test_first_match_wins_over_severity() {
        let rule = first_match(&reading(20.0, 3000.0)).unwrap();
        assert_eq!(rule.severity, Severity::Critical);
        assert_eq!(rule.name, "error-rate-spike");
    }

    #[test]
    fn test_tier_selection() {
        assert_eq!(first_match(&reading(0.0, 2500.0)).unwrap().severity, Severity::High);
        assert_eq!(first_match(&reading(6.0, 100.0)).unwrap().severity, Severity::Medium);
        assert_eq!(first_match(&reading(1.0, 1300.0)).unwrap().severity, Severity::Medium);
        assert!(first_match(&reading(5.0, 1200.0)).is_none());
    }

    #[test]
    fn test_messages() {
        let r = reading(16.457, 1234.6);
        assert_eq!((RULES[0].message)(&r), "Error rate spike detected: 16.46%");
        assert_eq!((RULES[1].message)(&r), "High latency detected: 1235ms");
        assert_eq!(
            (RULES[2].message)(&r),
            "Degraded performance: Error rate 16.46%, Response time 1235ms"
        );
    }

    #[test]
    fn test_messages_contain_dedup_key() {
        let r = reading(16.0, 2500.0);
        for rule in RULES {
            assert!((rule.message)(&r).contains(rule.dedup_key), "{}", rule.name);
        }
    }
}
