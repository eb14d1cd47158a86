use anyhow::Result;
use tracing::{debug, info};

use crate::detect::rules::first_match;
use crate::detect::{Incident, IncidentHistory, IncidentStatus, IncidentStore, NewIncident};
use crate::simulator::MetricsReading;

/// Decide whether `reading` should raise a new incident.
///
/// The reading's timestamp is "now" for the dedup window. Returns `None` when
/// no tier matches or a matching incident is already inside the window.
/// History lookup errors propagate unchanged.
pub fn derive_incident<H>(reading: &MetricsReading, history: &H) -> Result<Option<NewIncident>>
where
    H: IncidentHistory + ?Sized,
{
    let Some(rule) = first_match(reading) else {
        return Ok(None);
    };

    let since = reading.timestamp - rule.window();
    if let Some(existing) = history.find_recent(rule.dedup_key, since)? {
        debug!(
            rule = rule.name,
            existing_id = existing.id,
            "suppressing duplicate incident"
        );
        return Ok(None);
    }

    Ok(Some(NewIncident {
        timestamp: reading.timestamp,
        severity: rule.severity,
        message: (rule.message)(reading),
        status: IncidentStatus::Active,
    }))
}

/// Derive and persist, returning the stored incident if one was created.
pub fn record_incident<S>(reading: &MetricsReading, store: &S) -> Result<Option<Incident>>
where
    S: IncidentStore + ?Sized,
{
    let Some(new) = derive_incident(reading, store)? else {
        return Ok(None);
    };
    let stored = store.insert(&new)?;
    info!(
        id = stored.id,
        severity = %stored.severity,
        message = %stored.message,
        "incident recorded"
    );
    Ok(Some(stored))
}
