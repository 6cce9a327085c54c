use super::models::EventTime;
use crate::error::{fetch_error, SyncResult};
use chrono::{DateTime, FixedOffset};

/// Resolve a timed event boundary to an absolute timestamp, keeping its own
/// offset. Date-only boundaries have no instant and are rejected.
pub fn resolve_event_time(time: &EventTime) -> SyncResult<DateTime<FixedOffset>> {
    match &time.date_time {
        Some(date_time) => DateTime::parse_from_rfc3339(date_time)
            .map_err(|e| fetch_error(&format!("Failed to parse datetime {}: {}", date_time, e))),
        None => Err(fetch_error("Event boundary has no dateTime")),
    }
}
