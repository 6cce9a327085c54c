use super::models::EventRecord;
use crate::components::google_calendar::{resolve_event_time, CalendarEvent, EventQuery};
use crate::error::SyncResult;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use chrono_tz::Tz;
use std::sync::Arc;
use tracing::{debug, warn};

/// Anything that can list upcoming calendar events
#[async_trait]
pub trait CalendarSource: Send + Sync {
    async fn list_upcoming(&self, query: &EventQuery) -> SyncResult<Vec<CalendarEvent>>;
}

/// Fetches upcoming events and turns them into an ordered event sequence
pub struct EventFetcher {
    source: Arc<dyn CalendarSource>,
    calendar_id: String,
    max_results: u32,
    tz: Tz,
}

impl EventFetcher {
    pub fn new(source: Arc<dyn CalendarSource>, calendar_id: &str, max_results: u32, tz: Tz) -> Self {
        Self {
            source,
            calendar_id: calendar_id.to_string(),
            max_results,
            tz,
        }
    }

    pub fn tz(&self) -> &Tz {
        &self.tz
    }

    /// Running or future events, sorted by `(start, end)`
    pub async fn fetch_upcoming(&self, now: DateTime<Utc>) -> SyncResult<Vec<EventRecord>> {
        let query = EventQuery::upcoming(
            &self.calendar_id,
            now.to_rfc3339_opts(SecondsFormat::Secs, true),
            self.max_results,
        );

        let raw = self.source.list_upcoming(&query).await?;
        let mut events = normalize(raw);
        sort_events(&mut events);

        debug!("Fetched {} upcoming events", events.len());
        Ok(events)
    }
}

/// Convert raw calendar events, dropping cancelled, all-day and malformed entries
pub fn normalize(raw: Vec<CalendarEvent>) -> Vec<EventRecord> {
    raw.into_iter()
        .filter(|event| !event.is_cancelled())
        .filter(|event| {
            if event.is_all_day() {
                debug!(
                    "Ignoring all-day event {} ({})",
                    event.id,
                    event.summary.as_deref().unwrap_or("untitled")
                );
                return false;
            }
            true
        })
        .filter_map(|event| {
            let start = resolve_event_time(&event.start);
            let end = resolve_event_time(&event.end);
            match (start, end) {
                (Ok(start), Ok(end)) if start <= end => Some(EventRecord {
                    id: event.id,
                    start,
                    end,
                }),
                (Ok(_), Ok(_)) => {
                    warn!("Skipping event {}: ends before it starts", event.id);
                    None
                }
                (Err(e), _) | (_, Err(e)) => {
                    warn!("Skipping event {}: {}", event.id, e);
                    None
                }
            }
        })
        .collect()
}

/// Sort ascending by start, ties broken by end
pub fn sort_events(events: &mut [EventRecord]) {
    events.sort_by(|a, b| a.start.cmp(&b.start).then(a.end.cmp(&b.end)));
}
