use serde::{Deserialize, Serialize};

/// Calendar event as returned by the Calendar v3 events.list endpoint
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub start: EventTime,
    #[serde(default)]
    pub end: EventTime,
}

impl CalendarEvent {
    pub fn is_cancelled(&self) -> bool {
        self.status.as_deref() == Some("cancelled")
    }

    /// Date-only entries (holidays, out of office) rather than meetings
    pub fn is_all_day(&self) -> bool {
        self.start.date_time.is_none() && self.start.date.is_some()
    }
}

/// Either a timed boundary or an all-day date
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EventTime {
    #[serde(default)]
    pub date_time: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
}

impl EventTime {
    pub fn at(date_time: &str) -> Self {
        Self {
            date_time: Some(date_time.to_string()),
            date: None,
        }
    }

    pub fn all_day(date: &str) -> Self {
        Self {
            date_time: None,
            date: Some(date.to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct EventsPage {
    #[serde(default)]
    pub items: Vec<CalendarEvent>,
}

/// Ordering requested from the calendar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderBy {
    StartTime,
}

impl OrderBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderBy::StartTime => "startTime",
        }
    }
}

/// Parameters of an upcoming-events query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventQuery {
    pub calendar_id: String,
    /// RFC 3339 lower bound on event end time
    pub time_min: String,
    pub show_deleted: bool,
    pub single_events: bool,
    pub max_results: u32,
    pub order_by: OrderBy,
}

impl EventQuery {
    /// The query used by the status poller: future or running, expanded, capped
    pub fn upcoming(calendar_id: &str, time_min: String, max_results: u32) -> Self {
        Self {
            calendar_id: calendar_id.to_string(),
            time_min,
            show_deleted: false,
            single_events: true,
            max_results,
            order_by: OrderBy::StartTime,
        }
    }
}
