mod actor;
mod handle;
pub mod models;
mod time;
mod token;

pub use handle::GoogleCalendarHandle;
pub use models::{CalendarEvent, EventQuery, EventTime, OrderBy};
pub use time::resolve_event_time;
