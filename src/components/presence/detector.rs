use super::memo::StatusMemo;
use super::models::{EventRecord, StatusUpdate};
use crate::utils::time::minutes_until;
use chrono::{DateTime, TimeZone};
use tracing::{debug, warn};

/// Upper bound of the boundary window, in minutes before the boundary
const WINDOW_BEFORE: f64 = 0.5;
/// Lower bound of the boundary window, in minutes after the boundary
const WINDOW_AFTER: f64 = -0.49;

/// Outcome of inspecting the event list at one instant
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// The earliest event just started
    Enter(StatusUpdate),
    /// The earliest event just ended
    Exit(StatusUpdate),
    None,
}

/// A poll landing anywhere within one minute-long cycle of a boundary fires
/// exactly once. The window is open on both sides and slightly narrower after
/// the boundary than before it.
pub fn within_boundary_window(minutes: f64) -> bool {
    minutes < WINDOW_BEFORE && minutes > WINDOW_AFTER
}

/// Decide whether the earliest event's start or end was just crossed.
///
/// Only `events[0]` is considered. Overlapping meetings that share a boundary
/// with a later event are therefore not detected independently.
pub fn detect<Tz: TimeZone>(events: &[EventRecord], memo: &StatusMemo, now: DateTime<Tz>) -> Transition {
    let Some(first) = events.first() else {
        return Transition::None;
    };

    let minutes_until_start = minutes_until(&first.start, &now);
    let minutes_until_end = minutes_until(&first.end, &now);

    debug!("Minutes until event {}: {:.2}", first.id, minutes_until_start);
    debug!("Minutes until event {} ends: {:.2}", first.id, minutes_until_end);

    let Some(status) = memo.lookup(&first.id) else {
        warn!("No memoized status for event {}", first.id);
        return Transition::None;
    };

    if within_boundary_window(minutes_until_start) {
        Transition::Enter(status.on_enter())
    } else if within_boundary_window(minutes_until_end) {
        Transition::Exit(status.on_exit())
    } else {
        Transition::None
    }
}
