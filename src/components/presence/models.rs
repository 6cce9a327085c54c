use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// Default icon shown while a meeting is running
pub const DEFAULT_ICON: &str = "spiral_calendar_pad";
/// Default text shown while a meeting is running
pub const DEFAULT_MESSAGE: &str = "In a meeting";

/// One concrete calendar occurrence, rebuilt on every fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    pub id: String,
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
}

/// What to say while an event runs and after it ends
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusDescriptor {
    pub icon: String,
    pub message: String,
    /// Empty means the status is cleared
    pub expires_icon: String,
    pub expires_message: String,
}

impl Default for StatusDescriptor {
    fn default() -> Self {
        Self {
            icon: DEFAULT_ICON.to_string(),
            message: DEFAULT_MESSAGE.to_string(),
            expires_icon: String::new(),
            expires_message: String::new(),
        }
    }
}

/// Memoized status for a single event id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledStatus {
    pub icon: String,
    pub message: String,
    pub expires_icon: String,
    pub expires_message: String,
    /// Tracks the event's latest end time
    pub expires_time: DateTime<FixedOffset>,
}

impl ScheduledStatus {
    pub fn new(descriptor: &StatusDescriptor, expires_time: DateTime<FixedOffset>) -> Self {
        Self {
            icon: descriptor.icon.clone(),
            message: descriptor.message.clone(),
            expires_icon: descriptor.expires_icon.clone(),
            expires_message: descriptor.expires_message.clone(),
            expires_time,
        }
    }

    /// Status to publish when the event starts
    pub fn on_enter(&self) -> StatusUpdate {
        StatusUpdate {
            message: self.message.clone(),
            icon: self.icon.clone(),
        }
    }

    /// Status to publish when the event ends
    pub fn on_exit(&self) -> StatusUpdate {
        StatusUpdate {
            message: self.expires_message.clone(),
            icon: self.expires_icon.clone(),
        }
    }
}

/// A single status change handed to the presence sink
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    pub message: String,
    /// Emoji name without colons; empty clears the icon
    pub icon: String,
}

impl StatusUpdate {
    pub fn is_clear(&self) -> bool {
        self.message.is_empty() && self.icon.is_empty()
    }
}
