use super::models::{EventRecord, ScheduledStatus, StatusDescriptor};
use std::collections::HashMap;
use tracing::debug;

/// Per-event status bookkeeping kept across poll cycles.
///
/// Entries are created the first time an id shows up and are never evicted, so
/// the table grows by one entry per distinct event seen during the process
/// lifetime. Ids that scroll out of the fetch window keep their stale entries.
#[derive(Debug, Default)]
pub struct StatusMemo {
    defaults: StatusDescriptor,
    entries: HashMap<String, ScheduledStatus>,
}

impl StatusMemo {
    pub fn new(defaults: StatusDescriptor) -> Self {
        Self {
            defaults,
            entries: HashMap::new(),
        }
    }

    /// Record newly seen events and refresh expiry times of known ones.
    ///
    /// Only `expires_time` follows edits to an event; the text and icons stay
    /// as they were when the id was first seen.
    pub fn reconcile(&mut self, events: &[EventRecord]) {
        for event in events {
            match self.entries.get_mut(&event.id) {
                Some(entry) => entry.expires_time = event.end,
                None => {
                    debug!("Memoizing status for event {}", event.id);
                    self.entries
                        .insert(event.id.clone(), ScheduledStatus::new(&self.defaults, event.end));
                }
            }
        }
    }

    pub fn lookup(&self, id: &str) -> Option<&ScheduledStatus> {
        self.entries.get(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
