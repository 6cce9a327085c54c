use super::actor::GoogleCalendarActorHandle;
use super::models::{CalendarEvent, EventQuery};
use crate::components::presence::CalendarSource;
use crate::config::Config;
use crate::error::SyncResult;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

/// Handle for interacting with the Google Calendar actor
#[derive(Clone)]
pub struct GoogleCalendarHandle {
    actor_handle: GoogleCalendarActorHandle,
    _actor_task: Arc<JoinHandle<()>>,
}

impl GoogleCalendarHandle {
    /// Create a new GoogleCalendarHandle and spawn the actor
    pub fn new(config: Arc<RwLock<Config>>) -> Self {
        use super::actor::GoogleCalendarActor;

        // Create the actor and get its handle
        let (mut actor, handle) = GoogleCalendarActor::new(config);

        // Spawn a task to run the actor
        let actor_task = tokio::spawn(async move {
            actor.run().await;
        });

        Self {
            actor_handle: handle,
            _actor_task: Arc::new(actor_task),
        }
    }

    /// Id of the signed-in account's primary calendar
    pub async fn primary_calendar(&self) -> SyncResult<String> {
        self.actor_handle.primary_calendar().await
    }

    /// Drop the cached access token
    pub async fn forget_token(&self) -> SyncResult<()> {
        self.actor_handle.forget_token().await
    }

    /// Shutdown the actor
    pub async fn shutdown(&self) -> SyncResult<()> {
        self.actor_handle.shutdown().await
    }
}

#[async_trait]
impl CalendarSource for GoogleCalendarHandle {
    async fn list_upcoming(&self, query: &EventQuery) -> SyncResult<Vec<CalendarEvent>> {
        self.actor_handle.list_upcoming(query.clone()).await
    }
}
