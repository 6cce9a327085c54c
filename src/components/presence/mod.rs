pub mod detector;
pub mod fetcher;
pub mod memo;
pub mod models;
pub mod scheduler;
pub mod sink;

pub use detector::{detect, Transition};
pub use fetcher::{CalendarSource, EventFetcher};
pub use memo::StatusMemo;
pub use models::{EventRecord, ScheduledStatus, StatusDescriptor, StatusUpdate};
pub use scheduler::{forward_session_changes, PollScheduler, PollSchedulerHandle};
pub use sink::PresenceSink;

use super::google_calendar::GoogleCalendarHandle;
use super::identity::{GoogleIdentity, IdentityProvider};
use super::slack::SlackPresence;
use crate::config::Config;
use crate::error::SyncResult;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

struct Running {
    calendar: GoogleCalendarHandle,
    identity: Arc<GoogleIdentity>,
    scheduler: PollSchedulerHandle,
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

/// Keeps the Slack status in sync with Google Calendar meetings
#[derive(Default)]
pub struct PresenceSync {
    running: RwLock<Option<Running>>,
    unavailable: RwLock<bool>,
}

impl PresenceSync {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when the identity layer failed to initialize
    pub async fn is_unavailable(&self) -> bool {
        *self.unavailable.read().await
    }

    /// Identity provider, once initialized
    pub async fn identity(&self) -> Option<Arc<GoogleIdentity>> {
        self.running.read().await.as_ref().map(|r| Arc::clone(&r.identity))
    }
}

#[async_trait]
impl super::Component for PresenceSync {
    fn name(&self) -> &'static str {
        "presence_sync"
    }

    async fn init(&self, config: Arc<RwLock<Config>>) -> SyncResult<()> {
        let mut running = self.running.write().await;
        if running.is_some() {
            return Ok(());
        }

        let (calendar_id, max_results, tz, period, init_timeout, status) = {
            let config_read = config.read().await;
            (
                config_read.google_calendar_id.clone(),
                config_read.max_results,
                config_read.tz(),
                Duration::from_secs(config_read.poll_interval_secs),
                Duration::from_millis(config_read.init_timeout_ms),
                config_read.status.clone(),
            )
        };

        let calendar = GoogleCalendarHandle::new(Arc::clone(&config));
        let sink = Arc::new(SlackPresence::new(Arc::clone(&config)));
        let identity = Arc::new(GoogleIdentity::new(calendar.clone(), init_timeout));

        let fetcher = EventFetcher::new(Arc::new(calendar.clone()), &calendar_id, max_results, tz);
        let (mut scheduler, handle) =
            PollScheduler::new(fetcher, StatusMemo::new(status), sink, period);

        let mut tasks = Vec::new();
        tasks.push(tokio::spawn(async move {
            scheduler.run().await;
        }));

        let cancel = CancellationToken::new();
        tasks.push(tokio::spawn(forward_session_changes(
            identity.subscribe(),
            handle.clone(),
            cancel.clone(),
        )));

        let init_result = identity.init().await;

        *running = Some(Running {
            calendar,
            identity,
            scheduler: handle,
            cancel,
            tasks,
        });

        if let Err(e) = init_result {
            error!("Calendar sign-in unavailable: {}", e);
            *self.unavailable.write().await = true;
            return Err(e);
        }

        info!("Presence sync running");
        Ok(())
    }

    async fn shutdown(&self) -> SyncResult<()> {
        if let Some(running) = self.running.write().await.take() {
            running.cancel.cancel();
            running.scheduler.shutdown().await?;
            running.calendar.shutdown().await?;
            for task in running.tasks {
                let _ = task.await;
            }
        }
        Ok(())
    }
}
