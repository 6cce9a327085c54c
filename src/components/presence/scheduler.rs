use super::detector::{detect, Transition};
use super::fetcher::EventFetcher;
use super::memo::StatusMemo;
use super::models::EventRecord;
use super::sink::{publish_in_background, PresenceSink};
use crate::components::identity::SessionState;
use crate::error::{component_error, SyncResult};
use crate::utils::time::format_local;
use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Commands that can be sent to the poll scheduler
#[derive(Debug)]
pub enum SchedulerCommand {
    SignIn(String),
    SignOut,
    RunNow,
    Shutdown,
}

/// Handle for communicating with the poll scheduler
#[derive(Clone)]
pub struct PollSchedulerHandle {
    command_tx: mpsc::Sender<SchedulerCommand>,
    epoch: Arc<AtomicU64>,
}

impl PollSchedulerHandle {
    /// Start polling for `user`. Polling that is already running keeps its timer.
    pub async fn sign_in(&self, user: impl Into<String>) -> SyncResult<()> {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.send(SchedulerCommand::SignIn(user.into())).await
    }

    /// Stop polling and forget the current event list
    pub async fn sign_out(&self) -> SyncResult<()> {
        // Bump before queueing: a fetch already in flight must see the change
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.send(SchedulerCommand::SignOut).await
    }

    /// Run one poll cycle now if polling is active
    pub async fn run_now(&self) -> SyncResult<()> {
        self.send(SchedulerCommand::RunNow).await
    }

    /// Shutdown the scheduler
    pub async fn shutdown(&self) -> SyncResult<()> {
        let _ = self.command_tx.send(SchedulerCommand::Shutdown).await;
        Ok(())
    }

    async fn send(&self, cmd: SchedulerCommand) -> SyncResult<()> {
        self.command_tx
            .send(cmd)
            .await
            .map_err(|e| component_error(&format!("Scheduler mailbox error: {}", e)))
    }
}

enum Wake {
    Command(Option<SchedulerCommand>),
    Tick,
}

/// Owns the polling timer and every piece of mutable poll state.
///
/// Poll cycles run inline in the actor loop, so a slow fetch delays the next
/// tick instead of overlapping with it.
pub struct PollScheduler {
    fetcher: EventFetcher,
    memo: StatusMemo,
    sink: Arc<dyn PresenceSink>,
    period: Duration,
    events: Vec<EventRecord>,
    user: Option<String>,
    ticker: Option<Interval>,
    epoch: Arc<AtomicU64>,
    command_rx: mpsc::Receiver<SchedulerCommand>,
}

impl PollScheduler {
    /// Create a new scheduler and return its handle
    pub fn new(
        fetcher: EventFetcher,
        memo: StatusMemo,
        sink: Arc<dyn PresenceSink>,
        period: Duration,
    ) -> (Self, PollSchedulerHandle) {
        let (command_tx, command_rx) = mpsc::channel(32);
        let epoch = Arc::new(AtomicU64::new(0));

        let scheduler = Self {
            fetcher,
            memo,
            sink,
            period,
            events: Vec::new(),
            user: None,
            ticker: None,
            epoch: Arc::clone(&epoch),
            command_rx,
        };

        (scheduler, PollSchedulerHandle { command_tx, epoch })
    }

    pub fn is_running(&self) -> bool {
        self.ticker.is_some()
    }

    /// Start the scheduler's processing loop
    pub async fn run(&mut self) {
        info!("Poll scheduler started");

        loop {
            let wake = tokio::select! {
                cmd = self.command_rx.recv() => Wake::Command(cmd),
                _ = next_tick(&mut self.ticker) => Wake::Tick,
            };

            match wake {
                Wake::Tick => {
                    self.run_cycle().await;
                }
                Wake::Command(Some(SchedulerCommand::SignIn(user))) => self.start(user).await,
                Wake::Command(Some(SchedulerCommand::SignOut)) => self.stop(),
                Wake::Command(Some(SchedulerCommand::RunNow)) => {
                    if self.is_running() {
                        self.run_cycle().await;
                    } else {
                        debug!("Ignoring poll request while signed out");
                    }
                }
                Wake::Command(Some(SchedulerCommand::Shutdown)) | Wake::Command(None) => {
                    info!("Poll scheduler shutting down");
                    break;
                }
            }
        }

        self.stop();
        info!("Poll scheduler shut down");
    }

    async fn start(&mut self, user: String) {
        if self.ticker.is_none() {
            info!("Polling calendar for {} every {:?}", user, self.period);
            let mut ticker = interval_at(Instant::now() + self.period, self.period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            self.ticker = Some(ticker);
        } else {
            debug!("Polling already running, keeping the current timer");
        }
        self.user = Some(user);

        self.run_cycle().await;
    }

    fn stop(&mut self) {
        if self.ticker.take().is_some() {
            info!("Stopped polling calendar");
        }
        self.events.clear();
        self.user = None;
    }

    /// Fetch, reconcile, detect and maybe publish
    async fn run_cycle(&mut self) -> Transition {
        debug!(
            "Running poll cycle for {}",
            self.user.as_deref().unwrap_or("signed-out session")
        );
        let epoch = self.epoch.load(Ordering::SeqCst);
        let fetched = self.fetcher.fetch_upcoming(Utc::now()).await;

        if self.epoch.load(Ordering::SeqCst) != epoch {
            debug!("Session changed during fetch, discarding result");
            return Transition::None;
        }

        match fetched {
            Ok(events) => {
                self.memo.reconcile(&events);
                self.events = events;
                if let Some(next) = self.events.first() {
                    debug!(
                        "Next event {} runs {} - {}",
                        next.id,
                        format_local(&next.start, self.fetcher.tz()),
                        format_local(&next.end, self.fetcher.tz())
                    );
                }
            }
            Err(e) => {
                warn!("Skipping poll cycle: {}", e);
                return Transition::None;
            }
        }

        let transition = detect(&self.events, &self.memo, Utc::now());
        match &transition {
            Transition::Enter(update) => {
                info!("Meeting started, setting status");
                publish_in_background(Arc::clone(&self.sink), update.clone());
            }
            Transition::Exit(update) => {
                info!("Meeting ended, restoring status");
                publish_in_background(Arc::clone(&self.sink), update.clone());
            }
            Transition::None => {}
        }

        transition
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

/// Turn identity changes into scheduler commands until cancelled
pub async fn forward_session_changes(
    mut session_rx: watch::Receiver<SessionState>,
    handle: PollSchedulerHandle,
    cancel: CancellationToken,
) {
    loop {
        let session = session_rx.borrow_and_update().clone();
        let result = match (session.signed_in, session.user) {
            (true, Some(user)) => handle.sign_in(user).await,
            (true, None) => handle.sign_in("unknown").await,
            (false, _) => handle.sign_out().await,
        };

        if let Err(e) = result {
            warn!("Stopped forwarding session changes: {}", e);
            break;
        }

        tokio::select! {
            changed = session_rx.changed() => {
                if changed.is_err() {
                    debug!("Identity provider went away");
                    break;
                }
            }
            _ = cancel.cancelled() => break,
        }
    }
}
