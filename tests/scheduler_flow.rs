use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, SecondsFormat, Utc};
use chrono_tz::Tz;
use kalenteristatus::components::google_calendar::{CalendarEvent, EventQuery, EventTime};
use kalenteristatus::components::identity::SessionState;
use kalenteristatus::components::presence::{
    forward_session_changes, CalendarSource, EventFetcher, PollScheduler, PollSchedulerHandle,
    PresenceSink, StatusDescriptor, StatusMemo, StatusUpdate,
};
use kalenteristatus::error::{publish_error, SyncResult};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Calendar that answers after a fixed delay and counts concurrent calls
struct SlowCalendar {
    delay: Duration,
    events: Vec<CalendarEvent>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl SlowCalendar {
    fn new(delay: Duration, events: Vec<CalendarEvent>) -> Arc<Self> {
        Arc::new(Self {
            delay,
            events,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl CalendarSource for SlowCalendar {
    async fn list_upcoming(&self, _query: &EventQuery) -> SyncResult<Vec<CalendarEvent>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now_in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now_in_flight, Ordering::SeqCst);

        tokio::time::sleep(self.delay).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(self.events.clone())
    }
}

#[derive(Default)]
struct RecordingSink {
    updates: Mutex<Vec<StatusUpdate>>,
}

#[async_trait]
impl PresenceSink for RecordingSink {
    async fn set_status(&self, update: &StatusUpdate) -> SyncResult<()> {
        self.updates.lock().unwrap().push(update.clone());
        Ok(())
    }
}

/// Sink that rejects every publish
#[derive(Default)]
struct FailingSink {
    attempts: AtomicUsize,
}

#[async_trait]
impl PresenceSink for FailingSink {
    async fn set_status(&self, _update: &StatusUpdate) -> SyncResult<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(publish_error("invalid_auth"))
    }
}

/// A meeting starting right now on the wall clock
fn meeting_starting_now() -> CalendarEvent {
    let now = Utc::now();
    CalendarEvent {
        id: "planning".to_string(),
        start: EventTime::at(&now.to_rfc3339_opts(SecondsFormat::Secs, true)),
        end: EventTime::at(
            &(now + ChronoDuration::minutes(45)).to_rfc3339_opts(SecondsFormat::Secs, true),
        ),
        ..Default::default()
    }
}

fn spawn_scheduler(calendar: Arc<SlowCalendar>, sink: Arc<dyn PresenceSink>) -> PollSchedulerHandle {
    let fetcher = EventFetcher::new(calendar, "primary", 10, Tz::UTC);
    let (mut scheduler, handle) = PollScheduler::new(
        fetcher,
        StatusMemo::new(StatusDescriptor::default()),
        sink,
        Duration::from_secs(60),
    );
    tokio::spawn(async move {
        scheduler.run().await;
    });
    handle
}

#[tokio::test(start_paused = true)]
async fn test_sign_in_publishes_meeting_status() {
    let calendar = SlowCalendar::new(Duration::from_millis(100), vec![meeting_starting_now()]);
    let sink = Arc::new(RecordingSink::default());
    let handle = spawn_scheduler(calendar.clone(), sink.clone());

    handle.sign_in("me@example.com").await.unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;

    let updates = sink.updates.lock().unwrap();
    assert_eq!(calendar.calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        *updates,
        vec![StatusUpdate {
            message: "In a meeting".to_string(),
            icon: "spiral_calendar_pad".to_string(),
        }]
    );
}

#[tokio::test(start_paused = true)]
async fn test_failed_publish_keeps_polling() {
    let calendar = SlowCalendar::new(Duration::ZERO, vec![meeting_starting_now()]);
    let sink = Arc::new(FailingSink::default());
    let handle = spawn_scheduler(calendar.clone(), sink.clone());

    handle.sign_in("me@example.com").await.unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(sink.attempts.load(Ordering::SeqCst), 1);

    // The next tick still fetches and detects after the rejected publish
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(calendar.calls.load(Ordering::SeqCst), 2);
    assert_eq!(sink.attempts.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_slow_fetch_never_overlaps() {
    // Each fetch outlasts the 60 s period
    let calendar = SlowCalendar::new(Duration::from_secs(90), Vec::new());
    let sink = Arc::new(RecordingSink::default());
    let handle = spawn_scheduler(calendar.clone(), sink);

    handle.sign_in("me@example.com").await.unwrap();
    tokio::time::sleep(Duration::from_secs(600)).await;

    assert!(calendar.calls.load(Ordering::SeqCst) >= 2);
    assert_eq!(calendar.max_in_flight.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_sign_out_during_fetch_suppresses_publish() {
    let calendar = SlowCalendar::new(Duration::from_secs(5), vec![meeting_starting_now()]);
    let sink = Arc::new(RecordingSink::default());
    let handle = spawn_scheduler(calendar.clone(), sink.clone());

    handle.sign_in("me@example.com").await.unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;
    handle.sign_out().await.unwrap();

    // Long enough for the late result and several would-be ticks
    tokio::time::sleep(Duration::from_secs(300)).await;

    assert!(sink.updates.lock().unwrap().is_empty());
    assert_eq!(calendar.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_repeated_sign_in_keeps_one_timer() {
    let calendar = SlowCalendar::new(Duration::ZERO, Vec::new());
    let sink = Arc::new(RecordingSink::default());
    let handle = spawn_scheduler(calendar.clone(), sink);

    handle.sign_in("me@example.com").await.unwrap();
    tokio::time::sleep(Duration::from_secs(30)).await;
    handle.sign_in("me@example.com").await.unwrap();
    tokio::time::sleep(Duration::from_secs(31)).await;

    // Two sign-in cycles plus the tick of the original timer at 60 s
    assert_eq!(calendar.calls.load(Ordering::SeqCst), 3);

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(calendar.calls.load(Ordering::SeqCst), 4);
}

#[tokio::test(start_paused = true)]
async fn test_run_now_is_ignored_while_signed_out() {
    let calendar = SlowCalendar::new(Duration::ZERO, Vec::new());
    let sink = Arc::new(RecordingSink::default());
    let handle = spawn_scheduler(calendar.clone(), sink);

    handle.run_now().await.unwrap();
    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(calendar.calls.load(Ordering::SeqCst), 0);

    handle.sign_in("me@example.com").await.unwrap();
    handle.run_now().await.unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(calendar.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_session_changes_drive_the_scheduler() {
    let calendar = SlowCalendar::new(Duration::ZERO, Vec::new());
    let sink = Arc::new(RecordingSink::default());
    let handle = spawn_scheduler(calendar.clone(), sink);

    let (session_tx, session_rx) = watch::channel(SessionState::signed_out());
    let cancel = CancellationToken::new();
    let forwarder = tokio::spawn(forward_session_changes(
        session_rx,
        handle.clone(),
        cancel.clone(),
    ));

    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(calendar.calls.load(Ordering::SeqCst), 0);

    session_tx.send_replace(SessionState::signed_in("me@example.com"));
    tokio::time::sleep(Duration::from_secs(61)).await;
    assert_eq!(calendar.calls.load(Ordering::SeqCst), 2);

    session_tx.send_replace(SessionState::signed_out());
    tokio::time::sleep(Duration::from_secs(300)).await;
    assert_eq!(calendar.calls.load(Ordering::SeqCst), 2);

    cancel.cancel();
    forwarder.await.unwrap();
    handle.shutdown().await.unwrap();
}
