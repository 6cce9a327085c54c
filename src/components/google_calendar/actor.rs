use super::models::{CalendarEvent, EventQuery, EventsPage};
use super::token::TokenManager;
use crate::config::Config;
use crate::error::{fetch_error, SyncResult};
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info};
use url::Url;

/// The Google Calendar actor that processes messages
pub struct GoogleCalendarActor {
    config: Arc<RwLock<Config>>,
    token_manager: TokenManager,
    client: Client,
    command_rx: mpsc::Receiver<GoogleCalendarCommand>,
}

/// Commands that can be sent to the Google Calendar actor
pub enum GoogleCalendarCommand {
    ListUpcoming(EventQuery, mpsc::Sender<SyncResult<Vec<CalendarEvent>>>),
    PrimaryCalendar(mpsc::Sender<SyncResult<String>>),
    ForgetToken(mpsc::Sender<()>),
    Shutdown,
}

/// Handle for communicating with the Google Calendar actor
#[derive(Clone)]
pub struct GoogleCalendarActorHandle {
    command_tx: mpsc::Sender<GoogleCalendarCommand>,
}

impl GoogleCalendarActorHandle {
    /// List events matching the query
    pub async fn list_upcoming(&self, query: EventQuery) -> SyncResult<Vec<CalendarEvent>> {
        let (response_tx, mut response_rx) = mpsc::channel(1);
        self.command_tx
            .send(GoogleCalendarCommand::ListUpcoming(query, response_tx))
            .await
            .map_err(|e| fetch_error(&format!("Actor mailbox error: {}", e)))?;

        response_rx
            .recv()
            .await
            .ok_or_else(|| fetch_error("Response channel closed"))?
    }

    /// Id of the signed-in account's primary calendar
    pub async fn primary_calendar(&self) -> SyncResult<String> {
        let (response_tx, mut response_rx) = mpsc::channel(1);
        self.command_tx
            .send(GoogleCalendarCommand::PrimaryCalendar(response_tx))
            .await
            .map_err(|e| fetch_error(&format!("Actor mailbox error: {}", e)))?;

        response_rx
            .recv()
            .await
            .ok_or_else(|| fetch_error("Response channel closed"))?
    }

    /// Drop the cached access token
    pub async fn forget_token(&self) -> SyncResult<()> {
        let (response_tx, mut response_rx) = mpsc::channel(1);
        self.command_tx
            .send(GoogleCalendarCommand::ForgetToken(response_tx))
            .await
            .map_err(|e| fetch_error(&format!("Actor mailbox error: {}", e)))?;

        response_rx
            .recv()
            .await
            .ok_or_else(|| fetch_error("Response channel closed"))
    }

    /// Shutdown the actor
    pub async fn shutdown(&self) -> SyncResult<()> {
        let _ = self.command_tx.send(GoogleCalendarCommand::Shutdown).await;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct CalendarResource {
    id: String,
}

impl GoogleCalendarActor {
    /// Create a new actor and return its handle
    pub fn new(config: Arc<RwLock<Config>>) -> (Self, GoogleCalendarActorHandle) {
        let (command_tx, command_rx) = mpsc::channel(32);
        let client = Client::new();

        let actor = Self {
            config: Arc::clone(&config),
            token_manager: TokenManager::new(Arc::clone(&config), client.clone()),
            client,
            command_rx,
        };

        let handle = GoogleCalendarActorHandle { command_tx };

        (actor, handle)
    }

    /// Start the actor's processing loop
    pub async fn run(&mut self) {
        info!("Google Calendar actor started");

        // Process commands
        while let Some(cmd) = self.command_rx.recv().await {
            match cmd {
                GoogleCalendarCommand::ListUpcoming(query, response_tx) => {
                    let result = self.list_upcoming(&query).await;
                    let _ = response_tx.send(result).await;
                }
                GoogleCalendarCommand::PrimaryCalendar(response_tx) => {
                    let result = self.primary_calendar().await;
                    let _ = response_tx.send(result).await;
                }
                GoogleCalendarCommand::ForgetToken(response_tx) => {
                    self.token_manager.clear().await;
                    let _ = response_tx.send(()).await;
                }
                GoogleCalendarCommand::Shutdown => {
                    info!("Google Calendar actor shutting down");
                    break;
                }
            }
        }

        info!("Google Calendar actor shut down");
    }

    async fn calendar_url(&self, calendar_id: &str, tail: Option<&str>) -> SyncResult<Url> {
        let base = {
            let config_read = self.config.read().await;
            config_read.google_api_base.clone()
        };

        let mut url = Url::parse(&base)
            .map_err(|e| fetch_error(&format!("Failed to parse URL: {}", e)))?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| fetch_error("Calendar API base cannot carry a path"))?;
            segments.pop_if_empty().push("calendars").push(calendar_id);
            if let Some(tail) = tail {
                segments.push(tail);
            }
        }

        Ok(url)
    }

    /// List events from the calendar
    async fn list_upcoming(&self, query: &EventQuery) -> SyncResult<Vec<CalendarEvent>> {
        let access_token = self.token_manager.get_token().await?;

        let mut url = self.calendar_url(&query.calendar_id, Some("events")).await?;
        url.query_pairs_mut()
            .append_pair("timeMin", &query.time_min)
            .append_pair("showDeleted", &query.show_deleted.to_string())
            .append_pair("singleEvents", &query.single_events.to_string())
            .append_pair("maxResults", &query.max_results.to_string())
            .append_pair("orderBy", query.order_by.as_str());

        debug!("Listing events from calendar {}", query.calendar_id);

        // Make API request
        let response = self
            .client
            .get(url)
            .bearer_auth(&access_token)
            .send()
            .await
            .map_err(|e| fetch_error(&format!("Failed to fetch events: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Could not read error response".to_string());
            return Err(fetch_error(&format!(
                "Failed to fetch events: HTTP {} - {}",
                status, error_body
            )));
        }

        let page: EventsPage = response
            .json()
            .await
            .map_err(|e| fetch_error(&format!("Failed to parse events response: {}", e)))?;

        Ok(page.items)
    }

    /// Read the primary calendar, whose id is the account address
    async fn primary_calendar(&self) -> SyncResult<String> {
        let access_token = self.token_manager.get_token().await?;
        let url = self.calendar_url("primary", None).await?;

        let response = self
            .client
            .get(url)
            .bearer_auth(&access_token)
            .send()
            .await
            .map_err(|e| fetch_error(&format!("Failed to fetch primary calendar: {}", e)))?;

        if !response.status().is_success() {
            return Err(fetch_error(&format!(
                "Failed to fetch primary calendar: HTTP {}",
                response.status()
            )));
        }

        let calendar: CalendarResource = response
            .json()
            .await
            .map_err(|e| fetch_error(&format!("Failed to parse calendar response: {}", e)))?;

        Ok(calendar.id)
    }
}
