use crate::components::presence::models::StatusDescriptor;
use crate::error::{config_error, env_error, SyncResult};
use chrono_tz::Tz;
use dotenvy::dotenv;
use serde::Deserialize;
use std::env;
use std::fmt;
use std::fs;
use std::str::FromStr;

/// Default calendar to watch
pub const DEFAULT_CALENDAR_ID: &str = "primary";
/// Default polling period in seconds
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;
/// Default cap on events returned per poll
pub const DEFAULT_MAX_RESULTS: u32 = 10;
/// Default bound for the identity handshake in milliseconds
pub const DEFAULT_INIT_TIMEOUT_MS: u64 = 1000;

pub const DEFAULT_GOOGLE_API_BASE: &str = "https://www.googleapis.com/calendar/v3";
pub const DEFAULT_GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const DEFAULT_SLACK_API_BASE: &str = "https://slack.com/api";

/// Location of the optional status descriptor override file
const STATUS_FILE: &str = "config/status.toml";

/// Main configuration structure
#[derive(Clone)]
pub struct Config {
    /// Google OAuth client ID
    pub google_client_id: String,
    /// Google OAuth client secret
    pub google_client_secret: String,
    /// Long-lived refresh token provisioned out of band
    pub google_refresh_token: String,
    /// Google Calendar ID to watch
    pub google_calendar_id: String,
    /// Slack user token allowed to call users.profile.set
    pub slack_token: String,
    /// Timezone used when logging event times
    pub timezone: String,
    /// Seconds between poll cycles
    pub poll_interval_secs: u64,
    /// Maximum number of upcoming events fetched per poll
    pub max_results: u32,
    /// Bound for the identity handshake
    pub init_timeout_ms: u64,
    /// Base URL of the Google Calendar v3 API
    pub google_api_base: String,
    /// Google OAuth token endpoint
    pub google_token_url: String,
    /// Base URL of the Slack Web API
    pub slack_api_base: String,
    /// Status applied to newly seen events
    pub status: StatusDescriptor,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("google_client_id", &self.google_client_id)
            .field("google_client_secret", &"<redacted>")
            .field("google_refresh_token", &"<redacted>")
            .field("google_calendar_id", &self.google_calendar_id)
            .field("slack_token", &"<redacted>")
            .field("timezone", &self.timezone)
            .field("poll_interval_secs", &self.poll_interval_secs)
            .field("max_results", &self.max_results)
            .field("init_timeout_ms", &self.init_timeout_ms)
            .field("google_api_base", &self.google_api_base)
            .field("google_token_url", &self.google_token_url)
            .field("slack_api_base", &self.slack_api_base)
            .field("status", &self.status)
            .finish()
    }
}

impl Config {
    /// Load configuration from environment and config file
    pub fn load() -> SyncResult<Self> {
        // Load .env file if it exists
        dotenv().ok();

        // Required environment variables
        let google_client_id = required("GOOGLE_CLIENT_ID")?;
        let google_client_secret = required("GOOGLE_CLIENT_SECRET")?;
        let google_refresh_token = required("GOOGLE_REFRESH_TOKEN")?;
        let slack_token = required("SLACK_TOKEN")?;

        let google_calendar_id =
            env::var("GOOGLE_CALENDAR_ID").unwrap_or_else(|_| DEFAULT_CALENDAR_ID.to_string());

        let timezone = env::var("TIMEZONE").unwrap_or_else(|_| String::from("UTC"));
        Tz::from_str(&timezone)
            .map_err(|_| config_error(&format!("Unknown timezone: {}", timezone)))?;

        // Parse numeric values
        let poll_interval_secs = parse_or("POLL_INTERVAL_SECS", DEFAULT_POLL_INTERVAL_SECS)?;
        if poll_interval_secs == 0 {
            return Err(config_error("POLL_INTERVAL_SECS must be positive"));
        }
        let max_results = parse_or("MAX_RESULTS", DEFAULT_MAX_RESULTS)?;
        let init_timeout_ms = parse_or("INIT_TIMEOUT_MS", DEFAULT_INIT_TIMEOUT_MS)?;

        let google_api_base = env::var("GOOGLE_API_BASE")
            .unwrap_or_else(|_| DEFAULT_GOOGLE_API_BASE.to_string());
        let google_token_url = env::var("GOOGLE_TOKEN_URL")
            .unwrap_or_else(|_| DEFAULT_GOOGLE_TOKEN_URL.to_string());
        let slack_api_base =
            env::var("SLACK_API_BASE").unwrap_or_else(|_| DEFAULT_SLACK_API_BASE.to_string());

        // Status overrides from file if it exists
        let status = match fs::read_to_string(STATUS_FILE) {
            Ok(content) => load_status(&content)?,
            Err(_) => StatusDescriptor::default(),
        };

        Ok(Config {
            google_client_id,
            google_client_secret,
            google_refresh_token,
            google_calendar_id,
            slack_token,
            timezone,
            poll_interval_secs,
            max_results,
            init_timeout_ms,
            google_api_base,
            google_token_url,
            slack_api_base,
            status,
        })
    }

    /// Parsed timezone, falling back to UTC
    pub fn tz(&self) -> Tz {
        Tz::from_str(&self.timezone).unwrap_or(Tz::UTC)
    }
}

/// Merge a status.toml document over the default descriptor
pub fn load_status(content: &str) -> SyncResult<StatusDescriptor> {
    let overrides: StatusOverrides = toml::from_str(content)?;
    let mut status = StatusDescriptor::default();

    if let Some(icon) = overrides.icon {
        status.icon = icon;
    }
    if let Some(message) = overrides.message {
        status.message = message;
    }
    if let Some(expires_icon) = overrides.expires_icon {
        status.expires_icon = expires_icon;
    }
    if let Some(expires_message) = overrides.expires_message {
        status.expires_message = expires_message;
    }

    Ok(status)
}

#[derive(Debug, Default, Deserialize)]
struct StatusOverrides {
    icon: Option<String>,
    message: Option<String>,
    expires_icon: Option<String>,
    expires_message: Option<String>,
}

fn required(var: &str) -> SyncResult<String> {
    env::var(var).map_err(|_| env_error(var))
}

fn parse_or<T: FromStr>(var: &str, default: T) -> SyncResult<T> {
    match env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| config_error(&format!("Invalid {} format", var))),
        Err(_) => Ok(default),
    }
}
