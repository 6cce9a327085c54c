use crate::components::presence::{PresenceSink, StatusUpdate};
use crate::config::Config;
use crate::error::{publish_error, SyncResult};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Body of a users.profile.set call
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct ProfileRequest {
    pub profile: Profile,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct Profile {
    pub status_text: String,
    pub status_emoji: String,
    /// Zero means the status never expires on its own
    pub status_expiration: i64,
}

impl ProfileRequest {
    pub fn from_update(update: &StatusUpdate) -> Self {
        Self {
            profile: Profile {
                status_text: update.message.clone(),
                status_emoji: emoji_for(&update.icon),
                status_expiration: 0,
            },
        }
    }
}

/// Wrap an emoji name in colons; names shorter than two characters clear it
pub fn emoji_for(icon: &str) -> String {
    if icon.chars().count() > 1 {
        format!(":{}:", icon.trim_matches(':'))
    } else {
        String::new()
    }
}

#[derive(Debug, Deserialize)]
struct SlackResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

/// Presence sink that writes the Slack profile status
pub struct SlackPresence {
    config: Arc<RwLock<Config>>,
    client: Client,
}

impl SlackPresence {
    pub fn new(config: Arc<RwLock<Config>>) -> Self {
        Self {
            config,
            client: Client::new(),
        }
    }
}

#[async_trait]
impl PresenceSink for SlackPresence {
    async fn set_status(&self, update: &StatusUpdate) -> SyncResult<()> {
        let (base, token) = {
            let config_read = self.config.read().await;
            (config_read.slack_api_base.clone(), config_read.slack_token.clone())
        };

        let url = format!("{}/users.profile.set", base.trim_end_matches('/'));
        let response = self
            .client
            .post(url)
            .bearer_auth(token)
            .json(&ProfileRequest::from_update(update))
            .send()
            .await
            .map_err(|e| publish_error(&format!("Failed to reach Slack: {}", e)))?;

        if !response.status().is_success() {
            return Err(publish_error(&format!("Slack answered HTTP {}", response.status())));
        }

        let body: SlackResponse = response
            .json()
            .await
            .map_err(|e| publish_error(&format!("Failed to parse Slack response: {}", e)))?;

        if body.ok {
            Ok(())
        } else {
            Err(publish_error(
                body.error.as_deref().unwrap_or("Slack rejected the status"),
            ))
        }
    }
}
