use crate::config::Config;
use crate::error::{fetch_error, SyncResult};
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Refresh this long before the token actually expires
const EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    expires_in: Option<i64>,
}

/// Keeps a Google access token fresh using the configured refresh token.
///
/// The access token lives only in memory and is lost on restart.
#[derive(Clone)]
pub struct TokenManager {
    config: Arc<RwLock<Config>>,
    client: Client,
    cached: Arc<RwLock<Option<AccessToken>>>,
}

impl TokenManager {
    pub fn new(config: Arc<RwLock<Config>>, client: Client) -> Self {
        Self {
            config,
            client,
            cached: Arc::new(RwLock::new(None)),
        }
    }

    /// Get a valid access token, refreshing it when missing or about to expire
    pub async fn get_token(&self) -> SyncResult<String> {
        {
            let cached = self.cached.read().await;
            if let Some(token) = cached.as_ref() {
                if token.expires_at - Duration::seconds(EXPIRY_MARGIN_SECS) > Utc::now() {
                    return Ok(token.value.clone());
                }
            }
        }

        let token = self.refresh_token().await?;
        let value = token.value.clone();
        *self.cached.write().await = Some(token);
        Ok(value)
    }

    /// Forget the cached access token
    pub async fn clear(&self) {
        *self.cached.write().await = None;
    }

    async fn refresh_token(&self) -> SyncResult<AccessToken> {
        let (token_url, params) = {
            let config_read = self.config.read().await;
            (
                config_read.google_token_url.clone(),
                [
                    ("client_id", config_read.google_client_id.clone()),
                    ("client_secret", config_read.google_client_secret.clone()),
                    ("refresh_token", config_read.google_refresh_token.clone()),
                    ("grant_type", "refresh_token".to_string()),
                ],
            )
        };

        debug!("Refreshing Google access token");

        let response = self
            .client
            .post(&token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| fetch_error(&format!("Failed to refresh token: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Could not read error response".to_string());
            return Err(fetch_error(&format!(
                "Failed to refresh token: HTTP {} - {}",
                status, error_body
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| fetch_error(&format!("Failed to parse token response: {}", e)))?;

        let value = token
            .access_token
            .ok_or_else(|| fetch_error("Token response missing 'access_token' field"))?;
        let expires_in = token.expires_in.unwrap_or(3600);

        Ok(AccessToken {
            value,
            expires_at: Utc::now() + Duration::seconds(expires_in),
        })
    }
}
