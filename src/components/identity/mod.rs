use crate::components::google_calendar::GoogleCalendarHandle;
use crate::error::{initialization_error, Error, SyncResult};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::timeout;
use tracing::{info, warn};

/// Signed-in state as reported by the identity provider
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionState {
    pub signed_in: bool,
    /// Account identity, present only while signed in
    pub user: Option<String>,
}

impl SessionState {
    pub fn signed_in(user: impl Into<String>) -> Self {
        Self {
            signed_in: true,
            user: Some(user.into()),
        }
    }

    pub fn signed_out() -> Self {
        Self::default()
    }
}

/// Source of the current session and of sign-in/sign-out notifications
pub trait IdentityProvider: Send + Sync {
    fn session(&self) -> SessionState;

    /// Receiver that observes every later session change
    fn subscribe(&self) -> watch::Receiver<SessionState>;
}

/// Identity backed by the configured Google refresh token.
///
/// Signing in means obtaining an access token and reading the primary
/// calendar, whose id is the account address.
pub struct GoogleIdentity {
    calendar: GoogleCalendarHandle,
    init_timeout: Duration,
    state_tx: watch::Sender<SessionState>,
}

impl GoogleIdentity {
    pub fn new(calendar: GoogleCalendarHandle, init_timeout: Duration) -> Self {
        let (state_tx, _) = watch::channel(SessionState::signed_out());
        Self {
            calendar,
            init_timeout,
            state_tx,
        }
    }

    /// First handshake with Google, bounded by the init timeout
    pub async fn init(&self) -> SyncResult<()> {
        self.sign_in().await
    }

    /// Verify the credentials and publish a signed-in session
    pub async fn sign_in(&self) -> SyncResult<()> {
        let user = match timeout(self.init_timeout, self.calendar.primary_calendar()).await {
            Ok(Ok(user)) => user,
            Ok(Err(Error::Fetch(message))) => {
                return Err(initialization_error(&message));
            }
            Ok(Err(e)) => return Err(e),
            Err(_) => {
                return Err(initialization_error(&format!(
                    "Google did not answer within {:?}",
                    self.init_timeout
                )));
            }
        };

        info!("Signed in as {}", user);
        self.state_tx.send_replace(SessionState::signed_in(user));
        Ok(())
    }

    /// Drop the access token and publish a signed-out session
    pub async fn sign_out(&self) {
        if let Err(e) = self.calendar.forget_token().await {
            warn!("Failed to drop cached token: {}", e);
        }
        info!("Signed out");
        self.state_tx.send_replace(SessionState::signed_out());
    }
}

impl IdentityProvider for GoogleIdentity {
    fn session(&self) -> SessionState {
        self.state_tx.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }
}
