use super::models::StatusUpdate;
use crate::error::SyncResult;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Anything that can display the user's current status
#[async_trait]
pub trait PresenceSink: Send + Sync {
    async fn set_status(&self, update: &StatusUpdate) -> SyncResult<()>;
}

/// Publish without waiting for the outcome. Failures are logged and never retried.
pub fn publish_in_background(sink: Arc<dyn PresenceSink>, update: StatusUpdate) -> JoinHandle<()> {
    tokio::spawn(async move {
        match sink.set_status(&update).await {
            Ok(()) if update.is_clear() => info!("Status cleared"),
            Ok(()) => info!("Status set to {:?} :{}:", update.message, update.icon),
            Err(e) => error!("Failed to publish status: {}", e),
        }
    })
}
