use async_trait::async_trait;

use crate::domain::{JobId, JobStatus};

/// Terminal-status notification delivered to the caller-supplied callback
/// URL. `result_url` is present only for `done`, `error` only for `failed`.
#[derive(Debug, Clone)]
pub struct JobNotification {
    pub job_id: JobId,
    pub status: JobStatus,
    pub result_url: Option<String>,
    pub error: Option<String>,
    pub callback_url: String,
}

/// Delivers signed, at-least-once status notifications. Delivery failures
/// are the caller's problem to recover from (re-poll); the notifier makes a
/// single bounded-timeout attempt and reports the outcome.
#[async_trait]
pub trait WebhookNotifier: Send + Sync {
    async fn notify(&self, notification: &JobNotification) -> Result<(), WebhookError>;
}

#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("payload serialization failed: {0}")]
    Serialization(String),
    #[error("delivery failed: {0}")]
    DeliveryFailed(String),
    #[error("callback responded with status {0}")]
    RejectedByReceiver(u16),
}
