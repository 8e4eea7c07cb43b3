use std::time::Duration;

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::Sha256;

use crate::application::ports::{JobNotification, WebhookError, WebhookNotifier};

pub const SIGNATURE_HEADER: &str = "X-Signature";

const DELIVERY_TIMEOUT: Duration = Duration::from_secs(5);

type HmacSha256 = Hmac<Sha256>;

/// HMAC-SHA256 of the exact serialized body, rendered the way the receiver
/// verifies it: `sha256=<hex>`.
pub fn sign_payload(secret: &[u8], body: &[u8]) -> Result<String, WebhookError> {
    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| WebhookError::Serialization(format!("hmac key: {}", e)))?;
    mac.update(body);
    Ok(format!("sha256={}", hex::encode(mac.finalize().into_bytes())))
}

/// One signed POST per terminal job status, bounded timeout, no retries:
/// a caller that misses the delivery re-polls the status endpoint.
pub struct HttpWebhookNotifier {
    client: reqwest::Client,
    secret: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WebhookPayload<'a> {
    job_id: String,
    status: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    result_url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
}

impl HttpWebhookNotifier {
    pub fn new(secret: &str) -> Result<Self, WebhookError> {
        let client = reqwest::Client::builder()
            .timeout(DELIVERY_TIMEOUT)
            .build()
            .map_err(|e| WebhookError::DeliveryFailed(format!("building client: {}", e)))?;
        Ok(Self {
            client,
            secret: secret.to_string(),
        })
    }
}

#[async_trait]
impl WebhookNotifier for HttpWebhookNotifier {
    async fn notify(&self, notification: &JobNotification) -> Result<(), WebhookError> {
        let payload = WebhookPayload {
            job_id: notification.job_id.to_string(),
            status: notification.status.as_str(),
            result_url: notification.result_url.as_deref(),
            error: notification.error.as_deref(),
        };

        let body = serde_json::to_vec(&payload)
            .map_err(|e| WebhookError::Serialization(e.to_string()))?;
        let signature = sign_payload(self.secret.as_bytes(), &body)?;

        let response = self
            .client
            .post(&notification.callback_url)
            .header(SIGNATURE_HEADER, signature)
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| WebhookError::DeliveryFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(WebhookError::RejectedByReceiver(response.status().as_u16()));
        }

        tracing::info!(
            job_id = %notification.job_id,
            status = %notification.status,
            "Webhook delivered"
        );
        Ok(())
    }
}
