use async_trait::async_trait;

use super::ServiceError;

/// Linguistic correction for dialects the base transcription model handles
/// poorly. Backed by a long-lived helper process in production; the port
/// hides that lifecycle behind a stateless request/response call.
///
/// `Ok(None)` means no confident correction exists for the text.
#[async_trait]
pub trait DialectRefiner: Send + Sync {
    async fn correct(&self, text: &str) -> Result<Option<String>, ServiceError>;
}
