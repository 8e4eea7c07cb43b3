use async_trait::async_trait;

use crate::domain::Segment;

use super::ServiceError;

#[derive(Debug, Clone)]
pub struct Transcript {
    pub detected_language: Option<String>,
    pub segments: Vec<Segment>,
}

/// Speech-to-text collaborator: audio in, timed segments plus a detected
/// language out.
#[async_trait]
pub trait SttEngine: Send + Sync {
    async fn transcribe(
        &self,
        audio: &[u8],
        language_hint: Option<&str>,
    ) -> Result<Transcript, ServiceError>;
}
