use async_trait::async_trait;

use crate::domain::Segment;

use super::ServiceError;

/// Machine-translation collaborator: one output text per input segment,
/// same order. A response of any other shape is discarded by the caller.
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(
        &self,
        segments: &[Segment],
        source_lang: &str,
        target_lang: &str,
    ) -> Result<Vec<String>, ServiceError>;
}
