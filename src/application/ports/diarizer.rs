use std::path::Path;

use async_trait::async_trait;

use crate::domain::{Gender, Segment};

use super::ServiceError;

/// Speaker/voice/gender attribution for one transcript segment. The
/// contract requires exactly one annotation per input segment, same order;
/// the merge layer re-validates cardinality before applying.
#[derive(Debug, Clone)]
pub struct SpeakerAnnotation {
    pub speaker_id: String,
    pub voice_id: String,
    pub gender: Gender,
}

#[async_trait]
pub trait Diarizer: Send + Sync {
    async fn diarize(
        &self,
        audio_path: &Path,
        segments: &[Segment],
    ) -> Result<Vec<SpeakerAnnotation>, ServiceError>;
}
