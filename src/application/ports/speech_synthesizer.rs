use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::domain::Segment;

use super::ServiceError;

/// Speech-synthesis collaborator: renders one continuous audio track for a
/// segment sequence, honoring each segment's slot (`start`..`end`) and
/// assigned `voice_id`. Returns the path of the rendered track inside
/// `workdir`, which the calling worker owns exclusively.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize_track(
        &self,
        segments: &[Segment],
        lang: &str,
        workdir: &Path,
    ) -> Result<PathBuf, ServiceError>;
}
