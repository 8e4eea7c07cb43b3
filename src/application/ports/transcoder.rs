use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::ServiceError;

/// One piece of an assembled audio track, laid down in order.
#[derive(Debug, Clone)]
pub enum TrackPart {
    Silence { duration_ms: u64 },
    Clip { path: PathBuf },
}

/// Media transcoding collaborator, backed by a subprocess in production.
/// A non-zero exit of the underlying tool is a permanent failure: the
/// adapter layer does not retry it.
#[async_trait]
pub trait MediaTranscoder: Send + Sync {
    /// Extract and clean the audio track: mono, fixed sample rate,
    /// denoised, loudness-normalized.
    async fn normalize_audio(&self, input: &Path, output: &Path) -> Result<(), ServiceError>;

    /// Change playback speed by `ratio` (clip duration / slot duration)
    /// without changing pitch. Implementations clamp the ratio to a sane
    /// range.
    async fn stretch_audio(
        &self,
        input: &Path,
        output: &Path,
        ratio: f64,
    ) -> Result<(), ServiceError>;

    /// Measure a clip's playback duration in milliseconds.
    async fn probe_duration_ms(&self, path: &Path) -> Result<u64, ServiceError>;

    /// Concatenate clips and silence gaps into one continuous track.
    async fn assemble_track(&self, parts: &[TrackPart], output: &Path)
    -> Result<(), ServiceError>;

    /// Combine the source video stream with the final audio track and burn
    /// in the subtitle file.
    async fn mux(
        &self,
        video: &Path,
        audio: &Path,
        subtitles: &Path,
        output: &Path,
    ) -> Result<(), ServiceError>;
}
