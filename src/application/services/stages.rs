use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::application::ports::{
    DialectRefiner, Diarizer, MediaTranscoder, ServiceError, SpeechSynthesizer, SttEngine,
    Translator,
};
use crate::domain::{Job, MalformedSegments, Segment, validate_batch};

use super::retry::RetryPolicy;
use super::subtitles;

/// Everything the stage executors need: one adapter per external
/// collaborator plus the shared retry policy. Adapters are stateless and
/// safe to share across workers.
pub struct StageContext {
    pub stt: Arc<dyn SttEngine>,
    pub diarizer: Arc<dyn Diarizer>,
    pub translator: Arc<dyn Translator>,
    pub refiner: Arc<dyn DialectRefiner>,
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
    pub transcoder: Arc<dyn MediaTranscoder>,
    pub retry: RetryPolicy,
    /// Source languages whose raw transcript goes through the dialect
    /// refinement sub-step before segments are persisted.
    pub refinable_dialects: Vec<String>,
}

/// A stage failure that is terminal for the job. Recoverable degradations
/// (diarization, translation, refinement) never surface here; the executors
/// log them and continue with the best available segment state.
#[derive(Debug, thiserror::Error)]
pub enum StageError {
    #[error("malformed media: {0}")]
    MalformedMedia(ServiceError),
    #[error("malformed segments: {0}")]
    MalformedSegments(#[from] MalformedSegments),
    #[error("speech-to-text failed: {0}")]
    Stt(ServiceError),
    #[error("speech synthesis failed: {0}")]
    Synthesis(ServiceError),
    #[error("muxing failed: {0}")]
    Mux(ServiceError),
}

#[derive(Debug)]
pub struct SttOutcome {
    pub segments: Vec<Segment>,
    pub detected_language: Option<String>,
}

impl StageContext {
    /// Upload stage: extract and clean the source audio. A failure here
    /// means the media itself is unusable.
    pub async fn run_upload(&self, source: &Path, workdir: &Path) -> Result<PathBuf, StageError> {
        let audio_path = workdir.join("audio.wav");
        self.transcoder
            .normalize_audio(source, &audio_path)
            .await
            .map_err(StageError::MalformedMedia)?;
        Ok(audio_path)
    }

    /// STT stage: transcribe with bounded retries, then apply the dialect
    /// refinement sub-step where the source language calls for it, then
    /// validate the batch before it is persisted.
    pub async fn run_stt(&self, job: &Job, audio: &[u8]) -> Result<SttOutcome, StageError> {
        let hint = Some(job.source_lang.as_str());
        let transcript = self
            .retry
            .run("stt", || self.stt.transcribe(audio, hint))
            .await
            .map_err(StageError::Stt)?;

        let mut segments = transcript.segments;
        validate_batch(&segments)?;

        if self.refinable_dialects.contains(&job.source_lang) {
            self.refine_segments(&mut segments).await;
        }

        tracing::info!(
            segments = segments.len(),
            detected_language = transcript.detected_language.as_deref().unwrap_or("unknown"),
            "Transcription completed"
        );

        Ok(SttOutcome {
            segments,
            detected_language: transcript.detected_language,
        })
    }

    async fn refine_segments(&self, segments: &mut [Segment]) {
        for segment in segments.iter_mut() {
            if segment.text.is_empty() {
                continue;
            }
            match self.refiner.correct(&segment.text).await {
                Ok(Some(corrected)) => {
                    segment.normalized_text = Some(corrected.clone());
                    segment.text = corrected;
                }
                Ok(None) => {}
                Err(e) => {
                    // Refinement is an enhancement; a dead helper must not
                    // take the transcript down with it.
                    tracing::warn!(error = %e, "Dialect refinement unavailable, keeping raw text");
                    return;
                }
            }
        }
    }

    /// Diarization: merge speaker/voice/gender into the segments by index.
    /// The merge only applies when the result is non-empty and matches the
    /// input cardinality; anything else degrades to undiarized segments.
    /// Returns whether the merge was applied.
    pub async fn run_diarize(&self, audio_path: &Path, segments: &mut [Segment]) -> bool {
        if segments.is_empty() {
            return false;
        }

        let input = segments.to_vec();
        let result = self
            .retry
            .run("diarization", || self.diarizer.diarize(audio_path, &input))
            .await;

        match result {
            Ok(annotations) if !annotations.is_empty() && annotations.len() == segments.len() => {
                for (segment, annotation) in segments.iter_mut().zip(annotations) {
                    segment.speaker_id = Some(annotation.speaker_id);
                    segment.voice_id = Some(annotation.voice_id);
                    segment.gender = Some(annotation.gender);
                }
                true
            }
            Ok(annotations) => {
                tracing::warn!(
                    expected = segments.len(),
                    received = annotations.len(),
                    "Diarization result cardinality mismatch, continuing undiarized"
                );
                false
            }
            Err(e) => {
                tracing::warn!(error = %e, "Diarization failed, continuing undiarized");
                false
            }
        }
    }

    /// Translation: overwrite each segment's working text with its
    /// translation. The result is applied only when the output count equals
    /// the input count; a mismatched or failed response leaves every
    /// segment untouched. Returns whether the translation was applied.
    pub async fn run_translate(&self, job: &Job, segments: &mut [Segment]) -> bool {
        let target = match job.target_lang.as_deref() {
            Some(target) => target,
            None => return false,
        };

        let input = segments.to_vec();
        let result = self
            .retry
            .run("translation", || {
                self.translator.translate(&input, &job.source_lang, target)
            })
            .await;

        match result {
            Ok(texts) if texts.len() == segments.len() => {
                for (segment, text) in segments.iter_mut().zip(texts) {
                    segment.text = text;
                }
                true
            }
            Ok(texts) => {
                tracing::warn!(
                    expected = segments.len(),
                    received = texts.len(),
                    "Translation count mismatch, keeping untranslated segments"
                );
                false
            }
            Err(e) => {
                tracing::warn!(error = %e, "Translation failed, keeping untranslated segments");
                false
            }
        }
    }

    /// TTS stage: render the dubbed audio track. The deliverable cannot
    /// exist without it, so exhausted retries are terminal.
    pub async fn run_tts(
        &self,
        job: &Job,
        segments: &[Segment],
        workdir: &Path,
    ) -> Result<PathBuf, StageError> {
        let lang = job.target_lang.as_deref().unwrap_or(&job.source_lang);
        self.retry
            .run("tts", || {
                self.synthesizer.synthesize_track(segments, lang, workdir)
            })
            .await
            .map_err(StageError::Synthesis)
    }

    /// Mux stage: combine the source video with the final audio track and
    /// burn in subtitles rendered from the final segment text and timing.
    pub async fn run_mux(
        &self,
        video: &Path,
        audio_track: &Path,
        segments: &[Segment],
        workdir: &Path,
    ) -> Result<PathBuf, StageError> {
        let subtitle_path = workdir.join("burn.srt");
        tokio::fs::write(&subtitle_path, subtitles::srt_document(segments))
            .await
            .map_err(|e| StageError::Mux(ServiceError::Permanent(e.to_string())))?;

        let output = workdir.join("dubbed.mp4");
        self.transcoder
            .mux(video, audio_track, &subtitle_path, &output)
            .await
            .map_err(StageError::Mux)?;
        Ok(output)
    }
}
