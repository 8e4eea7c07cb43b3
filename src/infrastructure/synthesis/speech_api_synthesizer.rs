use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use crate::application::ports::{
    MediaTranscoder, ServiceError, SpeechSynthesizer, TrackPart,
};
use crate::domain::Segment;

const SEGMENT_ATTEMPTS: u32 = 3;
const SEGMENT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Per-segment TTS over an ElevenLabs-style voice API, assembled into one
/// continuous track. Each segment renders with its assigned voice (falling
/// back to the default voice when the id is unusable or unknown to the
/// service), gets tempo-fitted into its slot, and is laid down at its start
/// offset with silence filling the gaps. A segment that fails outright
/// becomes slot-length silence; only whole-track assembly failures are
/// fatal.
pub struct SpeechApiSynthesizer {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model_id: String,
    default_voice: String,
    transcoder: Arc<dyn MediaTranscoder>,
}

enum SegmentTtsError {
    VoiceNotFound,
    Other(String),
}

impl SpeechApiSynthesizer {
    pub fn new(
        base_url: &str,
        api_key: &str,
        model_id: &str,
        default_voice: &str,
        transcoder: Arc<dyn MediaTranscoder>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model_id: model_id.to_string(),
            default_voice: default_voice.to_string(),
            transcoder,
        }
    }

    /// Voice ids that are too short or contain whitespace are upstream
    /// garbage, not usable identifiers.
    fn usable_voice<'a>(&'a self, voice_id: Option<&'a str>) -> &'a str {
        match voice_id {
            Some(v) if v.len() >= 10 && !v.contains(' ') => v,
            Some(v) => {
                tracing::warn!(voice_id = v, "Unusable voice id, using default voice");
                &self.default_voice
            }
            None => &self.default_voice,
        }
    }

    async fn render_segment(
        &self,
        text: &str,
        voice_id: &str,
        output: &Path,
    ) -> Result<(), SegmentTtsError> {
        let url = format!("{}/v1/text-to-speech/{}", self.base_url, voice_id);
        let body = json!({
            "text": text,
            "model_id": self.model_id,
            "voice_settings": { "stability": 0.5, "similarity_boost": 0.5 },
        });

        let mut last_error = String::new();
        for attempt in 1..=SEGMENT_ATTEMPTS {
            let response = self
                .client
                .post(&url)
                .header("xi-api-key", &self.api_key)
                .header("Accept", "audio/mpeg")
                .json(&body)
                .send()
                .await;

            match response {
                Ok(response) if response.status().is_success() => {
                    let audio = response
                        .bytes()
                        .await
                        .map_err(|e| SegmentTtsError::Other(format!("reading audio: {}", e)))?;
                    if audio.len() < 100 {
                        tracing::warn!(
                            bytes = audio.len(),
                            "Rendered segment is suspiciously small"
                        );
                    }
                    tokio::fs::write(output, &audio)
                        .await
                        .map_err(|e| SegmentTtsError::Other(format!("writing clip: {}", e)))?;
                    return Ok(());
                }
                Ok(response) if response.status().as_u16() == 404 => {
                    // A missing voice will not appear on retry.
                    return Err(SegmentTtsError::VoiceNotFound);
                }
                Ok(response) => {
                    let status = response.status();
                    let text = response.text().await.unwrap_or_default();
                    last_error = format!("status {}: {}", status, text);
                    tracing::warn!(
                        attempt = attempt,
                        error = %last_error,
                        "Segment synthesis failed"
                    );
                }
                Err(e) => {
                    last_error = format!("request: {}", e);
                    tracing::warn!(attempt = attempt, error = %last_error, "Segment synthesis failed");
                }
            }

            if attempt < SEGMENT_ATTEMPTS {
                tokio::time::sleep(SEGMENT_RETRY_DELAY).await;
            }
        }
        Err(SegmentTtsError::Other(last_error))
    }

    async fn render_with_fallback(
        &self,
        text: &str,
        voice_id: &str,
        output: &Path,
    ) -> Result<(), String> {
        match self.render_segment(text, voice_id, output).await {
            Ok(()) => Ok(()),
            Err(SegmentTtsError::VoiceNotFound) if voice_id != self.default_voice => {
                tracing::warn!(
                    voice_id = voice_id,
                    "Voice unknown to the service, retrying with default voice"
                );
                match self.render_segment(text, &self.default_voice, output).await {
                    Ok(()) => Ok(()),
                    Err(SegmentTtsError::VoiceNotFound) => Err("default voice missing".to_string()),
                    Err(SegmentTtsError::Other(e)) => Err(e),
                }
            }
            Err(SegmentTtsError::VoiceNotFound) => Err("default voice missing".to_string()),
            Err(SegmentTtsError::Other(e)) => Err(e),
        }
    }

    /// Stretch the clip into its slot when it misses by more than 5%.
    async fn fit_to_slot(
        &self,
        clip: PathBuf,
        slot_ms: u64,
        fitted: PathBuf,
    ) -> Result<PathBuf, ServiceError> {
        let clip_ms = self.transcoder.probe_duration_ms(&clip).await?;
        if clip_ms == 0 || slot_ms == 0 {
            return Ok(clip);
        }
        let ratio = clip_ms as f64 / slot_ms as f64;
        if (0.95..=1.05).contains(&ratio) {
            return Ok(clip);
        }
        self.transcoder
            .stretch_audio(&clip, &fitted, ratio)
            .await?;
        Ok(fitted)
    }
}

#[async_trait]
impl SpeechSynthesizer for SpeechApiSynthesizer {
    async fn synthesize_track(
        &self,
        segments: &[Segment],
        lang: &str,
        workdir: &Path,
    ) -> Result<PathBuf, ServiceError> {
        let scratch = workdir.join("tts");
        tokio::fs::create_dir_all(&scratch)
            .await
            .map_err(|e| ServiceError::Permanent(format!("creating tts scratch dir: {}", e)))?;

        tracing::info!(segments = segments.len(), lang = lang, "Synthesizing dubbed track");

        let mut parts: Vec<TrackPart> = Vec::new();
        let mut cursor_ms: u64 = 0;
        let mut rendered = 0usize;

        for (i, segment) in segments.iter().enumerate() {
            let text = segment.text.trim();
            if text.is_empty() {
                continue;
            }
            let start_ms = (segment.start * 1000.0).round().max(0.0) as u64;
            let slot_ms = (segment.duration_secs() * 1000.0).round() as i64;
            if slot_ms <= 0 {
                continue;
            }
            let slot_ms = slot_ms as u64;

            if cursor_ms < start_ms {
                parts.push(TrackPart::Silence {
                    duration_ms: start_ms - cursor_ms,
                });
                cursor_ms = start_ms;
            }

            let voice = self.usable_voice(segment.voice_id.as_deref());
            let clip = scratch.join(format!("seg_{}.mp3", i));
            let fitted = scratch.join(format!("seg_{}_final.mp3", i));

            match self.render_with_fallback(text, voice, &clip).await {
                Ok(()) => {
                    let final_clip = self.fit_to_slot(clip, slot_ms, fitted).await?;
                    let final_ms = self.transcoder.probe_duration_ms(&final_clip).await?;
                    parts.push(TrackPart::Clip { path: final_clip });
                    cursor_ms += final_ms;
                    rendered += 1;
                }
                Err(e) => {
                    tracing::error!(
                        segment = i,
                        error = %e,
                        "All synthesis attempts failed, filling slot with silence"
                    );
                    parts.push(TrackPart::Silence {
                        duration_ms: slot_ms,
                    });
                    cursor_ms += slot_ms;
                }
            }
        }

        if rendered == 0 {
            return Err(ServiceError::Permanent(
                "no segment could be synthesized".to_string(),
            ));
        }

        let output = workdir.join("dub_track.mp3");
        self.transcoder.assemble_track(&parts, &output).await?;
        Ok(output)
    }
}
