use std::path::Path;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::application::ports::{Diarizer, ServiceError, SpeakerAnnotation};
use crate::domain::{Gender, Segment};

/// Diarization worker service: audio path plus transcript segments in,
/// speaker/voice/gender annotations out, one per segment in order. The
/// worker loads its model in the background and answers 503 until ready,
/// which maps to the warming retry schedule.
pub struct HttpDiarizer {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpDiarizer {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: format!("{}/diarize", base_url.trim_end_matches('/')),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DiarizeRequest<'a> {
    audio_path: &'a str,
    whisper_segments: Vec<WireSegment<'a>>,
}

#[derive(Serialize)]
struct WireSegment<'a> {
    start: f64,
    end: f64,
    text: &'a str,
}

#[derive(Deserialize)]
struct WireAnnotatedSegment {
    speaker_id: String,
    voice_id: String,
    gender: String,
}

#[async_trait]
impl Diarizer for HttpDiarizer {
    async fn diarize(
        &self,
        audio_path: &Path,
        segments: &[Segment],
    ) -> Result<Vec<SpeakerAnnotation>, ServiceError> {
        let request = DiarizeRequest {
            audio_path: audio_path.to_str().ok_or_else(|| {
                ServiceError::Permanent(format!("non-utf8 audio path: {}", audio_path.display()))
            })?,
            whisper_segments: segments
                .iter()
                .map(|s| WireSegment {
                    start: s.start,
                    end: s.end,
                    text: &s.text,
                })
                .collect(),
        };

        tracing::debug!(endpoint = %self.endpoint, segments = segments.len(), "Requesting diarization");

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| ServiceError::Transient(format!("request: {}", e)))?;

        match response.status() {
            s if s.is_success() => {}
            StatusCode::SERVICE_UNAVAILABLE => {
                return Err(ServiceError::Warming(
                    "diarization pipeline still loading".to_string(),
                ));
            }
            s if s.is_server_error() => {
                let body = response.text().await.unwrap_or_default();
                return Err(ServiceError::Transient(format!("status {}: {}", s, body)));
            }
            s => {
                let body = response.text().await.unwrap_or_default();
                return Err(ServiceError::Permanent(format!("status {}: {}", s, body)));
            }
        }

        let annotated: Vec<WireAnnotatedSegment> = response
            .json()
            .await
            .map_err(|e| ServiceError::Permanent(format!("parse response: {}", e)))?;

        Ok(annotated
            .into_iter()
            .map(|a| SpeakerAnnotation {
                speaker_id: a.speaker_id,
                voice_id: a.voice_id,
                gender: match a.gender.as_str() {
                    "male" => Gender::Male,
                    "female" => Gender::Female,
                    _ => Gender::Unknown,
                },
            })
            .collect())
    }
}
