use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::multipart;
use serde::Deserialize;

use crate::application::ports::{ServiceError, SttEngine, Transcript};
use crate::domain::Segment;

/// Hosted Whisper-compatible transcription endpoint (OpenAI-style
/// `audio/transcriptions` contract, `verbose_json` with segment
/// granularity).
pub struct WhisperApiEngine {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl WhisperApiEngine {
    pub fn new(endpoint: &str, api_key: &str, model: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        }
    }
}

#[derive(Deserialize)]
struct ApiSegment {
    start: Option<f64>,
    end: Option<f64>,
    text: Option<String>,
}

#[derive(Deserialize)]
struct ApiTranscriptionResponse {
    language: Option<String>,
    duration: Option<f64>,
    text: Option<String>,
    segments: Option<Vec<ApiSegment>>,
}

fn round_ts(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

fn classify_status(status: StatusCode, body: String) -> ServiceError {
    match status {
        StatusCode::SERVICE_UNAVAILABLE => ServiceError::Warming(body),
        s if s == StatusCode::TOO_MANY_REQUESTS
            || s == StatusCode::REQUEST_TIMEOUT
            || s.is_server_error() =>
        {
            ServiceError::Transient(format!("status {}: {}", s, body))
        }
        s => ServiceError::Permanent(format!("status {}: {}", s, body)),
    }
}

#[async_trait]
impl SttEngine for WhisperApiEngine {
    async fn transcribe(
        &self,
        audio: &[u8],
        language_hint: Option<&str>,
    ) -> Result<Transcript, ServiceError> {
        let file_part = multipart::Part::bytes(audio.to_vec())
            .file_name("audio.wav")
            .mime_str("audio/wav")
            .map_err(|e| ServiceError::Permanent(format!("mime: {}", e)))?;

        let mut form = multipart::Form::new()
            .part("file", file_part)
            .text("model", self.model.clone())
            .text("temperature", "0")
            .text("response_format", "verbose_json")
            .text("timestamp_granularities[]", "segment");
        if let Some(lang) = language_hint {
            form = form.text("language", lang.to_string());
        }

        tracing::debug!(endpoint = %self.endpoint, "Sending audio for transcription");

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ServiceError::Transient(format!("request: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(classify_status(status, body));
        }

        let result: ApiTranscriptionResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::Permanent(format!("parse response: {}", e)))?;

        let mut segments: Vec<Segment> = result
            .segments
            .unwrap_or_default()
            .into_iter()
            .map(|s| {
                Segment::new(
                    round_ts(s.start.unwrap_or(0.0)),
                    round_ts(s.end.unwrap_or(0.0)),
                    s.text.unwrap_or_default().trim().to_string(),
                )
            })
            .collect();

        // Some responses carry only flat text. Shape it into one segment
        // spanning the whole clip so downstream stages see a uniform batch.
        if segments.is_empty() {
            if let Some(text) = result.text.filter(|t| !t.trim().is_empty()) {
                segments.push(Segment::new(
                    0.0,
                    round_ts(result.duration.unwrap_or(0.0)).max(0.001),
                    text.trim().to_string(),
                ));
            }
        }

        tracing::info!(
            segments = segments.len(),
            language = result.language.as_deref().unwrap_or("unknown"),
            "Transcription response received"
        );

        Ok(Transcript {
            detected_language: result.language,
            segments,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_warming_status_when_classifying_then_warming_error() {
        let err = classify_status(StatusCode::SERVICE_UNAVAILABLE, "loading".to_string());
        assert!(matches!(err, ServiceError::Warming(_)));
    }

    #[test]
    fn given_rate_limit_when_classifying_then_transient_error() {
        let err = classify_status(StatusCode::TOO_MANY_REQUESTS, "slow down".to_string());
        assert!(matches!(err, ServiceError::Transient(_)));
    }

    #[test]
    fn given_auth_failure_when_classifying_then_permanent_error() {
        let err = classify_status(StatusCode::UNAUTHORIZED, "bad key".to_string());
        assert!(matches!(err, ServiceError::Permanent(_)));
    }
}
