use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::application::ports::{ServiceError, Translator};
use crate::domain::Segment;

/// Batch translation over a chat-completions endpoint. The prompt pins the
/// contract the pipeline depends on: a JSON array with exactly one
/// translated string per input segment, same order.
pub struct LlmTranslator {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl LlmTranslator {
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
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

#[async_trait]
impl Translator for LlmTranslator {
    async fn translate(
        &self,
        segments: &[Segment],
        source_lang: &str,
        target_lang: &str,
    ) -> Result<Vec<String>, ServiceError> {
        let lines: Vec<&str> = segments.iter().map(|s| s.text.as_str()).collect();

        let system = format!(
            "You translate subtitle segments from {} to {}. \
             Reply with a JSON array of strings: exactly one translation per \
             input element, same order, no commentary.",
            source_lang, target_lang
        );
        let user = serde_json::to_string(&lines)
            .map_err(|e| ServiceError::Permanent(format!("serializing segments: {}", e)))?;

        let body = json!({
            "model": self.model,
            "temperature": 0.2,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user},
            ],
        });

        tracing::debug!(
            endpoint = %self.endpoint,
            segments = segments.len(),
            target_lang = target_lang,
            "Requesting translation"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ServiceError::Transient(format!("request: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(if status.as_u16() == 429 || status.is_server_error() {
                ServiceError::Transient(format!("status {}: {}", status, text))
            } else {
                ServiceError::Permanent(format!("status {}: {}", status, text))
            });
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::Permanent(format!("parse response: {}", e)))?;

        let content = chat
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .ok_or_else(|| ServiceError::Permanent("empty completion".to_string()))?;

        // Models occasionally wrap the array in a code fence.
        let trimmed = content
            .trim()
            .trim_start_matches("```json")
            .trim_start_matches("```")
            .trim_end_matches("```")
            .trim();

        let translations: Vec<String> = serde_json::from_str(trimmed)
            .map_err(|e| ServiceError::Permanent(format!("malformed translation array: {}", e)))?;

        Ok(translations)
    }
}
