use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use telenote_pipeline::{LlmClient, StageError};

use crate::transport_error;

const SERVICE: &str = "summarizer";

/// Ollama-compatible text generation client.
pub struct OllamaClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

impl OllamaClient {
    pub fn new(base_url: &str, model: &str, timeout: Duration) -> reqwest::Result<Self> {
        Ok(Self {
            http: reqwest::Client::builder().timeout(timeout).build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        })
    }
}

#[async_trait]
impl LlmClient for OllamaClient {
    async fn generate(&self, prompt: &str) -> Result<String, StageError> {
        debug!(model = %self.model, prompt_len = prompt.len(), "Requesting summary");

        let response = self
            .http
            .post(format!("{}/api/generate", self.base_url))
            .json(&json!({
                "model": self.model,
                "prompt": prompt,
                "stream": false,
                // Low temperature for consistent clinical output.
                "options": { "temperature": 0.3 },
            }))
            .send()
            .await
            .map_err(|e| transport_error(SERVICE, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StageError::unavailable(
                SERVICE,
                format!("status {status}: {body}"),
            ));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| StageError::unavailable(SERVICE, format!("bad response body: {e}")))?;

        Ok(parsed.response)
    }

    fn model(&self) -> &str {
        &self.model
    }
}
