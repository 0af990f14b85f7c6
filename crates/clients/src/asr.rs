use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use telenote_pipeline::{AsrClient, AudioTrack, StageError, Transcript, TranscriptSegment};

use crate::transport_error;

const SERVICE: &str = "asr";

/// HTTP client for the speech-recognition engine. One request per
/// track: multipart upload, JSON transcript back.
pub struct HttpAsrClient {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct TranscribeResponse {
    #[serde(alias = "transcripts")]
    segments: Vec<SegmentDto>,
}

#[derive(Debug, Deserialize)]
struct SegmentDto {
    #[serde(default)]
    start: f64,
    #[serde(default)]
    end: f64,
    text: String,
    confidence: Option<f64>,
}

impl HttpAsrClient {
    pub fn new(base_url: &str, timeout: Duration) -> reqwest::Result<Self> {
        Ok(Self {
            http: reqwest::Client::builder().timeout(timeout).build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl AsrClient for HttpAsrClient {
    async fn transcribe(&self, track: &AudioTrack) -> Result<Transcript, StageError> {
        let file_name = track
            .path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("track")
            .to_string();

        let bytes = tokio::fs::read(&track.path)
            .await
            .map_err(|e| StageError::unavailable(SERVICE, format!("read {file_name}: {e}")))?;

        debug!(track = %file_name, size = bytes.len(), "Submitting track for transcription");

        let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name.clone());
        let form = reqwest::multipart::Form::new().part("audio", part);

        let response = self
            .http
            .post(format!("{}/transcribe", self.base_url))
            .multipart(form)
            .send()
            .await
            .map_err(|e| transport_error(SERVICE, e))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNSUPPORTED_MEDIA_TYPE
            || status == reqwest::StatusCode::BAD_REQUEST
        {
            let body = response.text().await.unwrap_or_default();
            return Err(StageError::FormatRejected(format!(
                "{file_name}: engine returned {status}: {body}"
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StageError::unavailable(
                SERVICE,
                format!("status {status}: {body}"),
            ));
        }

        let parsed: TranscribeResponse = response
            .json()
            .await
            .map_err(|e| StageError::unavailable(SERVICE, format!("bad response body: {e}")))?;

        Ok(Transcript {
            track_index: track.index,
            source_file: file_name,
            segments: parsed
                .segments
                .into_iter()
                .map(|s| TranscriptSegment {
                    start: s.start,
                    end: s.end,
                    text: s.text,
                    confidence: s.confidence,
                })
                .collect(),
        })
    }
}
