use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use telenote_pipeline::{EmrApi, StageError};

use crate::transport_error;

const SERVICE: &str = "emr";

/// Secondary OpenEMR-style delivery target. On any failure the note
/// is dropped into a shared directory for manual import before the
/// error is surfaced; the sequencer treats this stage as optional
/// either way.
pub struct OpenEmrClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    patient_id: Option<String>,
    shared_notes_dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct DocumentResponse {
    #[serde(default)]
    document_id: Option<String>,
}

impl OpenEmrClient {
    pub fn new(
        base_url: &str,
        api_key: &str,
        patient_id: Option<String>,
        shared_notes_dir: Option<PathBuf>,
        timeout: Duration,
    ) -> reqwest::Result<Self> {
        Ok(Self {
            http: reqwest::Client::builder().timeout(timeout).build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            patient_id,
            shared_notes_dir,
        })
    }

    fn endpoint(&self) -> String {
        match &self.patient_id {
            Some(pid) => format!("{}/patient/{pid}/document", self.base_url),
            None => format!("{}/document/unassigned", self.base_url),
        }
    }

    async fn save_to_shared_dir(&self, recording_id: &str, note: &str) {
        let Some(dir) = &self.shared_notes_dir else {
            return;
        };
        let stamp = Utc::now().format("%Y%m%d_%H%M%S");
        let path = dir.join(format!("telehealth_note_{recording_id}_{stamp}.txt"));
        match tokio::fs::write(&path, note).await {
            Ok(()) => info!(path = %path.display(), "Note saved to shared directory for manual import"),
            Err(e) => warn!(path = %path.display(), error = %e, "Shared-directory fallback failed"),
        }
    }

    async fn post_document(&self, recording_id: &str, note: &str) -> Result<String, StageError> {
        let now = Utc::now();
        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&json!({
                "date": now.format("%Y-%m-%d").to_string(),
                "time": now.format("%H:%M:%S").to_string(),
                "title": format!("Telehealth Consultation - {recording_id}"),
                "body": note,
                "category": "telehealth",
                "type": "clinical_note",
                "metadata": { "recording_id": recording_id, "source": "telenote" },
            }))
            .send()
            .await
            .map_err(|e| transport_error(SERVICE, e))?;

        let status = response.status();
        match status {
            reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => {
                return Err(StageError::AuthRejected(format!(
                    "emr returned {status}"
                )));
            }
            s if !s.is_success() => {
                let body = response.text().await.unwrap_or_default();
                return Err(StageError::unavailable(
                    SERVICE,
                    format!("status {status}: {body}"),
                ));
            }
            _ => {}
        }

        let parsed: DocumentResponse = response.json().await.unwrap_or(DocumentResponse {
            document_id: None,
        });
        Ok(parsed.document_id.unwrap_or_else(|| "unknown".to_string()))
    }
}

#[async_trait]
impl EmrApi for OpenEmrClient {
    async fn deliver_document(
        &self,
        recording_id: &str,
        note: &str,
    ) -> Result<String, StageError> {
        match self.post_document(recording_id, note).await {
            Ok(document_id) => Ok(document_id),
            Err(e) => {
                self.save_to_shared_dir(recording_id, note).await;
                Err(e)
            }
        }
    }
}
