use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use telenote_pipeline::{ConsultationContext, DeliveryReceipt, PlatformApi, StageError};
use telenote_store::JobStatus;

use crate::transport_error;

const SERVICE: &str = "platform";

/// Client for the telehealth platform: authenticated consultation
/// data retrieval, evolution-field note delivery, and the optional
/// trigger-origin callback.
pub struct TelehealthClient {
    http: reqwest::Client,
    base_url: String,
    api_token: String,
    callback_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ConsultationResponse {
    videoconsultation: VideoConsultation,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct VideoConsultation {
    secret: String,
    medic_secret: Option<String>,
    patient_id: Option<String>,
    patient_name: Option<String>,
    medic_name: Option<String>,
    specialty: Option<String>,
    doctor_notes: Option<String>,
    status: Option<String>,
}

impl TelehealthClient {
    pub fn new(
        base_url: &str,
        api_token: &str,
        callback_url: Option<String>,
        timeout: Duration,
    ) -> reqwest::Result<Self> {
        Ok(Self {
            http: reqwest::Client::builder().timeout(timeout).build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token: api_token.to_string(),
            callback_url,
        })
    }

    fn check_auth_and_presence(
        status: reqwest::StatusCode,
        what: &str,
    ) -> Option<StageError> {
        match status {
            reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => Some(
                StageError::AuthRejected(format!("{what}: platform returned {status}")),
            ),
            reqwest::StatusCode::NOT_FOUND => {
                Some(StageError::NotFound(format!("{what}: unknown consultation")))
            }
            _ => None,
        }
    }
}

#[async_trait]
impl PlatformApi for TelehealthClient {
    async fn fetch_consultation(
        &self,
        consultation_id: &str,
    ) -> Result<ConsultationContext, StageError> {
        debug!(%consultation_id, "Fetching consultation context");

        let response = self
            .http
            .get(format!("{}/api/videoconsultation/data", self.base_url))
            .query(&[("vc", consultation_id)])
            .bearer_auth(&self.api_token)
            .send()
            .await
            .map_err(|e| transport_error(SERVICE, e))?;

        let status = response.status();
        if let Some(err) = Self::check_auth_and_presence(status, "fetch consultation") {
            return Err(err);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StageError::unavailable(
                SERVICE,
                format!("status {status}: {body}"),
            ));
        }

        let parsed: ConsultationResponse = response
            .json()
            .await
            .map_err(|e| StageError::unavailable(SERVICE, format!("bad response body: {e}")))?;
        let vc = parsed.videoconsultation;

        Ok(ConsultationContext {
            consultation_id: if vc.secret.is_empty() {
                consultation_id.to_string()
            } else {
                vc.secret
            },
            medic_secret: vc.medic_secret,
            patient_id: vc.patient_id,
            patient_name: vc.patient_name.unwrap_or_else(|| "Patient".to_string()),
            provider_name: vc.medic_name.unwrap_or_else(|| "Doctor".to_string()),
            specialty: vc.specialty,
            clinician_notes: vc.doctor_notes,
            status: vc.status,
        })
    }

    async fn deliver_note(
        &self,
        consultation_id: &str,
        note: &str,
        ctx: &ConsultationContext,
    ) -> Result<DeliveryReceipt, StageError> {
        info!(%consultation_id, "Delivering note to platform evolution field");

        let response = self
            .http
            .post(format!("{}/api/webhook/evolution", self.base_url))
            .bearer_auth(&self.api_token)
            .json(&json!({
                "consultation_id": consultation_id,
                "evolution": note,
                "metadata": {
                    "patient_name": ctx.patient_name,
                    "patient_id": ctx.patient_id,
                    "medic_name": ctx.provider_name,
                    "source": "telenote",
                },
            }))
            .send()
            .await
            .map_err(|e| transport_error(SERVICE, e))?;

        let status = response.status();
        if let Some(err) = Self::check_auth_and_presence(status, "deliver note") {
            return Err(err);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StageError::unavailable(
                SERVICE,
                format!("status {status}: {body}"),
            ));
        }

        let body = response.text().await.unwrap_or_default();
        Ok(DeliveryReceipt {
            consultation_id: consultation_id.to_string(),
            response: body,
        })
    }

    async fn notify(&self, job_id: &str, status: JobStatus) -> Result<(), StageError> {
        let Some(url) = &self.callback_url else {
            return Ok(());
        };

        let response = self
            .http
            .post(url)
            .bearer_auth(&self.api_token)
            .json(&json!({ "job_id": job_id, "status": status.to_string() }))
            .send()
            .await
            .map_err(|e| transport_error(SERVICE, e))?;

        if !response.status().is_success() {
            return Err(StageError::unavailable(
                SERVICE,
                format!("callback returned {}", response.status()),
            ));
        }
        Ok(())
    }
}
