use std::path::PathBuf;
use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info};

use telenote_store::TriggerSource;

use crate::error::ApiError;
use crate::state::AppState;

/// The only platform event that starts a job.
pub const FINISHED_TOPIC: &str = "videoconsultation-finished";

#[derive(Debug, Deserialize)]
pub struct WebhookPayload {
    pub topic: String,
    #[serde(default)]
    pub vc: VcRef,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct VcRef {
    /// Consultation secret; doubles as the job id and names the
    /// recording subdirectory.
    pub secret: String,
}

/// Platform event trigger. Other topics are acknowledged and ignored
/// so the platform does not retry them.
pub async fn telehealth(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<WebhookPayload>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let expected = &state.settings.platform.webhook_token;
    if !expected.is_empty() {
        let supplied = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "));
        if supplied != Some(expected.as_str()) {
            return Err(ApiError::Unauthorized("invalid webhook token".to_string()));
        }
    }

    if payload.topic != FINISHED_TOPIC {
        debug!(topic = %payload.topic, "Ignoring webhook topic");
        return Ok((StatusCode::OK, Json(json!({ "status": "ignored" }))));
    }
    if payload.vc.secret.is_empty() {
        return Err(ApiError::BadRequest(
            "missing consultation secret".to_string(),
        ));
    }

    let job_id = payload.vc.secret;
    let recording_dir = PathBuf::from(&state.settings.storage.recordings_dir).join(&job_id);

    info!(%job_id, "Event trigger accepted");

    let sequencer = Arc::clone(&state.sequencer);
    let spawn_id = job_id.clone();
    tokio::spawn(async move {
        sequencer
            .run(&recording_dir, TriggerSource::Event, Some(spawn_id))
            .await;
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({ "job_id": job_id, "status": "processing" })),
    ))
}
