use std::path::PathBuf;
use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use telenote_store::{StatusRecord, TriggerSource};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct TriggerRequest {
    pub recording_path: String,
    pub job_id: Option<String>,
}

/// Direct trigger. Validates the path, spawns the job in the
/// background, and returns the job id immediately; progress is
/// observable through the status endpoint.
pub async fn trigger(
    State(state): State<AppState>,
    Json(req): Json<TriggerRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let path = PathBuf::from(&req.recording_path);
    if !path.is_dir() {
        return Err(ApiError::BadRequest(format!(
            "recording path {} is not a directory",
            path.display()
        )));
    }

    let job_id = match req.job_id {
        Some(id) if !id.is_empty() => id,
        _ => path
            .file_name()
            .and_then(|n| n.to_str())
            .map(String::from)
            .ok_or_else(|| {
                ApiError::BadRequest("cannot derive job id from recording path".to_string())
            })?,
    };

    info!(%job_id, path = %path.display(), "Direct trigger accepted");

    let sequencer = Arc::clone(&state.sequencer);
    let spawn_id = job_id.clone();
    tokio::spawn(async move {
        sequencer
            .run(&path, TriggerSource::Direct, Some(spawn_id))
            .await;
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({ "job_id": job_id, "status": "accepted" })),
    ))
}

/// Returns the persisted status record for a job.
pub async fn status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<StatusRecord>, ApiError> {
    match state.store.read(&job_id)? {
        Some(record) => Ok(Json(record)),
        None => Err(ApiError::NotFound(format!("no record for job {job_id}"))),
    }
}
