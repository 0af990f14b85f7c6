use std::path::Path;

use async_trait::async_trait;

use crate::error::StageError;
use crate::{AudioTrack, ConsultationContext, DeliveryReceipt, Transcript};
use telenote_store::JobStatus;

/// Speech-to-text engine, one request per track.
///
/// Implementations must distinguish `FormatRejected` (container not
/// accepted) from `Unavailable`/`Timeout` — that distinction is what
/// the normalization fallback probe keys on.
#[async_trait]
pub trait AsrClient: Send + Sync {
    async fn transcribe(&self, track: &AudioTrack) -> Result<Transcript, StageError>;
}

/// Converts a native-container track to a normalized waveform
/// (mono, 16 kHz WAV).
#[async_trait]
pub trait Transcoder: Send + Sync {
    async fn to_wav(&self, src: &Path, dst: &Path) -> Result<(), StageError>;
}

/// Text-generation model behind the summarizer.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, StageError>;

    /// Model identifier recorded in the summary.
    fn model(&self) -> &str;
}

/// The clinical telehealth platform: consultation context retrieval,
/// note delivery, and the optional trigger-origin callback.
#[async_trait]
pub trait PlatformApi: Send + Sync {
    /// Authenticated lookup by consultation id. Patient data is only
    /// ever obtained through this call, never from trigger payloads.
    async fn fetch_consultation(
        &self,
        consultation_id: &str,
    ) -> Result<ConsultationContext, StageError>;

    /// Pushes the final note into the consultation's evolution field.
    async fn deliver_note(
        &self,
        consultation_id: &str,
        note: &str,
        ctx: &ConsultationContext,
    ) -> Result<DeliveryReceipt, StageError>;

    /// Best-effort terminal-status notification back to the trigger
    /// origin. Failures are the caller's to log, never to escalate.
    async fn notify(&self, job_id: &str, status: JobStatus) -> Result<(), StageError>;
}

/// Optional secondary EMR target.
#[async_trait]
pub trait EmrApi: Send + Sync {
    /// Files the note as a document; returns the document id.
    async fn deliver_document(&self, recording_id: &str, note: &str)
        -> Result<String, StageError>;
}
