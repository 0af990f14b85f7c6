pub mod clients;
pub mod error;
pub mod merge;
pub mod probe;
pub mod sequencer;
pub mod speakers;
pub mod summarize;
pub mod tracks;

pub use clients::{AsrClient, EmrApi, LlmClient, PlatformApi, Transcoder};
pub use error::StageError;
pub use probe::{NormalizePolicy, TrackTranscriber};
pub use sequencer::Sequencer;
pub use summarize::{Summarizer, TemplateRegistry};

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// One physical per-speaker (or per-endpoint) audio stream from the
/// recording directory.
#[derive(Debug, Clone)]
pub struct AudioTrack {
    /// Stable position in the discovered track set (file-name order).
    pub index: usize,
    pub path: PathBuf,
    /// File name without extension; used to correlate with the
    /// room-event timeline.
    pub stem: String,
}

/// One time-stamped piece of recognized speech.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
    pub confidence: Option<f64>,
}

/// Per-track transcription result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    pub track_index: usize,
    pub source_file: String,
    pub segments: Vec<TranscriptSegment>,
}

/// Track index → participant display name. May be empty; callers fall
/// back to generic `Speaker {index}` labels.
pub type SpeakerMap = HashMap<usize, String>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergedSegment {
    pub timestamp: f64,
    pub speaker: String,
    pub text: String,
}

/// Single time-ordered, speaker-labeled dialogue across all tracks.
/// Every input segment appears exactly once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergedTranscript {
    pub recording_id: String,
    pub segments: Vec<MergedSegment>,
    pub speaker_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryMetadata {
    pub speaker_count: usize,
    pub segment_count: usize,
    pub patient_name: String,
    pub provider_name: String,
    /// Which inputs contributed ("audio_transcript", "clinician_notes").
    pub sources: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Summary {
    pub recording_id: String,
    pub model: String,
    pub summary_text: String,
    pub metadata: SummaryMetadata,
}

/// Consultation-side identity and context, retrieved from the
/// clinical platform in stage 3. Delivery is keyed by
/// `consultation_id`, never by the filesystem-derived job id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsultationContext {
    pub consultation_id: String,
    pub medic_secret: Option<String>,
    pub patient_id: Option<String>,
    pub patient_name: String,
    pub provider_name: String,
    /// Drives prompt template selection.
    pub specialty: Option<String>,
    /// Clinician's typed notes, folded into the summary prompt.
    pub clinician_notes: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryReceipt {
    pub consultation_id: String,
    pub response: String,
}
