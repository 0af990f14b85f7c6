/// Error taxonomy shared by every stage and client.
///
/// Each variant carries a stable exit code; the sequencer records the
/// code and the rendered message verbatim in the terminal status
/// record. `FormatRejected` is special: under the auto normalization
/// policy it drives the transcode fallback instead of failing the job.
#[derive(Debug, thiserror::Error)]
pub enum StageError {
    /// Bad trigger input; reported before any lock is taken.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The transcription engine rejected the input container.
    #[error("format rejected: {0}")]
    FormatRejected(String),

    /// A dependency is unreachable or returned a server-side error.
    #[error("{service} unavailable: {message}")]
    Unavailable { service: String, message: String },

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("auth rejected: {0}")]
    AuthRejected(String),

    /// Neither the requested specialty template nor the default exists.
    #[error("template missing: {0}")]
    TemplateMissing(String),

    /// Unknown consultation id at context retrieval or delivery.
    #[error("not found: {0}")]
    NotFound(String),
}

impl StageError {
    pub fn exit_code(&self) -> i32 {
        match self {
            StageError::InvalidInput(_) => 2,
            StageError::FormatRejected(_) => 3,
            StageError::Unavailable { .. } => 4,
            StageError::Timeout(_) => 5,
            StageError::AuthRejected(_) => 6,
            StageError::TemplateMissing(_) => 7,
            StageError::NotFound(_) => 8,
        }
    }

    pub fn unavailable(service: impl Into<String>, message: impl std::fmt::Display) -> Self {
        StageError::Unavailable {
            service: service.into(),
            message: message.to_string(),
        }
    }

    pub fn is_format_rejection(&self) -> bool {
        matches!(self, StageError::FormatRejected(_))
    }
}
