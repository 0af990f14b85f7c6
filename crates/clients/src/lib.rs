pub mod asr;
pub mod emr;
pub mod ollama;
pub mod platform;

pub use asr::HttpAsrClient;
pub use emr::OpenEmrClient;
pub use ollama::OllamaClient;
pub use platform::TelehealthClient;

use telenote_pipeline::StageError;

/// Maps a reqwest transport error onto the stage error taxonomy.
/// Timeouts are their own kind; everything else means the dependency
/// is unreachable.
pub(crate) fn transport_error(service: &str, e: reqwest::Error) -> StageError {
    if e.is_timeout() {
        StageError::Timeout(format!("{service}: {e}"))
    } else {
        StageError::unavailable(service, e)
    }
}
