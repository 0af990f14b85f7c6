use std::path::Path;

use async_trait::async_trait;
use tracing::debug;

use crate::clients::Transcoder;
use crate::error::StageError;
use crate::AudioTrack;

/// Containers the recorder is known to emit, plus already-normalized
/// waveforms.
const AUDIO_EXTENSIONS: &[&str] = &["mka", "webm", "ogg", "opus", "wav", "mp3", "m4a", "flac"];

/// Subdirectory holding transcoded waveforms; excluded from discovery
/// so a re-run never treats fallback output as fresh input.
pub const NORMALIZED_DIR: &str = "normalized";

/// Lists the audio tracks in a recording directory, sorted by file
/// name for a stable index assignment.
pub fn discover_tracks(dir: &Path) -> Result<Vec<AudioTrack>, StageError> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| StageError::InvalidInput(format!("cannot read {}: {e}", dir.display())))?;

    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry
            .map_err(|e| StageError::InvalidInput(format!("cannot read {}: {e}", dir.display())))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        if ext.as_deref().is_some_and(|e| AUDIO_EXTENSIONS.contains(&e)) {
            paths.push(path);
        }
    }
    paths.sort();

    let tracks = paths
        .into_iter()
        .enumerate()
        .map(|(index, path)| {
            let stem = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or_default()
                .to_string();
            AudioTrack { index, path, stem }
        })
        .collect::<Vec<_>>();

    debug!(dir = %dir.display(), count = tracks.len(), "Discovered audio tracks");
    Ok(tracks)
}

/// Shells out to ffmpeg for container-to-waveform conversion. The
/// pipeline performs no signal processing of its own.
pub struct FfmpegTranscoder {
    binary: String,
}

impl FfmpegTranscoder {
    pub fn new() -> Self {
        Self {
            binary: "ffmpeg".to_string(),
        }
    }
}

impl Default for FfmpegTranscoder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn to_wav(&self, src: &Path, dst: &Path) -> Result<(), StageError> {
        let status = tokio::process::Command::new(&self.binary)
            .arg("-y")
            .arg("-i")
            .arg(src)
            .args(["-ac", "1", "-ar", "16000", "-loglevel", "error"])
            .arg(dst)
            .status()
            .await
            .map_err(|e| StageError::unavailable("ffmpeg", e))?;

        if !status.success() {
            return Err(StageError::unavailable(
                "ffmpeg",
                format!("exit status {status} transcoding {}", src.display()),
            ));
        }

        verify_normalized_wav(dst)
    }
}

/// Confirms a transcoded file really is the mono/16 kHz waveform the
/// engine expects before resubmission.
pub fn verify_normalized_wav(path: &Path) -> Result<(), StageError> {
    let reader = hound::WavReader::open(path)
        .map_err(|e| StageError::unavailable("ffmpeg", format!("unreadable output: {e}")))?;
    let spec = reader.spec();
    if spec.channels != 1 || spec.sample_rate != 16_000 {
        return Err(StageError::unavailable(
            "ffmpeg",
            format!(
                "unexpected output format {}ch/{}Hz for {}",
                spec.channels,
                spec.sample_rate,
                path.display()
            ),
        ));
    }
    Ok(())
}
