use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use tracing::info;

use crate::clients::{AsrClient, Transcoder};
use crate::error::StageError;
use crate::tracks::NORMALIZED_DIR;
use crate::{AudioTrack, Transcript};

/// Audio normalization policy.
///
/// `Auto` probes one track against the engine in its native container
/// and only pays for transcoding when the engine rejects it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NormalizePolicy {
    #[default]
    Auto,
    /// Never transcode; a format rejection fails the job.
    ForceNative,
    /// Always transcode, never probe.
    ForceTranscode,
}

impl FromStr for NormalizePolicy {
    type Err = StageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(NormalizePolicy::Auto),
            "force-native" => Ok(NormalizePolicy::ForceNative),
            "force-transcode" => Ok(NormalizePolicy::ForceTranscode),
            other => Err(StageError::InvalidInput(format!(
                "unknown normalize policy '{other}'"
            ))),
        }
    }
}

/// Runs stages 1+2: decides per job whether tracks go to the engine
/// natively or through the transcode fallback, then collects one
/// transcript per track.
pub struct TrackTranscriber {
    asr: Arc<dyn AsrClient>,
    transcoder: Arc<dyn Transcoder>,
    policy: NormalizePolicy,
}

impl TrackTranscriber {
    pub fn new(
        asr: Arc<dyn AsrClient>,
        transcoder: Arc<dyn Transcoder>,
        policy: NormalizePolicy,
    ) -> Self {
        Self {
            asr,
            transcoder,
            policy,
        }
    }

    /// Transcribes every track. An empty track set returns an empty
    /// vec; the sequencer decides what that means for the job.
    pub async fn transcribe_all(
        &self,
        recording_dir: &Path,
        tracks: &[AudioTrack],
    ) -> Result<Vec<Transcript>, StageError> {
        if tracks.is_empty() {
            return Ok(Vec::new());
        }

        match self.policy {
            NormalizePolicy::ForceTranscode => {
                self.transcode_and_transcribe(recording_dir, tracks).await
            }
            NormalizePolicy::ForceNative => {
                let mut out = Vec::with_capacity(tracks.len());
                for track in tracks {
                    out.push(self.asr.transcribe(track).await?);
                }
                Ok(out)
            }
            NormalizePolicy::Auto => self.probe_then_transcribe(recording_dir, tracks).await,
        }
    }

    /// The auto policy: submit the first track natively. Acceptance
    /// means the engine handles the container and the remaining
    /// tracks follow natively (the probe transcript is kept, not
    /// resubmitted). A format rejection means every track — probe
    /// included — goes through the transcoder.
    async fn probe_then_transcribe(
        &self,
        recording_dir: &Path,
        tracks: &[AudioTrack],
    ) -> Result<Vec<Transcript>, StageError> {
        let probe = &tracks[0];
        match self.asr.transcribe(probe).await {
            Ok(probe_transcript) => {
                info!(track = %probe.stem, "Probe accepted: submitting tracks natively");
                let mut out = Vec::with_capacity(tracks.len());
                out.push(probe_transcript);
                for track in &tracks[1..] {
                    out.push(self.asr.transcribe(track).await?);
                }
                Ok(out)
            }
            Err(e) if e.is_format_rejection() => {
                info!(track = %probe.stem, reason = %e, "Probe rejected: falling back to transcode");
                self.transcode_and_transcribe(recording_dir, tracks).await
            }
            Err(e) => Err(e),
        }
    }

    async fn transcode_and_transcribe(
        &self,
        recording_dir: &Path,
        tracks: &[AudioTrack],
    ) -> Result<Vec<Transcript>, StageError> {
        let normalized = recording_dir.join(NORMALIZED_DIR);
        if let Err(e) = std::fs::create_dir_all(&normalized) {
            return Err(StageError::unavailable(
                "transcoder",
                format!("cannot create {}: {e}", normalized.display()),
            ));
        }

        let mut out = Vec::with_capacity(tracks.len());
        for track in tracks {
            let dst = normalized.join(format!("{}.wav", track.stem));
            self.transcoder.to_wav(&track.path, &dst).await?;
            let normalized_track = AudioTrack {
                index: track.index,
                path: dst,
                stem: track.stem.clone(),
            };
            let mut transcript = self.asr.transcribe(&normalized_track).await?;
            // Keep the original container as the reported source.
            transcript.source_file = track
                .path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or(&transcript.source_file)
                .to_string();
            out.push(transcript);
        }
        if tracks.len() > 1 {
            info!(count = tracks.len(), "All tracks transcoded and submitted");
        }
        Ok(out)
    }
}
