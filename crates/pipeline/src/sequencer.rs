use std::path::Path;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::{error, info, warn};

use telenote_store::{JobStatus, LockManager, StatusRecord, StatusStore, TriggerSource};

use crate::clients::{EmrApi, PlatformApi};
use crate::error::StageError;
use crate::probe::TrackTranscriber;
use crate::summarize::{render_note, Summarizer};
use crate::tracks::discover_tracks;
use crate::{merge, speakers};

pub const EXIT_SUCCESS: i32 = 0;

enum Outcome {
    Completed,
    /// Nothing to process (no audio tracks).
    Skipped,
}

/// The orchestration core: receives a trigger, takes the per-job
/// lock, runs the fixed stage sequence, keeps the status record
/// current, and releases the lock on every exit path.
///
/// Invocations for different job ids run fully concurrently; a second
/// invocation for the same id is serialized away by the lock and
/// exits 0 without running any stage (idempotent-by-skip).
pub struct Sequencer {
    store: Arc<StatusStore>,
    locks: Arc<LockManager>,
    transcriber: TrackTranscriber,
    platform: Arc<dyn PlatformApi>,
    summarizer: Summarizer,
    emr: Option<Arc<dyn EmrApi>>,
    callback_enabled: bool,
    /// Duplicate-trigger observations keyed `{job_id}:{source}`.
    /// Observability only; never feeds back into control flow. Grows
    /// one entry per job/source pair for the process lifetime, which
    /// is bounded by the consultation volume.
    duplicates: DashMap<String, u64>,
}

impl Sequencer {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<StatusStore>,
        locks: Arc<LockManager>,
        transcriber: TrackTranscriber,
        platform: Arc<dyn PlatformApi>,
        summarizer: Summarizer,
        emr: Option<Arc<dyn EmrApi>>,
        callback_enabled: bool,
    ) -> Self {
        Self {
            store,
            locks,
            transcriber,
            platform,
            summarizer,
            emr,
            callback_enabled,
            duplicates: DashMap::new(),
        }
    }

    /// Processes one recording end to end. Returns the process-style
    /// exit code recorded in the status record; a lock-busy skip is 0.
    pub async fn run(
        &self,
        recording_path: &Path,
        trigger: TriggerSource,
        job_id: Option<String>,
    ) -> i32 {
        let job_id = match self.validate(recording_path, job_id) {
            Ok(job_id) => job_id,
            Err(e) => {
                warn!(path = %recording_path.display(), error = %e, "Trigger rejected");
                return e.exit_code();
            }
        };

        let guard = match self.locks.acquire(&job_id) {
            Ok(Some(guard)) => guard,
            Ok(None) => {
                let observed = self.note_duplicate(&job_id, trigger);
                info!(
                    %job_id,
                    source = %trigger,
                    observed,
                    "Job already in flight; skipping duplicate trigger"
                );
                return EXIT_SUCCESS;
            }
            Err(e) => {
                error!(%job_id, error = %e, "Lock acquisition failed");
                return StageError::unavailable("lock manager", e).exit_code();
            }
        };

        info!(%job_id, source = %trigger, path = %recording_path.display(), "Job started");

        let record = StatusRecord::processing(
            &job_id,
            recording_path.display().to_string(),
            trigger,
        );
        if let Err(e) = self.store.write(&record) {
            error!(%job_id, error = %e, "Cannot write status record; aborting");
            guard.release();
            return StageError::unavailable("status store", e).exit_code();
        }

        let outcome = self.run_stages(&job_id, recording_path).await;

        let (status, exit_code, error_text) = match &outcome {
            Ok(Outcome::Completed) => (JobStatus::Completed, EXIT_SUCCESS, None),
            Ok(Outcome::Skipped) => (JobStatus::Skipped, EXIT_SUCCESS, None),
            Err(e) => (JobStatus::Failed, e.exit_code(), Some(e.to_string())),
        };

        if let Err(e) = self
            .store
            .write(&record.finish(status, exit_code, error_text.clone()))
        {
            error!(%job_id, error = %e, "Failed to write terminal status record");
        }

        match &error_text {
            None => info!(%job_id, %status, "Job finished"),
            Some(msg) => warn!(%job_id, %status, exit_code, error = %msg, "Job failed"),
        }

        if trigger == TriggerSource::Event && self.callback_enabled {
            if let Err(e) = self.platform.notify(&job_id, status).await {
                warn!(%job_id, error = %e, "Trigger callback failed (ignored)");
            }
        }

        guard.release();
        exit_code
    }

    /// Duplicate-trigger observations for a job/source pair.
    pub fn duplicate_count(&self, job_id: &str, source: TriggerSource) -> u64 {
        self.duplicates
            .get(&format!("{job_id}:{source}"))
            .map(|c| *c)
            .unwrap_or(0)
    }

    fn note_duplicate(&self, job_id: &str, source: TriggerSource) -> u64 {
        let mut entry = self
            .duplicates
            .entry(format!("{job_id}:{source}"))
            .or_insert(0);
        *entry += 1;
        *entry
    }

    fn validate(
        &self,
        recording_path: &Path,
        job_id: Option<String>,
    ) -> Result<String, StageError> {
        let mut entries = std::fs::read_dir(recording_path).map_err(|e| {
            StageError::InvalidInput(format!(
                "recording path {}: {e}",
                recording_path.display()
            ))
        })?;
        if entries.next().is_none() {
            return Err(StageError::InvalidInput(format!(
                "recording path {} is empty",
                recording_path.display()
            )));
        }

        match job_id {
            Some(job_id) if !job_id.is_empty() => Ok(job_id),
            _ => recording_path
                .file_name()
                .and_then(|n| n.to_str())
                .map(String::from)
                .ok_or_else(|| {
                    StageError::InvalidInput(format!(
                        "cannot derive job id from {}",
                        recording_path.display()
                    ))
                }),
        }
    }

    /// The fixed stage order. Required stages propagate their error
    /// (fail-fast); optional stages log and continue.
    async fn run_stages(&self, job_id: &str, recording_dir: &Path) -> Result<Outcome, StageError> {
        // 1+2. Track discovery, normalization probe, transcription.
        let tracks = discover_tracks(recording_dir)?;
        if tracks.is_empty() {
            info!(%job_id, "No audio tracks; nothing to process");
            return Ok(Outcome::Skipped);
        }
        let transcripts = self.transcriber.transcribe_all(recording_dir, &tracks).await?;

        // 3. Consultation context (patient/provider identity, notes,
        // specialty). The job id stands in for the consultation id
        // until the platform resolves the authoritative one.
        let ctx = self.platform.fetch_consultation(job_id).await?;

        // 4. Speaker mapping — optional, degrades to generic labels.
        let speaker_map = speakers::map_speakers(recording_dir, &tracks);
        if speaker_map.is_empty() {
            info!(%job_id, "No speaker identities; using generic labels");
        }

        // 5. Merge.
        let merged = merge::merge(job_id, &transcripts, &speaker_map);
        self.persist_json(recording_dir, "final_merged.json", &merged);

        // 6. Summarize.
        let summary = self.summarizer.summarize(&merged, &ctx).await?;
        self.persist_json(recording_dir, "clinical_summary.json", &summary);
        let note = render_note(&summary, &ctx);
        self.persist_text(recording_dir, "final_note.txt", &note);

        // 7. Primary delivery, keyed by the platform's consultation id.
        let receipt = self
            .platform
            .deliver_note(&ctx.consultation_id, &note, &ctx)
            .await?;
        info!(%job_id, consultation_id = %receipt.consultation_id, "Note delivered");

        // 8. Secondary EMR — optional by configuration and by outcome.
        if let Some(emr) = &self.emr {
            match emr.deliver_document(job_id, &note).await {
                Ok(document_id) => info!(%job_id, %document_id, "Note filed with secondary EMR"),
                Err(e) => warn!(%job_id, error = %e, "Secondary EMR delivery failed (continuing)"),
            }
        }

        Ok(Outcome::Completed)
    }

    fn persist_json<T: serde::Serialize>(&self, dir: &Path, name: &str, value: &T) {
        match serde_json::to_vec_pretty(value) {
            Ok(bytes) => {
                if let Err(e) = std::fs::write(dir.join(name), bytes) {
                    warn!(artifact = name, error = %e, "Failed to persist artifact");
                }
            }
            Err(e) => warn!(artifact = name, error = %e, "Failed to serialize artifact"),
        }
    }

    fn persist_text(&self, dir: &Path, name: &str, text: &str) {
        if let Err(e) = std::fs::write(dir.join(name), text) {
            warn!(artifact = name, error = %e, "Failed to persist artifact");
        }
    }
}
