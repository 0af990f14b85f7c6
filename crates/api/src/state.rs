use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use telenote_clients::{HttpAsrClient, OllamaClient, OpenEmrClient, TelehealthClient};
use telenote_config::Settings;
use telenote_pipeline::tracks::FfmpegTranscoder;
use telenote_pipeline::{EmrApi, NormalizePolicy, Sequencer, Summarizer, TemplateRegistry, TrackTranscriber};
use telenote_store::{LockManager, StatusStore};

/// Shared handles for the HTTP surface. Cheap to clone; the sequencer
/// owns all pipeline wiring.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub store: Arc<StatusStore>,
    pub sequencer: Arc<Sequencer>,
}

impl AppState {
    /// Builds the full service graph from settings: stores, HTTP
    /// clients for the external dependencies, and the sequencer.
    pub fn from_settings(settings: Settings) -> anyhow::Result<Self> {
        let state_dir = PathBuf::from(&settings.storage.state_dir);
        let store = Arc::new(StatusStore::new(state_dir.join("status"))?);
        let locks = Arc::new(LockManager::new(state_dir.join("locks"))?);

        let policy: NormalizePolicy = settings.asr.normalize_policy.parse()?;
        let asr = Arc::new(HttpAsrClient::new(
            &settings.asr.base_url,
            Duration::from_secs(settings.asr.timeout_secs),
        )?);
        let transcriber = TrackTranscriber::new(asr, Arc::new(FfmpegTranscoder::new()), policy);

        let platform = Arc::new(TelehealthClient::new(
            &settings.platform.base_url,
            &settings.platform.api_token,
            settings.platform.callback_url.clone(),
            Duration::from_secs(settings.platform.timeout_secs),
        )?);

        let llm = Arc::new(OllamaClient::new(
            &settings.summarizer.base_url,
            &settings.summarizer.model,
            Duration::from_secs(settings.summarizer.timeout_secs),
        )?);
        let templates = match &settings.summarizer.templates_dir {
            Some(dir) => TemplateRegistry::from_dir(Path::new(dir)),
            None => TemplateRegistry::builtin(),
        };
        let summarizer = Summarizer::new(llm, templates);

        let emr = if settings.emr.enabled {
            Some(Arc::new(OpenEmrClient::new(
                &settings.emr.base_url,
                &settings.emr.api_key,
                settings.emr.patient_id.clone(),
                settings.storage.shared_notes_dir.clone().map(PathBuf::from),
                Duration::from_secs(settings.platform.timeout_secs),
            )?) as Arc<dyn EmrApi>)
        } else {
            None
        };

        let callback_enabled = settings.platform.callback_url.is_some();
        let sequencer = Arc::new(Sequencer::new(
            Arc::clone(&store),
            locks,
            transcriber,
            platform,
            summarizer,
            emr,
            callback_enabled,
        ));

        Ok(Self {
            settings: Arc::new(settings),
            store,
            sequencer,
        })
    }
}
