use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Top-level service settings.
///
/// Loaded from an optional `telenote.toml` (path overridable via
/// `TELENOTE_CONFIG`), then overlaid with `TELENOTE__`-prefixed
/// environment variables (e.g. `TELENOTE__ASR__BASE_URL`).
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub asr: AsrSettings,
    #[serde(default)]
    pub summarizer: SummarizerSettings,
    #[serde(default)]
    pub platform: PlatformSettings,
    #[serde(default)]
    pub emr: EmrSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 9090,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    /// Root directory the multitrack recorder writes into; one
    /// subdirectory per consultation.
    pub recordings_dir: String,
    /// Directory for status records and lock directories.
    pub state_dir: String,
    /// Optional drop-off directory for notes that could not be
    /// delivered to the secondary EMR.
    pub shared_notes_dir: Option<String>,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            recordings_dir: "/data/recordings".to_string(),
            state_dir: "/data/state".to_string(),
            shared_notes_dir: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AsrSettings {
    pub base_url: String,
    /// Per-track request timeout. Recordings can be long; the engine
    /// processes a full track per request.
    pub timeout_secs: u64,
    /// "auto" | "force-native" | "force-transcode".
    pub normalize_policy: String,
}

impl Default for AsrSettings {
    fn default() -> Self {
        Self {
            base_url: "http://parakeet-asr:8000".to_string(),
            timeout_secs: 300,
            normalize_policy: "auto".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SummarizerSettings {
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
    /// Optional directory of per-specialty prompt templates
    /// (`<specialty>.txt`, plus `default.txt` to override the
    /// built-in default).
    pub templates_dir: Option<String>,
}

impl Default for SummarizerSettings {
    fn default() -> Self {
        Self {
            base_url: "http://ollama:11434".to_string(),
            model: "llama3.2:3b".to_string(),
            timeout_secs: 120,
            templates_dir: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlatformSettings {
    pub base_url: String,
    /// Bearer token for consultation data retrieval and note delivery.
    pub api_token: String,
    /// Token expected on inbound webhook triggers; empty disables the
    /// check (useful behind a trusted reverse proxy).
    pub webhook_token: String,
    /// Where to notify `{job_id, status}` after an event-triggered job
    /// reaches a terminal state. None disables the callback.
    pub callback_url: Option<String>,
    pub timeout_secs: u64,
}

impl Default for PlatformSettings {
    fn default() -> Self {
        Self {
            base_url: "http://telehealth-web".to_string(),
            api_token: String::new(),
            webhook_token: String::new(),
            callback_url: None,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct EmrSettings {
    /// Secondary EMR delivery is skipped entirely unless enabled.
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    /// Optional patient id for direct document attachment; unassigned
    /// queue otherwise.
    #[serde(default)]
    pub patient_id: Option<String>,
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        let config_path =
            std::env::var("TELENOTE_CONFIG").unwrap_or_else(|_| "telenote.toml".to_string());

        Config::builder()
            .add_source(File::with_name(&config_path).required(false))
            .add_source(Environment::with_prefix("TELENOTE").separator("__"))
            .build()?
            .try_deserialize()
    }
}
