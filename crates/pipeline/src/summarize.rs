use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::clients::LlmClient;
use crate::error::StageError;
use crate::merge::dialogue_text;
use crate::{ConsultationContext, MergedTranscript, Summary, SummaryMetadata};

/// Template key used when a specialty has no template of its own.
pub const DEFAULT_TEMPLATE_KEY: &str = "default";

/// Built-in default prompt. Placeholders are substituted before the
/// prompt reaches the model.
const BUILTIN_DEFAULT_TEMPLATE: &str = "\
You are a medical assistant helping to summarize a telehealth consultation \
between {{provider_name}} and {{patient_name}}.

Provide a structured clinical summary combining the audio conversation \
transcript and the clinician's typed notes. Include sections for:
1. Chief Complaint
2. History of Present Illness
3. Review of Systems (if mentioned)
4. Assessment
5. Plan/Recommendations
6. Follow-up (if discussed)

Keep the summary professional, concise, and clinically relevant. Integrate \
information from both the conversation and the clinician's notes seamlessly.

Audio Conversation Transcript:
{{transcript}}

Clinician's Typed Notes:
{{clinician_notes}}

Clinical Summary:";

/// Prompt templates keyed by specialty, with a default fallback.
pub struct TemplateRegistry {
    templates: HashMap<String, String>,
}

impl TemplateRegistry {
    /// Registry with only the built-in default template.
    pub fn builtin() -> Self {
        let mut templates = HashMap::new();
        templates.insert(
            DEFAULT_TEMPLATE_KEY.to_string(),
            BUILTIN_DEFAULT_TEMPLATE.to_string(),
        );
        Self { templates }
    }

    /// Explicit template set; primarily for tests and embedded use.
    /// An empty map produces a registry where every lookup is
    /// `TemplateMissing`.
    pub fn new(templates: HashMap<String, String>) -> Self {
        Self { templates }
    }

    /// Loads `<specialty>.txt` files from a directory on top of the
    /// built-in default. `default.txt` overrides the built-in. An
    /// unreadable directory degrades to the built-in registry.
    pub fn from_dir(dir: &Path) -> Self {
        let mut registry = Self::builtin();
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "Templates directory unreadable; using built-in default");
                return registry;
            }
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("txt") {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match std::fs::read_to_string(&path) {
                Ok(body) => {
                    debug!(specialty = name, "Loaded prompt template");
                    registry.templates.insert(name.to_string(), body);
                }
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable template"),
            }
        }
        registry
    }

    /// Resolves the template for a specialty, falling back to the
    /// default. `TemplateMissing` only when even the default is gone.
    pub fn resolve(&self, specialty: Option<&str>) -> Result<&str, StageError> {
        if let Some(specialty) = specialty {
            if let Some(template) = self.templates.get(specialty) {
                return Ok(template);
            }
            debug!(specialty, "No specialty template; falling back to default");
        }
        self.templates
            .get(DEFAULT_TEMPLATE_KEY)
            .map(String::as_str)
            .ok_or_else(|| {
                StageError::TemplateMissing(format!(
                    "no template for specialty '{}' and no default template",
                    specialty.unwrap_or("-")
                ))
            })
    }
}

/// Stage 6: renders the specialty prompt and asks the model for a
/// structured clinical summary.
pub struct Summarizer {
    llm: Arc<dyn LlmClient>,
    templates: TemplateRegistry,
}

impl Summarizer {
    pub fn new(llm: Arc<dyn LlmClient>, templates: TemplateRegistry) -> Self {
        Self { llm, templates }
    }

    pub async fn summarize(
        &self,
        merged: &MergedTranscript,
        ctx: &ConsultationContext,
    ) -> Result<Summary, StageError> {
        let template = self.templates.resolve(ctx.specialty.as_deref())?;
        let prompt = render_template(template, merged, ctx);

        let summary_text = self.llm.generate(&prompt).await?;

        let mut sources = vec!["audio_transcript".to_string()];
        if ctx.clinician_notes.as_deref().is_some_and(|n| !n.is_empty()) {
            sources.push("clinician_notes".to_string());
        }

        Ok(Summary {
            recording_id: merged.recording_id.clone(),
            model: self.llm.model().to_string(),
            summary_text,
            metadata: SummaryMetadata {
                speaker_count: merged.speaker_count,
                segment_count: merged.segments.len(),
                patient_name: ctx.patient_name.clone(),
                provider_name: ctx.provider_name.clone(),
                sources,
            },
        })
    }
}

fn render_template(template: &str, merged: &MergedTranscript, ctx: &ConsultationContext) -> String {
    let notes = ctx
        .clinician_notes
        .as_deref()
        .filter(|n| !n.is_empty())
        .unwrap_or("No additional typed notes provided.");

    template
        .replace("{{transcript}}", &dialogue_text(merged))
        .replace("{{clinician_notes}}", notes)
        .replace("{{patient_name}}", &ctx.patient_name)
        .replace("{{provider_name}}", &ctx.provider_name)
}

/// The artifact actually delivered: fixed header, summary body,
/// generated-by footer.
pub fn render_note(summary: &Summary, ctx: &ConsultationContext) -> String {
    let divider = "=".repeat(50);
    let sources = summary.metadata.sources.join(" + ");
    format!(
        "Telehealth Consultation Summary\n\
         Patient: {}\n\
         Provider: {}\n\
         Recording ID: {}\n\
         {divider}\n\n\
         {}\n\n\
         {divider}\n\
         Generated by: {}\n\
         Sources: {sources}\n",
        ctx.patient_name, ctx.provider_name, summary.recording_id, summary.summary_text, summary.model,
    )
}
