//! Shared runtime settings for the Parlor gateway and its sub-applications.
//!
//! One process holds exactly one [`SettingsStore`]; the gateway and every
//! mounted sub-application clone the same handle, so a write through the
//! admin endpoints is observed by all consumers on their next read.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// Feature flag plus allow-list controlling which model identifiers are
/// exposed downstream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelFilter {
    pub enabled: bool,
    pub models: Vec<String>,
}

impl ModelFilter {
    /// Whether a model identifier may be shown to callers under this filter.
    pub fn permits(&self, model_id: &str) -> bool {
        !self.enabled || self.models.iter().any(|entry| entry == model_id)
    }
}

/// A starter prompt offered on the landing screen: a short two-line title
/// plus the full prompt text it expands into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptSuggestion {
    pub title: Vec<String>,
    pub content: String,
}

/// Initial values for the store, assembled by the composition root from its
/// configuration source.
#[derive(Debug, Clone, Default)]
pub struct SettingsSeed {
    pub default_models: Option<String>,
    pub default_prompt_suggestions: Vec<PromptSuggestion>,
    pub trusted_email_header: Option<String>,
    pub model_filter: ModelFilter,
    pub webhook_url: String,
}

/// Cloneable handle to the process-wide settings.
///
/// Fields that never change after startup live directly in the handle;
/// runtime-mutable fields sit behind one writer lock so concurrent admin
/// writes serialize and readers never observe a torn value.
#[derive(Clone)]
pub struct SettingsStore {
    fixed: FixedSettings,
    mutable: Arc<RwLock<MutableSettings>>,
}

#[derive(Debug, Clone)]
struct FixedSettings {
    default_models: Option<String>,
    default_prompt_suggestions: Vec<PromptSuggestion>,
    trusted_email_header: Option<String>,
}

#[derive(Debug, Clone)]
struct MutableSettings {
    model_filter: ModelFilter,
    webhook_url: String,
}

impl SettingsStore {
    pub fn from_seed(seed: SettingsSeed) -> Self {
        Self {
            fixed: FixedSettings {
                default_models: seed.default_models,
                default_prompt_suggestions: seed.default_prompt_suggestions,
                trusted_email_header: seed.trusted_email_header,
            },
            mutable: Arc::new(RwLock::new(MutableSettings {
                model_filter: seed.model_filter,
                webhook_url: seed.webhook_url,
            })),
        }
    }

    pub fn default_models(&self) -> Option<&str> {
        self.fixed.default_models.as_deref()
    }

    pub fn default_prompt_suggestions(&self) -> &[PromptSuggestion] {
        &self.fixed.default_prompt_suggestions
    }

    /// Name of the reverse-proxy header trusted to carry an authenticated
    /// email, when that auth mode is configured.
    pub fn trusted_email_header(&self) -> Option<&str> {
        self.fixed.trusted_email_header.as_deref()
    }

    pub async fn model_filter(&self) -> ModelFilter {
        self.mutable.read().await.model_filter.clone()
    }

    pub async fn set_model_filter(&self, filter: ModelFilter) {
        let mut lock = self.mutable.write().await;
        lock.model_filter = filter;
    }

    pub async fn webhook_url(&self) -> String {
        self.mutable.read().await.webhook_url.clone()
    }

    pub async fn set_webhook_url(&self, url: String) {
        let mut lock = self.mutable.write().await;
        lock.webhook_url = url;
    }
}

/// Built-in starter prompts used when the deployment does not configure its
/// own set.
pub fn default_prompt_suggestions() -> Vec<PromptSuggestion> {
    vec![
        PromptSuggestion {
            title: vec![
                "Help me study".to_string(),
                "vocabulary for an entrance exam".to_string(),
            ],
            content: "Help me study vocabulary: write a sentence for me to fill in the blank, \
                      and I'll try to pick the correct option."
                .to_string(),
        },
        PromptSuggestion {
            title: vec![
                "Give me ideas".to_string(),
                "for a weekend project".to_string(),
            ],
            content: "Suggest five weekend projects I could finish in a day with basic tools."
                .to_string(),
        },
        PromptSuggestion {
            title: vec![
                "Tell me a fun fact".to_string(),
                "about the Roman Empire".to_string(),
            ],
            content: "Tell me a random fun fact about the Roman Empire".to_string(),
        },
        PromptSuggestion {
            title: vec![
                "Show me a code snippet".to_string(),
                "of a website's sticky header".to_string(),
            ],
            content: "Show me a code snippet of a website's sticky header in CSS and JavaScript."
                .to_string(),
        },
    ]
}
