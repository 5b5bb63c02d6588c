use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::types::AnalysisType;

pub const CONFIG_FILE_NAME: &str = "prompt-golem.toml";

#[derive(Default, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct GolemConfig {
    pub model: ModelConfig,
    pub store: StoreConfig,
    pub analytics: AnalyticsConfig,
    pub execution: ExecutionConfig,
}

#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct ModelConfig {
    pub base_url: String,
    pub api_key: String,
    /// Value of the `OpenAI-Beta` header sent with every request.
    pub beta_header: String,
    pub request_timeout_seconds: u64,
    pub assistants: AssistantIds,
}

/// Assistant id used for each analysis type and for the apply call.
#[derive(Default, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct AssistantIds {
    pub contextual_richness: String,
    pub conciseness: String,
    pub clarity: String,
    pub consistency: String,
    pub custom: String,
    pub apply: String,
}

impl AssistantIds {
    pub fn for_analysis(&self, analysis_type: AnalysisType) -> &str {
        match analysis_type {
            AnalysisType::ContextualRichness => &self.contextual_richness,
            AnalysisType::Conciseness => &self.conciseness,
            AnalysisType::Clarity => &self.clarity,
            AnalysisType::Consistency => &self.consistency,
            AnalysisType::Custom => &self.custom,
        }
    }
}

#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct StoreConfig {
    /// PostgREST root, e.g. `https://<project>.supabase.co/rest/v1`.
    pub base_url: String,
    pub api_key: String,
    pub request_timeout_seconds: u64,
}

#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct AnalyticsConfig {
    pub enabled: bool,
    pub base_url: String,
    pub api_key: String,
}

#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct ExecutionConfig {
    pub worker_timeout_seconds: u64,
    pub apply_timeout_seconds: u64,
    pub poll_interval_ms: u64,
}

impl ExecutionConfig {
    pub fn worker_timeout(&self) -> Duration {
        Duration::from_secs(self.worker_timeout_seconds)
    }

    pub fn apply_timeout(&self) -> Duration {
        Duration::from_secs(self.apply_timeout_seconds)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            beta_header: "assistants=v2".to_string(),
            request_timeout_seconds: 30,
            assistants: AssistantIds::default(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_key: String::new(),
            request_timeout_seconds: 30,
        }
    }
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: "https://eu.posthog.com".to_string(),
            api_key: String::new(),
        }
    }
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            worker_timeout_seconds: 100,
            apply_timeout_seconds: 120,
            poll_interval_ms: 1000,
        }
    }
}

pub fn validate(config: &GolemConfig) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    if config.model.base_url.is_empty() {
        errors.push("model.base_url must not be empty".to_string());
    }

    if config.model.api_key.is_empty() {
        errors.push("model.api_key is not set (or export OPENAI_API_KEY)".to_string());
    }

    // Custom only needs an assistant when instructions are given, but a job
    // can't know that up front.
    for analysis_type in AnalysisType::ALL {
        if config.model.assistants.for_analysis(analysis_type).is_empty() {
            errors.push(format!(
                "model.assistants.{} must be set",
                analysis_type.as_str()
            ));
        }
    }
    if config.model.assistants.apply.is_empty() {
        errors.push("model.assistants.apply must be set".to_string());
    }

    errors.extend(store_errors(config));

    if config.analytics.enabled && config.analytics.api_key.is_empty() {
        errors.push("analytics.api_key must be set when analytics.enabled = true".to_string());
    }

    let execution = &config.execution;
    if execution.worker_timeout_seconds < 1 {
        errors.push("execution.worker_timeout_seconds must be >= 1".to_string());
    }
    if execution.apply_timeout_seconds < 1 {
        errors.push("execution.apply_timeout_seconds must be >= 1".to_string());
    }
    if execution.poll_interval_ms < 1 {
        errors.push("execution.poll_interval_ms must be >= 1".to_string());
    } else if execution.poll_interval() >= execution.worker_timeout() {
        errors.push(
            "execution.poll_interval_ms must be shorter than execution.worker_timeout_seconds"
                .to_string(),
        );
    }

    into_result(errors)
}

/// Validate only the `[store]` section, for commands that never reach the model.
pub fn validate_store(config: &GolemConfig) -> Result<(), Vec<String>> {
    into_result(store_errors(config))
}

fn store_errors(config: &GolemConfig) -> Vec<String> {
    let mut errors = Vec::new();
    if config.store.base_url.is_empty() {
        errors.push("store.base_url must not be empty".to_string());
    }
    if config.store.request_timeout_seconds < 1 {
        errors.push("store.request_timeout_seconds must be >= 1".to_string());
    }
    errors
}

fn into_result(errors: Vec<String>) -> Result<(), Vec<String>> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Load config from `path`, falling back to defaults when the file is absent.
///
/// Secrets left empty in the file are taken from `OPENAI_API_KEY`,
/// `PROMPT_GOLEM_STORE_API_KEY` and `POSTHOG_API_KEY`.
pub fn load_config(path: &Path) -> Result<GolemConfig, String> {
    load_with(path, validate)
}

/// Like `load_config`, but only the store section has to be complete.
pub fn load_store_config(path: &Path) -> Result<GolemConfig, String> {
    load_with(path, validate_store)
}

fn load_with(
    path: &Path,
    check: fn(&GolemConfig) -> Result<(), Vec<String>>,
) -> Result<GolemConfig, String> {
    let mut config = if path.exists() {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
        toml::from_str(&contents)
            .map_err(|e| format!("Failed to parse {}: {}", path.display(), e))?
    } else {
        GolemConfig::default()
    };

    apply_env_secrets(&mut config, |key| std::env::var(key).ok());

    check(&config).map_err(|errors| {
        format!(
            "Config validation failed:\n{}",
            errors
                .iter()
                .map(|e| format!("  - {}", e))
                .collect::<Vec<_>>()
                .join("\n")
        )
    })?;

    Ok(config)
}

/// Fill empty secrets from the environment. `lookup` is injectable for tests.
pub fn apply_env_secrets(config: &mut GolemConfig, lookup: impl Fn(&str) -> Option<String>) {
    fill_if_empty(&mut config.model.api_key, lookup("OPENAI_API_KEY"));
    fill_if_empty(
        &mut config.store.api_key,
        lookup("PROMPT_GOLEM_STORE_API_KEY"),
    );
    fill_if_empty(&mut config.analytics.api_key, lookup("POSTHOG_API_KEY"));
}

fn fill_if_empty(slot: &mut String, value: Option<String>) {
    if slot.is_empty() {
        if let Some(v) = value.filter(|v| !v.is_empty()) {
            *slot = v;
        }
    }
}
