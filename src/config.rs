use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Environment variable consulted for the API key when the config omits it.
pub const DEFAULT_API_KEY_ENV: &str = "ORCA_API_KEY";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub assembly: AssemblyConfig,
}

/// Which remote protocol the analysis endpoint speaks.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// The POST response is the final result.
    Sync,
    /// The POST response points at an operation to poll.
    Async,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    #[serde(default = "default_protocol")]
    pub protocol: Protocol,
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// `features` query value. Unset picks the protocol's default; empty sends none.
    #[serde(default)]
    pub features: Option<String>,
    #[serde(default = "default_locale")]
    pub locale: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Subdirectory name used for results when `analyze` is not given `--out`.
    #[serde(default)]
    pub output_label: Option<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            protocol: default_protocol(),
            endpoint: String::new(),
            api_key: None,
            api_key_env: default_api_key_env(),
            api_version: default_api_version(),
            model: default_model(),
            features: None,
            locale: default_locale(),
            timeout_secs: default_timeout_secs(),
            output_label: None,
        }
    }
}

fn default_protocol() -> Protocol {
    Protocol::Async
}
fn default_api_key_env() -> String {
    DEFAULT_API_KEY_ENV.to_string()
}
fn default_api_version() -> String {
    "2023-07-31".to_string()
}
fn default_model() -> String {
    "prebuilt-read".to_string()
}
fn default_locale() -> Option<String> {
    Some("en".to_string())
}
fn default_timeout_secs() -> u64 {
    30
}

impl ServiceConfig {
    /// Resolve the API key: inline value first, then the named environment variable.
    pub fn resolve_api_key(&self) -> Result<String> {
        if let Some(key) = self.api_key.as_ref().filter(|k| !k.is_empty()) {
            return Ok(key.clone());
        }
        std::env::var(&self.api_key_env).with_context(|| {
            format!(
                "service.api_key not set and {} environment variable not set",
                self.api_key_env
            )
        })
    }

    /// `features` sent on the analyze request: `read` for sync image
    /// analysis, `ocrHighResolution` for async document models.
    pub fn features(&self) -> &str {
        match (&self.features, self.protocol) {
            (Some(features), _) => features,
            (None, Protocol::Sync) => "read",
            (None, Protocol::Async) => "ocrHighResolution",
        }
    }

    /// Directory label for results written under an input directory.
    pub fn output_label(&self) -> &str {
        self.output_label.as_deref().unwrap_or(&self.model)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct PollingConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: f64,
    #[serde(default = "default_max_wait_secs")]
    pub max_wait_secs: u64,
    #[serde(default = "default_completion_field")]
    pub completion_field: String,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            max_wait_secs: default_max_wait_secs(),
            completion_field: default_completion_field(),
        }
    }
}

fn default_interval_secs() -> f64 {
    1.0
}
fn default_max_wait_secs() -> u64 {
    300
}
fn default_completion_field() -> String {
    "analyzeResult".to_string()
}

/// What happens to an item once its retry budget is spent.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExhaustionPolicy {
    /// Record an empty result and continue with the next input.
    Skip,
    /// Stop the whole batch.
    Abort,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_delay_seconds")]
    pub delay_seconds: f64,
    #[serde(default = "default_on_exhausted")]
    pub on_exhausted: ExhaustionPolicy,
    #[serde(default = "default_persist_exhausted")]
    pub persist_exhausted: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            delay_seconds: default_delay_seconds(),
            on_exhausted: default_on_exhausted(),
            persist_exhausted: default_persist_exhausted(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}
fn default_delay_seconds() -> f64 {
    5.0
}
fn default_on_exhausted() -> ExhaustionPolicy {
    ExhaustionPolicy::Skip
}
fn default_persist_exhausted() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ClassifierConfig {
    /// HEIC needs conversion for most services, so it is opt-in.
    #[serde(default)]
    pub accept_heic: bool,
}

/// Output format for assembled chunks.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Docx,
    Text,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Docx => "docx",
            OutputFormat::Text => "txt",
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AssemblyConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_format")]
    pub format: OutputFormat,
    #[serde(default = "default_archive")]
    pub archive: bool,
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            format: default_format(),
            archive: default_archive(),
        }
    }
}

fn default_chunk_size() -> usize {
    5000
}
fn default_format() -> OutputFormat {
    OutputFormat::Docx
}
fn default_archive() -> bool {
    true
}

impl Config {
    /// Defaults only. Used by commands that never talk to the service.
    pub fn minimal() -> Self {
        Self::default()
    }

    /// Checks that apply to every command.
    pub fn validate(&self) -> Result<()> {
        if self.retry.max_attempts < 1 {
            anyhow::bail!("retry.max_attempts must be >= 1");
        }
        if !self.retry.delay_seconds.is_finite() || self.retry.delay_seconds < 0.0 {
            anyhow::bail!("retry.delay_seconds must be a finite number >= 0");
        }
        if !self.polling.interval_secs.is_finite() || self.polling.interval_secs <= 0.0 {
            anyhow::bail!("polling.interval_secs must be > 0");
        }
        if self.polling.max_wait_secs == 0 {
            anyhow::bail!("polling.max_wait_secs must be > 0");
        }
        if self.polling.completion_field.is_empty() {
            anyhow::bail!("polling.completion_field must not be empty");
        }
        if self.assembly.chunk_size == 0 {
            anyhow::bail!("assembly.chunk_size must be > 0");
        }
        Ok(())
    }

    /// Extra checks for commands that submit images.
    pub fn validate_service(&self) -> Result<()> {
        if self.service.endpoint.trim().is_empty() {
            anyhow::bail!("service.endpoint must be set to analyze images");
        }
        if self.service.protocol == Protocol::Async && self.service.model.is_empty() {
            anyhow::bail!("service.model must be set when protocol is 'async'");
        }
        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    config.validate()?;

    Ok(config)
}
