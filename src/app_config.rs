use log::warn;
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;
use url::Url;

use crate::errors::AppError;
use crate::translation::escalation::EscalationDecision;
use crate::translation::retry::RetryPolicy;
use crate::translation::scheduler::{AbortMode, SchedulerOptions};

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Source language (name such as "English" or ISO code)
    #[serde(default = "default_source_language")]
    pub source_language: String,

    /// Target language (name such as "Farsi" or ISO code)
    #[serde(default = "default_target_language")]
    pub target_language: String,

    /// Translation backend settings
    #[serde(default)]
    pub backend: BackendConfig,

    /// Batch planning and worker pool settings
    #[serde(default)]
    pub batching: BatchingConfig,

    /// Automatic retry settings
    #[serde(default)]
    pub retry: RetryConfig,

    /// Prompt template
    /// Placeholders: {source_language}, {target_language}, {context}, {batch_content}
    #[serde(default = "default_prompt_template")]
    pub prompt_template: String,

    /// What to do with a batch that exhausted its retries
    #[serde(default)]
    pub on_exhausted: ExhaustedPolicy,

    /// How an operator abort ends the run
    #[serde(default)]
    pub abort_mode: AbortMode,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Translation backend configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BackendConfig {
    // @field: Full URL of the chat completions endpoint
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    // @field: Model identifier sent with every request
    #[serde(default = "default_model")]
    pub model: String,

    // @field: Optional bearer token
    #[serde(default = "String::new")]
    pub api_key: String,

    // @field: Timeout seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            api_key: String::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Batch planning configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BatchingConfig {
    /// Maximum serialized size of a multi-page batch
    #[serde(default = "default_max_chars_per_batch")]
    pub max_chars_per_batch: usize,

    /// Characters of the previous batch's last page carried as context
    #[serde(default = "default_context_tail_chars")]
    pub context_tail_chars: usize,

    /// Number of batches processed at the same time
    #[serde(default = "default_concurrent_requests")]
    pub concurrent_requests: usize,
}

impl Default for BatchingConfig {
    fn default() -> Self {
        Self {
            max_chars_per_batch: default_max_chars_per_batch(),
            context_tail_chars: default_context_tail_chars(),
            concurrent_requests: default_concurrent_requests(),
        }
    }
}

/// Retry configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RetryConfig {
    /// Automatic retries before a batch is escalated
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay between attempts in milliseconds
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Multiplier applied to the delay after each failed attempt (1.0 keeps it fixed)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Upper bound for the delay in milliseconds
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl RetryConfig {
    /// Convert to the scheduler's retry policy
    pub fn to_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            retry_delay: Duration::from_millis(self.retry_delay_ms),
            backoff_multiplier: self.backoff_multiplier,
            max_delay: Duration::from_millis(self.max_delay_ms),
        }
    }
}

/// Policy applied when a batch exhausts its automatic retries
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExhaustedPolicy {
    /// Ask the operator on the console
    #[default]
    Prompt,
    /// Skip the batch without asking
    Skip,
    /// Abort the run without asking
    Abort,
}

impl ExhaustedPolicy {
    /// Fixed decision for non-interactive policies
    pub fn fixed_decision(&self) -> Option<EscalationDecision> {
        match self {
            Self::Prompt => None,
            Self::Skip => Some(EscalationDecision::Skip),
            Self::Abort => Some(EscalationDecision::Abort),
        }
    }
}

impl std::str::FromStr for ExhaustedPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_lowercase().as_str() {
            "prompt" => Ok(Self::Prompt),
            "skip" => Ok(Self::Skip),
            "abort" => Ok(Self::Abort),
            _ => Err(anyhow::anyhow!("Invalid exhausted-retry policy: {}", s)),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Matching filter for the `log` facade
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_source_language() -> String {
    "English".to_string()
}

fn default_target_language() -> String {
    "Farsi".to_string()
}

fn default_endpoint() -> String {
    "http://localhost:8000/v1/chat/completions".to_string()
}

fn default_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_timeout_secs() -> u64 {
    180
}

fn default_max_chars_per_batch() -> usize {
    12_000
}

fn default_context_tail_chars() -> usize {
    2_000
}

fn default_concurrent_requests() -> usize {
    4
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    5_000
}

fn default_backoff_multiplier() -> f64 {
    1.0
}

fn default_max_delay_ms() -> u64 {
    60_000
}

/// Default prompt asking for a JSON array of per-page translations
pub fn default_prompt_template() -> String {
    "You are a professional translator. Translate every page below from {source_language} to {target_language}.\n\
     For continuity, the previous part of the document ended with:\n\
     \"\"\"\n{context}\n\"\"\"\n\
     Do not translate that excerpt. The pages to translate are given as a JSON array of objects with \"page\" and \"text\" fields:\n\
     {batch_content}\n\n\
     Answer only with a JSON array containing one object per page, in the form \
     [{\"page\": <page number>, \"translated_text\": \"<translation>\"}]. \
     Keep every page, even empty ones, and add no commentary."
        .to_string()
}

impl Config {
    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<(), AppError> {
        if self.source_language.trim().is_empty() {
            return Err(AppError::Config("Source language cannot be empty".to_string()));
        }
        if self.target_language.trim().is_empty() {
            return Err(AppError::Config("Target language cannot be empty".to_string()));
        }

        Url::parse(&self.backend.endpoint).map_err(|e| {
            AppError::Config(format!("Invalid backend endpoint '{}': {}", self.backend.endpoint, e))
        })?;

        if self.backend.model.trim().is_empty() {
            return Err(AppError::Config("Backend model cannot be empty".to_string()));
        }
        if self.backend.timeout_secs == 0 {
            return Err(AppError::Config("Backend timeout must be positive".to_string()));
        }
        if self.batching.max_chars_per_batch == 0 {
            return Err(AppError::Config("max_chars_per_batch must be positive".to_string()));
        }
        if self.batching.concurrent_requests == 0 {
            return Err(AppError::Config("concurrent_requests must be positive".to_string()));
        }
        if !(self.retry.backoff_multiplier.is_finite() && self.retry.backoff_multiplier >= 1.0) {
            return Err(AppError::Config(format!(
                "backoff_multiplier must be at least 1.0, got {}",
                self.retry.backoff_multiplier
            )));
        }
        if !crate::translation::prompts::has_batch_placeholder(&self.prompt_template) {
            return Err(AppError::Config(
                "Prompt template must contain {batch_content} or {text_to_translate}".to_string(),
            ));
        }

        Ok(())
    }

    /// Load the configuration from a JSON file, writing a default one if it doesn't exist
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<Self, AppError> {
        let path = path.as_ref();

        if path.exists() {
            let file = File::open(path)
                .map_err(|e| AppError::File(format!("Failed to open config file {:?}: {}", path, e)))?;
            let reader = BufReader::new(file);
            return serde_json::from_reader(reader)
                .map_err(|e| AppError::Config(format!("Failed to parse config file {:?}: {}", path, e)));
        }

        warn!("Config file not found at {:?}, creating default config.", path);
        let config = Config::default();
        config.save(path)?;
        Ok(config)
    }

    /// Save the configuration as pretty-printed JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), AppError> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| AppError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path.as_ref(), json)?;
        Ok(())
    }

    /// Scheduler options derived from this configuration
    pub fn scheduler_options(&self) -> SchedulerOptions {
        SchedulerOptions {
            concurrent_requests: self.batching.concurrent_requests,
            retry: self.retry.to_policy(),
            abort_mode: self.abort_mode,
        }
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            source_language: default_source_language(),
            target_language: default_target_language(),
            backend: BackendConfig::default(),
            batching: BatchingConfig::default(),
            retry: RetryConfig::default(),
            prompt_template: default_prompt_template(),
            on_exhausted: ExhaustedPolicy::default(),
            abort_mode: AbortMode::default(),
            log_level: LogLevel::default(),
        }
    }
}
