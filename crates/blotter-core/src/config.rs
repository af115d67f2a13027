//! Blotter Configuration Management
//!
//! Handles configuration from environment variables and TOML config files
//! with sensible defaults for development.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// Keyword vocabulary override. `None` uses the built-in incident
    /// vocabulary; an explicitly empty list is rejected at startup.
    /// Declared before the table sections so TOML serialization stays valid.
    pub vocabulary: Option<Vec<String>>,

    /// Model fallback configuration
    pub llm: LlmConfig,

    /// Pipeline configuration
    pub pipeline: PipelineConfig,

    /// Result sink configuration
    pub sink: SinkConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        // Model endpoint
        if let Ok(key) = std::env::var("OPENROUTER_API_KEY") {
            config.llm.api_key = Some(key);
        }
        if let Ok(url) = std::env::var("BLOTTER_LLM_URL") {
            config.llm.base_url = url;
        }
        if let Ok(model) = std::env::var("BLOTTER_LLM_MODEL") {
            config.llm.model = model;
        }
        if let Ok(timeout) = std::env::var("BLOTTER_LLM_TIMEOUT_SECS") {
            config.llm.timeout_secs =
                timeout.parse().map_err(|_| ConfigError::InvalidValue {
                    key: "BLOTTER_LLM_TIMEOUT_SECS".to_string(),
                    value: timeout,
                })?;
        }

        // Pipeline
        if let Ok(n) = std::env::var("BLOTTER_MODEL_CONCURRENCY") {
            config.pipeline.max_model_concurrency =
                n.parse().map_err(|_| ConfigError::InvalidValue {
                    key: "BLOTTER_MODEL_CONCURRENCY".to_string(),
                    value: n,
                })?;
        }

        // Sink
        if let Ok(path) = std::env::var("BLOTTER_OUTPUT") {
            config.sink.path = PathBuf::from(path);
        }

        // Logging
        if let Ok(level) = std::env::var("BLOTTER_LOG_LEVEL") {
            config.logging.level = level;
        }

        Ok(config)
    }

    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path,
            message: e.to_string(),
        })
    }

    /// Merge with environment variables (env takes precedence for
    /// sensitive and operational values)
    pub fn with_env_override(mut self) -> Result<Self, ConfigError> {
        let env_config = Self::from_env()?;

        if env_config.llm.api_key.is_some() {
            self.llm.api_key = env_config.llm.api_key;
        }
        if env_config.llm.base_url != LlmConfig::default().base_url {
            self.llm.base_url = env_config.llm.base_url;
        }
        if env_config.llm.model != LlmConfig::default().model {
            self.llm.model = env_config.llm.model;
        }
        if env_config.llm.timeout_secs != LlmConfig::default().timeout_secs {
            self.llm.timeout_secs = env_config.llm.timeout_secs;
        }
        if env_config.pipeline.max_model_concurrency
            != PipelineConfig::default().max_model_concurrency
        {
            self.pipeline.max_model_concurrency = env_config.pipeline.max_model_concurrency;
        }
        if env_config.sink.path != SinkConfig::default().path {
            self.sink.path = env_config.sink.path;
        }
        if env_config.logging.level != LoggingConfig::default().level {
            self.logging.level = env_config.logging.level;
        }

        Ok(self)
    }

    /// Validate startup invariants that would otherwise surface mid-batch
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(vocabulary) = &self.vocabulary {
            if vocabulary.iter().all(|k| k.trim().is_empty()) {
                return Err(ConfigError::MissingRequired(
                    "vocabulary must contain at least one keyword".to_string(),
                ));
            }
        }
        if self.llm.enabled && self.llm.api_key.is_none() {
            return Err(ConfigError::MissingRequired(
                "OPENROUTER_API_KEY (or llm.api_key) required when the model fallback is enabled"
                    .to_string(),
            ));
        }
        if self.pipeline.max_model_concurrency == 0 {
            return Err(ConfigError::InvalidValue {
                key: "pipeline.max_model_concurrency".to_string(),
                value: "0".to_string(),
            });
        }
        Ok(())
    }
}

/// Model fallback endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Whether the model fallback stage runs at all
    pub enabled: bool,

    /// Bearer token for the completions endpoint
    pub api_key: Option<String>,

    /// OpenAI-compatible base URL
    pub base_url: String,

    /// Model name to use
    pub model: String,

    /// Maximum tokens for completion
    pub max_tokens: u32,

    /// Temperature for generation (0 for deterministic extraction)
    pub temperature: f32,

    /// Per-call timeout in seconds
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: None,
            base_url: "https://openrouter.ai/api/v1".to_string(),
            model: "openai/gpt-oss-20b".to_string(),
            max_tokens: 512,
            temperature: 0.0,
            timeout_secs: 60,
        }
    }
}

/// Pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Maximum in-flight model fallback calls (the model endpoint is
    /// metered; deterministic stages run unbounded)
    pub max_model_concurrency: usize,

    /// How many records to hand to the sink per append
    pub sink_batch_size: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_model_concurrency: 8,
            sink_batch_size: 50,
        }
    }
}

/// Result sink configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Output format
    pub format: SinkFormat,

    /// Output file path
    pub path: PathBuf,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            format: SinkFormat::Csv,
            path: PathBuf::from("results.csv"),
        }
    }
}

/// Supported sink formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkFormat {
    Csv,
    Jsonl,
}

impl std::str::FromStr for SinkFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "jsonl" => Ok(Self::Jsonl),
            _ => Err(ConfigError::InvalidValue {
                key: "sink.format".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}
