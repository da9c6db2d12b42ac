//! Configuration management for docforge.
//!
//! Configuration can be set via environment variables (a `.env` file is
//! loaded first by the binaries):
//! - `OPENAI_API_KEY` - Required for the pipeline. API key for the reasoning backend.
//! - `LLM_BASE_URL` - Optional. OpenAI-compatible base URL. Defaults to `https://api.openai.com/v1`.
//! - `DEFAULT_MODEL` - Optional. The model every agent uses unless overridden. Defaults to `gpt-4o-mini`.
//! - `MAX_ITERATIONS` - Optional. Maximum agent loop iterations per task. Defaults to `15`.
//! - `MAX_TOOL_FAILURES` - Optional. Consecutive failing tool calls before an agent gives up. Defaults to `3`.
//! - `SANDBOX_TIMEOUT_MS` - Optional. Wall-clock ceiling for generated code. Defaults to `30000`.
//! - `SANDBOX_MEMORY_MB` - Optional. Address-space ceiling for generated code. Defaults to `512`.
//! - `SANDBOX_INTERPRETER` - Optional. Interpreter for generated code. Defaults to `python3`.
//! - `ALLOW_EXECUTION` - Optional. Overrides every agent's code execution permission.
//! - `PIPELINE_FILE` - Optional. YAML pipeline definition. Defaults to the built-in pipeline.
//! - `SOURCE_DOCUMENT` - Optional. Document read by the built-in pipeline. Defaults to `Lect-7-DM.pdf`.
//! - `OUTPUT_FILE` - Optional. Artifact written by the built-in pipeline. Defaults to `replicated_gen.py`.
//! - `VERBOSE` - Optional. Stream crew progress. Defaults to `true`.
//! - `HOST` / `PORT` - Optional. Numeric server address. Defaults to `127.0.0.1:8000`.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Limits applied to generated code run by executing agents.
#[derive(Debug, Clone)]
pub struct SandboxConfig {
    /// Interpreter binary the code is handed to
    pub interpreter: String,

    /// Wall-clock ceiling in milliseconds
    pub timeout_ms: u64,

    /// Address-space ceiling in megabytes
    pub memory_mb: u64,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            interpreter: "python3".to_string(),
            timeout_ms: 30_000,
            memory_mb: 512,
        }
    }
}

impl SandboxConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn memory_limit_bytes(&self) -> u64 {
        self.memory_mb.saturating_mul(1024 * 1024)
    }
}

/// Runtime configuration, passed explicitly into the crew and agent constructors.
#[derive(Debug, Clone)]
pub struct Config {
    /// Reasoning backend API key
    pub api_key: String,

    /// OpenAI-compatible base URL
    pub llm_base_url: String,

    /// Default model identifier
    pub default_model: String,

    /// Maximum capability calls per task
    pub max_iterations: usize,

    /// Consecutive failing tool calls tolerated per task
    pub max_tool_failures: usize,

    /// Global override of each agent's execution permission
    pub allow_execution: Option<bool>,

    pub sandbox: SandboxConfig,

    /// Optional YAML pipeline definition
    pub pipeline_file: Option<PathBuf>,

    /// Document read by the built-in pipeline
    pub source_document: PathBuf,

    /// Artifact written by the built-in pipeline
    pub output_file: PathBuf,

    /// Stream crew progress
    pub verbose: bool,

    /// Numeric server host
    pub host: String,

    /// Numeric server port
    pub port: u16,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEnvVar` if `OPENAI_API_KEY` is not set and
    /// `ConfigError::InvalidValue` for any value that does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| ConfigError::MissingEnvVar("OPENAI_API_KEY".to_string()))?;
        let mut config = Self::server_from_env()?;
        config.api_key = api_key;
        Ok(config)
    }

    /// Load everything except the API key, which the numeric server never needs.
    pub fn server_from_env() -> Result<Self, ConfigError> {
        let mut config = Self::new(String::new(), env_or("DEFAULT_MODEL", "gpt-4o-mini"));

        config.llm_base_url = env_or("LLM_BASE_URL", "https://api.openai.com/v1");
        config.max_iterations = env_parse("MAX_ITERATIONS", config.max_iterations)?;
        config.max_tool_failures = env_parse("MAX_TOOL_FAILURES", config.max_tool_failures)?;
        config.allow_execution = env_bool("ALLOW_EXECUTION")?;

        config.sandbox = SandboxConfig {
            interpreter: env_or("SANDBOX_INTERPRETER", &config.sandbox.interpreter),
            timeout_ms: env_parse("SANDBOX_TIMEOUT_MS", config.sandbox.timeout_ms)?,
            memory_mb: env_parse("SANDBOX_MEMORY_MB", config.sandbox.memory_mb)?,
        };

        config.pipeline_file = std::env::var("PIPELINE_FILE").ok().map(PathBuf::from);
        config.source_document = std::env::var("SOURCE_DOCUMENT")
            .map(PathBuf::from)
            .unwrap_or(config.source_document);
        config.output_file = std::env::var("OUTPUT_FILE")
            .map(PathBuf::from)
            .unwrap_or(config.output_file);
        config.verbose = env_bool("VERBOSE")?.unwrap_or(config.verbose);

        config.host = env_or("HOST", &config.host);
        config.port = env_parse("PORT", config.port)?;

        if config.max_iterations == 0 {
            return Err(ConfigError::InvalidValue(
                "MAX_ITERATIONS".to_string(),
                "must be at least 1".to_string(),
            ));
        }
        if config.sandbox.timeout_ms == 0 {
            return Err(ConfigError::InvalidValue(
                "SANDBOX_TIMEOUT_MS".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        Ok(config)
    }

    /// Create a config with custom values (useful for testing).
    pub fn new(api_key: String, default_model: String) -> Self {
        Self {
            api_key,
            llm_base_url: "https://api.openai.com/v1".to_string(),
            default_model,
            max_iterations: 15,
            max_tool_failures: 3,
            allow_execution: None,
            sandbox: SandboxConfig::default(),
            pipeline_file: None,
            source_document: PathBuf::from("Lect-7-DM.pdf"),
            output_file: PathBuf::from("replicated_gen.py"),
            verbose: true,
            host: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(v) => v
            .trim()
            .parse()
            .map_err(|e| ConfigError::InvalidValue(key.to_string(), format!("{}", e))),
        Err(_) => Ok(default),
    }
}

fn env_bool(key: &str) -> Result<Option<bool>, ConfigError> {
    std::env::var(key)
        .ok()
        .map(|v| parse_bool(&v).map_err(|e| ConfigError::InvalidValue(key.to_string(), e)))
        .transpose()
}

pub(crate) fn parse_bool(value: &str) -> Result<bool, String> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "t" | "yes" | "y" | "on" => Ok(true),
        "0" | "false" | "f" | "no" | "n" | "off" => Ok(false),
        other => Err(format!("expected boolean-like value, got: {}", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_bool_accepts_common_spellings() {
        for v in ["1", "true", "YES", " on "] {
            assert_eq!(parse_bool(v), Ok(true));
        }
        for v in ["0", "False", "no", "off"] {
            assert_eq!(parse_bool(v), Ok(false));
        }
        assert!(parse_bool("maybe").is_err());
    }

    #[test]
    fn new_uses_pipeline_defaults() {
        let config = Config::new("key".to_string(), "gpt-4o-mini".to_string());
        assert_eq!(config.max_iterations, 15);
        assert_eq!(config.sandbox.interpreter, "python3");
        assert_eq!(config.sandbox.timeout(), Duration::from_secs(30));
        assert_eq!(config.sandbox.memory_limit_bytes(), 512 * 1024 * 1024);
        assert_eq!(config.output_file, PathBuf::from("replicated_gen.py"));
        assert!(config.allow_execution.is_none());
    }
}
