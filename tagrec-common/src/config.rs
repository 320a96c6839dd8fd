//! Configuration loading and LLM credential resolution
//!
//! Configuration lives in a single TOML file (`~/.config/tagrec/config.toml` on
//! Linux). Every field is optional so that partial files parse; a missing file
//! is not an error and falls back to compiled defaults.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable holding the LLM provider API key
pub const LLM_API_KEY_ENV: &str = "OPENAI_API_KEY";

const DEFAULT_LLM_MODEL: &str = "gpt-3.5-turbo";
const DEFAULT_LLM_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
const DEFAULT_LLM_TIMEOUT_SECS: u64 = 30;

/// Top-level TOML configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    /// Path to the co-occurrence model file
    pub model_path: Option<PathBuf>,
    /// Logging configuration
    pub logging: LoggingConfig,
    /// LLM provider settings
    pub llm: LlmConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default level when RUST_LOG is unset (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// LLM provider configuration (OpenAI-compatible chat completions)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// API key (ENV takes priority, see [`resolve_llm_api_key`])
    pub api_key: Option<String>,
    /// Model identifier sent with every request
    pub model: String,
    /// Chat completions endpoint
    pub endpoint: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_LLM_MODEL.to_string(),
            endpoint: DEFAULT_LLM_ENDPOINT.to_string(),
            timeout_secs: DEFAULT_LLM_TIMEOUT_SECS,
        }
    }
}

/// Platform config file location (`<config_dir>/tagrec/config.toml`)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("tagrec").join("config.toml"))
}

/// Load TOML configuration
///
/// A missing file yields defaults with a warning. A file that exists but
/// cannot be read or parsed is a configuration error.
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    if !path.exists() {
        warn!(
            "Config file {} not found, using defaults",
            path.display()
        );
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML failed: {}", e)))?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))?;

    info!("Loaded config from {}", path.display());
    Ok(config)
}

/// Write TOML configuration, creating parent directories as needed
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;

    // Write to a sibling temp file then rename so readers never see a partial file
    let tmp_path = path.with_extension("toml.tmp");
    std::fs::write(&tmp_path, content)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Resolve the LLM API key
///
/// **Priority:** ENV (`OPENAI_API_KEY`) → TOML `llm.api_key`
///
/// Missing credentials are a fatal configuration error for any workflow that
/// talks to the LLM provider.
pub fn resolve_llm_api_key(toml_config: &TomlConfig) -> Result<String> {
    let env_key = std::env::var(LLM_API_KEY_ENV)
        .ok()
        .filter(|k| is_valid_key(k));
    let toml_key = toml_config
        .llm
        .api_key
        .clone()
        .filter(|k| is_valid_key(k));

    if env_key.is_some() && toml_key.is_some() {
        warn!(
            "LLM API key found in environment and TOML. Using environment (highest priority)."
        );
    }

    if let Some(key) = env_key {
        info!("LLM API key loaded from environment variable");
        return Ok(key);
    }

    if let Some(key) = toml_key {
        info!("LLM API key loaded from TOML config");
        return Ok(key);
    }

    Err(Error::Config(format!(
        "LLM API key not configured. Please configure using one of:\n\
         1. Environment: {}=your-key-here\n\
         2. TOML config: [llm] api_key = \"your-key\"",
        LLM_API_KEY_ENV
    )))
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}
