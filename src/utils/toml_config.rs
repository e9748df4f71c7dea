//! TOML-based configuration for Deepdive
//!
//! Server, provider and report settings live in `deepdive.toml`. Secrets never
//! do: the file only names the environment variables that hold the provider
//! credentials, and both must be present before a run can start.

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::search::tavily::DEFAULT_BASE_URL as TAVILY_BASE_URL;

/// Root configuration structure loaded from deepdive.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeepdiveConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub report: ReportConfig,
}

// ============= Server Configuration =============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub log_format: LogFormat,

    /// Finished runs kept in memory for polling before the oldest is evicted
    #[serde(default = "default_max_retained_runs")]
    pub max_retained_runs: usize,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_retained_runs() -> usize {
    64
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            log_format: LogFormat::default(),
            max_retained_runs: default_max_retained_runs(),
        }
    }
}

// ============= LLM Configuration =============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProviderKind {
    #[default]
    Gemini,
    OpenAI,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub provider: LlmProviderKind,

    /// Environment variable containing the API key (provider default when unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,

    /// Chat-completions base URL (provider default when unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(
        default = "default_temperature",
        skip_serializing_if = "Option::is_none"
    )]
    pub temperature: Option<f32>,

    /// Per-call limit for query analysis, synthesis and narrative; 0 waits indefinitely
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

fn default_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_temperature() -> Option<f32> {
    Some(0.4)
}

fn default_llm_timeout() -> u64 {
    120
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProviderKind::default(),
            api_key_env: None,
            api_base: None,
            model: default_model(),
            temperature: default_temperature(),
            timeout_secs: default_llm_timeout(),
        }
    }
}

impl LlmConfig {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }

    pub fn api_key_env(&self) -> &str {
        match (&self.api_key_env, self.provider) {
            (Some(env), _) => env.as_str(),
            (None, LlmProviderKind::Gemini) => "GEMINI_API_KEY",
            (None, LlmProviderKind::OpenAI) => "OPENAI_API_KEY",
        }
    }

    pub fn api_base(&self) -> &str {
        match (&self.api_base, self.provider) {
            (Some(base), _) => base.as_str(),
            (None, LlmProviderKind::Gemini) => {
                "https://generativelanguage.googleapis.com/v1beta/openai"
            }
            (None, LlmProviderKind::OpenAI) => "https://api.openai.com/v1",
        }
    }
}

// ============= Search Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_search_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_search_base_url")]
    pub base_url: String,

    #[serde(default = "default_max_results")]
    pub max_results: usize,

    #[serde(default = "default_search_depth")]
    pub search_depth: String,

    #[serde(default = "default_search_timeout")]
    pub timeout_secs: u64,
}

fn default_search_key_env() -> String {
    "TAVILY_API_KEY".to_string()
}

fn default_search_base_url() -> String {
    TAVILY_BASE_URL.to_string()
}

fn default_max_results() -> usize {
    5
}

fn default_search_depth() -> String {
    "basic".to_string()
}

fn default_search_timeout() -> u64 {
    30
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_search_key_env(),
            base_url: default_search_base_url(),
            max_results: default_max_results(),
            search_depth: default_search_depth(),
            timeout_secs: default_search_timeout(),
        }
    }
}

// ============= Report Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Maximum concurrent section-generation calls
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,

    /// Per-section timeout; 0 waits indefinitely
    #[serde(default = "default_section_timeout")]
    pub section_timeout_secs: u64,

    #[serde(default = "default_event_log_capacity")]
    pub event_log_capacity: usize,
}

fn default_max_workers() -> usize {
    2
}

fn default_section_timeout() -> u64 {
    120
}

fn default_event_log_capacity() -> usize {
    crate::progress::DEFAULT_CAPACITY
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            max_workers: default_max_workers(),
            section_timeout_secs: default_section_timeout(),
            event_log_capacity: default_event_log_capacity(),
        }
    }
}

impl ReportConfig {
    pub fn section_timeout(&self) -> Option<Duration> {
        (self.section_timeout_secs > 0).then(|| Duration::from_secs(self.section_timeout_secs))
    }
}

// ============= Configuration Loading & Validation =============

/// Errors that can occur during configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Environment variable '{0}' is not set")]
    MissingEnvVar(String),
}

impl From<ConfigError> for crate::types::AppError {
    fn from(err: ConfigError) -> Self {
        crate::types::AppError::Configuration(err.to_string())
    }
}

/// Provider credentials resolved from the environment
#[derive(Clone)]
pub struct Credentials {
    pub llm_api_key: String,
    pub search_api_key: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("llm_api_key", &"<redacted>")
            .field("search_api_key", &"<redacted>")
            .finish()
    }
}

impl DeepdiveConfig {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let config = Self::parse(&content)?;

        Ok(config)
    }

    /// Load the file if it exists, otherwise fall back to defaults
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            info!("No config at {:?}, using defaults", path);
            let config = Self::default();
            config.validate()?;
            Ok(config)
        }
    }

    /// Parse and validate TOML content
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: DeepdiveConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate value ranges and URLs. Credentials are checked separately by
    /// [`DeepdiveConfig::credentials`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.report.max_workers == 0 {
            return Err(ConfigError::ValidationError(
                "report.max_workers must be at least 1".to_string(),
            ));
        }

        if self.report.event_log_capacity == 0 {
            return Err(ConfigError::ValidationError(
                "report.event_log_capacity must be at least 1".to_string(),
            ));
        }

        if !(1..=20).contains(&self.search.max_results) {
            return Err(ConfigError::ValidationError(format!(
                "search.max_results must be between 1 and 20, got {}",
                self.search.max_results
            )));
        }

        if let Some(temperature) = self.llm.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(ConfigError::ValidationError(format!(
                    "llm.temperature must be between 0.0 and 2.0, got {}",
                    temperature
                )));
            }
        }

        for (name, url) in [
            ("llm.api_base", self.llm.api_base()),
            ("search.base_url", self.search.base_url.as_str()),
        ] {
            reqwest::Url::parse(url).map_err(|e| {
                ConfigError::ValidationError(format!("{} is not a valid URL ({}): {}", name, url, e))
            })?;
        }

        Ok(())
    }

    /// Apply `DEEPDIVE_HOST` / `DEEPDIVE_PORT` overrides
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(host) = std::env::var("DEEPDIVE_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("DEEPDIVE_PORT") {
            self.server.port = port.parse().map_err(|_| {
                ConfigError::ValidationError(format!("DEEPDIVE_PORT is not a valid port: {}", port))
            })?;
        }
        Ok(())
    }

    /// Resolve both provider credentials from the process environment
    pub fn credentials(&self) -> Result<Credentials, ConfigError> {
        self.credentials_from(|name| std::env::var(name).ok())
    }

    /// Resolve credentials through `lookup`; empty values count as missing
    pub fn credentials_from<F>(&self, lookup: F) -> Result<Credentials, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let resolve = |name: &str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| ConfigError::MissingEnvVar(name.to_string()))
        };

        Ok(Credentials {
            llm_api_key: resolve(self.llm.api_key_env())?,
            search_api_key: resolve(&self.search.api_key_env)?,
        })
    }
}

// ============= Configuration Manager =============

/// Thread-safe holder for the active configuration
pub struct ConfigManager {
    config: Arc<ArcSwap<DeepdiveConfig>>,
    config_path: Option<PathBuf>,
}

impl ConfigManager {
    /// Load the configuration at `path` (defaults when the file is absent)
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref().to_path_buf();
        let mut config = DeepdiveConfig::load_or_default(&path)?;
        config.apply_env_overrides()?;

        Ok(Self {
            config: Arc::new(ArcSwap::from_pointee(config)),
            config_path: Some(path),
        })
    }

    /// Create a config manager directly from a config (useful for testing)
    pub fn from_config(config: DeepdiveConfig) -> Self {
        Self {
            config: Arc::new(ArcSwap::from_pointee(config)),
            config_path: None,
        }
    }

    /// Get the current configuration (lockless read)
    pub fn config(&self) -> Arc<DeepdiveConfig> {
        self.config.load_full()
    }

    /// Reload the configuration from disk. A manager built with
    /// [`ConfigManager::from_config`] has no file and keeps its config.
    pub fn reload(&self) -> Result<(), ConfigError> {
        let Some(path) = &self.config_path else {
            return Ok(());
        };
        info!("Reloading configuration from {:?}", path);

        let mut new_config = DeepdiveConfig::load_or_default(path)?;
        new_config.apply_env_overrides()?;
        self.config.store(Arc::new(new_config));
        Ok(())
    }
}
