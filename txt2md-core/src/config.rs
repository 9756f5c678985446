//! Run settings: the immutable configuration snapshot consumed by one run.
//!
//! Settings are built once (by the CLI's loader or directly in tests) and
//! passed by reference into every component that needs them.

use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_CONTEXT_LENGTH: u32 = 8192;
pub const DEFAULT_INPUT_DIR: &str = "data/input";
pub const DEFAULT_OUTPUT_DIR: &str = "data/output";
pub const DEFAULT_INPUT_EXTENSION: &str = "txt";
pub const DEFAULT_LOG_FILE: &str = "app.log";
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a helpful assistant that converts text to well-structured Markdown.";

/// Placeholder replaced by the file's text inside a user prompt template.
pub const TEXT_PLACEHOLDER: &str = "{text_content}";

/// Which kind of OpenAI-compatible server the endpoint belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerKind {
    LmStudio,
    Ollama,
}

impl ServerKind {
    /// Parses the `server.type` value, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lmstudio" => Some(ServerKind::LmStudio),
            "ollama" => Some(ServerKind::Ollama),
            _ => None,
        }
    }

    /// Name of the config section holding this server's endpoint settings.
    pub fn section(&self) -> &'static str {
        match self {
            ServerKind::LmStudio => "lmstudio",
            ServerKind::Ollama => "ollama",
        }
    }
}

/// Log verbosity as written in the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl LogLevel {
    /// Unknown names fall back to `Info`.
    pub fn parse_or_default(s: &str) -> Self {
        match s.trim().to_ascii_uppercase().as_str() {
            "DEBUG" => LogLevel::Debug,
            "INFO" => LogLevel::Info,
            "WARNING" | "WARN" => LogLevel::Warning,
            "ERROR" => LogLevel::Error,
            "CRITICAL" => LogLevel::Critical,
            _ => LogLevel::Info,
        }
    }
}

/// Endpoint and model parameters for the conversion call.
#[derive(Debug, Clone, Serialize)]
pub struct EndpointSettings {
    pub server: ServerKind,
    pub api_url: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub model_identifier: Option<String>,
    pub timeout: Duration,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub context_length: u32,
    pub system_prompt: String,
    pub user_prompt_template: Option<String>,
}

impl EndpointSettings {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            server: ServerKind::LmStudio,
            api_url: api_url.into(),
            api_key: None,
            model_identifier: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: None,
            context_length: DEFAULT_CONTEXT_LENGTH,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            user_prompt_template: None,
        }
    }

    /// Builds the user message for a file: the raw text, or the template
    /// with its placeholder substituted.
    pub fn user_content(&self, text: &str) -> String {
        match &self.user_prompt_template {
            Some(template) => template.replace(TEXT_PLACEHOLDER, text),
            None => text.to_string(),
        }
    }

    /// Model identifier, treating an empty string as absent.
    pub fn model(&self) -> Option<&str> {
        self.model_identifier
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
    }
}

/// Caching flags deciding how staleness is evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheSettings {
    pub enabled: bool,
    pub force_reprocess_all: bool,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            force_reprocess_all: false,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LogSettings {
    pub log_file: PathBuf,
    pub log_level: LogLevel,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
            log_level: LogLevel::Info,
        }
    }
}

/// The full settings snapshot for a run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSettings {
    pub endpoint: EndpointSettings,
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Extension (without the dot) that makes a file eligible.
    pub input_extension: String,
    pub cache: CacheSettings,
    pub max_concurrent_requests: usize,
    pub logging: LogSettings,
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("missing required setting `{0}`")]
    Missing(&'static str),
    #[error("invalid value for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl RunSettings {
    /// Settings with every optional field at its default.
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            endpoint: EndpointSettings::new(api_url),
            input_dir: PathBuf::from(DEFAULT_INPUT_DIR),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            input_extension: DEFAULT_INPUT_EXTENSION.to_string(),
            cache: CacheSettings::default(),
            max_concurrent_requests: 1,
            logging: LogSettings::default(),
        }
    }

    pub fn with_dirs(
        mut self,
        input_dir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        self.input_dir = input_dir.into();
        self.output_dir = output_dir.into();
        self
    }

    pub fn with_cache(mut self, enabled: bool, force_reprocess_all: bool) -> Self {
        self.cache = CacheSettings {
            enabled,
            force_reprocess_all,
        };
        self
    }

    pub fn with_concurrency(mut self, max_concurrent_requests: usize) -> Self {
        self.max_concurrent_requests = max_concurrent_requests;
        self
    }

    /// Checks the invariants a run relies on. Called by the loader before
    /// any file is touched.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.endpoint.api_url.trim();
        if url.is_empty() {
            return Err(ConfigError::Missing("api_url"));
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::Invalid {
                key: "api_url",
                reason: format!("expected an http(s) URL, got {url:?}"),
            });
        }
        if !(0.0..=2.0).contains(&self.endpoint.temperature) {
            return Err(ConfigError::Invalid {
                key: "temperature",
                reason: format!("{} is outside 0.0..=2.0", self.endpoint.temperature),
            });
        }
        if self.endpoint.timeout.is_zero() {
            return Err(ConfigError::Invalid {
                key: "api_timeout",
                reason: "must be greater than zero".into(),
            });
        }
        if self.endpoint.max_tokens == Some(0) {
            return Err(ConfigError::Invalid {
                key: "max_tokens",
                reason: "must be greater than zero when set".into(),
            });
        }
        if self.max_concurrent_requests == 0 {
            return Err(ConfigError::Invalid {
                key: "max_concurrent_requests",
                reason: "must be at least 1".into(),
            });
        }
        if self.input_extension.is_empty() || self.input_extension.contains('.') {
            return Err(ConfigError::Invalid {
                key: "input_extension",
                reason: format!(
                    "expected a single extension without dots, got {:?}",
                    self.input_extension
                ),
            });
        }
        Ok(())
    }

    pub fn trace_loaded(&self) {
        info!(
            server = ?self.endpoint.server,
            api_url = %self.endpoint.api_url,
            api_key_set = self.endpoint.api_key.is_some(),
            model = self.endpoint.model().unwrap_or("<server default>"),
            input_dir = %self.input_dir.display(),
            output_dir = %self.output_dir.display(),
            caching_enabled = self.cache.enabled,
            force_reprocess_all = self.cache.force_reprocess_all,
            max_concurrent_requests = self.max_concurrent_requests,
            "Loaded RunSettings"
        );
        debug!(
            timeout = ?self.endpoint.timeout,
            temperature = self.endpoint.temperature,
            max_tokens = ?self.endpoint.max_tokens,
            context_length = self.endpoint.context_length,
            "RunSettings endpoint parameters"
        );
    }
}
