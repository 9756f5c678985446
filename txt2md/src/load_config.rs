/// `load_config` module: loads the YAML configuration file and maps it into the
/// core's immutable [`RunSettings`].
///
/// This module is the only place where user-supplied YAML is parsed. Every
/// optional key is resolved to its default here, so the rest of the program
/// only ever sees a complete, validated settings value.
///
/// # Responsibilities
/// - Parse the YAML file into loosely-typed section structs
/// - Select the endpoint section named by `server.type`
/// - Apply environment overrides for secrets (`TXT2MD_API_KEY`, `TXT2MD_API_URL`)
/// - Validate the result before any file is touched
///
/// # Errors
/// All errors use `anyhow::Error` with context and are surfaced at the CLI
/// boundary as configuration errors.
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info, warn};
use txt2md_core::config::{
    CacheSettings, EndpointSettings, LogLevel, LogSettings, RunSettings, ServerKind,
    DEFAULT_CONTEXT_LENGTH, DEFAULT_INPUT_DIR, DEFAULT_INPUT_EXTENSION, DEFAULT_LOG_FILE,
    DEFAULT_OUTPUT_DIR, DEFAULT_SYSTEM_PROMPT, DEFAULT_TEMPERATURE, DEFAULT_TIMEOUT_SECS,
};

pub const DEFAULT_CONFIG_PATH: &str = "config/config.yaml";
pub const API_KEY_ENV: &str = "TXT2MD_API_KEY";
pub const API_URL_ENV: &str = "TXT2MD_API_URL";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawConfig {
    server: ServerSection,
    lmstudio: Option<EndpointSection>,
    ollama: Option<EndpointSection>,
    general: GeneralSection,
    directories: DirectoriesSection,
    logging: LoggingSection,
    caching: CachingSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ServerSection {
    #[serde(rename = "type")]
    kind: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct EndpointSection {
    api_url: Option<String>,
    api_key: Option<String>,
    api_timeout: Option<u64>,
    model_identifier: Option<String>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    context_length: Option<u32>,
    system_prompt: Option<String>,
    user_prompt_template: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GeneralSection {
    system_prompt: Option<String>,
    user_prompt_template: Option<String>,
    input_extension: Option<String>,
    max_concurrent_requests: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DirectoriesSection {
    input_dir: Option<PathBuf>,
    output_dir: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LoggingSection {
    log_file: Option<PathBuf>,
    log_level: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CachingSection {
    enabled: Option<bool>,
    force_reprocess_all: Option<bool>,
}

fn read_raw(path: &Path) -> Result<RawConfig> {
    let content = match fs::read_to_string(path) {
        Ok(content) => {
            info!(config_path = ?path, "Config file read successfully");
            content
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path,
                e
            ));
        }
    };

    if content.trim().is_empty() {
        return Ok(RawConfig::default());
    }

    match serde_yaml::from_str(&content) {
        Ok(raw) => {
            info!(config_path = ?path, "Parsed config YAML successfully");
            Ok(raw)
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path, "Failed to parse config YAML");
            Err(anyhow::anyhow!("Failed to parse config YAML: {e}"))
        }
    }
}

/// Loads the config file, applies environment overrides and validates the
/// resulting settings.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<RunSettings> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");
    let raw = read_raw(path_ref)?;

    let server = match raw.server.kind.as_deref() {
        None => ServerKind::LmStudio,
        Some(kind) => match ServerKind::parse(kind) {
            Some(server) => server,
            None => {
                error!(kind = %kind, "Unsupported server.type in config");
                anyhow::bail!(
                    "Invalid server type '{}' in configuration file {:?}",
                    kind,
                    path_ref
                );
            }
        },
    };
    info!(?server, "Selected server type from config");

    let section = match server {
        ServerKind::LmStudio => raw.lmstudio,
        ServerKind::Ollama => raw.ollama,
    };
    let env_url = std::env::var(API_URL_ENV).ok().filter(|v| !v.trim().is_empty());
    let section = match (section, &env_url) {
        (Some(section), _) => section,
        (None, Some(_)) => EndpointSection::default(),
        (None, None) => {
            error!(section = server.section(), "Missing endpoint section in config");
            anyhow::bail!(
                "Missing section [{}] in configuration file {:?}",
                server.section(),
                path_ref
            );
        }
    };

    let api_url = match env_url.or(section.api_url) {
        Some(url) => url,
        None => {
            error!(section = server.section(), "Missing api_url in config");
            anyhow::bail!(
                "Missing key 'api_url' in section [{}] in configuration file {:?}",
                server.section(),
                path_ref
            );
        }
    };

    let api_key = match std::env::var(API_KEY_ENV) {
        Ok(key) if !key.is_empty() => {
            info!("{API_KEY_ENV} found in env, overriding configured api_key");
            Some(key)
        }
        _ => section.api_key.filter(|k| !k.is_empty()),
    };

    let endpoint = EndpointSettings {
        server,
        api_url,
        api_key,
        model_identifier: section.model_identifier.filter(|m| !m.trim().is_empty()),
        timeout: Duration::from_secs(section.api_timeout.unwrap_or(DEFAULT_TIMEOUT_SECS)),
        temperature: section.temperature.unwrap_or(DEFAULT_TEMPERATURE),
        max_tokens: section.max_tokens,
        context_length: section.context_length.unwrap_or(DEFAULT_CONTEXT_LENGTH),
        system_prompt: raw
            .general
            .system_prompt
            .or(section.system_prompt)
            .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
        user_prompt_template: raw
            .general
            .user_prompt_template
            .or(section.user_prompt_template),
    };

    let input_extension = raw
        .general
        .input_extension
        .map(|ext| ext.trim().trim_start_matches('.').to_string())
        .unwrap_or_else(|| DEFAULT_INPUT_EXTENSION.to_string());

    let logging = LogSettings {
        log_file: raw
            .logging
            .log_file
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE)),
        log_level: raw
            .logging
            .log_level
            .as_deref()
            .map(LogLevel::parse_or_default)
            .unwrap_or(LogLevel::Info),
    };

    let defaults = CacheSettings::default();
    let settings = RunSettings {
        endpoint,
        input_dir: raw
            .directories
            .input_dir
            .unwrap_or_else(|| PathBuf::from(DEFAULT_INPUT_DIR)),
        output_dir: raw
            .directories
            .output_dir
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
        input_extension,
        cache: CacheSettings {
            enabled: raw.caching.enabled.unwrap_or(defaults.enabled),
            force_reprocess_all: raw
                .caching
                .force_reprocess_all
                .unwrap_or(defaults.force_reprocess_all),
        },
        max_concurrent_requests: raw.general.max_concurrent_requests.unwrap_or(1),
        logging,
    };

    settings
        .validate()
        .with_context(|| format!("Invalid configuration in {:?}", path_ref))?;

    info!(config_path = ?path_ref, "Config loaded and validated successfully");
    Ok(settings)
}

/// Reads only the logging section, falling back to defaults when the file
/// is missing or broken. Used to set up logging before the full load so that
/// configuration errors themselves get logged.
pub fn load_log_settings<P: AsRef<Path>>(path: P) -> LogSettings {
    match read_raw(path.as_ref()) {
        Ok(raw) => LogSettings {
            log_file: raw
                .logging
                .log_file
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE)),
            log_level: raw
                .logging
                .log_level
                .as_deref()
                .map(LogLevel::parse_or_default)
                .unwrap_or(LogLevel::Info),
        },
        Err(e) => {
            warn!(error = %e, "Using default logging settings");
            LogSettings::default()
        }
    }
}
