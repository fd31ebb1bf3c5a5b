//! Configuration resolution.
//!
//! Each field resolves independently: CLI flag, then environment variable,
//! then the JSON config file, then the built-in default. Empty values count as
//! unset at every layer.
use crate::gateway::{CommandBackend, Gateway, GeminiBackend, LmBackend, Unconfigured};
use crate::sink::{NoSink, Sink, WebhookSink};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_LANGUAGE: &str = "Korean (한국어)";

pub const LM_COMMAND_ENV: &str = "ESGW_LM_COMMAND";
pub const GEMINI_MODEL_ENV: &str = "ESGW_GEMINI_MODEL";
pub const SINK_URL_ENV: &str = "ESGW_SINK_URL";
pub const LANGUAGE_ENV: &str = "ESGW_LANGUAGE";
/// Checked in order.
pub const API_KEY_ENVS: [&str; 2] = ["GEMINI_API_KEY", "API_KEY"];

/// On-disk config (`<config_dir>/esgw/config.json`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default)]
    pub lm_command: Option<String>,
    #[serde(default)]
    pub gemini_api_key: Option<String>,
    #[serde(default)]
    pub gemini_model: Option<String>,
    #[serde(default)]
    pub sink_url: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
}

/// Values given on the command line.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub config_path: Option<PathBuf>,
    pub lm_command: Option<String>,
    pub gemini_model: Option<String>,
    pub sink_url: Option<String>,
    pub language: Option<String>,
}

/// Fully resolved settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub lm_command: Option<String>,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub sink_url: Option<String>,
    pub language: String,
}

/// Default config file location, if the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("esgw").join("config.json"))
}

pub fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let bytes = fs::read(path).with_context(|| format!("read config {}", path.display()))?;
    let config: ConfigFile = serde_json::from_slice(&bytes)
        .with_context(|| format!("parse config JSON {}", path.display()))?;
    Ok(config)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

impl Config {
    /// Resolve against the process environment.
    pub fn resolve(overrides: &ConfigOverrides) -> Result<Config> {
        Config::resolve_with(overrides, |key| std::env::var(key).ok())
    }

    /// Resolve with an explicit environment lookup.
    ///
    /// An explicit `--config` path must exist; the default path is optional.
    pub fn resolve_with(
        overrides: &ConfigOverrides,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Config> {
        let file = match &overrides.config_path {
            Some(path) => load_config_file(path)?,
            None => match default_config_path().filter(|path| path.is_file()) {
                Some(path) => load_config_file(&path)?,
                None => ConfigFile::default(),
            },
        };
        let env_var = |key: &str| non_empty(env(key));

        let lm_command = non_empty(overrides.lm_command.clone())
            .or_else(|| env_var(LM_COMMAND_ENV))
            .or_else(|| non_empty(file.lm_command.clone()));
        let gemini_api_key = API_KEY_ENVS
            .into_iter()
            .find_map(env_var)
            .or_else(|| non_empty(file.gemini_api_key.clone()));
        let gemini_model = non_empty(overrides.gemini_model.clone())
            .or_else(|| env_var(GEMINI_MODEL_ENV))
            .or_else(|| non_empty(file.gemini_model.clone()))
            .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string());
        let sink_url = non_empty(overrides.sink_url.clone())
            .or_else(|| env_var(SINK_URL_ENV))
            .or_else(|| non_empty(file.sink_url.clone()));
        let language = non_empty(overrides.language.clone())
            .or_else(|| env_var(LANGUAGE_ENV))
            .or_else(|| non_empty(file.language.clone()))
            .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());

        Ok(Config {
            lm_command,
            gemini_api_key,
            gemini_model,
            sink_url,
            language,
        })
    }

    /// Command backend when a command is set, else Gemini when a key is set.
    pub fn backend(&self) -> Box<dyn LmBackend> {
        if let Some(command) = &self.lm_command {
            return Box::new(CommandBackend::new(command.clone()));
        }
        if let Some(key) = &self.gemini_api_key {
            return Box::new(GeminiBackend::new(key.clone(), self.gemini_model.clone()));
        }
        Box::new(Unconfigured)
    }

    pub fn gateway(&self) -> Gateway {
        let gateway = Gateway::new(self.backend(), self.language.clone());
        tracing::debug!(backend = gateway.backend_name(), "gateway configured");
        gateway
    }

    pub fn sink(&self) -> Box<dyn Sink> {
        match &self.sink_url {
            Some(url) => Box::new(WebhookSink::new(url.clone())),
            None => Box::new(NoSink),
        }
    }
}
