//! Runtime settings and the document loader shared with docs files.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

pub const DEFAULT_LOG_LEVEL: &str = "info";

/// User-visible texts sent by the router.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Messages {
    pub wrong_channel: String,
    pub missing_permissions: String,
    pub missing_roles: String,
    pub failure: String,
}

impl Default for Messages {
    fn default() -> Self {
        Self {
            wrong_channel: "> **You cannot use this command in this channel.**".to_string(),
            missing_permissions: "> **You do not have the necessary perms to use this command.**"
                .to_string(),
            missing_roles: "> **You do not have the necessary roles to use this command.**"
                .to_string(),
            failure: "> **Something went wrong while running this command.**".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VidarConfig {
    /// Guilds every command is also registered in. Non-empty means development mode.
    pub debug_guilds: Vec<String>,
    /// Delay before a failed invocation's notice is sent.
    pub failure_notice_delay_ms: u64,
    /// Upper bound on handler run time; unbounded when absent.
    pub execution_timeout_ms: Option<u64>,
    pub log_level: String,
    pub messages: Messages,
}

impl Default for VidarConfig {
    fn default() -> Self {
        Self {
            debug_guilds: Vec::new(),
            failure_notice_delay_ms: 0,
            execution_timeout_ms: None,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            messages: Messages::default(),
        }
    }
}

impl VidarConfig {
    pub fn with_debug_guilds<I, S>(mut self, guilds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.debug_guilds = guilds.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_failure_notice_delay(mut self, delay: Duration) -> Self {
        self.failure_notice_delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_execution_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.execution_timeout_ms =
            timeout.map(|t| u64::try_from(t.as_millis()).unwrap_or(u64::MAX));
        self
    }

    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    pub fn with_messages(mut self, messages: Messages) -> Self {
        self.messages = messages;
        self
    }

    pub fn is_development(&self) -> bool {
        !self.debug_guilds.is_empty()
    }

    pub fn router_config(&self) -> RouterConfig {
        RouterConfig {
            failure_notice_delay: Duration::from_millis(self.failure_notice_delay_ms),
            execution_timeout: self.execution_timeout_ms.map(Duration::from_millis),
            messages: self.messages.clone(),
        }
    }
}

/// Settings the router needs, derived from [`VidarConfig`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouterConfig {
    pub failure_notice_delay: Duration,
    pub execution_timeout: Option<Duration>,
    pub messages: Messages,
}

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase()
}

/// Parse `data` as YAML, TOML or JSON depending on the extension of `path`.
fn parse_by_extension<T: DeserializeOwned>(path: &Path, data: &str) -> Result<T> {
    let parsed = match extension(path).as_str() {
        "yaml" | "yml" => serde_yaml::from_str(data)
            .with_context(|| format!("failed to parse yaml {}", path.display()))?,
        "toml" => toml::from_str(data)
            .with_context(|| format!("failed to parse toml {}", path.display()))?,
        _ => serde_json::from_str(data)
            .with_context(|| format!("failed to parse json {}", path.display()))?,
    };
    Ok(parsed)
}

/// Load settings from a file; `Ok(None)` if it does not exist.
pub fn load_config(path: &Path) -> Result<Option<VidarConfig>> {
    if !path.exists() {
        return Ok(None);
    }
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let config = parse_by_extension(path, &data)?;
    Ok(Some(config))
}

/// Read a structured document (docs files) as a JSON value.
pub(crate) fn read_document(path: &Path) -> ConfigResult<serde_json::Value> {
    let data = std::fs::read_to_string(path).map_err(|err| ConfigError::Io {
        path: path.display().to_string(),
        message: err.to_string(),
    })?;
    parse_by_extension(path, &data).map_err(|err| ConfigError::Parse {
        path: path.display().to_string(),
        message: format!("{err:#}"),
    })
}
