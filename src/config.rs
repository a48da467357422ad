use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::error::{Result, TagwatchError};

/// Longest accepted poll interval (one day)
pub const MAX_POLL_INTERVAL_SECS: u64 = 24 * 60 * 60;

/// Global tagwatch configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Seconds between two polls of a watched page
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Where notifications go
    #[serde(default)]
    pub notify: NotifyTarget,

    /// Also ring the terminal bell on every notification
    #[serde(default)]
    pub chime: bool,

    /// Extra request headers (e.g. a session Cookie copied from the browser)
    #[serde(default)]
    pub headers: HashMap<String, String>,

    /// Override the User-Agent sent with page fetches
    #[serde(default)]
    pub user_agent: Option<String>,
}

fn default_poll_interval() -> u64 {
    30
}

impl Default for Config {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            notify: NotifyTarget::default(),
            chime: false,
            headers: HashMap::new(),
            user_agent: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotifyTarget {
    /// Native desktop pop-up (notify-send / osascript)
    #[default]
    Desktop,
    /// Terminal bell only
    Bell,
    /// Custom command, receives the notification as JSON on stdin
    Command { command: String },
    Ntfy { topic: String, server: Option<String> },
    Gotify { server: String, token: String },
}

impl Config {
    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            Self::from_toml(&content)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        if config.poll_interval_secs == 0 {
            return Err(TagwatchError::ConfigError(
                "poll_interval_secs must be greater than zero".into(),
            ));
        }
        if config.poll_interval_secs > MAX_POLL_INTERVAL_SECS {
            return Err(TagwatchError::ConfigError(format!(
                "poll_interval_secs must be at most {}",
                MAX_POLL_INTERVAL_SECS
            )));
        }
        Ok(config)
    }

    /// Get the config file path
    pub fn config_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("", "", "tagwatch")
            .ok_or_else(|| TagwatchError::ConfigError("Could not determine config directory".into()))?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Get the data directory path
    pub fn data_dir() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("", "", "tagwatch")
            .ok_or_else(|| TagwatchError::ConfigError("Could not determine data directory".into()))?;
        Ok(dirs.data_dir().to_path_buf())
    }

    /// Get the database path
    ///
    /// Supports TAGWATCH_DB environment variable for test isolation
    pub fn db_path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var("TAGWATCH_DB") {
            return Ok(PathBuf::from(path));
        }
        Ok(Self::data_dir()?.join("tagwatch.db"))
    }
}
