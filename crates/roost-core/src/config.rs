//! Configuration management for Roost
//!
//! Loaded from a TOML file (by default `roost.toml` in the working directory).
//! Every section has defaults so a partial file is enough.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::{Result, RoostError};

/// Top-level Roost configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoostConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub twilio: TwilioConfig,

    #[serde(default)]
    pub calendar: CalendarConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub timing: TimingConfig,
}

/// HTTP listener and the public URL used for voice callbacks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Externally reachable base URL, no trailing slash
    #[serde(default = "default_public_url")]
    pub public_url: String,
}

/// Credentials for the SMS/voice provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TwilioConfig {
    #[serde(default)]
    pub account_sid: String,

    #[serde(default)]
    pub auth_token: String,

    /// Sending number
    #[serde(default)]
    pub phone: String,

    #[serde(default = "default_api_base")]
    pub api_base: String,
}

/// Where the household is, for sunset times
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarConfig {
    #[serde(default = "default_latitude")]
    pub latitude: f64,

    #[serde(default = "default_longitude")]
    pub longitude: f64,

    /// Minutes added to sunset for "sunset" tasks
    #[serde(default = "default_sunset_offset")]
    pub sunset_offset_minutes: i64,

    /// Household offset from UTC in minutes; unset uses the host's local zone
    #[serde(default)]
    pub utc_offset_minutes: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

/// Tick periods and timer delays
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    /// How often SCHEDULED assignments are checked
    #[serde(default = "default_check_interval")]
    pub check_interval_secs: u64,

    /// How often the timer table is polled
    #[serde(default = "default_timer_resolution")]
    pub timer_resolution_secs: u64,

    #[serde(default = "default_hour")]
    pub escalation_minutes: i64,

    #[serde(default = "default_hour")]
    pub snooze_minutes: i64,

    #[serde(default = "default_hour")]
    pub context_timeout_minutes: i64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_public_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_api_base() -> String {
    "https://api.twilio.com/2010-04-01".to_string()
}

fn default_latitude() -> f64 {
    42.36
}

fn default_longitude() -> f64 {
    -71.06
}

fn default_sunset_offset() -> i64 {
    10
}

fn default_store_path() -> PathBuf {
    PathBuf::from("roost-state.json")
}

fn default_check_interval() -> u64 {
    60
}

fn default_timer_resolution() -> u64 {
    15
}

fn default_hour() -> i64 {
    60
}

impl RoostConfig {
    /// Load configuration from `path` or use defaults when it does not exist
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Self::parse(&content)
        } else {
            Ok(Self::default())
        }
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| RoostError::Config(format!("Failed to parse config file: {}", e)))
    }

    /// Write the default configuration to `path`
    pub fn write_default(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let content = toml::to_string_pretty(&Self::default())
            .map_err(|e| RoostError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            public_url: default_public_url(),
        }
    }
}

impl Default for TwilioConfig {
    fn default() -> Self {
        Self {
            account_sid: String::new(),
            auth_token: String::new(),
            phone: String::new(),
            api_base: default_api_base(),
        }
    }
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            latitude: default_latitude(),
            longitude: default_longitude(),
            sunset_offset_minutes: default_sunset_offset(),
            utc_offset_minutes: None,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            check_interval_secs: default_check_interval(),
            timer_resolution_secs: default_timer_resolution(),
            escalation_minutes: default_hour(),
            snooze_minutes: default_hour(),
            context_timeout_minutes: default_hour(),
        }
    }
}
