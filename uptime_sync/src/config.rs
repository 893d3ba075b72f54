//! Configuration management for the uptime synchroniser

use crate::errors::{Result, SyncError};
use crate::models::normalize_url;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::env;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";
pub const DEFAULT_PROVIDER_URL: &str = "https://api.uptimerobot.com/v2";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Monitoring provider settings
    #[serde(default)]
    pub uptime_robot: ProviderConfig,

    /// HTTP timeout applied to every outbound request
    #[serde(default = "default_http_timeout_seconds")]
    pub http_timeout_seconds: u64,

    /// Monitors to synchronise, processed in file order
    #[serde(default)]
    pub monitors: Vec<MonitorConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Account-wide provider API key
    #[serde(default)]
    pub api_key: String,

    /// Base URL of the provider API
    #[serde(default = "default_provider_url")]
    pub base_url: String,

    /// Number of days the uptime ratio is computed over
    #[serde(default = "default_uptime_window_days")]
    pub uptime_window_days: u32,
}

/// One monitored URL and the status page metric it feeds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(rename = "url")]
    pub source_url: String,

    #[serde(rename = "api_key")]
    pub status_page_api_key: String,

    #[serde(rename = "status_url")]
    pub status_page_base_url: String,

    #[serde(default)]
    pub component_id: Option<u64>,

    pub metric_id: u64,

    /// Push the provider status onto `component_id` as well
    #[serde(default)]
    pub update_component: bool,
}

fn default_http_timeout_seconds() -> u64 {
    10
}

fn default_provider_url() -> String {
    DEFAULT_PROVIDER_URL.to_string()
}

fn default_uptime_window_days() -> u32 {
    1
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_provider_url(),
            uptime_window_days: default_uptime_window_days(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            uptime_robot: ProviderConfig::default(),
            http_timeout_seconds: default_http_timeout_seconds(),
            monitors: Vec::new(),
        }
    }
}

impl Config {
    /// Load, override from the environment and validate a YAML config file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;

        let mut config = Self::from_yaml(&content)?;
        config.apply_env_overrides();
        config.validate().map_err(SyncError::Config)?;

        Ok(config)
    }

    /// Parse a YAML document without applying overrides or validation
    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Apply overrides from environment variables
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| env::var(key).ok());
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(api_key) = lookup("UPTIMEROBOT_API_KEY") {
            self.uptime_robot.api_key = api_key;
        }

        if let Some(base_url) = lookup("UPTIMEROBOT_BASE_URL") {
            self.uptime_robot.base_url = base_url;
        }

        if let Some(timeout) = lookup("HTTP_TIMEOUT_SECONDS") {
            if let Ok(seconds) = timeout.parse::<u64>() {
                self.http_timeout_seconds = seconds;
            }
        }
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_seconds)
    }

    /// Validate the configuration
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.uptime_robot.api_key.trim().is_empty() {
            return Err("uptime_robot.api_key cannot be empty".to_string());
        }

        if !is_http_url(&self.uptime_robot.base_url) {
            return Err(format!(
                "uptime_robot.base_url must be an http(s) URL, got '{}'",
                self.uptime_robot.base_url
            ));
        }

        if self.uptime_robot.uptime_window_days == 0 {
            return Err("uptime_robot.uptime_window_days must be greater than 0".to_string());
        }

        if self.http_timeout_seconds == 0 {
            return Err("http_timeout_seconds must be greater than 0".to_string());
        }

        if self.monitors.is_empty() {
            return Err("at least one monitor must be configured".to_string());
        }

        let mut seen = HashSet::new();
        for monitor in &self.monitors {
            monitor.validate()?;

            if !seen.insert(normalize_url(&monitor.source_url)) {
                return Err(format!("monitor {} is configured twice", monitor.source_url));
            }
        }

        Ok(())
    }
}

impl MonitorConfig {
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.source_url.trim().is_empty() {
            return Err("monitor url cannot be empty".to_string());
        }

        if self.status_page_api_key.trim().is_empty() {
            return Err(format!("monitor {}: api_key cannot be empty", self.source_url));
        }

        if !is_http_url(&self.status_page_base_url) {
            return Err(format!(
                "monitor {}: status_url must be an http(s) URL, got '{}'",
                self.source_url, self.status_page_base_url
            ));
        }

        if self.metric_id == 0 {
            return Err(format!("monitor {}: metric_id must be greater than 0", self.source_url));
        }

        if self.update_component && self.component_id.is_none() {
            return Err(format!(
                "monitor {}: update_component requires a component_id",
                self.source_url
            ));
        }

        Ok(())
    }
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}
