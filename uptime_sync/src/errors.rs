//! Error types for the uptime synchroniser

use std::fmt;

pub type Result<T> = std::result::Result<T, SyncError>;

#[derive(Debug)]
pub enum SyncError {
    /// IO operation failed
    Io(std::io::Error),

    /// HTTP request failed
    Http(reqwest::Error),

    /// JSON serialization/deserialization failed
    Json(serde_json::Error),

    /// Configuration file could not be parsed
    Yaml(serde_yaml::Error),

    /// Configuration error
    Config(String),

    /// Monitoring provider rejected the request or answered unexpectedly
    Provider(String),

    /// No provider monitor matches the configured source URL
    MonitorNotFound(String),

    /// Provider record carries no usable uptime ratio
    MissingUptime(u64),

    /// Status page rejected the request or answered unexpectedly
    StatusPage(String),
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncError::Io(err) => write!(f, "IO error: {}", err),
            SyncError::Http(err) => write!(f, "HTTP error: {}", err),
            SyncError::Json(err) => write!(f, "JSON error: {}", err),
            SyncError::Yaml(err) => write!(f, "YAML error: {}", err),
            SyncError::Config(msg) => write!(f, "Configuration error: {}", msg),
            SyncError::Provider(msg) => write!(f, "Provider error: {}", msg),
            SyncError::MonitorNotFound(url) => {
                write!(f, "No provider monitor matches {}", url)
            }
            SyncError::MissingUptime(id) => {
                write!(f, "Monitor {} has no uptime ratio in the provider response", id)
            }
            SyncError::StatusPage(msg) => write!(f, "Status page error: {}", msg),
        }
    }
}

impl std::error::Error for SyncError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SyncError::Io(err) => Some(err),
            SyncError::Http(err) => Some(err),
            SyncError::Json(err) => Some(err),
            SyncError::Yaml(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::Io(err)
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        SyncError::Http(err)
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::Json(err)
    }
}

impl From<serde_yaml::Error> for SyncError {
    fn from(err: serde_yaml::Error) -> Self {
        SyncError::Yaml(err)
    }
}
