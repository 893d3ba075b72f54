//! Client for the UptimeRobot `getMonitors` API

use crate::config::ProviderConfig;
use crate::errors::{Result, SyncError};
use crate::models::{search_term, GetMonitorsResponse, MonitorRecord, MonitorStatus, UptimeReading};
use async_trait::async_trait;
use reqwest::{Client, Response};
use tracing::{debug, warn};

/// Source of per-monitor uptime ratios
#[async_trait]
pub trait UptimeSource: Send + Sync {
    /// Find the provider monitor watching `source_url`
    async fn resolve_monitor(&self, source_url: &str) -> Result<MonitorRecord>;

    /// Fetch the uptime ratio of exactly one monitor
    async fn fetch_uptime(&self, monitor: &MonitorRecord) -> Result<UptimeReading>;
}

#[derive(Debug, Clone)]
pub struct UptimeRobotClient {
    client: Client,
    base_url: String,
    api_key: String,
    uptime_window_days: u32,
}

impl UptimeRobotClient {
    pub fn new(client: Client, config: &ProviderConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            uptime_window_days: config.uptime_window_days,
        }
    }

    /// Call `getMonitors` with the common parameters plus `extra`
    async fn get_monitors(&self, extra: &[(&str, String)]) -> Result<GetMonitorsResponse> {
        let url = format!("{}/getMonitors", self.base_url);

        let mut form: Vec<(&str, String)> = vec![
            ("api_key", self.api_key.clone()),
            ("format", "json".to_string()),
            ("logs", "0".to_string()),
            ("response_times", "0".to_string()),
        ];
        form.extend(extra.iter().cloned());

        let response = self
            .client
            .post(&url)
            .header("Cache-Control", "no-cache")
            .form(&form)
            .send()
            .await?;

        let body = Self::handle_response(response).await?;
        let decoded: GetMonitorsResponse = serde_json::from_str(&body)?;

        if !decoded.is_ok() {
            return Err(SyncError::Provider(decoded.failure_reason()));
        }

        Ok(decoded)
    }

    async fn handle_response(response: Response) -> Result<String> {
        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            return Ok(body);
        }

        let error_message = match status.as_u16() {
            401 | 403 => format!("provider rejected the API key ({}): {}", status, body),
            429 => format!("provider rate limit hit: {}", body),
            500..=599 => format!("provider server error {}: {}", status, body),
            _ => format!("unexpected provider response {}: {}", status, body),
        };

        Err(SyncError::Provider(error_message))
    }
}

#[async_trait]
impl UptimeSource for UptimeRobotClient {
    async fn resolve_monitor(&self, source_url: &str) -> Result<MonitorRecord> {
        let response = self
            .get_monitors(&[("search", search_term(source_url))])
            .await?;

        let mut candidates: Vec<MonitorRecord> = response
            .monitors
            .into_iter()
            .filter(|record| record.matches(source_url))
            .collect();

        if candidates.len() > 1 {
            let ids: Vec<String> = candidates.iter().map(|c| c.id.to_string()).collect();
            warn!(
                "{} provider monitors match {} (ids {}), using the first",
                candidates.len(),
                source_url,
                ids.join(", ")
            );
        }

        if candidates.is_empty() {
            return Err(SyncError::MonitorNotFound(source_url.to_string()));
        }

        let monitor = candidates.swap_remove(0);
        debug!("Resolved {} to provider monitor {}", source_url, monitor.id);
        Ok(monitor)
    }

    async fn fetch_uptime(&self, monitor: &MonitorRecord) -> Result<UptimeReading> {
        let response = self
            .get_monitors(&[
                ("monitors", monitor.id.to_string()),
                ("custom_uptime_ratios", self.uptime_window_days.to_string()),
            ])
            .await?;

        let record = response
            .monitors
            .into_iter()
            .find(|record| record.id == monitor.id)
            .ok_or_else(|| {
                SyncError::Provider(format!("monitor {} missing from provider response", monitor.id))
            })?;

        let uptime_ratio = record
            .custom_uptime_ratio
            .ok_or(SyncError::MissingUptime(record.id))?;

        Ok(UptimeReading {
            monitor_id: record.id,
            friendly_name: record.friendly_name,
            url: record.url,
            uptime_ratio,
            status: MonitorStatus::from(record.status),
        })
    }
}
