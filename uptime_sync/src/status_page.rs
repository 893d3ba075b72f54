//! HTTP client for the Cachet status page API

use crate::config::MonitorConfig;
use crate::errors::{Result, SyncError};
use crate::models::{ComponentStatus, ComponentUpdate, CreatedPoint, DataEnvelope, MetricPoint};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use tracing::debug;

const TOKEN_HEADER: &str = "X-Cachet-Token";

/// Destination for metric points and component statuses
#[async_trait]
pub trait MetricSink: Send + Sync {
    /// Append `point` to its metric on the target's status page
    async fn publish_point(&self, target: &MonitorConfig, point: &MetricPoint) -> Result<CreatedPoint>;

    /// Set the status of one component on the target's status page
    async fn update_component(
        &self,
        target: &MonitorConfig,
        component_id: u64,
        status: ComponentStatus,
    ) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct CachetClient {
    client: Client,
}

impl CachetClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api_url(target: &MonitorConfig, path: &str) -> String {
        format!(
            "{}/api/v1/{}",
            target.status_page_base_url.trim_end_matches('/'),
            path
        )
    }

    /// Each status page instance has its own token
    fn authorized(&self, builder: RequestBuilder, target: &MonitorConfig) -> RequestBuilder {
        builder
            .header(TOKEN_HEADER, &target.status_page_api_key)
            .header("Time-Zone", "Etc/UTC")
    }

    async fn handle_response(response: Response, what: &str) -> Result<String> {
        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            return Ok(body);
        }

        let error_message = match status.as_u16() {
            401 => format!("unauthorized for {}, check the api_key: {}", what, body),
            403 => format!("forbidden for {}: {}", what, body),
            404 => format!("{} not found: {}", what, body),
            422 => format!("{} rejected: {}", what, body),
            500..=599 => format!("status page server error for {}: {}", what, body),
            _ => format!("unexpected response {} for {}: {}", status, what, body),
        };

        Err(SyncError::StatusPage(error_message))
    }
}

#[async_trait]
impl MetricSink for CachetClient {
    async fn publish_point(&self, target: &MonitorConfig, point: &MetricPoint) -> Result<CreatedPoint> {
        let url = Self::api_url(target, &format!("metrics/{}/points", point.metric_id));
        debug!("Posting value {} to {}", point.value, url);

        let response = self
            .authorized(self.client.post(&url), target)
            .json(point)
            .send()
            .await?;

        let body = Self::handle_response(response, &format!("metric {}", point.metric_id)).await?;
        let created: DataEnvelope<CreatedPoint> = serde_json::from_str(&body)?;

        Ok(created.data)
    }

    async fn update_component(
        &self,
        target: &MonitorConfig,
        component_id: u64,
        status: ComponentStatus,
    ) -> Result<()> {
        let url = Self::api_url(target, &format!("components/{}", component_id));
        debug!("Setting component status {} at {}", status.code(), url);

        let response = self
            .authorized(self.client.put(&url), target)
            .json(&ComponentUpdate {
                status: status.code(),
            })
            .send()
            .await?;

        Self::handle_response(response, &format!("component {}", component_id)).await?;
        Ok(())
    }
}
