//! Sequential synchronisation of provider uptime ratios onto status page metrics

use crate::config::{Config, MonitorConfig};
use crate::errors::{Result, SyncError};
use crate::models::{ComponentStatus, CreatedPoint, MetricPoint, MonitorRecord, UptimeReading};
use crate::status_page::{CachetClient, MetricSink};
use crate::uptime_robot::{UptimeRobotClient, UptimeSource};

use chrono::{DateTime, Utc};
use reqwest::Client;
use std::time::Duration;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// Pulls uptime from an [`UptimeSource`] and pushes it into a [`MetricSink`]
pub struct Synchronizer<S, M> {
    source: S,
    sink: M,
}

/// What happened to a single configured monitor
#[derive(Debug)]
pub enum SyncResult {
    Published(CreatedPoint),
    FetchFailed(SyncError),
    PublishFailed(SyncError),
}

#[derive(Debug, Default)]
pub enum ComponentResult {
    #[default]
    NotRequested,
    /// Provider status has no component equivalent (paused monitor)
    Unchanged,
    Updated(ComponentStatus),
    Failed(SyncError),
}

#[derive(Debug)]
pub struct MonitorOutcome {
    pub source_url: String,
    pub metric_id: u64,
    pub monitor: Option<MonitorRecord>,
    pub reading: Option<UptimeReading>,
    pub component: ComponentResult,
    pub result: SyncResult,
}

/// Everything learned about a monitor before its final result
#[derive(Default)]
struct Progress {
    monitor: Option<MonitorRecord>,
    reading: Option<UptimeReading>,
    component: ComponentResult,
}

/// One pass over the configured monitors
#[derive(Debug)]
pub struct SyncReport {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcomes: Vec<MonitorOutcome>,
}

impl MonitorOutcome {
    pub fn is_published(&self) -> bool {
        matches!(self.result, SyncResult::Published(_))
    }

    /// Provider name and id, falling back to the configured URL
    pub fn label(&self) -> String {
        match &self.monitor {
            Some(record) if !record.friendly_name.is_empty() => format!(
                "{} (url: {}, id: {})",
                record.friendly_name, self.source_url, record.id
            ),
            Some(record) => format!("{} (id: {})", self.source_url, record.id),
            None => self.source_url.clone(),
        }
    }

    /// Operator facing progress line
    pub fn summary(&self) -> String {
        match &self.result {
            SyncResult::Published(point) => format!(
                "Monitor {}: created point {} on metric {} with value {}",
                self.label(),
                point.id,
                self.metric_id,
                point.value
            ),
            SyncResult::FetchFailed(e) => {
                format!("Monitor {}: fetching uptime failed: {}", self.label(), e)
            }
            SyncResult::PublishFailed(e) => format!(
                "Monitor {}: publishing to metric {} failed: {}",
                self.label(),
                self.metric_id,
                e
            ),
        }
    }
}

impl SyncReport {
    pub fn published(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_published()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.published()
    }

    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

/// Shared HTTP client for both APIs
fn build_http_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(format!("uptime_sync/{}", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(SyncError::Http)
}

impl Synchronizer<UptimeRobotClient, CachetClient> {
    /// Wire the UptimeRobot and Cachet clients from configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate().map_err(SyncError::Config)?;

        let client = build_http_client(config.http_timeout())?;

        Ok(Self::new(
            UptimeRobotClient::new(client.clone(), &config.uptime_robot),
            CachetClient::new(client),
        ))
    }
}

impl<S: UptimeSource, M: MetricSink> Synchronizer<S, M> {
    pub fn new(source: S, sink: M) -> Self {
        Self { source, sink }
    }

    /// Process every monitor in order. Never stops early: each monitor gets
    /// exactly one outcome, whatever happened to the others.
    pub async fn synchronize_all(&self, monitors: &[MonitorConfig]) -> SyncReport {
        let run_id = Uuid::new_v4().to_string();
        let started_at = Utc::now();

        info!("Sync run {} starting for {} monitors", run_id, monitors.len());

        let mut outcomes = Vec::with_capacity(monitors.len());
        for monitor in monitors {
            outcomes.push(self.synchronize_one(&run_id, monitor).await);
        }

        let report = SyncReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            outcomes,
        };

        info!(
            "Sync run {} finished in {}ms - {} monitors, {} published, {} failed",
            report.run_id,
            report.duration().num_milliseconds(),
            report.outcomes.len(),
            report.published(),
            report.failed()
        );

        report
    }

    #[instrument(
        skip(self, run_id, monitor),
        fields(run_id = %run_id, url = %monitor.source_url, metric = monitor.metric_id)
    )]
    async fn synchronize_one(&self, run_id: &str, monitor: &MonitorConfig) -> MonitorOutcome {
        let mut progress = Progress::default();
        let result = self.run_steps(monitor, &mut progress).await;

        let outcome = MonitorOutcome {
            source_url: monitor.source_url.clone(),
            metric_id: monitor.metric_id,
            monitor: progress.monitor,
            reading: progress.reading,
            component: progress.component,
            result,
        };

        if outcome.is_published() {
            info!("{}", outcome.summary());
        } else {
            error!("{}", outcome.summary());
        }

        outcome
    }

    async fn run_steps(&self, monitor: &MonitorConfig, progress: &mut Progress) -> SyncResult {
        let record = match self.source.resolve_monitor(&monitor.source_url).await {
            Ok(record) => record,
            Err(e) => return SyncResult::FetchFailed(e),
        };

        info!(
            "Updating monitor {}. URL: {}. ID: {}",
            record.friendly_name, record.url, record.id
        );
        progress.monitor = Some(record.clone());

        let reading = match self.source.fetch_uptime(&record).await {
            Ok(reading) => reading,
            Err(e) => return SyncResult::FetchFailed(e),
        };

        if let (true, Some(component_id)) = (monitor.update_component, monitor.component_id) {
            progress.component = self.sync_component(monitor, component_id, &reading).await;
        }

        let point = MetricPoint::new(monitor.metric_id, &reading);
        progress.reading = Some(reading);

        match self.sink.publish_point(monitor, &point).await {
            Ok(created) => SyncResult::Published(created),
            Err(e) => SyncResult::PublishFailed(e),
        }
    }

    async fn sync_component(
        &self,
        monitor: &MonitorConfig,
        component_id: u64,
        reading: &UptimeReading,
    ) -> ComponentResult {
        let Some(status) = ComponentStatus::from_monitor(reading.status) else {
            info!(
                "Monitor {} is {}, leaving component {} unchanged",
                reading.monitor_id, reading.status, component_id
            );
            return ComponentResult::Unchanged;
        };

        match self.sink.update_component(monitor, component_id, status).await {
            Ok(()) => ComponentResult::Updated(status),
            Err(e) => {
                warn!("Component {} update failed: {}", component_id, e);
                ComponentResult::Failed(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MonitorStatus;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    /// In-memory provider keyed by source URL
    #[derive(Default)]
    struct FakeSource {
        monitors: HashMap<String, (u64, Option<f64>, u8)>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeSource {
        fn with(mut self, url: &str, id: u64, ratio: Option<f64>, status: u8) -> Self {
            self.monitors.insert(url.to_string(), (id, ratio, status));
            self
        }
    }

    #[async_trait]
    impl UptimeSource for FakeSource {
        async fn resolve_monitor(&self, source_url: &str) -> Result<MonitorRecord> {
            self.calls.lock().unwrap().push(format!("resolve {}", source_url));
            let (id, ratio, status) = self
                .monitors
                .get(source_url)
                .ok_or_else(|| SyncError::MonitorNotFound(source_url.to_string()))?;

            Ok(MonitorRecord {
                id: *id,
                friendly_name: source_url.trim_start_matches("https://").to_string(),
                url: source_url.to_string(),
                status: *status,
                custom_uptime_ratio: *ratio,
            })
        }

        async fn fetch_uptime(&self, monitor: &MonitorRecord) -> Result<UptimeReading> {
            self.calls.lock().unwrap().push(format!("fetch {}", monitor.id));
            let ratio = monitor
                .custom_uptime_ratio
                .ok_or(SyncError::MissingUptime(monitor.id))?;

            Ok(UptimeReading {
                monitor_id: monitor.id,
                friendly_name: monitor.friendly_name.clone(),
                url: monitor.url.clone(),
                uptime_ratio: ratio,
                status: MonitorStatus::from(monitor.status),
            })
        }
    }

    #[derive(Default)]
    struct FakeSink {
        rejected_metrics: Vec<u64>,
        published: Mutex<Vec<(String, u64, f64)>>,
        components: Mutex<Vec<(u64, ComponentStatus)>>,
    }

    #[async_trait]
    impl MetricSink for FakeSink {
        async fn publish_point(
            &self,
            target: &MonitorConfig,
            point: &MetricPoint,
        ) -> Result<CreatedPoint> {
            if self.rejected_metrics.contains(&point.metric_id) {
                return Err(SyncError::StatusPage("unauthorized".to_string()));
            }

            let mut published = self.published.lock().unwrap();
            published.push((target.status_page_api_key.clone(), point.metric_id, point.value));

            Ok(CreatedPoint {
                id: published.len() as u64,
                metric_id: Some(point.metric_id),
                value: point.value,
                created_at: None,
                updated_at: None,
                counter: Some(1),
            })
        }

        async fn update_component(
            &self,
            _target: &MonitorConfig,
            component_id: u64,
            status: ComponentStatus,
        ) -> Result<()> {
            self.components.lock().unwrap().push((component_id, status));
            Ok(())
        }
    }

    fn monitor(url: &str, key: &str, metric_id: u64) -> MonitorConfig {
        MonitorConfig {
            source_url: url.to_string(),
            status_page_api_key: key.to_string(),
            status_page_base_url: "https://status.example.com".to_string(),
            component_id: Some(1),
            metric_id,
            update_component: false,
        }
    }

    #[tokio::test]
    async fn test_empty_input_makes_no_calls() {
        let synchronizer = Synchronizer::new(FakeSource::default(), FakeSink::default());

        let report = synchronizer.synchronize_all(&[]).await;

        assert!(report.outcomes.is_empty());
        assert!(synchronizer.source.calls.lock().unwrap().is_empty());
        assert!(synchronizer.sink.published.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failures_are_isolated() {
        let source = FakeSource::default()
            .with("https://a.example.com", 1, Some(100.0), 2)
            .with("https://c.example.com", 3, Some(97.25), 2)
            .with("https://d.example.com", 4, Some(99.0), 2);
        let sink = FakeSink {
            rejected_metrics: vec![40],
            ..Default::default()
        };
        let synchronizer = Synchronizer::new(source, sink);

        let monitors = vec![
            monitor("https://a.example.com", "KA", 10),
            monitor("https://b.example.com", "KB", 20),
            monitor("https://c.example.com", "KC", 30),
            monitor("https://d.example.com", "KD", 40),
        ];
        let report = synchronizer.synchronize_all(&monitors).await;

        assert_eq!(report.outcomes.len(), 4);
        assert_eq!(report.published(), 2);
        assert_eq!(report.failed(), 2);

        let urls: Vec<&str> = report.outcomes.iter().map(|o| o.source_url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://a.example.com",
                "https://b.example.com",
                "https://c.example.com",
                "https://d.example.com"
            ]
        );

        assert!(matches!(report.outcomes[1].result, SyncResult::FetchFailed(_)));
        assert!(matches!(report.outcomes[3].result, SyncResult::PublishFailed(_)));

        let published = synchronizer.sink.published.lock().unwrap();
        assert_eq!(
            *published,
            vec![("KA".to_string(), 10, 100.0), ("KC".to_string(), 30, 97.25)]
        );
    }

    #[tokio::test]
    async fn test_value_is_published_unrounded() {
        let source = FakeSource::default().with("https://mydomain.com", 12345678, Some(99.87), 2);
        let synchronizer = Synchronizer::new(source, FakeSink::default());

        let report = synchronizer
            .synchronize_all(&[monitor("https://mydomain.com", "K", 27)])
            .await;

        match &report.outcomes[0].result {
            SyncResult::Published(point) => assert_eq!(point.value, 99.87),
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(report.outcomes[0].summary().contains("12345678"));
    }

    #[tokio::test]
    async fn test_missing_uptime_skips_publish() {
        let source = FakeSource::default().with("https://mydomain.com", 12345678, None, 2);
        let synchronizer = Synchronizer::new(source, FakeSink::default());

        let report = synchronizer
            .synchronize_all(&[monitor("https://mydomain.com", "K", 27)])
            .await;

        assert!(matches!(
            report.outcomes[0].result,
            SyncResult::FetchFailed(SyncError::MissingUptime(12345678))
        ));
        assert_eq!(report.outcomes[0].monitor.as_ref().map(|m| m.id), Some(12345678));
        assert!(synchronizer.sink.published.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_component_update_when_requested() {
        let source = FakeSource::default()
            .with("https://down.example.com", 1, Some(12.5), 9)
            .with("https://paused.example.com", 2, Some(100.0), 0);
        let synchronizer = Synchronizer::new(source, FakeSink::default());

        let mut down = monitor("https://down.example.com", "K", 1);
        down.update_component = true;
        down.component_id = Some(7);
        let mut paused = monitor("https://paused.example.com", "K", 2);
        paused.update_component = true;
        let untouched = monitor("https://down.example.com", "K", 3);

        let report = synchronizer.synchronize_all(&[down, paused, untouched]).await;

        assert_eq!(report.published(), 3);
        assert!(matches!(
            report.outcomes[0].component,
            ComponentResult::Updated(ComponentStatus::MajorOutage)
        ));
        assert!(matches!(report.outcomes[1].component, ComponentResult::Unchanged));
        assert!(matches!(report.outcomes[2].component, ComponentResult::NotRequested));
        assert_eq!(
            *synchronizer.sink.components.lock().unwrap(),
            vec![(7, ComponentStatus::MajorOutage)]
        );
    }

    /// Log sink shared between the subscriber and the test
    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_monitor_log_lines_carry_run_id() {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let source = FakeSource::default().with("https://a.example.com", 1, Some(100.0), 2);
        let synchronizer = Synchronizer::new(source, FakeSink::default());
        let report = synchronizer
            .synchronize_all(&[
                monitor("https://a.example.com", "KA", 10),
                monitor("https://b.example.com", "KB", 20),
            ])
            .await;

        let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        let monitor_lines: Vec<&str> = output
            .lines()
            .filter(|line| line.contains("example.com"))
            .collect();

        assert_eq!(monitor_lines.len(), 3);
        for line in monitor_lines {
            assert!(line.contains(&report.run_id), "missing run id: {}", line);
        }
    }

    #[test]
    fn test_from_config_rejects_invalid_config() {
        let config = Config::default();

        assert!(matches!(
            Synchronizer::from_config(&config),
            Err(SyncError::Config(_))
        ));
    }
}
