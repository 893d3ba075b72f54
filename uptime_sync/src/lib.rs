//! UptimeRobot to Cachet uptime synchroniser
//!
//! This library reads per-monitor uptime ratios from UptimeRobot and records
//! them as metric points on one or more Cachet status pages.

pub mod config;
pub mod errors;
pub mod models;
pub mod status_page;
pub mod synchronizer;
pub mod uptime_robot;

pub use config::{Config, MonitorConfig};
pub use errors::{Result, SyncError};
pub use models::{CreatedPoint, MetricPoint, UptimeReading};
pub use status_page::{CachetClient, MetricSink};
pub use synchronizer::{MonitorOutcome, SyncReport, SyncResult, Synchronizer};
pub use uptime_robot::{UptimeRobotClient, UptimeSource};
