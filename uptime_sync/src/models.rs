//! Wire shapes of the provider and status page APIs, and the values passed between them

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

/// Body of a provider `getMonitors` response
#[derive(Clone, Debug, Deserialize)]
pub struct GetMonitorsResponse {
    pub stat: String,
    #[serde(default)]
    pub monitors: Vec<MonitorRecord>,
    #[serde(default)]
    pub error: Option<ProviderErrorBody>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ProviderErrorBody {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub message: String,
}

/// A single monitor as listed by the provider
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct MonitorRecord {
    pub id: u64,
    #[serde(default)]
    pub friendly_name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub status: u8,
    #[serde(default, deserialize_with = "optional_ratio")]
    pub custom_uptime_ratio: Option<f64>,
}

impl GetMonitorsResponse {
    pub fn is_ok(&self) -> bool {
        self.stat == "ok"
    }

    /// Human readable reason for a `stat: fail` response
    pub fn failure_reason(&self) -> String {
        match &self.error {
            Some(error) if !error.message.is_empty() => {
                format!("{} ({})", error.message, error.kind)
            }
            Some(error) => error.kind.clone(),
            None => format!("stat={}", self.stat),
        }
    }
}

impl MonitorRecord {
    /// Whether this record is the provider's view of `source_url`
    pub fn matches(&self, source_url: &str) -> bool {
        let wanted = normalize_url(source_url);
        if wanted.is_empty() {
            return false;
        }

        normalize_url(&self.url) == wanted || normalize_url(&self.friendly_name) == wanted
    }
}

/// Strip scheme, `www.`, trailing slashes and case so that
/// `https://www.MyDomain.com/` and `mydomain.com` compare equal.
pub fn normalize_url(url: &str) -> String {
    let url = url.trim().to_lowercase();
    let url = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(&url);
    let url = url.strip_prefix("www.").unwrap_or(url);

    url.trim_end_matches('/').to_string()
}

/// Host part of a normalised URL, broad enough for the provider's substring search
pub fn search_term(url: &str) -> String {
    normalize_url(url)
        .split('/')
        .next()
        .unwrap_or_default()
        .to_string()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Number(f64),
    Text(String),
}

/// Ratios arrive as `"99.870"`, or `"99.870-98.100"` when several windows were
/// requested; the first window wins.
fn parse_ratio(text: &str) -> Option<f64> {
    text.split('-').next()?.trim().parse::<f64>().ok()
}

fn optional_ratio<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<NumberOrText>::deserialize(deserializer)? {
        Some(NumberOrText::Number(value)) => Some(value),
        Some(NumberOrText::Text(text)) => parse_ratio(&text),
        None => None,
    })
}

fn flexible_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    match NumberOrText::deserialize(deserializer)? {
        NumberOrText::Number(value) => Ok(value),
        NumberOrText::Text(text) => text
            .trim()
            .parse::<f64>()
            .map_err(|_| de::Error::custom(format!("invalid number '{}'", text))),
    }
}

/// Provider monitor status codes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MonitorStatus {
    Paused,
    NotCheckedYet,
    Up,
    SeemsDown,
    Down,
    Unknown(u8),
}

impl From<u8> for MonitorStatus {
    fn from(code: u8) -> Self {
        match code {
            0 => MonitorStatus::Paused,
            1 => MonitorStatus::NotCheckedYet,
            2 => MonitorStatus::Up,
            8 => MonitorStatus::SeemsDown,
            9 => MonitorStatus::Down,
            other => MonitorStatus::Unknown(other),
        }
    }
}

impl std::fmt::Display for MonitorStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MonitorStatus::Paused => write!(f, "paused"),
            MonitorStatus::NotCheckedYet => write!(f, "not checked yet"),
            MonitorStatus::Up => write!(f, "up"),
            MonitorStatus::SeemsDown => write!(f, "seems down"),
            MonitorStatus::Down => write!(f, "down"),
            MonitorStatus::Unknown(code) => write!(f, "unknown ({})", code),
        }
    }
}

/// Status page component statuses
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ComponentStatus {
    Operational = 1,
    PerformanceIssues = 2,
    PartialOutage = 3,
    MajorOutage = 4,
}

impl ComponentStatus {
    /// Paused and unrecognised monitors leave the component untouched.
    pub fn from_monitor(status: MonitorStatus) -> Option<Self> {
        match status {
            MonitorStatus::NotCheckedYet | MonitorStatus::Up => Some(ComponentStatus::Operational),
            MonitorStatus::SeemsDown => Some(ComponentStatus::PartialOutage),
            MonitorStatus::Down => Some(ComponentStatus::MajorOutage),
            MonitorStatus::Paused | MonitorStatus::Unknown(_) => None,
        }
    }

    pub fn code(self) -> u8 {
        self as u8
    }
}

/// Uptime of one provider monitor over the requested window
#[derive(Clone, Debug, PartialEq)]
pub struct UptimeReading {
    pub monitor_id: u64,
    pub friendly_name: String,
    pub url: String,
    pub uptime_ratio: f64,
    pub status: MonitorStatus,
}

/// A value to append to a status page metric
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct MetricPoint {
    #[serde(skip)]
    pub metric_id: u64,
    pub value: f64,
}

impl MetricPoint {
    pub fn new(metric_id: u64, reading: &UptimeReading) -> Self {
        Self {
            metric_id,
            value: reading.uptime_ratio,
        }
    }
}

/// Status page envelope around every response payload
#[derive(Clone, Debug, Deserialize)]
pub struct DataEnvelope<T> {
    pub data: T,
}

/// Metric point as confirmed by the status page
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct CreatedPoint {
    pub id: u64,
    #[serde(default)]
    pub metric_id: Option<u64>,
    #[serde(deserialize_with = "flexible_f64")]
    pub value: f64,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub counter: Option<u64>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ComponentUpdate {
    pub status: u8,
}
