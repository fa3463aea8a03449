use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use super::ConfigError;
use crate::probe::ProbeKind;
use crate::sink::mongo::{DEFAULT_COLLECTION, DEFAULT_MONGODB_URI};

/// The agent configuration file.
/// Contains the probing interval, the per-probe timeouts, the targets and where records go.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Seconds between two probe rounds.
    #[serde(default = "default_interval_seconds")]
    pub interval_seconds: u64,

    /// Upper bound for a single latency probe, in milliseconds.
    #[serde(default = "default_latency_timeout_ms")]
    pub latency_timeout_ms: u64,

    /// Upper bound for a single HTTP probe, in milliseconds.
    #[serde(default = "default_http_timeout_ms")]
    pub http_timeout_ms: u64,

    /// The targets probed every round, in order.
    #[serde(default)]
    pub targets: Vec<TargetConfig>,

    /// Where measurement records are stored.
    #[serde(default)]
    pub sink: SinkConfig,
}

/// A single probe target: a host for latency checks, a URL for HTTP checks.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TargetConfig {
    pub kind: ProbeKind,
    pub target: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SinkConfig {
    /// Append-only JSON lines file.
    Jsonl { path: PathBuf },

    /// Prometheus remote write endpoint, e.g. Grafana Mimir.
    /// `tenant_id` translates to the 'X-Scope-OrgID' header.
    Mimir {
        endpoint: String,
        #[serde(default)]
        tenant_id: Option<String>,
    },

    /// MongoDB collection. Without `database` the one named in `uri` is used.
    Mongodb {
        #[serde(default = "default_mongodb_uri")]
        uri: String,
        #[serde(default)]
        database: Option<String>,
        #[serde(default = "default_collection")]
        collection: String,
    },
}

impl Default for SinkConfig {
    fn default() -> Self {
        SinkConfig::Jsonl {
            path: PathBuf::from("metrics.jsonl"),
        }
    }
}

fn default_mongodb_uri() -> String {
    DEFAULT_MONGODB_URI.to_string()
}

fn default_collection() -> String {
    DEFAULT_COLLECTION.to_string()
}

fn default_interval_seconds() -> u64 {
    60
}

fn default_latency_timeout_ms() -> u64 {
    1000
}

fn default_http_timeout_ms() -> u64 {
    5000
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }

    pub fn latency_timeout(&self) -> Duration {
        Duration::from_millis(self.latency_timeout_ms)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.interval_seconds == 0 {
            return Err(ConfigError::Invalid("interval_seconds must be greater than 0".into()));
        }
        if self.latency_timeout_ms == 0 || self.http_timeout_ms == 0 {
            return Err(ConfigError::Invalid("probe timeouts must be greater than 0".into()));
        }
        if let Some(pos) = self.targets.iter().position(|t| t.target.trim().is_empty()) {
            return Err(ConfigError::Invalid(format!("target #{} is empty", pos + 1)));
        }

        if self.targets.is_empty() {
            log::warn!("No targets configured, rounds will record nothing");
        }
        for target in self.targets.iter().filter(|t| t.kind == ProbeKind::Http) {
            if let Err(e) = url::Url::parse(&target.target) {
                log::warn!(
                    "HTTP target {} is not a valid URL ({e}), it will be recorded as failed",
                    target.target
                );
            }
        }
        Ok(())
    }
}
