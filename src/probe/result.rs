use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reported in place of a reading that could not be taken.
pub const UNMEASURABLE: f64 = -1.0;

/// Packet loss recorded for a latency probe that got no reply.
pub const FULL_PACKET_LOSS: f64 = 100.0;

/// Status code recorded when an HTTP request never produced a response.
pub const NO_STATUS_CODE: u16 = 0;

const UNKNOWN_FAULT: &str = "unknown fault";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricType {
    Latency,
    HttpResponse,
}

impl std::fmt::Display for MetricType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetricType::Latency => write!(f, "latency"),
            MetricType::HttpResponse => write!(f, "http_response"),
        }
    }
}

/// Outcome class of a probe.
///
/// `Failed` is an ordinary negative outcome (no reply, non-success status,
/// unreachable URL). `Error` means the latency mechanism itself faulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeStatus {
    Success,
    Failed,
    Error,
}

impl std::fmt::Display for ProbeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProbeStatus::Success => write!(f, "success"),
            ProbeStatus::Failed => write!(f, "failed"),
            ProbeStatus::Error => write!(f, "error"),
        }
    }
}

/// The numeric fields of a record. The variant decides the metric type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "metric_type", rename_all = "snake_case")]
pub enum Measurement {
    Latency {
        /// Round trip time in milliseconds, or [`UNMEASURABLE`].
        value: f64,
        packet_loss: f64,
    },
    HttpResponse {
        /// Time until response headers arrived, or [`UNMEASURABLE`].
        load_time_ms: f64,
        status_code: u16,
    },
}

/// An immutable record of one probe execution.
///
/// Records are only created through the constructors below, which stamp the
/// completion time. Once built, a record is never modified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeResult {
    timestamp: DateTime<Utc>,
    target: String,
    status: ProbeStatus,
    #[serde(flatten)]
    measurement: Measurement,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error_message: Option<String>,
}

impl ProbeResult {
    fn new(
        target: &str,
        status: ProbeStatus,
        measurement: Measurement,
        error_message: Option<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            target: target.to_string(),
            status,
            measurement,
            error_message: error_message.map(non_empty),
        }
    }

    /// A latency probe that observed a round trip of `rtt_ms`.
    pub fn latency_success(host: &str, rtt_ms: f64) -> Self {
        Self::new(
            host,
            ProbeStatus::Success,
            Measurement::Latency {
                value: rtt_ms,
                packet_loss: 0.0,
            },
            None,
        )
    }

    /// A latency probe that got no reply in time.
    pub fn latency_unreachable(host: &str) -> Self {
        Self::new(
            host,
            ProbeStatus::Failed,
            Measurement::Latency {
                value: UNMEASURABLE,
                packet_loss: FULL_PACKET_LOSS,
            },
            None,
        )
    }

    /// A latency probe whose mechanism faulted.
    pub fn latency_fault(host: &str, message: impl Into<String>) -> Self {
        Self::new(
            host,
            ProbeStatus::Error,
            Measurement::Latency {
                value: UNMEASURABLE,
                packet_loss: FULL_PACKET_LOSS,
            },
            Some(message.into()),
        )
    }

    /// An HTTP check that received a response. Codes in `200..400` succeed.
    pub fn http_response(url: &str, status_code: u16, load_time_ms: f64) -> Self {
        let status = if (200..400).contains(&status_code) {
            ProbeStatus::Success
        } else {
            ProbeStatus::Failed
        };
        Self::new(
            url,
            status,
            Measurement::HttpResponse {
                load_time_ms,
                status_code,
            },
            None,
        )
    }

    /// An HTTP check that could not complete.
    pub fn http_unreachable(url: &str, message: impl Into<String>) -> Self {
        Self::new(
            url,
            ProbeStatus::Failed,
            Measurement::HttpResponse {
                load_time_ms: UNMEASURABLE,
                status_code: NO_STATUS_CODE,
            },
            Some(message.into()),
        )
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn status(&self) -> ProbeStatus {
        self.status
    }

    pub fn measurement(&self) -> &Measurement {
        &self.measurement
    }

    pub fn metric_type(&self) -> MetricType {
        match self.measurement {
            Measurement::Latency { .. } => MetricType::Latency,
            Measurement::HttpResponse { .. } => MetricType::HttpResponse,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn value(&self) -> Option<f64> {
        match self.measurement {
            Measurement::Latency { value, .. } => Some(value),
            Measurement::HttpResponse { .. } => None,
        }
    }

    pub fn packet_loss(&self) -> Option<f64> {
        match self.measurement {
            Measurement::Latency { packet_loss, .. } => Some(packet_loss),
            Measurement::HttpResponse { .. } => None,
        }
    }

    pub fn load_time_ms(&self) -> Option<f64> {
        match self.measurement {
            Measurement::HttpResponse { load_time_ms, .. } => Some(load_time_ms),
            Measurement::Latency { .. } => None,
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self.measurement {
            Measurement::HttpResponse { status_code, .. } => Some(status_code),
            Measurement::Latency { .. } => None,
        }
    }
}

fn non_empty(message: String) -> String {
    if message.trim().is_empty() {
        UNKNOWN_FAULT.to_string()
    } else {
        message
    }
}
