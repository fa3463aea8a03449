pub mod http;
pub mod latency;
pub mod result;

use std::fmt::Write;

use serde::Deserialize;

pub use http::{HttpProbe, HttpTransport, ReqwestTransport};
pub use latency::{IcmpTransport, LatencyProbe, LatencyTransport};
pub use result::{Measurement, MetricType, ProbeResult, ProbeStatus};

/// The kind of check a configured target receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeKind {
    Latency,
    Http,
}

impl std::fmt::Display for ProbeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProbeKind::Latency => write!(f, "latency"),
            ProbeKind::Http => write!(f, "http"),
        }
    }
}

/// A fault raised by a probing mechanism.
///
/// Probes never return this to their caller, it is folded into the
/// `ProbeResult` they produce.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ProbeFault {
    message: String,
}

impl ProbeFault {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Builds a fault from an error, keeping its whole source chain.
    pub fn from_error(err: &(dyn std::error::Error + 'static)) -> Self {
        Self::new(report(err))
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

fn report(mut err: &(dyn std::error::Error + 'static)) -> String {
    let mut s = format!("{}", err);
    while let Some(src) = err.source() {
        let _ = write!(s, ": {}", src);
        err = src;
    }
    s
}
