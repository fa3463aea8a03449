use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;

use crate::config::TargetConfig;
use crate::probe::http::DEFAULT_HTTP_TIMEOUT;
use crate::probe::latency::DEFAULT_LATENCY_TIMEOUT;
use crate::probe::{HttpProbe, LatencyProbe, Measurement, ProbeKind, ProbeResult, ProbeStatus};
use crate::sink::RecordSink;

/// Ordered, static list of the probes a round executes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeTargetSet {
    targets: Vec<TargetConfig>,
}

impl ProbeTargetSet {
    pub fn new(targets: Vec<TargetConfig>) -> Self {
        Self { targets }
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TargetConfig> {
        self.targets.iter()
    }
}

impl FromIterator<(ProbeKind, String)> for ProbeTargetSet {
    fn from_iter<I: IntoIterator<Item = (ProbeKind, String)>>(iter: I) -> Self {
        Self::new(
            iter.into_iter()
                .map(|(kind, target)| TargetConfig { kind, target })
                .collect(),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeTimeouts {
    pub latency: Duration,
    pub http: Duration,
}

impl Default for ProbeTimeouts {
    fn default() -> Self {
        Self {
            latency: DEFAULT_LATENCY_TIMEOUT,
            http: DEFAULT_HTTP_TIMEOUT,
        }
    }
}

/// What happened during one round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoundReport {
    /// Probes started.
    pub attempted: usize,
    /// Records the sink accepted.
    pub recorded: usize,
    /// Records the sink refused.
    pub sink_failures: usize,
    /// Probe tasks that panicked before producing a record.
    pub aborted: usize,
}

enum Outcome {
    Recorded,
    SinkFailed,
}

/// Runs every configured probe once, concurrently, and hands each record to the sink.
pub struct ProbeRound {
    targets: ProbeTargetSet,
    latency: LatencyProbe,
    http: HttpProbe,
    sink: Arc<dyn RecordSink>,
    timeouts: ProbeTimeouts,
    label_width: usize,
}

impl ProbeRound {
    pub fn new(
        targets: ProbeTargetSet,
        latency: LatencyProbe,
        http: HttpProbe,
        sink: Arc<dyn RecordSink>,
        timeouts: ProbeTimeouts,
    ) -> Self {
        let label_width = targets.iter().map(|t| t.target.len()).max().unwrap_or(10);
        Self {
            targets,
            latency,
            http,
            sink,
            timeouts,
            label_width,
        }
    }

    pub fn targets(&self) -> &ProbeTargetSet {
        &self.targets
    }

    /// Executes the round. Returns once every probe has finished and its
    /// record has been offered to the sink. Sink failures are logged and
    /// counted, they never stop the other probes.
    pub async fn run(&self) -> RoundReport {
        let mut tasks = JoinSet::new();

        for target in self.targets.iter() {
            let target = target.clone();
            let latency = self.latency.clone();
            let http = self.http.clone();
            let sink = self.sink.clone();
            let timeouts = self.timeouts;
            let label = to_fixed_width(&target.target, self.label_width);

            tasks.spawn(async move {
                let result = match target.kind {
                    ProbeKind::Latency => latency.measure(&target.target, timeouts.latency).await,
                    ProbeKind::Http => http.check(&target.target, timeouts.http).await,
                };
                log_result(&label, &result);

                match sink.insert(result).await {
                    Ok(()) => Outcome::Recorded,
                    Err(e) => {
                        log::error!("[{label}] Failed to record {} result: {e}", target.kind);
                        Outcome::SinkFailed
                    }
                }
            });
        }

        let mut report = RoundReport {
            attempted: tasks.len(),
            ..Default::default()
        };

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Outcome::Recorded) => report.recorded += 1,
                Ok(Outcome::SinkFailed) => report.sink_failures += 1,
                Err(e) => {
                    log::error!("Probe task aborted: {e}");
                    report.aborted += 1;
                }
            }
        }

        report
    }
}

fn to_fixed_width(input: &str, width: usize) -> String {
    use unicode_truncate::UnicodeTruncateStr;

    let (truncated, _) = input.unicode_truncate(width);
    format!("{:<width$}", truncated, width = width)
}

fn log_result(label: &str, result: &ProbeResult) {
    let icon = match result.status() {
        ProbeStatus::Success => "✅",
        ProbeStatus::Failed => "❌",
        ProbeStatus::Error => "⚠️",
    };
    let detail = match *result.measurement() {
        Measurement::Latency { value, packet_loss } => {
            format!("RTT={value:.2}ms, Packet Loss={packet_loss}%")
        }
        Measurement::HttpResponse {
            load_time_ms,
            status_code,
        } => format!("Load Time={load_time_ms:.2}ms, Status Code={status_code}"),
    };

    match result.error_message() {
        Some(message) => log::warn!(
            "[{label}] {icon} {} {}: {detail} ({message})",
            result.metric_type(),
            result.status()
        ),
        None => log::info!(
            "[{label}] {icon} {} {}: {detail}",
            result.metric_type(),
            result.status()
        ),
    }
}
