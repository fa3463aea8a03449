use async_trait::async_trait;
use client::prometheus::prompb;
use reqwest::{Client, header::HeaderValue};

use crate::probe::{Measurement, ProbeResult, ProbeStatus};
use crate::sink::{RecordSink, SinkError};

pub mod client;

const INSTANCE_LABEL: &str = "instance";
const JOB_LABEL: &str = "job";
const MODULE_LABEL: &str = "module";
const TARGET_LABEL: &str = "target";
const STATUS_LABEL: &str = "status";
const ERROR_LABEL: &str = "error";
const PROBE_SUCCESS_METRIC: &str = "probe_success";
const PROBE_ERROR_METRIC: &str = "probe_error";
const PROBE_LATENCY_METRIC: &str = "probe_latency_milliseconds";
const PROBE_PACKET_LOSS_METRIC: &str = "probe_packet_loss_percent";
const PROBE_HTTP_LOAD_TIME_METRIC: &str = "probe_http_load_time_milliseconds";
const PROBE_HTTP_STATUS_METRIC: &str = "probe_http_status_code";

const PROBE_JOB: &str = "netprobe";

fn create_time_series(
    metric_name: &str,
    result: &ProbeResult,
    module: &str,
    outcome_labels: &[(&str, &str)],
    value: f64,
) -> prompb::TimeSeries {
    let mut labels: Vec<(&str, &str)> = vec![
        (INSTANCE_LABEL, result.target()),
        (JOB_LABEL, PROBE_JOB),
        (MODULE_LABEL, module),
        (TARGET_LABEL, result.target()),
    ];
    labels.extend_from_slice(outcome_labels);

    client::create_time_series(
        metric_name,
        &labels,
        value,
        result.timestamp().timestamp_millis(),
    )
}

/// Creates the TimeSeries representing one probe record.
/// The metrics include:
///    - `probe_success`: 1.0 when the probe succeeded, 0.0 otherwise.
///    - `probe_error`: 1.0 when the probing mechanism faulted.
///    - `probe_latency_milliseconds` and `probe_packet_loss_percent` for latency probes.
///    - `probe_http_load_time_milliseconds` and `probe_http_status_code` for HTTP probes.
///
/// Only `probe_success` and `probe_error` carry the `status` label, and the
/// `error` label when the record has an error message, so value series keep
/// their identity when a target's status flips. Sample timestamps are in
/// milliseconds, the resolution of the remote write protocol.
///
/// Sentinel readings are pushed as recorded, so a `-1` latency marks an
/// unmeasurable probe in the store too.
pub fn create_probe_metrics(result: &ProbeResult) -> Vec<prompb::TimeSeries> {
    let module = result.metric_type().to_string();
    let status = result.status().to_string();

    let mut outcome: Vec<(&str, &str)> = vec![(STATUS_LABEL, status.as_str())];
    if let Some(message) = result.error_message() {
        outcome.push((ERROR_LABEL, message));
    }

    let outcome_series =
        |name: &str, value: f64| create_time_series(name, result, &module, &outcome, value);
    let series = |name: &str, value: f64| create_time_series(name, result, &module, &[], value);

    let mut metrics = vec![
        outcome_series(
            PROBE_SUCCESS_METRIC,
            bool_to_sample(result.status() == ProbeStatus::Success),
        ),
        outcome_series(
            PROBE_ERROR_METRIC,
            bool_to_sample(result.status() == ProbeStatus::Error),
        ),
    ];

    match *result.measurement() {
        Measurement::Latency { value, packet_loss } => {
            metrics.push(series(PROBE_LATENCY_METRIC, value));
            metrics.push(series(PROBE_PACKET_LOSS_METRIC, packet_loss));
        }
        Measurement::HttpResponse {
            load_time_ms,
            status_code,
        } => {
            metrics.push(series(PROBE_HTTP_LOAD_TIME_METRIC, load_time_ms));
            metrics.push(series(PROBE_HTTP_STATUS_METRIC, f64::from(status_code)));
        }
    }

    metrics
}

fn bool_to_sample(flag: bool) -> f64 {
    match flag {
        true => 1.0,
        false => 0.0,
    }
}

/// Pushes every record to a Mimir (or any Prometheus remote write) endpoint.
pub struct MimirSink {
    client: Client,
    endpoint: String,
    tenant_id: Option<HeaderValue>,
}

impl MimirSink {
    pub fn new(endpoint: String, tenant_id: Option<String>) -> Result<Self, SinkError> {
        let tenant_id = tenant_id.as_deref().map(HeaderValue::from_str).transpose()?;
        Ok(Self {
            client: Client::builder().build()?,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            tenant_id,
        })
    }
}

#[async_trait]
impl RecordSink for MimirSink {
    async fn insert(&self, record: ProbeResult) -> Result<(), SinkError> {
        let metrics = create_probe_metrics(&record);
        client::send_to_mimir(
            &self.client,
            &self.endpoint,
            self.tenant_id.as_ref(),
            metrics,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::serve_once;

    fn label<'a>(series: &'a prompb::TimeSeries, name: &str) -> Option<&'a str> {
        series
            .labels
            .iter()
            .find(|l| l.name == name)
            .map(|l| l.value.as_str())
    }

    fn sample(metrics: &[prompb::TimeSeries], metric: &str) -> Option<f64> {
        metrics
            .iter()
            .find(|s| label(s, "__name__") == Some(metric))
            .map(|s| s.samples[0].value)
    }

    #[test]
    fn test_latency_metrics() {
        let result = ProbeResult::latency_success("example.com", 14.25);
        let metrics = create_probe_metrics(&result);

        assert_eq!(metrics.len(), 4);
        assert_eq!(sample(&metrics, PROBE_SUCCESS_METRIC), Some(1.0));
        assert_eq!(sample(&metrics, PROBE_ERROR_METRIC), Some(0.0));
        assert_eq!(sample(&metrics, PROBE_LATENCY_METRIC), Some(14.25));
        assert_eq!(sample(&metrics, PROBE_PACKET_LOSS_METRIC), Some(0.0));
        assert_eq!(sample(&metrics, PROBE_HTTP_STATUS_METRIC), None);

        for series in &metrics {
            assert_eq!(label(series, TARGET_LABEL), Some("example.com"));
            assert_eq!(label(series, MODULE_LABEL), Some("latency"));
            assert_eq!(label(series, JOB_LABEL), Some(PROBE_JOB));
            assert_eq!(series.samples[0].timestamp, result.timestamp().timestamp_millis());
        }
    }

    #[test]
    fn test_http_failure_metrics() {
        let result = ProbeResult::http_response("https://example.com/missing", 404, 31.5);
        let metrics = create_probe_metrics(&result);

        assert_eq!(sample(&metrics, PROBE_SUCCESS_METRIC), Some(0.0));
        assert_eq!(sample(&metrics, PROBE_HTTP_STATUS_METRIC), Some(404.0));
        assert_eq!(sample(&metrics, PROBE_HTTP_LOAD_TIME_METRIC), Some(31.5));
        assert_eq!(label(&metrics[0], STATUS_LABEL), Some("failed"));
        assert_eq!(label(&metrics[0], MODULE_LABEL), Some("http_response"));
    }

    #[test]
    fn test_fault_sets_error_metric() {
        let result = ProbeResult::latency_fault("nowhere.invalid", "no record found for nowhere.invalid");
        let metrics = create_probe_metrics(&result);
        assert_eq!(sample(&metrics, PROBE_ERROR_METRIC), Some(1.0));
        assert_eq!(sample(&metrics, PROBE_LATENCY_METRIC), Some(-1.0));
    }

    #[test]
    fn test_error_message_is_carried_on_outcome_series() {
        let fault = ProbeResult::latency_fault("nowhere.invalid", "no record found for nowhere.invalid");
        let unreachable = ProbeResult::http_unreachable("https://example.com", "connection refused");

        for (result, message) in [
            (&fault, "no record found for nowhere.invalid"),
            (&unreachable, "connection refused"),
        ] {
            let metrics = create_probe_metrics(result);
            let outcome: Vec<_> = metrics
                .iter()
                .filter(|s| {
                    matches!(
                        label(s, "__name__"),
                        Some(PROBE_SUCCESS_METRIC) | Some(PROBE_ERROR_METRIC)
                    )
                })
                .collect();
            assert_eq!(outcome.len(), 2);
            for series in outcome {
                assert_eq!(label(series, ERROR_LABEL), Some(message));
            }
        }

        let ok = create_probe_metrics(&ProbeResult::latency_success("example.com", 3.0));
        assert!(ok.iter().all(|s| label(s, ERROR_LABEL).is_none()));
    }

    #[test]
    fn test_status_only_on_outcome_series() {
        let result = ProbeResult::http_response("https://example.com", 200, 12.0);
        for series in create_probe_metrics(&result) {
            let name = label(&series, "__name__");
            let is_outcome = matches!(name, Some(PROBE_SUCCESS_METRIC) | Some(PROBE_ERROR_METRIC));
            assert_eq!(label(&series, STATUS_LABEL).is_some(), is_outcome, "{name:?}");
        }
    }

    #[test]
    fn test_samples_keep_millisecond_timestamp() {
        let result = ProbeResult::latency_success("example.com", 3.0);
        for series in create_probe_metrics(&result) {
            assert_eq!(series.samples[0].timestamp, result.timestamp().timestamp_millis());
        }
    }

    #[tokio::test]
    async fn test_sink_surfaces_rejection() {
        let addr = serve_once("503 Service Unavailable").await;
        let sink = MimirSink::new(format!("http://{addr}/"), Some("demo".to_string())).expect("sink");

        let err = sink
            .insert(ProbeResult::latency_unreachable("example.com"))
            .await
            .expect_err("rejected push");
        assert!(matches!(err, SinkError::Rejected { .. }));
    }
}
