pub mod prometheus {
    /// The subset of the Prometheus remote write protocol that is pushed.
    pub mod prompb {
        #[derive(Clone, PartialEq, prost::Message)]
        pub struct WriteRequest {
            #[prost(message, repeated, tag = "1")]
            pub timeseries: Vec<TimeSeries>,
        }

        #[derive(Clone, PartialEq, prost::Message)]
        pub struct TimeSeries {
            #[prost(message, repeated, tag = "1")]
            pub labels: Vec<Label>,
            #[prost(message, repeated, tag = "2")]
            pub samples: Vec<Sample>,
        }

        #[derive(Clone, PartialEq, prost::Message)]
        pub struct Label {
            #[prost(string, tag = "1")]
            pub name: String,
            #[prost(string, tag = "2")]
            pub value: String,
        }

        #[derive(Clone, PartialEq, prost::Message)]
        pub struct Sample {
            #[prost(double, tag = "1")]
            pub value: f64,
            #[prost(int64, tag = "2")]
            pub timestamp: i64,
        }
    }
}

use prometheus::prompb::{Label, Sample, TimeSeries, WriteRequest};
use reqwest::{
    Client,
    header::{CONTENT_ENCODING, CONTENT_TYPE, HeaderMap, HeaderValue},
};
use snap::raw::Encoder;

use crate::sink::SinkError;

/// Encodes `metrics` as a snappy compressed remote write request.
pub fn encode_write_request(metrics: Vec<TimeSeries>) -> Result<Vec<u8>, SinkError> {
    let write_request = WriteRequest {
        timeseries: metrics,
    };

    let mut buf = Vec::new();
    prost::Message::encode(&write_request, &mut buf)?;

    let mut encoder = Encoder::new();
    Ok(encoder.compress_vec(&buf)?)
}

/// Sends Prometheus metrics to a Mimir remote write endpoint.
///
/// # Arguments
///
/// * `client` - The HTTP client to push with.
/// * `mimir_endpoint` - The base URL of your Mimir instance (e.g., "http://localhost:9009").
/// * `tenant_id` - An optional tenant header for multi-tenant Mimir setups.
/// * `metrics` - A vector of `TimeSeries` to send.
pub async fn send_to_mimir(
    client: &Client,
    mimir_endpoint: &str,
    tenant_id: Option<&HeaderValue>,
    metrics: Vec<TimeSeries>,
) -> Result<(), SinkError> {
    if metrics.is_empty() {
        log::warn!("No metrics to send.");
        return Ok(());
    }

    let compressed_data = encode_write_request(metrics)?;

    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_ENCODING, HeaderValue::from_static("snappy"));
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static("application/x-protobuf"),
    );
    headers.insert(
        "X-Prometheus-Remote-Write-Version",
        HeaderValue::from_static("0.1.0"),
    );
    if let Some(id) = tenant_id {
        headers.insert("X-Scope-OrgID", id.clone());
    }

    let response = client
        .post(format!("{mimir_endpoint}/api/v1/push"))
        .headers(headers)
        .body(compressed_data)
        .send()
        .await?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        log::error!("Failed to push to Mimir: {} - {}", status, body);
        return Err(SinkError::Rejected { status, body });
    }
    Ok(())
}

/// Creates a `TimeSeries` with the given metric name, labels, value and timestamp.
/// # Arguments
/// * `metric_name` - The name of the metric (e.g., "probe_success").
/// * `labels` - Label pairs for the metric (e.g., &[("target", "example.com")]).
/// * `value` - The sample value.
/// * `timestamp_ms` - The sample timestamp in milliseconds since the epoch.
pub fn create_time_series(
    metric_name: &str,
    labels: &[(&str, &str)],
    value: f64,
    timestamp_ms: i64,
) -> TimeSeries {
    let mut all_labels = Vec::with_capacity(labels.len() + 1);
    all_labels.push(Label {
        name: "__name__".to_string(),
        value: metric_name.to_string(),
    });

    for (name, val) in labels {
        all_labels.push(Label {
            name: name.to_string(),
            value: val.to_string(),
        });
    }

    TimeSeries {
        labels: all_labels,
        samples: vec![Sample {
            value,
            timestamp: timestamp_ms,
        }],
    }
}
