use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use tokio::time;

use super::ProbeFault;
use super::result::ProbeResult;

pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(5);

const USER_AGENT: &str = concat!("netprobe/", env!("CARGO_PKG_VERSION"));

/// A mechanism that can issue one GET and report the response status.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Returns once the response headers are in.
    async fn get(&self, url: &str, timeout: Duration) -> Result<u16, ProbeFault>;
}

/// Executes single HTTP reachability checks and classifies the outcome.
#[derive(Clone)]
pub struct HttpProbe {
    transport: Arc<dyn HttpTransport>,
}

impl HttpProbe {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }

    /// Checks `url`. Transport faults are ordinary failures of an HTTP check,
    /// so they are recorded as `failed` with the fault description.
    pub async fn check(&self, url: &str, timeout: Duration) -> ProbeResult {
        log::debug!("Running HTTP check for {url}");

        let start = Instant::now();
        let outcome = time::timeout(timeout, self.transport.get(url, timeout)).await;
        let load_time_ms = start.elapsed().as_secs_f64() * 1000.0;

        match outcome {
            Ok(Ok(status_code)) => ProbeResult::http_response(url, status_code, load_time_ms),
            Ok(Err(fault)) => ProbeResult::http_unreachable(url, fault.message()),
            Err(_) => ProbeResult::http_unreachable(
                url,
                format!("request timed out after {}ms", timeout.as_millis()),
            ),
        }
    }
}

/// `reqwest` backed transport sharing one connection pool across checks.
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &str, timeout: Duration) -> Result<u16, ProbeFault> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| ProbeFault::from_error(&e))?;
        Ok(response.status().as_u16())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::result::{NO_STATUS_CODE, UNMEASURABLE};
    use crate::probe::{MetricType, ProbeStatus};
    use crate::test_support::{closed_port, serve_once};

    struct FixedStatus(u16);

    #[async_trait]
    impl HttpTransport for FixedStatus {
        async fn get(&self, _url: &str, _timeout: Duration) -> Result<u16, ProbeFault> {
            Ok(self.0)
        }
    }

    struct Stalled;

    #[async_trait]
    impl HttpTransport for Stalled {
        async fn get(&self, _url: &str, _timeout: Duration) -> Result<u16, ProbeFault> {
            time::sleep(Duration::from_secs(3600)).await;
            Ok(200)
        }
    }

    #[tokio::test]
    async fn test_status_codes_below_400_succeed() {
        for code in [200, 301, 302] {
            let probe = HttpProbe::new(Arc::new(FixedStatus(code)));
            let result = probe.check("https://example.com", DEFAULT_HTTP_TIMEOUT).await;
            assert_eq!(result.status(), ProbeStatus::Success, "status code {code}");
            assert_eq!(result.status_code(), Some(code));
            assert!(result.load_time_ms().is_some_and(|ms| ms >= 0.0));
        }
    }

    #[tokio::test]
    async fn test_not_found_fails() {
        let probe = HttpProbe::new(Arc::new(FixedStatus(404)));
        let result = probe.check("https://example.com/missing", DEFAULT_HTTP_TIMEOUT).await;
        assert_eq!(result.metric_type(), MetricType::HttpResponse);
        assert_eq!(result.status(), ProbeStatus::Failed);
        assert_eq!(result.status_code(), Some(404));
        assert_eq!(result.error_message(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_request_times_out_as_failed() {
        let probe = HttpProbe::new(Arc::new(Stalled));
        let result = probe.check("https://example.com", Duration::from_secs(5)).await;
        assert_eq!(result.status(), ProbeStatus::Failed);
        assert_eq!(result.status_code(), Some(NO_STATUS_CODE));
        assert_eq!(result.load_time_ms(), Some(UNMEASURABLE));
        assert_eq!(result.error_message(), Some("request timed out after 5000ms"));
    }

    #[tokio::test]
    async fn test_reqwest_transport_reports_server_status() {
        let addr = serve_once("404 Not Found").await;
        let probe = HttpProbe::new(Arc::new(ReqwestTransport::new().expect("client")));
        let result = probe.check(&format!("http://{addr}/missing"), DEFAULT_HTTP_TIMEOUT).await;
        assert_eq!(result.status(), ProbeStatus::Failed);
        assert_eq!(result.status_code(), Some(404));
        assert!(result.load_time_ms().is_some_and(|ms| ms >= 0.0));
    }

    #[tokio::test]
    async fn test_connection_refused_is_failed_not_error() {
        let addr = closed_port().await;
        let probe = HttpProbe::new(Arc::new(ReqwestTransport::new().expect("client")));
        let result = probe.check(&format!("http://{addr}/"), DEFAULT_HTTP_TIMEOUT).await;
        assert_eq!(result.status(), ProbeStatus::Failed);
        assert_eq!(result.status_code(), Some(NO_STATUS_CODE));
        assert_eq!(result.load_time_ms(), Some(UNMEASURABLE));
        assert!(result.error_message().is_some_and(|m| !m.is_empty()));
    }

    #[tokio::test]
    async fn test_url_without_scheme_is_failed() {
        let probe = HttpProbe::new(Arc::new(ReqwestTransport::new().expect("client")));
        let result = probe.check("youtube.com", DEFAULT_HTTP_TIMEOUT).await;
        assert_eq!(result.status(), ProbeStatus::Failed);
        assert_eq!(result.status_code(), Some(NO_STATUS_CODE));
        assert!(result.error_message().is_some_and(|m| !m.is_empty()));
    }
}
