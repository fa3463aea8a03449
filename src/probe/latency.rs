use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use surge_ping::{Client, Config, ICMP, PingIdentifier, PingSequence, SurgeError};
use tokio::time;
use trust_dns_resolver::TokioAsyncResolver;

use super::ProbeFault;
use super::result::ProbeResult;

pub const DEFAULT_LATENCY_TIMEOUT: Duration = Duration::from_secs(1);

const ECHO_PAYLOAD: [u8; 56] = [0; 56];

/// A mechanism that can time one round trip to a host.
#[async_trait]
pub trait LatencyTransport: Send + Sync {
    /// `Ok(Some(ms))` when a reply arrived, `Ok(None)` when none arrived in
    /// time, `Err` when the mechanism itself failed.
    async fn round_trip(&self, host: &str, timeout: Duration) -> Result<Option<f64>, ProbeFault>;
}

/// Executes single latency checks and classifies the outcome.
#[derive(Clone)]
pub struct LatencyProbe {
    transport: Arc<dyn LatencyTransport>,
}

impl LatencyProbe {
    pub fn new(transport: Arc<dyn LatencyTransport>) -> Self {
        Self { transport }
    }

    /// Measures the round trip time to `host`. Never fails: faults become
    /// records with `status=error`.
    pub async fn measure(&self, host: &str, timeout: Duration) -> ProbeResult {
        log::debug!("Running latency check for {host}");

        match time::timeout(timeout, self.transport.round_trip(host, timeout)).await {
            Ok(Ok(Some(rtt_ms))) if rtt_ms.is_finite() && rtt_ms >= 0.0 => {
                ProbeResult::latency_success(host, rtt_ms)
            }
            Ok(Ok(Some(rtt_ms))) => {
                ProbeResult::latency_fault(host, format!("invalid round trip time reported: {rtt_ms}"))
            }
            Ok(Ok(None)) | Err(_) => ProbeResult::latency_unreachable(host),
            Ok(Err(fault)) => ProbeResult::latency_fault(host, fault.message()),
        }
    }
}

/// ICMP echo transport. Host names are resolved through the agent's resolver.
pub struct IcmpTransport {
    resolver: TokioAsyncResolver,
}

impl IcmpTransport {
    pub fn new(resolver: TokioAsyncResolver) -> Self {
        Self { resolver }
    }

    async fn resolve(&self, host: &str) -> Result<IpAddr, ProbeFault> {
        if let Ok(ip) = host.parse::<IpAddr>() {
            return Ok(ip);
        }
        let lookup = self
            .resolver
            .lookup_ip(host)
            .await
            .map_err(|e| ProbeFault::from_error(&e))?;
        lookup
            .iter()
            .next()
            .ok_or_else(|| ProbeFault::new(format!("no addresses found for {host}")))
    }
}

#[async_trait]
impl LatencyTransport for IcmpTransport {
    async fn round_trip(&self, host: &str, timeout: Duration) -> Result<Option<f64>, ProbeFault> {
        let ip = self.resolve(host).await?;

        let config = match ip {
            IpAddr::V4(_) => Config::default(),
            IpAddr::V6(_) => Config::builder().kind(ICMP::V6).build(),
        };
        let client = Client::new(&config).map_err(|e| ProbeFault::from_error(&e))?;

        let mut pinger = client.pinger(ip, PingIdentifier(rand::random())).await;
        pinger.timeout(timeout);

        match pinger.ping(PingSequence(0), &ECHO_PAYLOAD).await {
            Ok((_, rtt)) => Ok(Some(rtt.as_secs_f64() * 1000.0)),
            Err(SurgeError::Timeout { .. }) => Ok(None),
            Err(e) => Err(ProbeFault::from_error(&e)),
        }
    }
}
