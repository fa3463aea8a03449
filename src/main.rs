use std::process::ExitCode;
use std::sync::Arc;

use netprobe::config::{load_config, setup_resolver};
use netprobe::probe::{HttpProbe, IcmpTransport, LatencyProbe, ReqwestTransport};
use netprobe::sink::build_sink;
use netprobe::{ProbeRound, ProbeTargetSet, ProbeTimeouts, Scheduler, logger};

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    logger::init();

    log::info!("Starting monitoring agent...");

    let mut scheduler = match start().await {
        Ok(scheduler) => scheduler,
        Err(e) => {
            log::error!("Failed to start monitoring agent: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = shutdown_signal().await {
        log::error!("Failed to listen for shutdown signal: {e}");
    }

    log::info!("Shutdown requested, waiting for the current round to finish");
    scheduler.stop().await;
    log::info!("Monitoring agent stopped.");
    ExitCode::SUCCESS
}

async fn start() -> Result<Scheduler, Box<dyn std::error::Error>> {
    let app_config = load_config()?;
    let config = app_config.config;

    let resolver = setup_resolver(&app_config.dns_hosts)?;
    let latency = LatencyProbe::new(Arc::new(IcmpTransport::new(resolver)));
    let http = HttpProbe::new(Arc::new(ReqwestTransport::new()?));
    let sink = build_sink(&config.sink).await?;

    let timeouts = ProbeTimeouts {
        latency: config.latency_timeout(),
        http: config.http_timeout(),
    };
    let round = ProbeRound::new(
        ProbeTargetSet::new(config.targets.clone()),
        latency,
        http,
        sink,
        timeouts,
    );

    let mut scheduler = Scheduler::new();
    scheduler.start(config.interval(), Arc::new(round))?;
    Ok(scheduler)
}

#[cfg(unix)]
async fn shutdown_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let terminate = signal(SignalKind::terminate()).map(|mut terminate| async move {
        terminate.recv().await;
    });
    wait_for_shutdown(tokio::signal::ctrl_c(), terminate).await
}

#[cfg(not(unix))]
async fn shutdown_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}

/// Resolves on whichever of `ctrl_c` or `terminate` fires first. When the
/// terminate listener could not be installed, waits on `ctrl_c` alone.
#[cfg_attr(not(unix), allow(dead_code))]
async fn wait_for_shutdown<C, T>(ctrl_c: C, terminate: std::io::Result<T>) -> std::io::Result<()>
where
    C: Future<Output = std::io::Result<()>>,
    T: Future<Output = ()>,
{
    match terminate {
        Ok(terminate) => {
            tokio::select! {
                result = ctrl_c => result,
                _ = terminate => Ok(()),
            }
        }
        Err(e) => {
            log::warn!("Cannot listen for SIGTERM, only Ctrl-C stops the agent: {e}");
            ctrl_c.await
        }
    }
}
