use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::round::ProbeRound;

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
    Stopped,
}

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("Cannot start a scheduler that is {0:?}")]
    InvalidTransition(SchedulerState),

    #[error("Interval must be greater than zero")]
    ZeroInterval,
}

/// Fires a probe round on a fixed interval until stopped.
///
/// The first round fires one full interval after `start`. Rounds never
/// overlap: a round that outlasts the interval causes the missed ticks to be
/// skipped, and the next round starts on the following tick.
pub struct Scheduler {
    state: SchedulerState,
    shutdown: Option<watch::Sender<bool>>,
    task: Option<JoinHandle<()>>,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            state: SchedulerState::Idle,
            shutdown: None,
            task: None,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn start(&mut self, interval: Duration, round: Arc<ProbeRound>) -> Result<(), SchedulerError> {
        if self.state != SchedulerState::Idle {
            return Err(SchedulerError::InvalidTransition(self.state));
        }
        if interval.is_zero() {
            return Err(SchedulerError::ZeroInterval);
        }

        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut round_number: u64 = 0;

            loop {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.changed() => break,
                    _ = ticker.tick() => {}
                }

                round_number += 1;
                log::info!(
                    "--- Running round {round_number} for {} targets at {} ---",
                    round.targets().len(),
                    chrono::Utc::now()
                );
                let report = round.run().await;
                log::info!(
                    "--- Round {round_number} finished: {} recorded, {} sink failures, {} aborted ---",
                    report.recorded,
                    report.sink_failures,
                    report.aborted
                );
            }

            log::debug!("Scheduler loop exited after {round_number} rounds");
        });

        self.shutdown = Some(shutdown_tx);
        self.task = Some(task);
        self.state = SchedulerState::Running;
        log::info!("Scheduler started, probing every {}s", interval.as_secs_f64());
        Ok(())
    }

    /// Stops scheduling. A round that is already running finishes and
    /// reaches the sink before this returns. Calling it again is a no-op.
    pub async fn stop(&mut self) {
        if self.state == SchedulerState::Stopped {
            return;
        }
        self.state = SchedulerState::Stopped;

        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(true);
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                log::error!("Scheduler loop ended abnormally: {e}");
            }
        }
        log::info!("Scheduler stopped");
    }
}
