//! A lightweight synthetic monitoring agent.
//!
//! On a fixed interval the [`Scheduler`] runs a [`ProbeRound`]: every
//! configured target receives either a latency probe or an HTTP check, all
//! concurrently, and each outcome is written as an immutable [`ProbeResult`]
//! to a [`RecordSink`].

pub mod config;
pub mod logger;
pub mod mimir;
pub mod probe;
pub mod round;
pub mod scheduler;
pub mod sink;

#[cfg(test)]
pub(crate) mod test_support;

pub use probe::{HttpProbe, LatencyProbe, MetricType, ProbeResult, ProbeStatus};
pub use round::{ProbeRound, ProbeTargetSet, ProbeTimeouts, RoundReport};
pub use scheduler::{Scheduler, SchedulerError, SchedulerState};
pub use sink::{RecordSink, SinkError};
