//! Observability: runtime counters and the sink boundary that feeds them.
//!
//! Structured log events go through `tracing` at the call sites; this module
//! only carries counters.

pub(crate) mod metrics;
pub(crate) mod sink;

// re-exports
pub use metrics::{EventOps, EventPerf, EventState, TypeCounters};
pub use sink::{
    ExecKind, GlobalMetricsSink, MetricsEvent, MetricsSink, metrics_reset, metrics_snapshot,
};
