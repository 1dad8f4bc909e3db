//! Metrics sink boundary.
//!
//! Engine logic MUST NOT depend on obs::metrics directly.
//! All instrumentation flows through MetricsEvent and MetricsSink.
//!
//! Each `Db` owns one sink; the default writes into the process-wide
//! counters, and a host can install its own.
use crate::obs::metrics::{self, EventState};
use std::{sync::Arc, time::Instant};

///
/// ExecKind
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ExecKind {
    Load,
    Insert,
    Update,
    Delete,
    Restore,
    Destroy,
}

///
/// MetricsEvent
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum MetricsEvent {
    ExecStart {
        kind: ExecKind,
        type_name: String,
    },
    ExecFinish {
        kind: ExecKind,
        type_name: String,
        rows_touched: u64,
        elapsed_us: u64,
    },
    RowsScanned {
        type_name: String,
        rows_scanned: u64,
    },
    UniqueViolation {
        type_name: String,
    },
    CascadePlanned {
        type_name: String,
        nodes: u64,
    },
    ReferenceBlocked {
        type_name: String,
        blockers: u64,
    },
    LedgerReplay {
        type_name: String,
        restored: u64,
        dropped: u64,
    },
}

///
/// MetricsSink
///

pub trait MetricsSink: Send + Sync {
    fn record(&self, event: MetricsEvent);
}

///
/// GlobalMetricsSink
///
/// Default process-local sink that writes into global metrics state.
///

#[derive(Clone, Copy, Debug, Default)]
pub struct GlobalMetricsSink;

impl MetricsSink for GlobalMetricsSink {
    fn record(&self, event: MetricsEvent) {
        metrics::with_state_mut(|m| apply(m, event));
    }
}

#[allow(clippy::too_many_lines)]
fn apply(m: &mut EventState, event: MetricsEvent) {
    match event {
        MetricsEvent::ExecStart { kind, type_name } => {
            let ops = &mut m.ops;
            match kind {
                ExecKind::Load => ops.load_calls = ops.load_calls.saturating_add(1),
                ExecKind::Insert => ops.insert_calls = ops.insert_calls.saturating_add(1),
                ExecKind::Update => ops.update_calls = ops.update_calls.saturating_add(1),
                ExecKind::Delete => ops.delete_calls = ops.delete_calls.saturating_add(1),
                ExecKind::Restore => ops.restore_calls = ops.restore_calls.saturating_add(1),
                ExecKind::Destroy => ops.destroy_calls = ops.destroy_calls.saturating_add(1),
            }

            let entry = m.type_entry(&type_name);
            match kind {
                ExecKind::Load => entry.load_calls = entry.load_calls.saturating_add(1),
                ExecKind::Insert => entry.insert_calls = entry.insert_calls.saturating_add(1),
                ExecKind::Update => entry.update_calls = entry.update_calls.saturating_add(1),
                ExecKind::Delete => entry.delete_calls = entry.delete_calls.saturating_add(1),
                ExecKind::Restore => {
                    entry.restore_calls = entry.restore_calls.saturating_add(1);
                }
                ExecKind::Destroy => {
                    entry.destroy_calls = entry.destroy_calls.saturating_add(1);
                }
            }
        }

        MetricsEvent::ExecFinish {
            kind,
            type_name,
            rows_touched,
            elapsed_us,
        } => {
            let perf = &mut m.perf;
            match kind {
                ExecKind::Load => {
                    metrics::add_elapsed(&mut perf.load_us_total, &mut perf.load_us_max, elapsed_us);
                }
                ExecKind::Insert | ExecKind::Update | ExecKind::Destroy => {
                    metrics::add_elapsed(
                        &mut perf.write_us_total,
                        &mut perf.write_us_max,
                        elapsed_us,
                    );
                }
                ExecKind::Delete | ExecKind::Restore => {
                    metrics::add_elapsed(
                        &mut perf.cascade_us_total,
                        &mut perf.cascade_us_max,
                        elapsed_us,
                    );
                }
            }

            if kind == ExecKind::Load {
                m.ops.rows_loaded = m.ops.rows_loaded.saturating_add(rows_touched);
                let entry = m.type_entry(&type_name);
                entry.rows_loaded = entry.rows_loaded.saturating_add(rows_touched);
            } else {
                m.ops.rows_written = m.ops.rows_written.saturating_add(rows_touched);
                let entry = m.type_entry(&type_name);
                entry.rows_written = entry.rows_written.saturating_add(rows_touched);
            }
        }

        MetricsEvent::RowsScanned {
            type_name,
            rows_scanned,
        } => {
            m.ops.rows_scanned = m.ops.rows_scanned.saturating_add(rows_scanned);
            let entry = m.type_entry(&type_name);
            entry.rows_scanned = entry.rows_scanned.saturating_add(rows_scanned);
        }

        MetricsEvent::UniqueViolation { type_name } => {
            m.ops.unique_violations = m.ops.unique_violations.saturating_add(1);
            let entry = m.type_entry(&type_name);
            entry.unique_violations = entry.unique_violations.saturating_add(1);
        }

        MetricsEvent::CascadePlanned { nodes, .. } => {
            m.ops.cascade_plans = m.ops.cascade_plans.saturating_add(1);
            m.ops.cascade_nodes = m.ops.cascade_nodes.saturating_add(nodes);
        }

        MetricsEvent::ReferenceBlocked {
            type_name,
            blockers,
        } => {
            m.ops.reference_blocks = m.ops.reference_blocks.saturating_add(1);
            m.ops.blockers = m.ops.blockers.saturating_add(blockers);
            let entry = m.type_entry(&type_name);
            entry.reference_blocks = entry.reference_blocks.saturating_add(1);
        }

        MetricsEvent::LedgerReplay {
            restored, dropped, ..
        } => {
            m.ops.ledger_restored = m.ops.ledger_restored.saturating_add(restored);
            m.ops.ledger_dropped = m.ops.ledger_dropped.saturating_add(dropped);
        }
    }
}

/// Snapshot the process-wide counters.
#[must_use]
pub fn metrics_snapshot() -> EventState {
    metrics::with_state(Clone::clone)
}

/// Reset the process-wide counters.
pub fn metrics_reset() {
    metrics::reset();
}

///
/// Span
///
/// RAII guard that emits start/finish metrics events for one engine call.
/// Finish accounting happens even when the call returns early with an error.
///

pub(crate) struct Span {
    sink: Arc<dyn MetricsSink>,
    kind: ExecKind,
    type_name: String,
    start: Instant,
    rows: u64,
}

impl Span {
    #[must_use]
    pub(crate) fn new(sink: &Arc<dyn MetricsSink>, kind: ExecKind, type_name: &str) -> Self {
        sink.record(MetricsEvent::ExecStart {
            kind,
            type_name: type_name.to_string(),
        });

        Self {
            sink: Arc::clone(sink),
            kind,
            type_name: type_name.to_string(),
            start: Instant::now(),
            rows: 0,
        }
    }

    pub(crate) const fn set_rows(&mut self, rows: u64) {
        self.rows = rows;
    }
}

impl Drop for Span {
    fn drop(&mut self) {
        let elapsed_us = u64::try_from(self.start.elapsed().as_micros()).unwrap_or(u64::MAX);

        self.sink.record(MetricsEvent::ExecFinish {
            kind: self.kind,
            type_name: std::mem::take(&mut self.type_name),
            rows_touched: self.rows,
            elapsed_us,
        });
    }
}
