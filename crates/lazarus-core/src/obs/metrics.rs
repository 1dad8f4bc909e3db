use crate::types::Timestamp;
use parking_lot::Mutex;
use serde::Serialize;
use std::{collections::BTreeMap, sync::LazyLock};

///
/// EventState
/// Ephemeral, in-memory counters and simple perf totals for operations.
///

#[derive(Clone, Debug, Serialize)]
pub struct EventState {
    pub ops: EventOps,
    pub perf: EventPerf,
    pub types: BTreeMap<String, TypeCounters>,
    pub since_ms: u64,
}

impl Default for EventState {
    fn default() -> Self {
        Self {
            ops: EventOps::default(),
            perf: EventPerf::default(),
            types: BTreeMap::new(),
            since_ms: Timestamp::now().as_millis(),
        }
    }
}

impl EventState {
    pub(crate) fn type_entry(&mut self, type_name: &str) -> &mut TypeCounters {
        self.types.entry(type_name.to_string()).or_default()
    }
}

///
/// EventOps
///

#[derive(Clone, Debug, Default, Serialize)]
pub struct EventOps {
    // Entrypoints
    pub load_calls: u64,
    pub insert_calls: u64,
    pub update_calls: u64,
    pub delete_calls: u64,
    pub restore_calls: u64,
    pub destroy_calls: u64,

    // Rows touched
    pub rows_loaded: u64,
    pub rows_scanned: u64,
    pub rows_written: u64,

    // Integrity
    pub unique_violations: u64,
    pub cascade_plans: u64,
    pub cascade_nodes: u64,
    pub reference_blocks: u64,
    pub blockers: u64,

    // Undo ledger
    pub ledger_restored: u64,
    pub ledger_dropped: u64,
}

///
/// TypeCounters
///

#[derive(Clone, Debug, Default, Serialize)]
pub struct TypeCounters {
    pub load_calls: u64,
    pub insert_calls: u64,
    pub update_calls: u64,
    pub delete_calls: u64,
    pub restore_calls: u64,
    pub destroy_calls: u64,
    pub rows_loaded: u64,
    pub rows_scanned: u64,
    pub rows_written: u64,
    pub unique_violations: u64,
    pub reference_blocks: u64,
}

///
/// EventPerf
///

#[derive(Clone, Debug, Default, Serialize)]
pub struct EventPerf {
    // Wall-clock totals per entrypoint, in microseconds
    pub load_us_total: u128,
    pub write_us_total: u128,
    pub cascade_us_total: u128,

    // Maximum observed deltas
    pub load_us_max: u64,
    pub write_us_max: u64,
    pub cascade_us_max: u64,
}

static EVENT_STATE: LazyLock<Mutex<EventState>> =
    LazyLock::new(|| Mutex::new(EventState::default()));

/// Borrow metrics immutably.
pub(crate) fn with_state<R>(f: impl FnOnce(&EventState) -> R) -> R {
    f(&EVENT_STATE.lock())
}

/// Borrow metrics mutably.
pub(crate) fn with_state_mut<R>(f: impl FnOnce(&mut EventState) -> R) -> R {
    f(&mut EVENT_STATE.lock())
}

/// Reset all counters (useful in tests).
pub(crate) fn reset() {
    with_state_mut(|m| *m = EventState::default());
}

/// Accumulate an elapsed delta and track a max.
pub(crate) fn add_elapsed(total: &mut u128, max: &mut u64, delta_us: u64) {
    *total = total.saturating_add(u128::from(delta_us));
    if delta_us > *max {
        *max = delta_us;
    }
}
