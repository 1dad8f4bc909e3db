use serde::Deserialize;

///
/// DbConfig
///
/// Engine settings. Every field has a default, so a host can load a partial
/// document (`{ "maxCascadeDepth": 16 }`).
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct DbConfig {
    /// Emit per-phase diagnostics at `debug` level.
    pub debug: bool,

    /// Deepest cascade the planner will follow before failing.
    pub max_cascade_depth: usize,

    /// Blocker ids kept per referencing type in a reference violation.
    pub max_blocker_ids: usize,

    /// Sibling subtrees planned concurrently.
    pub plan_concurrency: usize,
}

impl DbConfig {
    pub const DEFAULT_MAX_CASCADE_DEPTH: usize = 64;
    pub const DEFAULT_MAX_BLOCKER_IDS: usize = 25;
    pub const DEFAULT_PLAN_CONCURRENCY: usize = 16;

    #[must_use]
    pub const fn debug(mut self) -> Self {
        self.debug = true;
        self
    }

    #[must_use]
    pub const fn max_cascade_depth(mut self, depth: usize) -> Self {
        self.max_cascade_depth = depth;
        self
    }

    #[must_use]
    pub const fn max_blocker_ids(mut self, ids: usize) -> Self {
        self.max_blocker_ids = ids;
        self
    }

    #[must_use]
    pub const fn plan_concurrency(mut self, concurrency: usize) -> Self {
        self.plan_concurrency = concurrency;
        self
    }

    /// Concurrency actually used; zero is treated as one.
    #[must_use]
    pub const fn effective_concurrency(&self) -> usize {
        if self.plan_concurrency == 0 {
            1
        } else {
            self.plan_concurrency
        }
    }
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            debug: false,
            max_cascade_depth: Self::DEFAULT_MAX_CASCADE_DEPTH,
            max_blocker_ids: Self::DEFAULT_MAX_BLOCKER_IDS,
            plan_concurrency: Self::DEFAULT_PLAN_CONCURRENCY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config: DbConfig = serde_json::from_str(r#"{ "maxCascadeDepth": 8, "debug": true }"#)
            .expect("partial config should parse");

        assert_eq!(config, DbConfig::default().max_cascade_depth(8).debug());
        assert_eq!(config.max_blocker_ids, DbConfig::DEFAULT_MAX_BLOCKER_IDS);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(serde_json::from_str::<DbConfig>(r#"{ "maxDepth": 8 }"#).is_err());
    }

    #[test]
    fn zero_concurrency_runs_sequentially() {
        assert_eq!(DbConfig::default().plan_concurrency(0).effective_concurrency(), 1);
    }
}
