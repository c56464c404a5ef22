use serde::{Deserialize, Serialize};

/// Process-wide planner configuration, loaded once at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Maximum planning attempts under the optimistic metadata lock before
    /// the statement fails with a fatal planning error.
    pub max_plan_retry_count: u32,
    /// Prefer replicated-storage writes over shuffling rows to replicas.
    /// When set, the property planner drops the hash-shuffle requirement
    /// and forces replicated storage on the internal sink instead.
    pub eliminate_shuffle_load_by_replicated_storage: bool,
    /// Force shuffling even for single-replica tables. Test-only knob.
    pub enable_single_replica_shuffle: bool,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            max_plan_retry_count: 3,
            eliminate_shuffle_load_by_replicated_storage: false,
            enable_single_replica_shuffle: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = GlobalConfig::default();
        assert_eq!(cfg.max_plan_retry_count, 3);
        assert!(!cfg.eliminate_shuffle_load_by_replicated_storage);
        assert!(!cfg.enable_single_replica_shuffle);
    }
}
