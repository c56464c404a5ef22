use serde::{Deserialize, Serialize};

/// Per-session variables that influence insert planning.
///
/// The planner never mutates the session's own copy: every planning
/// attempt starts by cloning this struct and threads the clone through
/// the pipeline. Toggles flipped during planning (pipeline engine, local
/// shuffle agg, spill) land on the clone only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionVariables {
    /// Pipeline execution engine toggle.
    pub enable_pipeline_engine: bool,
    /// Local shuffle aggregation. Always disabled for insert planning:
    /// table sinks assign scan ranges per driver sequence, which local
    /// shuffle agg cannot use.
    pub enable_local_shuffle_agg: bool,
    /// Global shuffle before file-sink writes.
    pub enable_connector_sink_global_shuffle: bool,
    /// Allow spill for external-connector sinks.
    pub enable_connector_sink_spill: bool,
    /// General spill toggle.
    pub enable_spill: bool,
    /// Memory threshold (fraction) above which operators spill.
    pub spill_mem_limit_threshold: f64,
    /// Tighter spill threshold applied to connector sinks.
    pub connector_sink_spill_mem_limit_threshold: f64,
    /// Let the sink pick its own degree of parallelism.
    pub enable_adaptive_sink_dop: bool,
    /// Sink DOP used when adaptive sink DOP is enabled.
    pub sink_degree_of_parallelism: u32,
    /// Session parallelism, used as the sink DOP otherwise.
    pub parallel_exec_instance_num: u32,
    /// Route fragments to compute-only nodes when possible. Internal table
    /// sinks cannot run on compute nodes; the planner clears this on its
    /// session clone.
    pub prefer_compute_node: bool,
    /// Number of compute nodes the session may use (0 = none).
    pub use_compute_nodes: u32,
}

impl Default for SessionVariables {
    fn default() -> Self {
        Self {
            enable_pipeline_engine: true,
            enable_local_shuffle_agg: true,
            enable_connector_sink_global_shuffle: true,
            enable_connector_sink_spill: false,
            enable_spill: false,
            spill_mem_limit_threshold: 0.8,
            connector_sink_spill_mem_limit_threshold: 0.5,
            enable_adaptive_sink_dop: false,
            sink_degree_of_parallelism: 0,
            parallel_exec_instance_num: 1,
            prefer_compute_node: false,
            use_compute_nodes: 0,
        }
    }
}
