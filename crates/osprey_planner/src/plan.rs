use std::sync::Arc;

use osprey_catalog::ColumnDict;
use osprey_common::session::SessionVariables;
use osprey_common::types::DataType;

use crate::column_ref::ColumnRefId;
use crate::properties::{DistributionSpec, SortOrdering};
use crate::scalar::ScalarExpr;
use crate::sink::SinkDescriptor;

/// Logical operator tree built by the derivation pipeline. Each pipeline
/// stage layers a new immutable `Project` over the previous root.
#[derive(Debug, Clone, PartialEq)]
pub enum LogicalPlan {
    /// Inline VALUES rows, one expression per output column.
    Values {
        output: Vec<ColumnRefId>,
        rows: Vec<Vec<ScalarExpr>>,
    },
    /// Opaque analyzed select relation; the optimizer expands it. The
    /// derivation pipeline only needs its output columns.
    SourceScan { output: Vec<ColumnRefId> },
    /// Ordered projection: handle → expression, evaluated over `input`.
    Project {
        input: Box<LogicalPlan>,
        mappings: Vec<(ColumnRefId, ScalarExpr)>,
    },
}

impl LogicalPlan {
    /// Layer a projection over this plan.
    pub fn project(self, mappings: Vec<(ColumnRefId, ScalarExpr)>) -> LogicalPlan {
        LogicalPlan::Project {
            input: Box::new(self),
            mappings,
        }
    }

    /// Number of projection stages above the leaf.
    pub fn depth(&self) -> usize {
        match self {
            LogicalPlan::Project { input, .. } => 1 + input.depth(),
            _ => 0,
        }
    }
}

/// Physical operator tree produced by the optimizer.
#[derive(Debug, Clone, PartialEq)]
pub enum PhysicalPlan {
    Values {
        output: Vec<ColumnRefId>,
        rows: Vec<Vec<ScalarExpr>>,
    },
    SourceScan {
        output: Vec<ColumnRefId>,
    },
    Project {
        input: Box<PhysicalPlan>,
        mappings: Vec<(ColumnRefId, ScalarExpr)>,
    },
    /// Redistribution enforcing a required distribution.
    Exchange {
        spec: DistributionSpec,
        input: Box<PhysicalPlan>,
    },
    /// Per-instance sort enforcing a required ordering.
    Sort {
        orderings: Vec<SortOrdering>,
        input: Box<PhysicalPlan>,
    },
}

/// One materialized slot of the sink's row layout.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotDescriptor {
    pub slot: usize,
    pub column_name: String,
    pub data_type: DataType,
    pub nullable: bool,
    pub materialized: bool,
}

/// Row layout of the rows reaching the sink: one slot per column of the
/// resolved full schema, in schema order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RowLayout {
    pub slots: Vec<SlotDescriptor>,
}

/// The finished, executable insert plan.
#[derive(Debug)]
pub struct ExecPlan {
    pub root: PhysicalPlan,
    /// Position *i* is the resolved value for full-schema column *i*.
    pub output_columns: Vec<ColumnRefId>,
    pub row_layout: RowLayout,
    pub sink: SinkDescriptor,
    /// (slot position, dictionary) bindings for dictionary-encoded
    /// columns.
    pub global_dicts: Vec<(usize, Arc<ColumnDict>)>,
    /// Sink fragment degree of parallelism; `None` when the pipeline
    /// engine is not used for this sink.
    pub pipeline_dop: Option<u32>,
    /// The session clone the plan was built under, carrying the
    /// planning-time toggles (pipeline engine, spill, node routing). The
    /// caller's own session object is never touched.
    pub session_variables: SessionVariables,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_layers_are_counted() {
        let leaf = LogicalPlan::SourceScan { output: vec![ColumnRefId(0)] };
        let plan = leaf.project(Vec::new()).project(Vec::new());
        assert_eq!(plan.depth(), 2);
    }
}
