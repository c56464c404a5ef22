use osprey_common::OspreyResult;

use crate::column_ref::ColumnRefId;
use crate::plan::{LogicalPlan, PhysicalPlan};
use crate::properties::PhysicalRequirement;

/// The optimizer seam. Insert planning hands the optimizer a logical root,
/// the physical properties required directly above the write sink, and the
/// output column set; it gets back a physical plan satisfying them.
///
/// Treated as a pure function of its inputs: the retry controller may call
/// it several times for one statement.
pub trait Optimizer {
    fn optimize(
        &self,
        root: LogicalPlan,
        required: &PhysicalRequirement,
        output_columns: &[ColumnRefId],
    ) -> OspreyResult<PhysicalPlan>;
}

/// Minimal optimizer: lowers the logical tree one-to-one and enforces the
/// required properties by inserting exchange/sort operators above the
/// root. No cost-based exploration.
#[derive(Debug, Default)]
pub struct PropertyEnforcer;

impl Optimizer for PropertyEnforcer {
    fn optimize(
        &self,
        root: LogicalPlan,
        required: &PhysicalRequirement,
        _output_columns: &[ColumnRefId],
    ) -> OspreyResult<PhysicalPlan> {
        let mut plan = lower(root);
        if let Some(spec) = &required.distribution {
            plan = PhysicalPlan::Exchange {
                spec: spec.clone(),
                input: Box::new(plan),
            };
        }
        if !required.sort.is_empty() {
            plan = PhysicalPlan::Sort {
                orderings: required.sort.clone(),
                input: Box::new(plan),
            };
        }
        Ok(plan)
    }
}

fn lower(plan: LogicalPlan) -> PhysicalPlan {
    match plan {
        LogicalPlan::Values { output, rows } => PhysicalPlan::Values { output, rows },
        LogicalPlan::SourceScan { output } => PhysicalPlan::SourceScan { output },
        LogicalPlan::Project { input, mappings } => PhysicalPlan::Project {
            input: Box::new(lower(*input)),
            mappings,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::properties::{DistributionSpec, SortOrdering};

    fn leaf() -> LogicalPlan {
        LogicalPlan::SourceScan { output: vec![ColumnRefId(0)] }
    }

    #[test]
    fn test_empty_requirement_lowers_one_to_one() {
        let plan = PropertyEnforcer
            .optimize(leaf(), &PhysicalRequirement::none(), &[ColumnRefId(0)])
            .unwrap();
        assert_eq!(plan, PhysicalPlan::SourceScan { output: vec![ColumnRefId(0)] });
    }

    #[test]
    fn test_distribution_requirement_adds_exchange() {
        let required = PhysicalRequirement {
            distribution: Some(DistributionSpec::Gather),
            sort: Vec::new(),
        };
        let plan = PropertyEnforcer
            .optimize(leaf(), &required, &[ColumnRefId(0)])
            .unwrap();
        assert!(matches!(
            plan,
            PhysicalPlan::Exchange { spec: DistributionSpec::Gather, .. }
        ));
    }

    #[test]
    fn test_sort_requirement_is_outermost() {
        let required = PhysicalRequirement {
            distribution: None,
            sort: vec![SortOrdering {
                column: ColumnRefId(0),
                ascending: true,
                nulls_first: false,
            }],
        };
        let plan = PropertyEnforcer
            .optimize(leaf(), &required, &[ColumnRefId(0)])
            .unwrap();
        assert!(matches!(plan, PhysicalPlan::Sort { .. }));
    }
}
