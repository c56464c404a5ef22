//! Insert plan construction for OspreyDB.
//!
//! Given an analyzed INSERT statement (target table plus a source
//! values/select relation), this crate produces an executable plan that
//! writes rows with correct column values, types, and row-to-shard
//! routing, and stays correct under concurrent schema changes:
//!
//! 1. the schema resolver derives the base/full output schemas;
//! 2. the column derivation pipeline builds the logical plan (literal
//!    cast, default fill, static partition constants, generated columns,
//!    shadow columns, output coercion);
//! 3. the property planner decides the distribution/sort contract above
//!    the write sink;
//! 4. the optimizer (an external seam) produces the physical plan,
//!    optionally under the optimistic retry controller;
//! 5. the sink assembler attaches the target-kind sink configuration.

pub mod column_ref;
pub mod derive;
pub mod insert;
pub mod optimizer;
pub mod plan;
pub mod properties;
pub mod resolver;
pub mod retry;
pub mod scalar;
pub mod sink;
pub mod stmt;

pub use column_ref::{ColumnRef, ColumnRefFactory, ColumnRefId};
pub use insert::InsertPlanner;
pub use optimizer::{Optimizer, PropertyEnforcer};
pub use plan::{ExecPlan, LogicalPlan, PhysicalPlan, RowLayout, SlotDescriptor};
pub use properties::{
    required_properties, DistributionSpec, PhysicalRequirement, PropertyDecision, SortOrdering,
};
pub use resolver::{resolve_output_schema, ResolvedSchema};
pub use retry::{OptimisticRetryController, RetryState};
pub use scalar::ScalarExpr;
pub use sink::{InternalSink, PartialUpdateMode, SinkDescriptor};
pub use stmt::{
    Field, InsertStatement, OverwriteKind, QueryRelation, SelectItem, SelectRelation,
    StaticPartitionClause, ValueCell, ValuesRelation,
};
