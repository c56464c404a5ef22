use osprey_catalog::{TargetTable, WriteQuorum};
use osprey_common::error::PlanError;
use osprey_common::session::SessionVariables;
use osprey_common::types::{PartitionId, TableId};
use osprey_common::{OspreyError, OspreyResult};

use crate::properties::PropertyDecision;
use crate::stmt::{InsertStatement, OverwriteKind, QueryRelation};

/// Partial-update write mode carried to the sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartialUpdateMode {
    /// The sink decides between row and column mode per load.
    Auto,
}

/// Configuration of the internal-table write sink.
#[derive(Debug, Clone, PartialEq)]
pub struct InternalSink {
    pub table: TableId,
    pub target_partition_ids: Vec<PartitionId>,
    pub write_quorum: WriteQuorum,
    pub enable_replicated_storage: bool,
    pub enable_automatic_partition: bool,
    /// An INSERT INTO SELECT may legally deliver NULL into the
    /// auto-increment column (the sink allocates values).
    pub null_expr_in_auto_increment: bool,
    pub partial_update_mode: Option<PartialUpdateMode>,
    /// Partial update that omits the auto-increment column.
    pub missing_auto_increment_column: bool,
    pub automatic_bucket_size: u64,
    pub dynamic_overwrite: bool,
    pub from_overwrite: bool,
}

/// Target-kind-tagged sink configuration attached to the finished plan.
/// Exhaustive over table kinds; there is no unknown-kind branch.
#[derive(Debug, Clone, PartialEq)]
pub enum SinkDescriptor {
    Internal(InternalSink),
    /// Lake-format sink; records whether the insert targets a statically
    /// determined single partition.
    Lake {
        table: TableId,
        static_single_partition: bool,
    },
    FileSink { table: TableId },
    /// Pass-through relational sink.
    External { table: TableId },
    BlackHole,
}

impl SinkDescriptor {
    /// Sinks the pipeline engine can drive.
    pub fn supports_pipeline(&self) -> bool {
        matches!(
            self,
            SinkDescriptor::Internal(_) | SinkDescriptor::Lake { .. } | SinkDescriptor::FileSink { .. }
        )
    }

    /// Sinks that write through an external connector (spill candidates).
    pub fn is_connector_sink(&self) -> bool {
        matches!(self, SinkDescriptor::Lake { .. } | SinkDescriptor::FileSink { .. })
    }
}

/// Whether the pipeline engine can drive the sink for this table kind,
/// before the descriptor exists.
pub fn can_table_sink_use_pipeline(table: &TargetTable) -> bool {
    matches!(
        table,
        TargetTable::Internal(_) | TargetTable::Lake(_) | TargetTable::FileSink(_)
    )
}

/// Build the sink descriptor for the statement's target table.
///
/// Internal sinks mutate the cloned session: fragments carrying an
/// internal-table sink must not run on compute-only nodes.
pub fn assemble_sink(
    stmt: &InsertStatement,
    decision: &PropertyDecision,
    session: &mut SessionVariables,
) -> OspreyResult<SinkDescriptor> {
    match &stmt.target_table {
        TargetTable::Internal(table) => {
            let enable_automatic_partition = match stmt.overwrite {
                OverwriteKind::SystemUnspecified => {
                    if stmt.target_partition_ids.is_empty() {
                        return Err(OspreyError::Internal(
                            "overwrite insert requires resolved target partitions".into(),
                        ));
                    }
                    table.automatic_partition_supported
                }
                OverwriteKind::Dynamic => {
                    if !stmt.target_partition_ids.is_empty() {
                        return Err(OspreyError::Internal(
                            "dynamic overwrite resolves partitions from data, none expected"
                                .into(),
                        ));
                    }
                    table.automatic_partition_supported
                }
                OverwriteKind::None => {
                    if stmt.specify_partition_names {
                        if stmt.target_partition_ids.is_empty() {
                            return Err(OspreyError::Internal(
                                "named partitions did not resolve to partition ids".into(),
                            ));
                        }
                        false
                    } else if stmt.is_static_key_partition_insert() {
                        false
                    } else {
                        if stmt.target_partition_ids.is_empty() {
                            return Err(OspreyError::Internal(
                                "insert requires resolved target partitions".into(),
                            ));
                        }
                        table.automatic_partition_supported
                    }
                }
            };

            // INSERT INTO SELECT: when no target list is given, or the
            // auto-increment column is explicitly targeted, NULL may reach
            // the sink legally.
            let null_expr_in_auto_increment = if !stmt.source.is_values() {
                match &stmt.target_column_names {
                    None => true,
                    Some(names) => names.iter().any(|name| {
                        table
                            .base_schema
                            .iter()
                            .any(|c| c.is_auto_increment && &c.name == name)
                    }),
                }
            } else {
                false
            };

            let missing_auto_increment_column = stmt.partial_update
                && table.base_schema.iter().any(|c| {
                    c.is_auto_increment && !stmt.targets_column(&c.name)
                });

            // Internal sinks crash on compute-only nodes; pin scheduling
            // to worker nodes on the session clone.
            session.prefer_compute_node = false;
            session.use_compute_nodes = 0;

            Ok(SinkDescriptor::Internal(InternalSink {
                table: table.id,
                target_partition_ids: stmt.target_partition_ids.clone(),
                write_quorum: table.write_quorum,
                enable_replicated_storage: table.enable_replicated_storage
                    || decision.force_replicated_storage,
                enable_automatic_partition,
                null_expr_in_auto_increment,
                partial_update_mode: stmt.partial_update.then_some(PartialUpdateMode::Auto),
                missing_auto_increment_column,
                automatic_bucket_size: table.automatic_bucket_size,
                dynamic_overwrite: stmt.overwrite == OverwriteKind::Dynamic,
                from_overwrite: stmt.from_overwrite,
            }))
        }

        TargetTable::Lake(table) => Ok(SinkDescriptor::Lake {
            table: table.id,
            static_single_partition: is_static_partition_insert(stmt)?,
        }),

        TargetTable::FileSink(table) => Ok(SinkDescriptor::FileSink { table: table.id }),

        TargetTable::External(table) => Ok(SinkDescriptor::External { table: table.id }),

        TargetTable::BlackHole { .. } => Ok(SinkDescriptor::BlackHole),
    }
}

/// Whether the insert writes a single, statically determined partition of
/// a partitioned lake table: either an explicit static partition clause,
/// or a select list that pins every partition column to a constant.
pub fn is_static_partition_insert(stmt: &InsertStatement) -> OspreyResult<bool> {
    let table = match &stmt.target_table {
        TargetTable::Lake(t) => t,
        _ => return Ok(false),
    };
    if !table.is_partitioned() {
        return Ok(false);
    }

    if stmt.is_static_key_partition_insert() {
        check_partition_transforms(stmt)?;
        return Ok(true);
    }

    let select = match &stmt.source {
        QueryRelation::Select(s) => s,
        _ => return Ok(false),
    };
    if select.items.iter().any(|item| item.is_star) {
        return Ok(false);
    }

    let full_names: Vec<String>;
    let target_names: &[String] = match &stmt.target_column_names {
        Some(names) => names,
        None => {
            full_names = table.schema.iter().map(|c| c.name.clone()).collect();
            &full_names
        }
    };

    let partition_names = table.partition_column_names();
    for (i, name) in target_names.iter().enumerate() {
        if partition_names.contains(&name.as_str()) {
            match select.items.get(i) {
                Some(item) if item.is_constant => {}
                _ => return Ok(false),
            }
        }
    }
    check_partition_transforms(stmt)?;
    Ok(true)
}

/// A static insert can only address identity-transformed partitions.
fn check_partition_transforms(stmt: &InsertStatement) -> OspreyResult<()> {
    if let TargetTable::Lake(table) = &stmt.target_table {
        if table.is_partitioned()
            && table.partition_fields.iter().any(|f| !f.transform.is_identity())
        {
            return Err(PlanError::NonIdentityPartitionTransform {
                table: table.name.clone(),
            }
            .into());
        }
    }
    Ok(())
}

/// Degree of parallelism for a pipeline-capable sink fragment.
///
/// With an active shuffle the sink DOP must stay 1: a local passthrough
/// exchange above the sink would reorder sends, and replicas of a key
/// could disagree on the winning row.
pub fn sink_pipeline_dop(shuffle_active: bool, session: &SessionVariables) -> u32 {
    if shuffle_active {
        1
    } else if session.enable_adaptive_sink_dop {
        session.sink_degree_of_parallelism
    } else {
        session.parallel_exec_instance_num
    }
}

/// Force-enable spill for connector sinks when the session permits,
/// tightening the threshold when the connector-specific one is lower.
/// Mutates the cloned session only.
pub fn apply_connector_sink_spill(sink: &SinkDescriptor, session: &mut SessionVariables) {
    if session.enable_connector_sink_spill && sink.is_connector_sink() {
        session.enable_spill = true;
        if session.connector_sink_spill_mem_limit_threshold < session.spill_mem_limit_threshold {
            session.spill_mem_limit_threshold =
                session.connector_sink_spill_mem_limit_threshold;
        }
    }
}
