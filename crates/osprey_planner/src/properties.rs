use osprey_common::config::GlobalConfig;
use osprey_common::session::SessionVariables;
use osprey_common::{OspreyError, OspreyResult};

use osprey_catalog::TargetTable;

use crate::column_ref::ColumnRefId;
use crate::resolver::ResolvedSchema;
use crate::stmt::{InsertStatement, QueryRelation};

/// Distribution the optimizer must produce directly above the write sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DistributionSpec {
    /// All rows on a single fragment instance.
    Gather,
    /// Any instance, balanced.
    RoundRobin,
    /// Rows sharing the hash of these columns land on the same instance.
    HashShuffle { columns: Vec<ColumnRefId> },
}

/// One field of a required sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortOrdering {
    pub column: ColumnRefId,
    pub ascending: bool,
    pub nulls_first: bool,
}

/// Distribution/sort contract handed to the optimizer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PhysicalRequirement {
    pub distribution: Option<DistributionSpec>,
    pub sort: Vec<SortOrdering>,
}

impl PhysicalRequirement {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.distribution.is_none() && self.sort.is_empty()
    }
}

/// Outcome of the property planner: the requirement itself plus the two
/// side decisions the sink assembler needs.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDecision {
    pub requirement: PhysicalRequirement,
    /// A hash shuffle was required; the sink DOP must stay 1 so the send
    /// order of rows sharing a key is preserved per instance.
    pub shuffle_active: bool,
    /// Replicated storage was forced instead of shuffling (global config
    /// preference).
    pub force_replicated_storage: bool,
}

impl PropertyDecision {
    fn plain(requirement: PhysicalRequirement) -> Self {
        Self {
            requirement,
            shuffle_active: false,
            force_replicated_storage: false,
        }
    }
}

/// Decide the physical properties required above the write sink.
///
/// Independent fragment instances may deliver the same logical row to
/// different replicas. For key-resolving tables the winning row per key
/// must be the same on every replica, so rows sharing a key are routed to
/// one instance (hash shuffle) unless replication or storage mode already
/// guarantees a single write path.
pub fn required_properties(
    stmt: &InsertStatement,
    schema: &ResolvedSchema,
    output_columns: &[ColumnRefId],
    session: &SessionVariables,
    config: &GlobalConfig,
) -> OspreyResult<PropertyDecision> {
    // A limited select must be evaluated on one node for the limit to be
    // global; gather before the sink.
    if let QueryRelation::Select(sel) = &stmt.source {
        if sel.has_limit {
            return Ok(PropertyDecision::plain(PhysicalRequirement {
                distribution: Some(DistributionSpec::Gather),
                sort: Vec::new(),
            }));
        }
    }

    match &stmt.target_table {
        TargetTable::Lake(table) => {
            if table.sort_fields.is_empty() {
                return Ok(PropertyDecision::plain(PhysicalRequirement::none()));
            }
            let mut sort = Vec::with_capacity(table.sort_fields.len());
            for (field, index) in table.sort_fields.iter().zip(table.sort_key_indexes()) {
                sort.push(SortOrdering {
                    column: *output_columns.get(index).ok_or_else(|| {
                        OspreyError::Internal(format!(
                            "sort column {} at position {} has no output column",
                            field.column, index
                        ))
                    })?,
                    ascending: field.ascending,
                    nulls_first: field.nulls_first,
                });
            }
            Ok(PropertyDecision::plain(PhysicalRequirement {
                distribution: None,
                sort,
            }))
        }

        TargetTable::FileSink(table) => {
            if table.write_single_file {
                return Ok(PropertyDecision::plain(PhysicalRequirement {
                    distribution: Some(DistributionSpec::Gather),
                    sort: Vec::new(),
                }));
            }
            if session.enable_connector_sink_global_shuffle {
                if table.partition_columns.is_empty() {
                    return Ok(PropertyDecision::plain(PhysicalRequirement {
                        distribution: Some(DistributionSpec::RoundRobin),
                        sort: Vec::new(),
                    }));
                }
                let columns = table
                    .partition_columns
                    .iter()
                    .map(|name| {
                        table
                            .schema
                            .iter()
                            .position(|c| &c.name == name)
                            .and_then(|pos| output_columns.get(pos).copied())
                            .ok_or_else(|| {
                                OspreyError::Internal(format!(
                                    "partition column {} has no output column",
                                    name
                                ))
                            })
                    })
                    .collect::<OspreyResult<Vec<_>>>()?;
                return Ok(PropertyDecision::plain(PhysicalRequirement {
                    distribution: Some(DistributionSpec::HashShuffle { columns }),
                    sort: Vec::new(),
                }));
            }
            Ok(PropertyDecision::plain(PhysicalRequirement::none()))
        }

        TargetTable::External(_) | TargetTable::BlackHole { .. } => {
            Ok(PropertyDecision::plain(PhysicalRequirement::none()))
        }

        TargetTable::Internal(table) => {
            // Append-only tables are order-insensitive.
            if table.keys_type.is_duplicate() {
                return Ok(PropertyDecision::plain(PhysicalRequirement::none()));
            }
            // One replica: only one write path exists.
            if !config.enable_single_replica_shuffle && table.replication_num <= 1 {
                return Ok(PropertyDecision::plain(PhysicalRequirement::none()));
            }
            // Replicated storage forwards through a single primary.
            if table.enable_replicated_storage {
                return Ok(PropertyDecision::plain(PhysicalRequirement::none()));
            }

            if output_columns.len() != schema.full.len() {
                return Err(OspreyError::Internal(format!(
                    "output columns ({}) must match full schema ({})",
                    output_columns.len(),
                    schema.full.len()
                )));
            }

            if config.eliminate_shuffle_load_by_replicated_storage {
                return Ok(PropertyDecision {
                    requirement: PhysicalRequirement::none(),
                    shuffle_active: false,
                    force_replicated_storage: true,
                });
            }

            let columns = table
                .key_columns()
                .into_iter()
                .map(|key| {
                    schema
                        .full
                        .iter()
                        .position(|c| c.name == key.name)
                        .map(|pos| output_columns[pos])
                        .ok_or_else(|| {
                            OspreyError::Internal(format!(
                                "key column {} missing from output schema",
                                key.name
                            ))
                        })
                })
                .collect::<OspreyResult<Vec<_>>>()?;

            Ok(PropertyDecision {
                requirement: PhysicalRequirement {
                    distribution: Some(DistributionSpec::HashShuffle { columns }),
                    sort: Vec::new(),
                },
                shuffle_active: true,
                force_replicated_storage: false,
            })
        }
    }
}
