use serde::{Deserialize, Serialize};

use osprey_common::types::{IndexId, PartitionId, TableId};

use crate::column::Column;

/// Key semantics of an internal table. Everything except `Duplicate`
/// resolves multiple rows sharing a key, so replica consistency depends on
/// row arrival order at the sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeysType {
    /// Append-only; duplicate keys are kept. Row order never affects
    /// correctness.
    Duplicate,
    /// Rows sharing a key are merged through aggregate functions.
    Aggregate,
    /// Last write wins on the key.
    Unique,
    /// Primary-key table with delete+insert semantics.
    Primary,
}

impl KeysType {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, KeysType::Duplicate)
    }
}

/// Write quorum required before a load is acknowledged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum WriteQuorum {
    #[default]
    Majority,
    One,
    All,
}

/// One field of a lake table's declared sort order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortField {
    /// Lowercase column name.
    pub column: String,
    pub ascending: bool,
    pub nulls_first: bool,
}

/// Partition transform of a lake table partition field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PartitionTransform {
    Identity,
    Bucket,
    Truncate,
}

impl PartitionTransform {
    pub fn is_identity(&self) -> bool {
        matches!(self, PartitionTransform::Identity)
    }
}

/// One partition field of a lake table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartitionField {
    pub column: String,
    pub transform: PartitionTransform,
}

/// A synchronized materialized index of an internal table. The base index
/// holds the table's own schema; additional indexes hold MV schemas whose
/// maintenance columns appear in the table's full schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexMeta {
    pub id: IndexId,
    pub name: String,
    pub schema: Vec<Column>,
}

/// Internal (natively stored, partitioned, keyed) table.
///
/// Schema ordering invariant relied on by the derivation pipeline: the
/// full schema lists plain stored columns first (in storage order), then
/// generated columns, then shadow / MV maintenance / in-flight
/// schema-change columns. The base schema is the full schema restricted
/// to physically stored columns, preserving relative order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InternalTable {
    pub id: TableId,
    pub name: String,
    pub base_schema: Vec<Column>,
    pub full_schema: Vec<Column>,
    pub keys_type: KeysType,
    pub replication_num: u32,
    /// Synchronized single-copy replicated storage: the primary replica
    /// forwards writes, so row routing no longer matters.
    pub enable_replicated_storage: bool,
    pub write_quorum: WriteQuorum,
    /// All currently existing partitions.
    pub partition_ids: Vec<PartitionId>,
    pub automatic_partition_supported: bool,
    /// 0 = fixed bucketing.
    pub automatic_bucket_size: u64,
    pub base_index_id: IndexId,
    /// Base index plus synchronized MV indexes.
    pub indexes: Vec<IndexMeta>,
}

impl InternalTable {
    /// Key columns of the base index, in schema order.
    pub fn key_columns(&self) -> Vec<&Column> {
        self.base_schema.iter().filter(|c| c.is_key).collect()
    }

    /// The synchronized MV index (excluding the base index) whose schema
    /// contains `column_name`, if any.
    pub fn index_containing_column(&self, column_name: &str) -> Option<&IndexMeta> {
        self.indexes
            .iter()
            .filter(|ix| ix.id != self.base_index_id)
            .find(|ix| ix.schema.iter().any(|c| c.name == column_name))
    }
}

/// External lake-format table (sorted/partitioned files with catalog
/// metadata). Partition columns are trailing in the schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LakeTable {
    pub id: TableId,
    pub name: String,
    pub schema: Vec<Column>,
    /// Declared native sort order; empty = unsorted.
    pub sort_fields: Vec<SortField>,
    pub partition_fields: Vec<PartitionField>,
}

impl LakeTable {
    pub fn is_partitioned(&self) -> bool {
        !self.partition_fields.is_empty()
    }

    pub fn partition_column_names(&self) -> Vec<&str> {
        self.partition_fields.iter().map(|f| f.column.as_str()).collect()
    }

    /// Positions of the sort-order columns within the schema, in sort
    /// order. Columns missing from the schema are skipped.
    pub fn sort_key_indexes(&self) -> Vec<usize> {
        self.sort_fields
            .iter()
            .filter_map(|f| self.schema.iter().position(|c| c.name == f.column))
            .collect()
    }
}

/// File-sink table: rows written straight to files at a target location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileSinkTable {
    pub id: TableId,
    pub name: String,
    pub schema: Vec<Column>,
    /// Trailing partition columns.
    pub partition_columns: Vec<String>,
    pub write_single_file: bool,
}

/// Pass-through relational external table (rows forwarded over a wire
/// protocol to another system).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalTable {
    pub id: TableId,
    pub name: String,
    pub schema: Vec<Column>,
}

/// Closed variant over insert target kinds. Exhaustive matching replaces
/// the original's runtime type checks; there is no "unknown kind" branch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TargetTable {
    Internal(InternalTable),
    Lake(LakeTable),
    FileSink(FileSinkTable),
    External(ExternalTable),
    BlackHole { id: TableId },
}

impl TargetTable {
    pub fn id(&self) -> TableId {
        match self {
            TargetTable::Internal(t) => t.id,
            TargetTable::Lake(t) => t.id,
            TargetTable::FileSink(t) => t.id,
            TargetTable::External(t) => t.id,
            TargetTable::BlackHole { id } => *id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            TargetTable::Internal(t) => &t.name,
            TargetTable::Lake(t) => &t.name,
            TargetTable::FileSink(t) => &t.name,
            TargetTable::External(t) => &t.name,
            TargetTable::BlackHole { .. } => "blackhole",
        }
    }

    /// Physically stored columns, in storage order.
    pub fn base_schema(&self) -> &[Column] {
        match self {
            TargetTable::Internal(t) => &t.base_schema,
            TargetTable::Lake(t) => &t.schema,
            TargetTable::FileSink(t) => &t.schema,
            TargetTable::External(t) => &t.schema,
            TargetTable::BlackHole { .. } => &[],
        }
    }

    /// Base schema plus generated, shadow, and MV maintenance columns.
    /// Identical to the base schema for non-internal tables.
    pub fn full_schema(&self) -> &[Column] {
        match self {
            TargetTable::Internal(t) => &t.full_schema,
            TargetTable::Lake(t) => &t.schema,
            TargetTable::FileSink(t) => &t.schema,
            TargetTable::External(t) => &t.schema,
            TargetTable::BlackHole { .. } => &[],
        }
    }

    /// Declared partition column names (empty when unpartitioned).
    pub fn partition_column_names(&self) -> Vec<&str> {
        match self {
            TargetTable::Lake(t) => t.partition_column_names(),
            TargetTable::FileSink(t) => t.partition_columns.iter().map(|s| s.as_str()).collect(),
            _ => Vec::new(),
        }
    }

    pub fn is_internal(&self) -> bool {
        matches!(self, TargetTable::Internal(_))
    }

    pub fn is_lake(&self) -> bool {
        matches!(self, TargetTable::Lake(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use osprey_common::types::DataType;

    fn lake_with_sort() -> LakeTable {
        LakeTable {
            id: TableId(9),
            name: "events".into(),
            schema: vec![
                Column::new(0, "a", DataType::Int64),
                Column::new(1, "b", DataType::Varchar),
                Column::new(2, "dt", DataType::Date),
            ],
            sort_fields: vec![
                SortField { column: "b".into(), ascending: true, nulls_first: false },
                SortField { column: "a".into(), ascending: false, nulls_first: true },
            ],
            partition_fields: vec![PartitionField {
                column: "dt".into(),
                transform: PartitionTransform::Identity,
            }],
        }
    }

    #[test]
    fn test_sort_key_indexes_follow_sort_order() {
        assert_eq!(lake_with_sort().sort_key_indexes(), vec![1, 0]);
    }

    #[test]
    fn test_duplicate_keys_detection() {
        assert!(KeysType::Duplicate.is_duplicate());
        assert!(!KeysType::Unique.is_duplicate());
        assert!(!KeysType::Primary.is_duplicate());
    }

    #[test]
    fn test_partition_columns_per_kind() {
        let lake = TargetTable::Lake(lake_with_sort());
        assert_eq!(lake.partition_column_names(), vec!["dt"]);
        assert!(lake.is_lake());
        assert!(!lake.is_internal());
    }
}
