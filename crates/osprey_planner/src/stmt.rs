use osprey_catalog::TargetTable;
use osprey_common::datum::Datum;
use osprey_common::types::{DataType, PartitionId, TableId};

/// One output field of an analyzed source relation.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub data_type: DataType,
}

/// One cell of a VALUES row, as produced by semantic analysis.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueCell {
    Literal(Datum),
    /// The explicit `DEFAULT` keyword.
    DefaultKeyword,
}

/// An analyzed VALUES relation: typed fields and per-cell literals.
#[derive(Debug, Clone)]
pub struct ValuesRelation {
    pub fields: Vec<Field>,
    pub rows: Vec<Vec<ValueCell>>,
}

/// Shape of one select-list item, as far as insert planning cares:
/// star-expansion and constness of the expression.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectItem {
    pub is_star: bool,
    pub is_constant: bool,
}

/// An analyzed SELECT source. The planner treats it as an opaque relation
/// producing typed fields; only the shape bits that drive insert planning
/// are exposed.
#[derive(Debug, Clone)]
pub struct SelectRelation {
    pub fields: Vec<Field>,
    pub has_limit: bool,
    pub items: Vec<SelectItem>,
    /// Tables the query reads, for optimistic validation.
    pub referenced_tables: Vec<TableId>,
}

/// Source relation of an INSERT.
#[derive(Debug, Clone)]
pub enum QueryRelation {
    Values(ValuesRelation),
    Select(SelectRelation),
}

impl QueryRelation {
    pub fn fields(&self) -> &[Field] {
        match self {
            QueryRelation::Values(v) => &v.fields,
            QueryRelation::Select(s) => &s.fields,
        }
    }

    pub fn is_values(&self) -> bool {
        matches!(self, QueryRelation::Values(_))
    }
}

/// `PARTITION (p1 = 'v1', ...)` static partition clause of a lake or
/// file-sink insert. Values are analyzed literals, positionally matched
/// to `column_names`.
#[derive(Debug, Clone)]
pub struct StaticPartitionClause {
    pub column_names: Vec<String>,
    pub values: Vec<Datum>,
}

/// Overwrite semantics of the statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverwriteKind {
    /// Plain INSERT.
    #[default]
    None,
    /// System-issued overwrite insert with partitions resolved by the
    /// overwrite job rather than the statement.
    SystemUnspecified,
    /// Dynamic overwrite: partitions created/replaced from the data.
    Dynamic,
}

/// A fully analyzed INSERT, ready for planning. Table handles inside are
/// catalog snapshots valid for one planning attempt.
#[derive(Debug, Clone)]
pub struct InsertStatement {
    pub target_table: TargetTable,
    /// Explicit target column list, lowercased by the analyzer. `None`
    /// means the full base schema in order.
    pub target_column_names: Option<Vec<String>>,
    pub source: QueryRelation,
    /// Partial-update mode: untargeted columns keep their current values.
    pub partial_update: bool,
    pub static_partition: Option<StaticPartitionClause>,
    /// Resolved physical partitions this statement writes.
    pub target_partition_ids: Vec<PartitionId>,
    pub overwrite: OverwriteKind,
    /// Statement was rewritten from INSERT OVERWRITE.
    pub from_overwrite: bool,
    /// Statement named partitions explicitly (PARTITION (p1, p2)).
    pub specify_partition_names: bool,
}

impl InsertStatement {
    /// Plain insert with defaults for the rarely used knobs.
    pub fn new(target_table: TargetTable, source: QueryRelation) -> Self {
        Self {
            target_table,
            target_column_names: None,
            source,
            partial_update: false,
            static_partition: None,
            target_partition_ids: Vec::new(),
            overwrite: OverwriteKind::None,
            from_overwrite: false,
            specify_partition_names: false,
        }
    }

    pub fn is_static_key_partition_insert(&self) -> bool {
        self.static_partition.is_some()
    }

    /// Position of `column_name` in the explicit target list, if both
    /// exist.
    pub fn target_index_of(&self, column_name: &str) -> Option<usize> {
        self.target_column_names
            .as_ref()
            .and_then(|names| names.iter().position(|n| n == column_name))
    }

    pub fn targets_column(&self, column_name: &str) -> bool {
        self.target_index_of(column_name).is_some()
    }

    /// All tables whose metadata this plan depends on: the target plus
    /// everything the source query reads.
    pub fn referenced_tables(&self) -> Vec<TableId> {
        let mut tables = vec![self.target_table.id()];
        if let QueryRelation::Select(sel) = &self.source {
            for id in &sel.referenced_tables {
                if !tables.contains(id) {
                    tables.push(*id);
                }
            }
        }
        tables
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use osprey_catalog::{Column, InternalTable, KeysType, WriteQuorum};
    use osprey_common::types::IndexId;

    fn table() -> TargetTable {
        TargetTable::Internal(InternalTable {
            id: TableId(1),
            name: "t".into(),
            base_schema: vec![Column::new(0, "id", DataType::Int64)],
            full_schema: vec![Column::new(0, "id", DataType::Int64)],
            keys_type: KeysType::Duplicate,
            replication_num: 1,
            enable_replicated_storage: false,
            write_quorum: WriteQuorum::Majority,
            partition_ids: vec![PartitionId(1)],
            automatic_partition_supported: false,
            automatic_bucket_size: 0,
            base_index_id: IndexId(1),
            indexes: Vec::new(),
        })
    }

    #[test]
    fn test_referenced_tables_dedup() {
        let source = QueryRelation::Select(SelectRelation {
            fields: vec![Field { name: "id".into(), data_type: DataType::Int64 }],
            has_limit: false,
            items: vec![SelectItem { is_star: false, is_constant: false }],
            referenced_tables: vec![TableId(2), TableId(1), TableId(2)],
        });
        let stmt = InsertStatement::new(table(), source);
        assert_eq!(stmt.referenced_tables(), vec![TableId(1), TableId(2)]);
    }

    #[test]
    fn test_target_index_lookup() {
        let source = QueryRelation::Values(ValuesRelation {
            fields: vec![Field { name: "id".into(), data_type: DataType::Int64 }],
            rows: vec![vec![ValueCell::Literal(Datum::Int64(1))]],
        });
        let mut stmt = InsertStatement::new(table(), source);
        assert!(!stmt.targets_column("id"));
        stmt.target_column_names = Some(vec!["id".into()]);
        assert_eq!(stmt.target_index_of("id"), Some(0));
    }
}
