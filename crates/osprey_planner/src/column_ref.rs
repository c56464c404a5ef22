use osprey_common::types::DataType;

/// Stable integer handle for an output column. Handles are dense indexes
/// into the owning [`ColumnRefFactory`]; stages compare and store handles,
/// never references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColumnRefId(pub u32);

/// Metadata of one column reference.
#[derive(Debug, Clone)]
pub struct ColumnRef {
    pub id: ColumnRefId,
    pub name: String,
    pub data_type: DataType,
    pub nullable: bool,
}

/// Append-only arena of column references for one planning attempt.
/// Created fresh per attempt and discarded with the plan.
#[derive(Debug, Default)]
pub struct ColumnRefFactory {
    refs: Vec<ColumnRef>,
}

impl ColumnRefFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&mut self, name: &str, data_type: DataType, nullable: bool) -> ColumnRefId {
        let id = ColumnRefId(self.refs.len() as u32);
        self.refs.push(ColumnRef {
            id,
            name: name.to_string(),
            data_type,
            nullable,
        });
        id
    }

    pub fn get(&self, id: ColumnRefId) -> &ColumnRef {
        &self.refs[id.0 as usize]
    }

    pub fn data_type(&self, id: ColumnRefId) -> &DataType {
        &self.refs[id.0 as usize].data_type
    }

    pub fn len(&self) -> usize {
        self.refs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.refs.is_empty()
    }
}
