use std::sync::Arc;

use dashmap::DashMap;

use osprey_common::types::{ColumnId, TableId};

/// A global low-cardinality dictionary for a string column: ordered
/// distinct values; the executor encodes cell values as indexes into it.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDict {
    pub dict_id: u64,
    /// Dictionary version; bumped when the value set changes.
    pub version: u64,
    pub values: Vec<String>,
}

/// Registry of global dictionaries keyed by (table, column). Lookups are
/// lock-free; registration happens from the statistics subsystem.
#[derive(Default)]
pub struct DictionaryManager {
    dicts: DashMap<(TableId, ColumnId), Arc<ColumnDict>>,
}

impl DictionaryManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, table: TableId, column: ColumnId, dict: ColumnDict) {
        self.dicts.insert((table, column), Arc::new(dict));
    }

    pub fn has_global_dict(&self, table: TableId, column: ColumnId) -> bool {
        self.dicts.contains_key(&(table, column))
    }

    pub fn get_global_dict(&self, table: TableId, column: ColumnId) -> Option<Arc<ColumnDict>> {
        self.dicts.get(&(table, column)).map(|e| Arc::clone(e.value()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_roundtrip() {
        let mgr = DictionaryManager::new();
        assert!(!mgr.has_global_dict(TableId(1), ColumnId(2)));
        mgr.register(
            TableId(1),
            ColumnId(2),
            ColumnDict { dict_id: 10, version: 1, values: vec!["a".into(), "b".into()] },
        );
        assert!(mgr.has_global_dict(TableId(1), ColumnId(2)));
        let dict = mgr.get_global_dict(TableId(1), ColumnId(2)).unwrap();
        assert_eq!(dict.values.len(), 2);
    }
}
