use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a table within the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TableId(pub u64);

/// Unique identifier for a column within a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnId(pub u32);

/// Unique identifier for a materialized index of an internal table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexId(pub u64);

/// Unique identifier for a physical partition of a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PartitionId(pub u64);

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tbl:{}", self.0)
    }
}

impl fmt::Display for ColumnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "col:{}", self.0)
    }
}

impl fmt::Display for IndexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "idx:{}", self.0)
    }
}

/// SQL data types supported by OspreyDB.
///
/// `Null` is the type of an untyped NULL literal; it compares unequal to
/// every storable type, so the output-coercion stage always wraps it in an
/// explicit cast.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    Null,
    Boolean,
    Int32,
    Int64,
    Float64,
    /// Fixed-point decimal: (precision, scale).
    Decimal(u8, u8),
    Varchar,
    Date,
    Timestamp,
    Jsonb,
}

impl DataType {
    /// Whether a value of this type is dictionary-encodable (string types).
    pub fn is_string(&self) -> bool {
        matches!(self, DataType::Varchar)
    }

    /// Whether this is the NULL literal type.
    pub fn is_null(&self) -> bool {
        matches!(self, DataType::Null)
    }

    /// Exact type match used by the output-coercion stage.
    ///
    /// NULL-typed values never match a declared column type, so they are
    /// always wrapped in a cast to the declared type.
    pub fn matches(&self, declared: &DataType) -> bool {
        self == declared
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Null => write!(f, "NULL_TYPE"),
            DataType::Boolean => write!(f, "BOOLEAN"),
            DataType::Int32 => write!(f, "INT"),
            DataType::Int64 => write!(f, "BIGINT"),
            DataType::Float64 => write!(f, "DOUBLE"),
            DataType::Decimal(p, s) => write!(f, "DECIMAL({},{})", p, s),
            DataType::Varchar => write!(f, "VARCHAR"),
            DataType::Date => write!(f, "DATE"),
            DataType::Timestamp => write!(f, "DATETIME"),
            DataType::Jsonb => write!(f, "JSON"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_type_never_matches_declared() {
        assert!(!DataType::Null.matches(&DataType::Int64));
        assert!(!DataType::Null.matches(&DataType::Varchar));
    }

    #[test]
    fn test_exact_match_required() {
        assert!(DataType::Int64.matches(&DataType::Int64));
        assert!(!DataType::Int32.matches(&DataType::Int64));
        assert!(!DataType::Decimal(10, 2).matches(&DataType::Decimal(10, 3)));
    }

    #[test]
    fn test_varchar_is_dictionary_encodable() {
        assert!(DataType::Varchar.is_string());
        assert!(!DataType::Int64.is_string());
    }
}
