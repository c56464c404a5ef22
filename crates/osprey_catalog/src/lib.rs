//! Read-only catalog views consumed by the planner, plus the two catalog
//! services it depends on: the planner metadata lock (with optimistic
//! version tickets) and the global dictionary manager.
//!
//! Catalog views (`Column`, `TargetTable`) are snapshots valid for a single
//! planning attempt; concurrent DDL is detected through version tickets,
//! not prevented.

pub mod column;
pub mod dict;
pub mod lock;
pub mod table;

pub use column::{Column, ColumnDefault, ColumnExpr, MV_COLUMN_PREFIX, SHADOW_COLUMN_PREFIX};
pub use dict::{ColumnDict, DictionaryManager};
pub use lock::{MetaLockGuard, OptimisticTicket, PlannerMetaLock};
pub use table::{
    ExternalTable, FileSinkTable, IndexMeta, InternalTable, KeysType, LakeTable, PartitionField,
    PartitionTransform, SortField, TargetTable, WriteQuorum,
};
