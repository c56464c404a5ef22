use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use parking_lot::{Mutex, MutexGuard};

use osprey_common::types::TableId;

/// Monotonically increasing version stamp taken before the metadata lock
/// is released for the expensive planning phase. A plan is valid iff no
/// referenced table was updated past its ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct OptimisticTicket(pub u64);

/// Guard over the planner metadata lock. Dropping it releases the lock.
pub struct MetaLockGuard<'a> {
    _inner: MutexGuard<'a, ()>,
}

/// Coarse cooperative metadata lock shared by planning and DDL, plus the
/// optimistic version registry used to detect concurrent schema mutation.
///
/// Planning holds the lock while resolving and validating; it releases the
/// lock during optimization (see the retry controller) so DDL is not
/// starved by expensive plans. DDL bumps a table's version stamp under the
/// lock via [`mark_table_updated`](Self::mark_table_updated).
#[derive(Default)]
pub struct PlannerMetaLock {
    mutex: Mutex<()>,
    version: AtomicU64,
    table_versions: DashMap<TableId, u64>,
}

impl PlannerMetaLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the metadata lock, blocking until available.
    pub fn lock(&self) -> MetaLockGuard<'_> {
        MetaLockGuard {
            _inner: self.mutex.lock(),
        }
    }

    /// Generate a fresh version ticket. Tickets are strictly increasing
    /// across the process.
    pub fn current_ticket(&self) -> OptimisticTicket {
        OptimisticTicket(self.version.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Record that a table's metadata changed. Called by DDL under the
    /// metadata lock.
    pub fn mark_table_updated(&self, table: TableId) {
        let stamp = self.version.fetch_add(1, Ordering::SeqCst) + 1;
        self.table_versions.insert(table, stamp);
    }

    /// Whether `table` is unchanged since `ticket` was taken. Tables never
    /// updated validate against any ticket.
    pub fn validate(&self, table: TableId, ticket: OptimisticTicket) -> bool {
        self.table_versions
            .get(&table)
            .map(|stamp| *stamp <= ticket.0)
            .unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tickets_are_monotonic() {
        let lock = PlannerMetaLock::new();
        let t1 = lock.current_ticket();
        let t2 = lock.current_ticket();
        assert!(t2 > t1);
    }

    #[test]
    fn test_untouched_table_validates() {
        let lock = PlannerMetaLock::new();
        let ticket = lock.current_ticket();
        assert!(lock.validate(TableId(1), ticket));
    }

    #[test]
    fn test_update_after_ticket_invalidates() {
        let lock = PlannerMetaLock::new();
        let ticket = lock.current_ticket();
        lock.mark_table_updated(TableId(1));
        assert!(!lock.validate(TableId(1), ticket));
        // A ticket taken after the update validates again.
        let fresh = lock.current_ticket();
        assert!(lock.validate(TableId(1), fresh));
    }

    #[test]
    fn test_update_before_ticket_still_valid() {
        let lock = PlannerMetaLock::new();
        lock.mark_table_updated(TableId(7));
        let ticket = lock.current_ticket();
        assert!(lock.validate(TableId(7), ticket));
    }
}
