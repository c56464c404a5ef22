use std::time::Instant;

use tracing::{debug, error, warn};

use osprey_catalog::PlannerMetaLock;
use osprey_common::error::PlanError;
use osprey_common::types::TableId;
use osprey_common::OspreyResult;

/// Phase of the optimistic planning loop, for observability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    Planning,
    Validating,
    Succeeded,
    Exhausted,
}

/// Bounded optimistic retry around plan construction.
///
/// Plan construction (the optimizer call in particular) is expensive and
/// must not hold the metadata lock, which would starve concurrent DDL. The
/// lock is held only while resolving and while validating: each attempt
/// takes a version ticket, releases the lock, builds the plan, reacquires
/// the lock, and checks every referenced table against the ticket.
/// Staleness is detected, not prevented; a stale attempt discards its plan
/// and retries.
pub struct OptimisticRetryController<'a> {
    lock: &'a PlannerMetaLock,
    max_attempts: u32,
}

impl<'a> OptimisticRetryController<'a> {
    pub fn new(lock: &'a PlannerMetaLock, max_attempts: u32) -> Self {
        Self { lock, max_attempts }
    }

    /// Run `build` until it survives validation or the attempt budget is
    /// exhausted.
    ///
    /// `resolve` is called under the metadata lock (once before the first
    /// attempt, and again whenever the previous attempt was found stale)
    /// and returns the tables the plan depends on. `build` is called with
    /// the lock released.
    pub fn run<T>(
        &self,
        mut resolve: impl FnMut() -> OspreyResult<Vec<TableId>>,
        mut build: impl FnMut() -> OspreyResult<T>,
    ) -> OspreyResult<T> {
        let started = Instant::now();
        let mut guard = Some(self.lock.lock());
        let mut tables = resolve()?;
        let mut stale = false;

        for attempt in 1..=self.max_attempts.max(1) {
            debug!(attempt, state = ?RetryState::Planning, "starting planning attempt");
            let ticket = self.lock.current_ticket();
            if stale {
                tables = resolve()?;
            }

            // Expensive phase runs unlocked; reacquire before touching
            // catalog versions, even if the build failed.
            drop(guard.take());
            let built = build();
            guard = Some(self.lock.lock());
            let plan = built?;

            debug!(attempt, state = ?RetryState::Validating, "validating plan against ticket");
            if tables.iter().all(|t| self.lock.validate(*t, ticket)) {
                debug!(attempt, state = ?RetryState::Succeeded, "plan validated");
                return Ok(plan);
            }
            warn!(attempt, "table metadata changed during planning; discarding plan");
            stale = true;
        }

        let elapsed_ms = started.elapsed().as_millis() as u64;
        error!(
            state = ?RetryState::Exhausted,
            elapsed_ms,
            attempts = self.max_attempts,
            "optimistic planning budget exhausted"
        );
        Err(PlanError::RetryExhausted {
            elapsed_ms,
            attempts: self.max_attempts,
        }
        .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_attempt_succeeds_without_contention() {
        let lock = PlannerMetaLock::new();
        let controller = OptimisticRetryController::new(&lock, 3);
        let mut builds = 0;
        let result = controller.run(
            || Ok(vec![TableId(1)]),
            || {
                builds += 1;
                Ok(42)
            },
        );
        assert_eq!(result.unwrap(), 42);
        assert_eq!(builds, 1);
    }

    #[test]
    fn test_stale_attempt_is_discarded_and_retried_once() {
        let lock = PlannerMetaLock::new();
        let controller = OptimisticRetryController::new(&lock, 3);
        let mut builds = 0;
        let result = controller.run(
            || Ok(vec![TableId(1)]),
            || {
                builds += 1;
                if builds == 1 {
                    // Concurrent DDL lands between ticket capture and
                    // re-validation.
                    lock.mark_table_updated(TableId(1));
                }
                Ok(builds)
            },
        );
        // Exactly one extra attempt: the first plan is discarded, the
        // second validates.
        assert_eq!(result.unwrap(), 2);
        assert_eq!(builds, 2);
    }

    #[test]
    fn test_exhaustion_is_fatal_and_bounded() {
        let lock = PlannerMetaLock::new();
        let controller = OptimisticRetryController::new(&lock, 3);
        let mut builds = 0;
        let result: OspreyResult<u32> = controller.run(
            || Ok(vec![TableId(1)]),
            || {
                builds += 1;
                lock.mark_table_updated(TableId(1));
                Ok(builds)
            },
        );
        let err = result.unwrap_err();
        assert!(err.is_internal_bug());
        assert!(err.to_string().contains("3 attempts"));
        assert_eq!(builds, 3);
    }

    #[test]
    fn test_reresolve_called_only_after_staleness() {
        let lock = PlannerMetaLock::new();
        let controller = OptimisticRetryController::new(&lock, 3);
        let mut resolves = 0;
        let mut builds = 0;
        let result = controller.run(
            || {
                resolves += 1;
                Ok(vec![TableId(1)])
            },
            || {
                builds += 1;
                if builds == 1 {
                    lock.mark_table_updated(TableId(1));
                }
                Ok(())
            },
        );
        assert!(result.is_ok());
        // Initial resolution plus one re-resolution for the stale attempt.
        assert_eq!(resolves, 2);
    }

    #[test]
    fn test_build_error_propagates_unwrapped() {
        let lock = PlannerMetaLock::new();
        let controller = OptimisticRetryController::new(&lock, 3);
        let result: OspreyResult<u32> = controller.run(
            || Ok(vec![TableId(1)]),
            || Err(osprey_common::OspreyError::Internal("optimizer fault".into())),
        );
        assert!(result.unwrap_err().to_string().contains("optimizer fault"));
    }
}
