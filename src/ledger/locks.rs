//! Per-project mutual exclusion for ledger writes.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::error::{LedgerError, Result};

/// One lock per project id, created on first use and dropped once idle.
///
/// Writers on different projects never wait on each other; writers on the
/// same project run strictly one at a time.
#[derive(Debug, Default)]
pub struct ProjectLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ProjectLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` while holding the lock for `project_id`.
    ///
    /// Waits at most `timeout` for the lock, then fails with
    /// [`LedgerError::StoreUnavailable`] without running `f`.
    pub fn with_project<T, F>(&self, project_id: &str, timeout: Duration, f: F) -> Result<T>
    where
        F: FnOnce() -> Result<T>,
    {
        let lock = {
            let mut locks = self.locks.lock();
            locks.entry(project_id.to_string()).or_default().clone()
        };
        let outcome = {
            let guard = lock.try_lock_for(timeout);
            match guard {
                Some(_) => f(),
                None => Err(LedgerError::StoreUnavailable(format!(
                    "timed out after {:?} waiting for project {}",
                    timeout, project_id
                ))),
            }
        };
        self.release(project_id, lock);
        outcome
    }

    /// Drop the map entry when the caller held the last outside reference.
    fn release(&self, project_id: &str, lock: Arc<Mutex<()>>) {
        let mut locks = self.locks.lock();
        // Clones are only taken under the map lock, so a count of two (map
        // plus `lock`) means no other caller holds or awaits this entry
        let idle = locks
            .get(project_id)
            .is_some_and(|held| Arc::ptr_eq(held, &lock) && Arc::strong_count(held) == 2);
        if idle {
            locks.remove(project_id);
        }
    }

    /// Number of projects currently locked or waited on.
    pub fn len(&self) -> usize {
        self.locks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
