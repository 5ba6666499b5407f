use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::constants::DEFAULT_LOCK_TABLE_HIGH_WATER;

/// Per-learner mutual exclusion.
///
/// Entries are created lazily. Once the table holds more than
/// `high_water_mark` keys, entries nobody else holds a handle to are dropped;
/// a lock that is held or being waited on is never evicted.
pub struct LearnerLocks {
    table: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    high_water_mark: usize,
}

impl Default for LearnerLocks {
    fn default() -> Self {
        Self::new(DEFAULT_LOCK_TABLE_HIGH_WATER)
    }
}

impl LearnerLocks {
    pub fn new(high_water_mark: usize) -> Self {
        Self {
            table: Mutex::new(HashMap::new()),
            high_water_mark,
        }
    }

    fn acquire(&self, learner_id: &str) -> Arc<Mutex<()>> {
        let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);

        if table.len() > self.high_water_mark {
            let before = table.len();
            table.retain(|_, lock| Arc::strong_count(lock) > 1);
            tracing::debug!(before, after = table.len(), "Swept idle learner locks");
        }

        table
            .entry(learner_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Runs `f` while holding the learner's lock. Released on every exit path,
    /// unwinding included; a poisoned lock is taken over rather than reported.
    pub fn with_learner<T>(&self, learner_id: &str, f: impl FnOnce() -> T) -> T {
        let lock = self.acquire(learner_id);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        f()
    }

    pub fn len(&self) -> usize {
        self.table.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
