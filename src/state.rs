use std::sync::Arc;
use std::time::Instant;

use crate::srs::ExamEngine;
use crate::store::Store;

#[derive(Clone)]
pub struct AppState {
    engine: Arc<ExamEngine>,
    store: Arc<Store>,
    started_at: Instant,
}

impl AppState {
    pub fn new(engine: Arc<ExamEngine>, store: Arc<Store>) -> Self {
        Self {
            engine,
            store,
            started_at: Instant::now(),
        }
    }

    pub fn engine(&self) -> &ExamEngine {
        &self.engine
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
