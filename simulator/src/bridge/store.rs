use crate::generator::profile::StoredEvent;
use pulsemap::model::QueryRow;
use pulsemap::query::QueryWindow;
use std::collections::VecDeque;
use std::sync::{Arc, RwLock};

/// Time-ordered in-memory event buffer with a retention horizon.
#[derive(Debug, Clone)]
pub struct EventStore {
    events: Arc<RwLock<VecDeque<StoredEvent>>>,
    retention_ms: i64,
}

impl EventStore {
    pub fn new(retention_ms: i64) -> Self {
        Self {
            events: Arc::new(RwLock::new(VecDeque::new())),
            retention_ms,
        }
    }

    pub fn append(&self, batch: Vec<StoredEvent>) {
        let mut guard = self.events.write().unwrap_or_else(|p| p.into_inner());
        guard.extend(batch);
        guard
            .make_contiguous()
            .sort_by_key(|event| event.row.timestamp);
    }

    /// Drops events older than the retention horizon; returns how many.
    pub fn prune(&self, now_ms: i64) -> usize {
        let horizon = now_ms - self.retention_ms;
        let mut guard = self.events.write().unwrap_or_else(|p| p.into_inner());
        let before = guard.len();
        while guard
            .front()
            .is_some_and(|event| event.row.timestamp < horizon)
        {
            guard.pop_front();
        }
        before - guard.len()
    }

    pub fn query(&self, account_id: u64, window: QueryWindow) -> Vec<QueryRow> {
        let guard = self.events.read().unwrap_or_else(|p| p.into_inner());
        guard
            .iter()
            .filter(|event| event.account_id == account_id && window.contains(event.row.timestamp))
            .map(|event| event.row.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.events.read().map(|guard| guard.len()).unwrap_or(0)
    }
}
