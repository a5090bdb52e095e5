//! Immutable task history.
//!
//! Every executed task is appended here with its result, whatever the
//! outcome, so a failed task never silently disappears. Records are
//! shared as `Arc<Task>` and never mutated after insertion; resubmitting
//! a task id that only ever stayed pending (validation failure, unknown
//! agent, unavailable agent) replaces its pending record.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use taskweave_core::{Task, TaskId, TaskStatus};

#[derive(Default)]
struct HistoryInner {
    records: HashMap<TaskId, Arc<Task>>,
    order: Vec<TaskId>,
}

/// Append-only store of finished (or rejected) task records.
#[derive(Default)]
pub struct TaskHistory {
    inner: RwLock<HistoryInner>,
}

impl TaskHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a task. A pending record for the same id is replaced;
    /// records that progressed past pending are never overwritten.
    pub(crate) fn record(&self, task: Task) -> Arc<Task> {
        let record = Arc::new(task);
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        match inner.records.get(&record.id) {
            Some(existing) if existing.status != TaskStatus::Pending => {
                // Records past pending are immutable; a later rejection of
                // the same id must not clobber them.
                Arc::clone(existing)
            }
            Some(_) => {
                inner
                    .records
                    .insert(record.id.clone(), Arc::clone(&record));
                record
            }
            None => {
                inner.order.push(record.id.clone());
                inner
                    .records
                    .insert(record.id.clone(), Arc::clone(&record));
                record
            }
        }
    }

    /// Whether the id already ran (reached `running` or beyond). Ids that
    /// only ever stayed pending may be resubmitted.
    pub(crate) fn has_executed(&self, id: &TaskId) -> bool {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner
            .records
            .get(id)
            .is_some_and(|t| t.status != TaskStatus::Pending)
    }

    /// Look up one record.
    pub fn task(&self, id: &TaskId) -> Option<Arc<Task>> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.records.get(id).cloned()
    }

    /// All records in insertion order.
    pub fn tasks(&self) -> Vec<Arc<Task>> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner
            .order
            .iter()
            .filter_map(|id| inner.records.get(id).cloned())
            .collect()
    }

    /// Number of recorded tasks.
    pub fn len(&self) -> usize {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
