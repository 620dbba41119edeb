//! Batch and per-task record types

use std::collections::BTreeMap;

use serde::Serialize;

use super::{StringId, StringTable, TaskId, Timestamp};

/// A task's record within one batch
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TaskRecord {
    /// Interned display name, 0 while unresolved
    pub name: StringId,
    /// Time spent in the running state within this batch
    pub running: i64,
    /// (timestamp, interned state) pairs, in event order
    pub events: Vec<(Timestamp, StringId)>,

    #[serde(skip)]
    pub(crate) prev_time: Timestamp,
}

impl TaskRecord {
    pub fn new(first_seen: Timestamp) -> Self {
        Self {
            name: 0,
            running: 0,
            events: Vec::new(),
            prev_time: first_seen,
        }
    }

    pub fn has_name(&self) -> bool {
        self.name != 0
    }
}

/// A sealed window of processed trace events
#[derive(Debug, Clone, Serialize)]
pub struct Batch {
    pub id: u64,
    pub start: Timestamp,
    pub end: Timestamp,
    /// Number of task state transitions folded in
    pub events: u64,
    pub tasks: BTreeMap<TaskId, TaskRecord>,
    pub strings: StringTable,
}

impl Batch {
    pub fn new(id: u64, start: Timestamp) -> Self {
        Self {
            id,
            start,
            end: start,
            events: 0,
            tasks: BTreeMap::new(),
            strings: StringTable::new(),
        }
    }

    /// Get the record for `task`, creating it if this batch hasn't seen it
    pub fn task_mut(&mut self, task: TaskId, ts: Timestamp) -> &mut TaskRecord {
        self.tasks.entry(task).or_insert_with(|| TaskRecord::new(ts))
    }

    pub fn task(&self, task: TaskId) -> Option<&TaskRecord> {
        self.tasks.get(&task)
    }

    /// Resolved display name of `task`, if any
    pub fn task_name(&self, task: TaskId) -> Option<&str> {
        self.task(task)
            .filter(|t| t.has_name())
            .and_then(|t| self.strings.get(t.name))
    }
}
