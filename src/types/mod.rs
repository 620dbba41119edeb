//! Data types for the task timeline
//!
//! This module contains the decoded trace events and the batch structures
//! built from them.

mod batch;
mod event;
mod strings;

pub use batch::{Batch, TaskRecord};
pub use event::{Event, EventKind, Frame, Resource, Stack, StateTransition, TaskState};
pub use strings::StringTable;

/// Trace time, in the source's native ticks
pub type Timestamp = i64;

/// Identity of a tracked task, stable across batches
pub type TaskId = u64;

/// Id of a string in a batch's string table
pub type StringId = u32;
