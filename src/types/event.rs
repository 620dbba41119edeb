//! Trace event types
//!
//! These are the decoded events handed to the batcher by an event source.
//! They are immutable once decoded.

use serde::{Deserialize, Serialize};

use super::{TaskId, Timestamp};

/// Lifecycle state of a tracked task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    #[default]
    Undetermined,
    NotExist,
    Runnable,
    Running,
    Waiting,
    Syscall,
}

impl TaskState {
    /// Lowercase name, as interned into batch string tables
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskState::Undetermined => "undetermined",
            TaskState::NotExist => "notexist",
            TaskState::Runnable => "runnable",
            TaskState::Running => "running",
            TaskState::Waiting => "waiting",
            TaskState::Syscall => "syscall",
        }
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single call-stack frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Frame {
    pub func: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub file: String,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub line: u32,
}

fn is_zero(val: &u32) -> bool {
    *val == 0
}

impl Frame {
    pub fn new(func: impl Into<String>) -> Self {
        Self {
            func: func.into(),
            ..Default::default()
        }
    }
}

/// A call stack, listed leaf first
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Stack(pub Vec<Frame>);

impl Stack {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_funcs<I, S>(funcs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(funcs.into_iter().map(Frame::new).collect())
    }

    /// Function symbol of the outermost frame, or "" for an empty stack
    pub fn outermost_func(&self) -> &str {
        self.0.last().map(|f| f.func.as_str()).unwrap_or("")
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// The resource whose state changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Task(TaskId),
    Proc(u64),
    Thread(u64),
}

/// Payload of a state transition event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateTransition {
    pub resource: Resource,
    pub from: TaskState,
    pub to: TaskState,
    /// Stack attached to the transition itself
    #[serde(default)]
    pub transition_stack: Stack,
}

/// Kind-specific event payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventKind {
    StateTransition(StateTransition),
    StackSample {
        #[serde(default)]
        task: Option<TaskId>,
    },
    /// Any kind this decoder does not interpret
    #[serde(other)]
    Other,
}

/// A decoded trace event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub ts: Timestamp,
    #[serde(flatten)]
    pub kind: EventKind,
    /// Stack of the event itself (where it was emitted)
    #[serde(default)]
    pub stack: Stack,
}

impl Event {
    /// Build a task state transition event
    pub fn transition(
        ts: Timestamp,
        task: TaskId,
        from: TaskState,
        to: TaskState,
        transition_stack: Stack,
    ) -> Self {
        Self {
            ts,
            kind: EventKind::StateTransition(StateTransition {
                resource: Resource::Task(task),
                from,
                to,
                transition_stack,
            }),
            stack: Stack::empty(),
        }
    }

    pub fn with_stack(mut self, stack: Stack) -> Self {
        self.stack = stack;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_state_transition() {
        let line = r#"{"ts":42,"kind":"state_transition","resource":{"task":7},"from":"runnable","to":"running","transition_stack":[{"func":"runtime.park"},{"func":"main.worker"}]}"#;
        let event: Event = serde_json::from_str(line).unwrap();

        assert_eq!(event.ts, 42);
        match event.kind {
            EventKind::StateTransition(st) => {
                assert_eq!(st.resource, Resource::Task(7));
                assert_eq!(st.from, TaskState::Runnable);
                assert_eq!(st.to, TaskState::Running);
                assert_eq!(st.transition_stack.outermost_func(), "main.worker");
            }
            other => panic!("unexpected kind: {:?}", other),
        }
        assert!(event.stack.is_empty());
    }

    #[test]
    fn test_unknown_kind_is_other() {
        let event: Event = serde_json::from_str(r#"{"ts":1,"kind":"gc_begin"}"#).unwrap();
        assert_eq!(event.kind, EventKind::Other);
    }

    #[test]
    fn test_notexist_state_name() {
        let state: TaskState = serde_json::from_str(r#""notexist""#).unwrap();
        assert_eq!(state, TaskState::NotExist);
        assert_eq!(state.to_string(), "notexist");
    }
}
