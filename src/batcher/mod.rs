//! Batcher - folds trace events into capacity-bounded batches
//!
//! The batcher keeps one open batch. Each task state transition is folded
//! into the record of the task it belongs to; once the open batch holds
//! `capacity` transitions, the next event seals it and opens a new one.
//!
//! ```text
//! Event ──► seal if full ──► fold into open batch ──► (sealed batch out)
//! ```

mod encoding;
mod ingest;

use crate::types::{
    Batch, Event, EventKind, Resource, Stack, StringId, StringTable, TaskId, TaskState,
};

pub use encoding::{TimestampEncoder, TimestampEncoding};
pub use ingest::{ingest, run_ingestion};

/// Number of task transitions per batch
pub const DEFAULT_BATCH_CAPACITY: u64 = 100_000;

/// Configuration for the batcher
#[derive(Debug, Clone)]
pub struct BatcherConfig {
    /// Transitions folded into a batch before it is sealed
    pub capacity: u64,
    /// Encoding of task event timestamps
    pub timestamps: TimestampEncoding,
    /// Let stack samples name tasks that have no name yet
    pub resolve_names_from_samples: bool,
}

impl Default for BatcherConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_BATCH_CAPACITY,
            timestamps: TimestampEncoding::Absolute,
            resolve_names_from_samples: false,
        }
    }
}

impl BatcherConfig {
    /// Default config with a custom capacity
    pub fn with_capacity(capacity: u64) -> Self {
        Self {
            capacity: capacity.max(1),
            ..Default::default()
        }
    }
}

/// Streaming fold from events to sealed batches
pub struct Batcher {
    config: BatcherConfig,
    open: Option<Batch>,
    encoder: TimestampEncoder,
    next_id: u64,
}

impl Batcher {
    pub fn new(config: BatcherConfig) -> Self {
        let encoder = TimestampEncoder::new(config.timestamps, 0);
        Self {
            config,
            open: None,
            encoder,
            next_id: 0,
        }
    }

    /// Fold one event. Returns the previous batch if this event sealed it.
    pub fn push(&mut self, event: &Event) -> Option<Batch> {
        let sealed = if self
            .open
            .as_ref()
            .is_some_and(|b| b.events >= self.config.capacity)
        {
            self.open.take()
        } else {
            None
        };

        if self.open.is_none() {
            self.open = Some(Batch::new(self.next_id, event.ts));
            self.encoder = TimestampEncoder::new(self.config.timestamps, event.ts);
            self.next_id += 1;
        }

        if let Some(batch) = self.open.as_mut() {
            fold_event(batch, &mut self.encoder, &self.config, event);
        }
        sealed
    }

    /// Seal whatever is open at end-of-stream
    pub fn finish(&mut self) -> Option<Batch> {
        self.open.take()
    }

    /// Transitions folded into the open batch so far
    pub fn pending_events(&self) -> u64 {
        self.open.as_ref().map_or(0, |b| b.events)
    }
}

fn fold_event(
    batch: &mut Batch,
    encoder: &mut TimestampEncoder,
    config: &BatcherConfig,
    event: &Event,
) {
    batch.end = event.ts;

    match &event.kind {
        EventKind::StateTransition(st) => {
            let Resource::Task(task) = st.resource else {
                return;
            };
            batch.events += 1;

            let state = batch.strings.intern(st.to.as_str());
            let name = if is_unnamed(batch, task) {
                resolve_name(&mut batch.strings, &[&st.transition_stack, &event.stack])
            } else {
                0
            };

            let record = batch.task_mut(task, event.ts);
            record.events.push((encoder.encode(event.ts), state));
            if st.from == TaskState::Running {
                // Out-of-order timestamps never take running time backwards
                let interval = event.ts.saturating_sub(record.prev_time).max(0);
                record.running = record.running.saturating_add(interval);
            }
            if !record.has_name() {
                record.name = name;
            }
            record.prev_time = event.ts;
        }
        EventKind::StackSample { task: Some(task) } if config.resolve_names_from_samples => {
            let name = if is_unnamed(batch, *task) {
                resolve_name(&mut batch.strings, &[&event.stack])
            } else {
                0
            };

            let record = batch.task_mut(*task, event.ts);
            if !record.has_name() {
                record.name = name;
            }
        }
        _ => {}
    }
}

fn is_unnamed(batch: &Batch, task: TaskId) -> bool {
    batch.task(task).map_or(true, |r| !r.has_name())
}

/// First non-empty outermost frame across `stacks`, interned
fn resolve_name(strings: &mut StringTable, stacks: &[&Stack]) -> StringId {
    stacks
        .iter()
        .map(|s| s.outermost_func())
        .find(|f| !f.is_empty())
        .map_or(0, |f| strings.intern(f))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Stack, StateTransition};

    fn transition(ts: i64, task: u64, from: TaskState, to: TaskState) -> Event {
        Event::transition(ts, task, from, to, Stack::empty())
    }

    fn feed(batcher: &mut Batcher, events: &[Event]) -> Vec<Batch> {
        let mut sealed: Vec<Batch> = events.iter().filter_map(|e| batcher.push(e)).collect();
        sealed.extend(batcher.finish());
        sealed
    }

    #[test]
    fn test_running_time_accumulates() {
        let mut batcher = Batcher::new(BatcherConfig::default());
        let batches = feed(
            &mut batcher,
            &[
                transition(10, 1, TaskState::Runnable, TaskState::Running),
                transition(25, 1, TaskState::Running, TaskState::Waiting),
                transition(40, 1, TaskState::Waiting, TaskState::Running),
                transition(45, 1, TaskState::Running, TaskState::Runnable),
            ],
        );

        assert_eq!(batches.len(), 1);
        let batch = &batches[0];
        assert_eq!(batch.events, 4);
        assert_eq!(batch.start, 10);
        assert_eq!(batch.end, 45);

        let record = batch.task(1).unwrap();
        assert_eq!(record.running, 20);
        let states: Vec<&str> = record
            .events
            .iter()
            .map(|(_, s)| batch.strings.get(*s).unwrap())
            .collect();
        assert_eq!(states, vec!["running", "waiting", "running", "runnable"]);
    }

    #[test]
    fn test_name_resolution_first_non_empty_wins() {
        let mut batcher = Batcher::new(BatcherConfig::default());
        let batches = feed(
            &mut batcher,
            &[
                transition(1, 7, TaskState::NotExist, TaskState::Runnable),
                Event::transition(
                    2,
                    7,
                    TaskState::Runnable,
                    TaskState::Running,
                    Stack::from_funcs(["runtime.gopark", "main.worker"]),
                ),
                Event::transition(
                    3,
                    7,
                    TaskState::Running,
                    TaskState::Waiting,
                    Stack::from_funcs(["main.other"]),
                ),
            ],
        );

        let batch = &batches[0];
        let record = batch.task(7).unwrap();
        assert_eq!(batch.strings.get(record.name), Some("main.worker"));
        assert_eq!(batch.task_name(7), Some("main.worker"));
    }

    #[test]
    fn test_name_falls_back_to_event_stack() {
        let mut batcher = Batcher::new(BatcherConfig::default());
        let event = transition(1, 3, TaskState::Runnable, TaskState::Running)
            .with_stack(Stack::from_funcs(["net/http.(*conn).serve"]));
        let batches = feed(&mut batcher, &[event]);

        assert_eq!(batches[0].task_name(3), Some("net/http.(*conn).serve"));
    }

    #[test]
    fn test_non_task_resources_are_skipped() {
        let mut batcher = Batcher::new(BatcherConfig::default());
        let proc_event = Event {
            ts: 5,
            kind: EventKind::StateTransition(StateTransition {
                resource: Resource::Proc(0),
                from: TaskState::Running,
                to: TaskState::Waiting,
                transition_stack: Stack::empty(),
            }),
            stack: Stack::empty(),
        };
        let other = Event {
            ts: 9,
            kind: EventKind::Other,
            stack: Stack::empty(),
        };
        let batches = feed(
            &mut batcher,
            &[transition(1, 1, TaskState::Runnable, TaskState::Running), proc_event, other],
        );

        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].events, 1);
        assert_eq!(batches[0].end, 9);
        assert_eq!(batches[0].tasks.len(), 1);
    }

    #[test]
    fn test_seals_at_capacity() {
        let mut batcher = Batcher::new(BatcherConfig::with_capacity(2));
        let events: Vec<Event> = (0..5)
            .map(|i| transition(i, 1, TaskState::Runnable, TaskState::Running))
            .collect();

        assert!(batcher.push(&events[0]).is_none());
        assert!(batcher.push(&events[1]).is_none());
        let first = batcher.push(&events[2]).unwrap();
        assert_eq!((first.id, first.start, first.end, first.events), (0, 0, 1, 2));
        assert_eq!(batcher.pending_events(), 1);

        assert!(batcher.push(&events[3]).is_none());
        let second = batcher.push(&events[4]).unwrap();
        assert_eq!((second.id, second.start, second.end), (1, 2, 3));

        let last = batcher.finish().unwrap();
        assert_eq!((last.id, last.start, last.end, last.events), (2, 4, 4, 1));
        assert!(batcher.finish().is_none());
    }

    #[test]
    fn test_task_records_are_batch_local() {
        let mut batcher = Batcher::new(BatcherConfig::with_capacity(1));
        let batches = feed(
            &mut batcher,
            &[
                Event::transition(
                    1,
                    4,
                    TaskState::Runnable,
                    TaskState::Running,
                    Stack::from_funcs(["main.worker"]),
                ),
                transition(2, 4, TaskState::Running, TaskState::Waiting),
            ],
        );

        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].task_name(4), Some("main.worker"));
        // Fresh record: no name carried over, and running starts from the first sighting
        assert_eq!(batches[1].task_name(4), None);
        assert_eq!(batches[1].task(4).unwrap().running, 0);
    }

    #[test]
    fn test_stack_samples_name_tasks_when_enabled() {
        let sample = Event {
            ts: 1,
            kind: EventKind::StackSample { task: Some(2) },
            stack: Stack::from_funcs(["main.loop"]),
        };

        let mut off = Batcher::new(BatcherConfig::default());
        let batches = feed(&mut off, &[sample.clone()]);
        assert!(batches[0].tasks.is_empty());

        let mut on = Batcher::new(BatcherConfig {
            resolve_names_from_samples: true,
            ..Default::default()
        });
        let batches = feed(&mut on, &[sample]);
        assert_eq!(batches[0].task_name(2), Some("main.loop"));
        assert_eq!(batches[0].events, 0);
    }

    #[test]
    fn test_delta_timestamps() {
        let mut batcher = Batcher::new(BatcherConfig {
            timestamps: TimestampEncoding::Delta,
            ..Default::default()
        });
        let batches = feed(
            &mut batcher,
            &[
                transition(100, 1, TaskState::Runnable, TaskState::Running),
                transition(130, 2, TaskState::Runnable, TaskState::Running),
                transition(160, 1, TaskState::Running, TaskState::Waiting),
            ],
        );

        let batch = &batches[0];
        assert_eq!(batch.start, 100);
        assert_eq!(batch.end, 160);
        let t1: Vec<i64> = batch.task(1).unwrap().events.iter().map(|(t, _)| *t).collect();
        assert_eq!(t1, vec![0, 30]);
        assert_eq!(batch.task(1).unwrap().running, 60);
    }

    #[test]
    fn test_extreme_timestamps_saturate() {
        let mut batcher = Batcher::new(BatcherConfig {
            timestamps: TimestampEncoding::Delta,
            ..Default::default()
        });
        let batches = feed(
            &mut batcher,
            &[
                transition(i64::MIN, 1, TaskState::Runnable, TaskState::Running),
                transition(i64::MAX, 1, TaskState::Running, TaskState::Waiting),
                transition(i64::MAX, 2, TaskState::Runnable, TaskState::Running),
                transition(i64::MIN, 2, TaskState::Running, TaskState::Waiting),
            ],
        );

        let batch = &batches[0];
        assert_eq!(batch.events, 4);
        assert_eq!(batch.task(1).unwrap().running, i64::MAX);
        // Time going backwards adds nothing
        assert_eq!(batch.task(2).unwrap().running, 0);
    }
}
