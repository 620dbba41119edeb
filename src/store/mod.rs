//! Batch Store - published batches and the terminal outcome
//!
//! The store is append-only. The ingestion thread publishes sealed batches
//! and, exactly once, a terminal outcome. Readers look up the first batch
//! starting after a given time and wait when it hasn't been published yet.
//!
//! # Wakeups
//!
//! Every publication bumps a version counter held in a `watch` channel.
//! A reader subscribes before its first scan, so any publication that lands
//! between "nothing found" and "start waiting" is still seen as a version
//! change and the reader rescans immediately.

use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::watch;
use tracing::debug;

use crate::source::SourceError;
use crate::types::{Batch, Timestamp};

/// Why no further batch can be returned
#[derive(Debug, Clone, Error)]
pub enum ReadError {
    /// No more batches will ever be published
    #[error("end of stream")]
    EndOfStream,

    /// Decoding stopped at a corrupt or closed input
    #[error(transparent)]
    Decode(Arc<SourceError>),

    /// The ingestion thread died without recording an outcome
    #[error("ingestion aborted")]
    Aborted,
}

impl ReadError {
    /// True for end-of-stream and for a close requested by a stop
    pub fn is_benign(&self) -> bool {
        match self {
            ReadError::EndOfStream => true,
            ReadError::Decode(e) => e.is_closed(),
            ReadError::Aborted => false,
        }
    }
}

/// Result of a batch lookup
pub type ReadResult = Result<Arc<Batch>, ReadError>;

#[derive(Default)]
struct StoreState {
    batches: Vec<Arc<Batch>>,
    outcome: Option<ReadError>,
}

impl StoreState {
    /// Scan from `*checked` for a batch starting after `after`.
    ///
    /// `checked` is advanced past every batch ruled out, so a reader never
    /// rescans the same prefix. Returns `None` when the caller should wait.
    fn scan(&self, after: Timestamp, checked: &mut usize) -> Option<ReadResult> {
        while let Some(batch) = self.batches.get(*checked) {
            if batch.start > after {
                return Some(Ok(Arc::clone(batch)));
            }
            *checked += 1;
        }
        self.outcome.clone().map(Err)
    }
}

/// Append-only sequence of sealed batches plus one terminal outcome
pub struct BatchStore {
    state: Mutex<StoreState>,
    version: watch::Sender<u64>,
}

impl BatchStore {
    pub fn new() -> Self {
        let (version, _) = watch::channel(0);
        Self {
            state: Mutex::new(StoreState::default()),
            version,
        }
    }

    /// Append a sealed batch and wake all waiting readers.
    ///
    /// Once the outcome is recorded the sequence is frozen and the batch is
    /// dropped.
    pub fn publish(&self, batch: Batch) -> Option<Arc<Batch>> {
        let batch = Arc::new(batch);
        {
            let mut state = self.state.lock();
            if state.outcome.is_some() {
                debug!(id = batch.id, "dropped batch published after terminal outcome");
                return None;
            }
            state.batches.push(Arc::clone(&batch));
        }
        debug!(
            id = batch.id,
            start = batch.start,
            end = batch.end,
            events = batch.events,
            tasks = batch.tasks.len(),
            "published batch"
        );
        self.version.send_modify(|v| *v += 1);
        Some(batch)
    }

    /// Record the terminal outcome. Only the first call has any effect.
    pub fn finish(&self, outcome: ReadError) -> bool {
        let recorded = {
            let mut state = self.state.lock();
            if state.outcome.is_some() {
                false
            } else {
                state.outcome = Some(outcome);
                true
            }
        };
        if recorded {
            self.version.send_modify(|v| *v += 1);
        }
        recorded
    }

    /// First batch whose start is strictly after `after`, waiting for it if
    /// it hasn't been published and the store isn't terminal yet.
    pub async fn read_batch_after(&self, after: Timestamp) -> ReadResult {
        let mut updates = self.version.subscribe();
        let mut checked = 0;

        loop {
            let found = self.state.lock().scan(after, &mut checked);
            if let Some(result) = found {
                return result;
            }
            if updates.changed().await.is_err() {
                // Sender lives as long as the store
                return Err(ReadError::EndOfStream);
            }
        }
    }

    /// Non-waiting lookup; `None` means the caller would have to wait
    pub fn try_read_batch_after(&self, after: Timestamp) -> Option<ReadResult> {
        self.state.lock().scan(after, &mut 0)
    }

    /// Snapshot of all batches published so far
    pub fn batches(&self) -> Vec<Arc<Batch>> {
        self.state.lock().batches.clone()
    }

    pub fn len(&self) -> usize {
        self.state.lock().batches.len()
    }

    pub fn outcome(&self) -> Option<ReadError> {
        self.state.lock().outcome.clone()
    }

    pub fn is_terminal(&self) -> bool {
        self.state.lock().outcome.is_some()
    }

    /// Number of publications (batches and outcome) so far
    pub fn version(&self) -> u64 {
        *self.version.borrow()
    }
}

impl Default for BatchStore {
    fn default() -> Self {
        Self::new()
    }
}
