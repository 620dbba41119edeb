//! Ingestion loop: drives an event source into the batch store

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::{Batcher, BatcherConfig};
use crate::source::EventSource;
use crate::store::{BatchStore, ReadError};

/// Drive `source` until it ends or fails, publishing each sealed batch.
///
/// Returns the outcome that ended the loop. A batch still open when decoding
/// fails is dropped; only sealed batches ever reach the store.
pub fn ingest<S: EventSource + ?Sized>(
    source: &mut S,
    store: &BatchStore,
    config: BatcherConfig,
) -> ReadError {
    let mut batcher = Batcher::new(config);

    loop {
        match source.next_event() {
            Ok(Some(event)) => {
                if let Some(batch) = batcher.push(&event) {
                    store.publish(batch);
                }
            }
            Ok(None) => {
                if let Some(batch) = batcher.finish() {
                    store.publish(batch);
                }
                return ReadError::EndOfStream;
            }
            Err(e) => {
                let discarded = batcher.pending_events();
                if e.is_closed() {
                    info!(discarded, "event source closed");
                } else {
                    warn!(error = %e, discarded, "failed to decode event");
                }
                return ReadError::Decode(Arc::new(e));
            }
        }
    }
}

/// Run ingestion to completion, close the source and record the outcome.
///
/// A close failure only replaces a clean end-of-stream; an earlier decode
/// error always wins.
pub fn run_ingestion<S: EventSource + ?Sized>(
    source: &mut S,
    store: &BatchStore,
    config: BatcherConfig,
) -> ReadError {
    let mut outcome = ingest(source, store, config);

    if let Err(e) = source.close() {
        if matches!(outcome, ReadError::EndOfStream) {
            outcome = ReadError::Decode(Arc::new(e));
        } else {
            debug!(error = %e, "ignoring close error after decode failure");
        }
    }

    store.finish(outcome.clone());
    info!(batches = store.len(), outcome = %outcome, "ingestion finished");
    outcome
}
