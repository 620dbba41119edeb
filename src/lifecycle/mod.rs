//! Lifecycle Controller
//!
//! Starts the ingestion thread, lets a stop request close its source, and
//! joins ingestion with the HTTP server at shutdown.
//!
//! ```text
//! Starting ──► Running ──► Stopping ──► Stopped
//!                 └──────────────────────▲
//!                     (end of stream)
//! ```
//!
//! Stopping never interrupts a decode in progress. It closes the source, so
//! the next read fails and the ingestion loop ends on its own with every
//! fully decoded batch already published. The store is made terminal at the
//! same time, so readers don't depend on that read ever returning.

use std::future::Future;
use std::io;
use std::sync::Arc;
use std::thread;

use tokio::sync::watch;
use tracing::{debug, error, info};

use crate::batcher::{run_ingestion, BatcherConfig};
use crate::error::{AppError, AppResult};
use crate::source::{CloseHandle, EventSource, SourceError};
use crate::store::{BatchStore, ReadError};

/// Phase of the batch reader
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Starting,
    Running,
    Stopping,
    Stopped,
}

/// Handle to a running ingestion unit and the store it feeds
#[derive(Clone)]
pub struct BatchReader {
    store: Arc<BatchStore>,
    closer: CloseHandle,
    state: Arc<watch::Sender<LifecycleState>>,
}

impl BatchReader {
    /// Launch ingestion of `source` on a dedicated thread
    pub fn start<S>(mut source: S, config: BatcherConfig) -> io::Result<Self>
    where
        S: EventSource + 'static,
    {
        let store = Arc::new(BatchStore::new());
        let closer = source.close_handle();
        let (state, _) = watch::channel(LifecycleState::Starting);
        let state = Arc::new(state);

        let reader = Self {
            store: Arc::clone(&store),
            closer,
            state: Arc::clone(&state),
        };

        thread::Builder::new()
            .name("ingest".to_string())
            .spawn(move || {
                let _exit = StoppedOnExit {
                    store: Arc::clone(&store),
                    state: Arc::clone(&state),
                };
                state.send_if_modified(|s| {
                    let starting = *s == LifecycleState::Starting;
                    if starting {
                        *s = LifecycleState::Running;
                    }
                    starting
                });
                info!(capacity = config.capacity, "batch reader started");

                run_ingestion(&mut source, &store, config);
            })?;

        Ok(reader)
    }

    pub fn store(&self) -> Arc<BatchStore> {
        Arc::clone(&self.store)
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.borrow()
    }

    /// Ask ingestion to wind down by closing its source. Does not wait.
    ///
    /// The store turns terminal right away, so readers are released even
    /// when the ingestion thread is parked in a blocking read. An outcome
    /// recorded earlier is kept.
    pub fn stop(&self) {
        self.closer.close();
        if self.store.finish(ReadError::Decode(Arc::new(SourceError::Closed))) {
            debug!("released readers waiting on the batch reader");
        }

        let stopping = self.state.send_if_modified(|s| {
            let live = matches!(*s, LifecycleState::Starting | LifecycleState::Running);
            if live {
                *s = LifecycleState::Stopping;
            }
            live
        });
        if stopping {
            info!("stopping batch reader");
        }
    }

    /// Wait for ingestion to return, or for a stop to settle the store.
    ///
    /// End-of-stream and a stop-induced close are clean; any other decode
    /// failure is returned.
    pub async fn wait(&self) -> Result<(), ReadError> {
        let mut rx = self.state.subscribe();
        let store = &self.store;
        // The sender is owned by `self`, so this can't observe a closed channel
        let _ = rx
            .wait_for(|s| match s {
                LifecycleState::Stopped => true,
                LifecycleState::Stopping => store.is_terminal(),
                _ => false,
            })
            .await;

        match self.store.outcome() {
            Some(outcome) if !outcome.is_benign() => Err(outcome),
            _ => Ok(()),
        }
    }
}

/// Moves the reader to `Stopped` when the ingestion thread exits.
///
/// Runs during unwinding too, so a panic still settles the store.
struct StoppedOnExit {
    store: Arc<BatchStore>,
    state: Arc<watch::Sender<LifecycleState>>,
}

impl Drop for StoppedOnExit {
    fn drop(&mut self) {
        if thread::panicking() {
            error!("ingestion thread panicked");
            self.store.finish(ReadError::Aborted);
        }
        self.state.send_replace(LifecycleState::Stopped);
        debug!("stopped batch reader");
    }
}

/// One-shot shutdown trigger shared by the signal handler and the server
#[derive(Clone)]
pub struct Shutdown {
    tx: Arc<watch::Sender<bool>>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolve once `trigger` has been called
    pub async fn wait(&self) {
        let mut rx = self.tx.subscribe();
        let _ = rx.wait_for(|triggered| *triggered).await;
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Run the server and ingestion side by side until both finish.
///
/// Returns the first failure to complete; clean exits of either side are
/// not failures.
pub async fn supervise<A, B>(server: A, ingestion: B) -> AppResult<()>
where
    A: Future<Output = AppResult<()>>,
    B: Future<Output = Result<(), ReadError>>,
{
    tokio::pin!(server, ingestion);
    let mut server_done = false;
    let mut ingestion_done = false;
    let mut first: Option<AppError> = None;

    while !(server_done && ingestion_done) {
        tokio::select! {
            result = &mut server, if !server_done => {
                server_done = true;
                if let Err(e) = result {
                    error!(error = %e, "http server failed");
                    first.get_or_insert(e);
                }
            }
            result = &mut ingestion, if !ingestion_done => {
                ingestion_done = true;
                if let Err(e) = result {
                    error!(error = %e, "batch reader failed");
                    first.get_or_insert(AppError::Ingest(e));
                }
            }
        }
    }

    first.map_or(Ok(()), Err)
}
