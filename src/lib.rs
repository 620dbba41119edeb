//! Task Timeline
//!
//! Streams a trace of task lifecycle events into capacity-bounded batches
//! and serves them over HTTP while the trace is still being read.
//!
//! # Modules
//!
//! - `types`: Trace events, batches, per-task records, string tables
//! - `source`: Event sources (JSON lines decoder, closable inputs)
//! - `batcher`: Folds events into batches and runs the ingestion loop
//! - `store`: Published batches with a waiting lookup by time
//! - `lifecycle`: Starts, stops and supervises the ingestion thread
//! - `api`: HTTP router and handlers
//! - `server`: Wires everything together for the binary
//! - `config`: Command-line configuration
//!
//! # Example
//!
//! ```no_run
//! use task_timeline::batcher::BatcherConfig;
//! use task_timeline::lifecycle::BatchReader;
//! use task_timeline::source::open_input;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let source = open_input(Some("trace.jsonl".as_ref()))?;
//! let reader = BatchReader::start(source, BatcherConfig::default())?;
//! let first = reader.store().read_batch_after(i64::MIN).await?;
//! println!("batch {} covers {}..={}", first.id, first.start, first.end);
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod batcher;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod server;
pub mod source;
pub mod store;
pub mod types;

// Re-export commonly used items at crate root
pub use batcher::{Batcher, BatcherConfig};
pub use error::{AppError, AppResult};
pub use lifecycle::{BatchReader, LifecycleState};
pub use source::{EventSource, JsonlSource, SourceError};
pub use store::{BatchStore, ReadError};
pub use types::{Batch, Event, TaskRecord, TaskState};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
