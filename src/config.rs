//! Command-line and environment configuration

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::batcher::{BatcherConfig, TimestampEncoding, DEFAULT_BATCH_CAPACITY};

/// Serve a task lifecycle trace as time-windowed batches over HTTP
#[derive(Debug, Clone, Parser)]
#[command(name = "task-timeline", version, about)]
pub struct Config {
    /// Trace file to read; `-` or omitted reads stdin
    pub input: Option<PathBuf>,

    /// Address the HTTP server listens on
    #[arg(long, env = "TASK_TIMELINE_ADDR", default_value = "127.0.0.1:8080")]
    pub addr: String,

    /// Directory of static UI assets
    #[arg(long, env = "TASK_TIMELINE_ASSETS", default_value = "assets")]
    pub assets: PathBuf,

    /// Task transitions per batch
    #[arg(long, default_value_t = DEFAULT_BATCH_CAPACITY, value_parser = clap::value_parser!(u64).range(1..))]
    pub batch_size: u64,

    /// Encoding of per-task event timestamps
    #[arg(long, value_enum, default_value_t = TimestampEncoding::Absolute)]
    pub timestamps: TimestampEncoding,

    /// Let stack samples name tasks with no name yet
    #[arg(long)]
    pub sample_names: bool,

    /// Seconds to wait for open requests when shutting down
    #[arg(long, default_value_t = 3)]
    pub shutdown_timeout: u64,
}

impl Config {
    pub fn batcher(&self) -> BatcherConfig {
        BatcherConfig {
            capacity: self.batch_size,
            timestamps: self.timestamps,
            resolve_names_from_samples: self.sample_names,
        }
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout)
    }
}
