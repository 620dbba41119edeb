//! Top-level error type for the server binary

use std::io;

use thiserror::Error;

use crate::source::SourceError;
use crate::store::ReadError;

/// Errors that end the process with a non-zero status
#[derive(Debug, Error)]
pub enum AppError {
    /// The trace input could not be opened
    #[error(transparent)]
    Source(#[from] SourceError),

    /// Ingestion stopped on something other than a clean end
    #[error("batch reader failed: {0}")]
    Ingest(#[from] ReadError),

    /// The ingestion thread could not be spawned
    #[error("failed to start batch reader: {0}")]
    Spawn(#[source] io::Error),

    /// Binding or serving HTTP failed
    #[error("http server failed: {0}")]
    Server(#[from] io::Error),
}

/// Result type for application-level operations
pub type AppResult<T> = Result<T, AppError>;
