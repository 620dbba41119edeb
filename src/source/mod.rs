//! Event sources
//!
//! An event source decodes a byte stream into an ordered sequence of
//! [`Event`]s. The batcher drives it until it reports end-of-stream or an
//! error. Sources are owned by the ingestion thread; other threads can only
//! ask for them to be closed through a [`CloseHandle`].

mod closable;
mod jsonl;

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::types::Event;

pub use closable::{Closable, CloseHandle};
pub use jsonl::JsonlSource;

/// Errors produced while opening or decoding a source
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("malformed event at line {line}: {source}")]
    Malformed {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("source closed")]
    Closed,
}

impl SourceError {
    /// True when the error only reflects a requested close
    pub fn is_closed(&self) -> bool {
        matches!(self, SourceError::Closed)
    }
}

/// A decoder yielding trace events in stream order
pub trait EventSource: Send {
    /// Next event, or `None` at end-of-stream
    fn next_event(&mut self) -> Result<Option<Event>, SourceError>;

    /// Release the underlying stream
    fn close(&mut self) -> Result<(), SourceError>;

    /// Handle that makes subsequent reads fail once closed
    fn close_handle(&self) -> CloseHandle;
}

/// Boxed byte stream accepted by [`open_input`]
pub type Input = Box<dyn Read + Send>;

/// Open a trace file, or stdin for `None` / `-`
pub fn open_input(path: Option<&Path>) -> Result<JsonlSource<Input>, SourceError> {
    let input: Input = match path {
        None => Box::new(io::stdin()),
        Some(p) if p == Path::new("-") => Box::new(io::stdin()),
        Some(p) => {
            let file = File::open(p).map_err(|source| SourceError::Open {
                path: p.to_path_buf(),
                source,
            })?;
            Box::new(file)
        }
    };
    Ok(JsonlSource::new(input))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_open_missing_file() {
        let err = open_input(Some(Path::new("/nonexistent/trace.jsonl"))).err().unwrap();
        assert!(matches!(err, SourceError::Open { .. }));
        assert!(err.to_string().contains("/nonexistent/trace.jsonl"));
    }

    #[test]
    fn test_open_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"ts":5,"kind":"other"}}"#).unwrap();

        let mut src = open_input(Some(file.path())).unwrap();
        assert_eq!(src.next_event().unwrap().unwrap().ts, 5);
        assert!(src.next_event().unwrap().is_none());
    }
}
