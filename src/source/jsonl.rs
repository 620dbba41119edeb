//! Line-delimited JSON trace decoder
//!
//! Each non-blank line holds one [`Event`]. Decoding stops at the first line
//! that fails to parse; everything before it has already been handed out.

use std::io::{BufRead, BufReader, Read};

use super::closable::{Closable, CloseHandle};
use super::{EventSource, SourceError};
use crate::types::Event;

/// Event source reading JSON lines from a byte stream
pub struct JsonlSource<R> {
    reader: BufReader<Closable<R>>,
    handle: CloseHandle,
    line: usize,
    buf: String,
}

impl<R: Read> JsonlSource<R> {
    pub fn new(inner: R) -> Self {
        let handle = CloseHandle::new();
        Self {
            reader: BufReader::new(Closable::new(inner, handle.clone())),
            handle,
            line: 0,
            buf: String::new(),
        }
    }

    /// Number of lines consumed so far
    pub fn lines_read(&self) -> usize {
        self.line
    }
}

impl<R: Read + Send> EventSource for JsonlSource<R> {
    fn next_event(&mut self) -> Result<Option<Event>, SourceError> {
        loop {
            self.buf.clear();
            let n = self.reader.read_line(&mut self.buf).map_err(|e| {
                if self.handle.is_closed() {
                    SourceError::Closed
                } else {
                    SourceError::Io(e)
                }
            })?;
            if n == 0 {
                return Ok(None);
            }
            self.line += 1;

            let trimmed = self.buf.trim();
            if trimmed.is_empty() {
                continue;
            }

            return serde_json::from_str(trimmed)
                .map(Some)
                .map_err(|source| SourceError::Malformed {
                    line: self.line,
                    source,
                });
        }
    }

    fn close(&mut self) -> Result<(), SourceError> {
        self.reader.get_mut().release();
        Ok(())
    }

    fn close_handle(&self) -> CloseHandle {
        self.handle.clone()
    }
}
