//! Byte streams that can be closed from another thread
//!
//! The ingestion thread owns the reader exclusively, so a stop request can't
//! close it directly. Instead it flips a shared [`CloseHandle`]; the next
//! read on the ingestion side observes the flag and fails, which ends the
//! decode loop the same way a truncated input would. A read already parked
//! in the kernel only notices once it returns, which is why a stop also
//! settles the batch store itself.

use std::io::{self, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// How long to back off when the inner reader reports `WouldBlock`
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Shared flag marking a source as closed
#[derive(Debug, Clone, Default)]
pub struct CloseHandle {
    closed: Arc<AtomicBool>,
}

impl CloseHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the source closed. Idempotent.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// A reader that fails every read once its handle is closed
pub struct Closable<R> {
    inner: Option<R>,
    handle: CloseHandle,
}

impl<R: Read> Closable<R> {
    pub fn new(inner: R, handle: CloseHandle) -> Self {
        Self {
            inner: Some(inner),
            handle,
        }
    }

    /// Drop the underlying reader, releasing its file descriptor
    pub fn release(&mut self) {
        self.handle.close();
        self.inner = None;
    }
}

fn closed_error() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, "source closed")
}

impl<R: Read> Read for Closable<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            if self.handle.is_closed() {
                return Err(closed_error());
            }
            let inner = self.inner.as_mut().ok_or_else(closed_error)?;
            match inner.read(buf) {
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => thread::sleep(POLL_INTERVAL),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                other => return other,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_reads_until_closed() {
        let handle = CloseHandle::new();
        let mut reader = Closable::new(Cursor::new(b"abcdef".to_vec()), handle.clone());

        let mut buf = [0u8; 3];
        assert_eq!(reader.read(&mut buf).unwrap(), 3);
        assert_eq!(&buf, b"abc");

        handle.close();
        let err = reader.read(&mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }

    #[test]
    fn test_release_closes_handle() {
        let handle = CloseHandle::new();
        let mut reader = Closable::new(Cursor::new(Vec::new()), handle.clone());
        reader.release();
        assert!(handle.is_closed());
        assert!(reader.read(&mut [0u8; 1]).is_err());
    }

    struct StallThenData {
        stalls: usize,
    }

    impl Read for StallThenData {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.stalls > 0 {
                self.stalls -= 1;
                return Err(io::ErrorKind::WouldBlock.into());
            }
            buf[0] = b'x';
            Ok(1)
        }
    }

    #[test]
    fn test_would_block_is_retried() {
        let mut reader = Closable::new(StallThenData { stalls: 2 }, CloseHandle::new());
        let mut buf = [0u8; 1];
        assert_eq!(reader.read(&mut buf).unwrap(), 1);
        assert_eq!(buf[0], b'x');
    }
}
