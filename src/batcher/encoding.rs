//! Timestamp encoding for per-task event lists

use crate::types::Timestamp;

/// How task event timestamps are written into a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum TimestampEncoding {
    /// Trace time as decoded
    #[default]
    Absolute,
    /// Distance from the previous encoded timestamp in the same batch
    Delta,
}

/// Per-batch encoder state
#[derive(Debug, Clone)]
pub struct TimestampEncoder {
    encoding: TimestampEncoding,
    prev: Timestamp,
}

impl TimestampEncoder {
    /// New encoder for a batch starting at `base`
    pub fn new(encoding: TimestampEncoding, base: Timestamp) -> Self {
        Self {
            encoding,
            prev: base,
        }
    }

    pub fn encode(&mut self, ts: Timestamp) -> Timestamp {
        match self.encoding {
            TimestampEncoding::Absolute => ts,
            TimestampEncoding::Delta => {
                let delta = ts.saturating_sub(self.prev);
                self.prev = ts;
                delta
            }
        }
    }
}
