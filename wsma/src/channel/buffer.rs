//! Frame buffer with incremental delimiter search.
//!
//! Messages on the subsystem channel are terminated by `]]>]]>`. Output is
//! accumulated chunk by chunk and only the bytes not yet scanned (plus a
//! delimiter-sized overlap) are searched after each chunk, so large outputs
//! such as a full running-config are not rescanned from the start.

use bytes::{Bytes, BytesMut};
use memchr::memmem;

/// End-of-message delimiter, both directions.
pub const EOM: &[u8] = b"]]>]]>";

/// Buffer for accumulating channel output and splitting off framed messages.
#[derive(Debug)]
pub struct FrameBuffer {
    /// The accumulated output buffer.
    buffer: BytesMut,

    /// How many bytes at the front are known not to start a delimiter.
    scanned: usize,
}

impl FrameBuffer {
    /// Create an empty frame buffer.
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(16384),
            scanned: 0,
        }
    }

    /// Extend the buffer with new data.
    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Split off the first complete message, if the delimiter has arrived.
    ///
    /// Bytes after the delimiter are discarded; the agent never pipelines
    /// responses.
    pub fn take_frame(&mut self) -> Option<Bytes> {
        let start = self.scanned.saturating_sub(EOM.len() - 1);
        match memmem::find(&self.buffer[start..], EOM) {
            Some(offset) => {
                let frame = self.buffer.split_to(start + offset).freeze();
                self.buffer.clear();
                self.scanned = 0;
                Some(frame)
            }
            None => {
                self.scanned = self.buffer.len();
                None
            }
        }
    }

    /// Take everything accumulated so far and reset.
    pub fn take(&mut self) -> Bytes {
        self.scanned = 0;
        self.buffer.split().freeze()
    }

    /// Get a reference to the buffer contents.
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    /// Get the current buffer length.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Clear the buffer.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.scanned = 0;
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}
