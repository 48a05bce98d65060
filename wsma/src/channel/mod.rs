//! Channel layer for the SSH subsystem.
//!
//! This module handles message framing: every XML document in either
//! direction is terminated by `]]>]]>`, and the agent greets first.

mod buffer;
mod framed;

pub use buffer::{EOM, FrameBuffer};
pub use framed::{CHUNK_SIZE, FramedChannel, HELLO_MARKER, ReadResult};
