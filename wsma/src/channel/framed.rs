//! Delimiter-framed message channel over an async byte stream.

use std::io;

use log::{debug, trace, warn};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::buffer::{EOM, FrameBuffer};
use crate::error::{ProtocolError, Result, TransportError};

/// Read size for each chunk pulled off the channel.
pub const CHUNK_SIZE: usize = 16384;

/// Marker the agent includes in its greeting.
pub const HELLO_MARKER: &str = "wsma-hello";

/// Result of a read operation.
#[derive(Debug)]
pub struct ReadResult {
    /// The bytes before the delimiter (or everything read before EOF).
    pub data: Vec<u8>,

    /// Whether the delimiter was seen. `false` means the stream ended first.
    pub delimited: bool,
}

impl ReadResult {
    /// Get the data as a string (lossy UTF-8).
    pub fn as_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.data)
    }
}

/// One request/response message channel.
///
/// The stream is usually the SSH subsystem channel, but anything that reads
/// and writes bytes works, which keeps the framing testable without a device.
pub struct FramedChannel<S> {
    stream: S,
    buffer: FrameBuffer,
}

impl<S> FramedChannel<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Wrap a byte stream.
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            buffer: FrameBuffer::new(),
        }
    }

    /// Write one message followed by the delimiter.
    pub async fn send(&mut self, message: &str) -> Result<()> {
        let mut frame = Vec::with_capacity(message.len() + EOM.len());
        frame.extend_from_slice(message.as_bytes());
        frame.extend_from_slice(EOM);

        trace!("framed send: {} bytes", frame.len());
        self.stream.write_all(&frame).await.map_err(write_error)?;
        self.stream.flush().await.map_err(write_error)?;
        Ok(())
    }

    /// Read until the delimiter shows up or the stream ends.
    ///
    /// There is no deadline here; a silent peer blocks this call.
    pub async fn recv(&mut self) -> Result<ReadResult> {
        let mut chunk = vec![0u8; CHUNK_SIZE];
        loop {
            if let Some(frame) = self.buffer.take_frame() {
                return Ok(ReadResult {
                    data: frame.to_vec(),
                    delimited: true,
                });
            }

            let n = self
                .stream
                .read(&mut chunk)
                .await
                .map_err(TransportError::Io)?;
            if n == 0 {
                let data = self.buffer.take().to_vec();
                warn!(
                    "channel closed before end-of-message, returning {} bytes",
                    data.len()
                );
                return Ok(ReadResult {
                    data,
                    delimited: false,
                });
            }

            trace!("framed recv chunk: {} bytes, buffered: {}", n, self.buffer.len());
            self.buffer.extend(&chunk[..n]);
        }
    }

    /// Wait for the agent's greeting.
    pub async fn read_hello(&mut self) -> Result<String> {
        let hello = self.recv().await?;
        let text = hello.as_str().into_owned();
        if !text.contains(HELLO_MARKER) {
            return Err(ProtocolError::MissingHello.into());
        }
        debug!("received hello: {}", text);
        Ok(text)
    }

    /// Shut the write half down.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.stream.shutdown().await.map_err(TransportError::Io)?;
        Ok(())
    }

    /// Get a reference to the underlying stream.
    pub fn get_ref(&self) -> &S {
        &self.stream
    }
}

fn write_error(err: io::Error) -> crate::error::Error {
    match err.kind() {
        io::ErrorKind::BrokenPipe | io::ErrorKind::WriteZero | io::ErrorKind::NotConnected => {
            ProtocolError::Closed.into()
        }
        _ => TransportError::Io(err).into(),
    }
}
