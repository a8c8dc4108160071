use std::io::{self, ErrorKind, Write};

use bytes::BytesMut;

use crate::codec::encode_block;
use crate::error::{FrameError, Result};

/// Writes to the server's input stream.
///
/// Two shapes go out on the wire: unframed control lines such as
/// `runcommand\n`, and length-prefixed blocks carrying arguments or replies.
pub struct BlockWriter<W> {
    inner: W,
    scratch: BytesMut,
}

impl<W: Write> BlockWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            scratch: BytesMut::new(),
        }
    }

    /// Write an unframed control line. The line is not flushed; the block
    /// that follows it flushes both.
    pub fn write_line(&mut self, line: &[u8]) -> Result<()> {
        self.inner.write_all(line).map_err(write_error)
    }

    /// Send a length-prefixed block and flush.
    pub fn write_block(&mut self, payload: &[u8]) -> Result<()> {
        self.scratch.clear();
        encode_block(payload, &mut self.scratch)?;
        self.inner.write_all(&self.scratch).map_err(write_error)?;
        self.flush()
    }

    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush().map_err(write_error)
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

/// A pipe the server stopped reading from means the server is gone.
fn write_error(err: io::Error) -> FrameError {
    match err.kind() {
        ErrorKind::BrokenPipe | ErrorKind::WriteZero => FrameError::ConnectionClosed,
        _ => FrameError::Io(err),
    }
}
