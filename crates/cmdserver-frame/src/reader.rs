use std::io::{ErrorKind, Read};

use bytes::BytesMut;

use crate::channel::is_request;
use crate::codec::{check_payload_len, parse_header, Frame, FrameConfig, HEADER_SIZE};
use crate::error::{FrameError, Result};

/// Blocking reader of server frames.
///
/// Reads one header and then exactly its payload, so nothing past the
/// current frame is taken from the stream.
pub struct FrameReader<R> {
    inner: R,
    config: FrameConfig,
}

impl<R: Read> FrameReader<R> {
    pub fn new(inner: R) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    pub fn with_config(inner: R, config: FrameConfig) -> Self {
        Self { inner, config }
    }

    /// Read the next frame.
    ///
    /// EOF before a full header is [`FrameError::ConnectionClosed`]; EOF inside
    /// a payload is [`FrameError::Truncated`].
    pub fn read_frame(&mut self) -> Result<Frame> {
        let mut header = [0u8; HEADER_SIZE];
        if fill(&mut self.inner, &mut header)? < HEADER_SIZE {
            return Err(FrameError::ConnectionClosed);
        }
        let (channel, len) = parse_header(&header);

        let frame = if is_request(channel) {
            Frame::Request { channel, size: len }
        } else {
            check_payload_len(len, self.config.max_payload_size)?;
            let mut payload = BytesMut::zeroed(len);
            let received = fill(&mut self.inner, &mut payload)?;
            if received < len {
                return Err(FrameError::Truncated {
                    channel: char::from(channel),
                    expected: len,
                    received,
                });
            }
            Frame::Data {
                channel,
                payload: payload.freeze(),
            }
        };

        tracing::trace!(
            channel = %char::from(channel),
            wire_size = frame.wire_size(),
            "frame received"
        );
        Ok(frame)
    }

    pub fn config(&self) -> &FrameConfig {
        &self.config
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

/// Read until `buf` is full or the stream ends. Returns the bytes read.
fn fill(inner: &mut impl Read, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match inner.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => {}
            Err(err) => return Err(err.into()),
        }
    }
    Ok(filled)
}
