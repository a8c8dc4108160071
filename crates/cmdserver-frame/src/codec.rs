use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};

/// Inbound frame header: channel (1) + length (4) = 5 bytes.
pub const HEADER_SIZE: usize = 5;

/// Outbound block header: length (4) = 4 bytes.
pub const BLOCK_HEADER_SIZE: usize = 4;

/// Default maximum inbound payload size: 256 MiB.
pub const DEFAULT_MAX_PAYLOAD: usize = 256 * 1024 * 1024;

/// One frame received from the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A frame whose length prefix is the exact size of the payload that followed.
    Data { channel: u8, payload: Bytes },
    /// An input request: the server will accept a reply of up to `size` bytes.
    Request { channel: u8, size: usize },
}

impl Frame {
    /// Create a data frame.
    pub fn data(channel: u8, payload: impl Into<Bytes>) -> Self {
        Self::Data {
            channel,
            payload: payload.into(),
        }
    }

    /// Create an input request frame.
    pub fn request(channel: u8, size: usize) -> Self {
        Self::Request { channel, size }
    }

    /// The channel this frame belongs to.
    pub fn channel(&self) -> u8 {
        match self {
            Self::Data { channel, .. } | Self::Request { channel, .. } => *channel,
        }
    }

    /// The payload of a data frame, or `None` for a request.
    pub fn payload(&self) -> Option<&Bytes> {
        match self {
            Self::Data { payload, .. } => Some(payload),
            Self::Request { .. } => None,
        }
    }

    /// The total wire size of this frame (header + payload).
    pub fn wire_size(&self) -> usize {
        match self {
            Self::Data { payload, .. } => HEADER_SIZE + payload.len(),
            Self::Request { .. } => HEADER_SIZE,
        }
    }
}

/// Encode an outbound block: a length prefix followed by the payload.
///
/// Wire format:
/// ```text
/// ┌──────────────┬─────────────────┐
/// │ Length       │ Payload         │
/// │ (4B BE)      │ (Length bytes)  │
/// └──────────────┴─────────────────┘
/// ```
pub fn encode_block(payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    let len = u32::try_from(payload.len()).map_err(|_| FrameError::PayloadTooLarge {
        size: payload.len(),
        max: u32::MAX as usize,
    })?;
    dst.reserve(BLOCK_HEADER_SIZE + payload.len());
    dst.put_u32(len);
    dst.put_slice(payload);
    Ok(())
}

/// Split an inbound header into its channel id and length field.
///
/// Wire format:
/// ```text
/// ┌──────────┬──────────────┬──────────────────────────────┐
/// │ Channel  │ Length       │ Payload                      │
/// │ (1B)     │ (4B BE)      │ (Length bytes, none for I/L) │
/// └──────────┴──────────────┴──────────────────────────────┘
/// ```
pub(crate) fn parse_header(header: &[u8; HEADER_SIZE]) -> (u8, usize) {
    let len = u32::from_be_bytes([header[1], header[2], header[3], header[4]]) as usize;
    (header[0], len)
}

pub(crate) fn check_payload_len(len: usize, max_payload: usize) -> Result<()> {
    if len > max_payload {
        return Err(FrameError::PayloadTooLarge {
            size: len,
            max: max_payload,
        });
    }
    Ok(())
}

/// Decode the payload of a result frame into the command's return code.
pub fn decode_result(payload: &[u8]) -> Result<i32> {
    let raw: [u8; 4] = payload
        .try_into()
        .map_err(|_| FrameError::InvalidResult { len: payload.len() })?;
    Ok(i32::from_be_bytes(raw))
}

/// Join an argument vector into a single NUL-separated payload.
pub fn join_args<S: AsRef<str>>(args: &[S]) -> Vec<u8> {
    let mut out = Vec::with_capacity(args.iter().map(|a| a.as_ref().len() + 1).sum());
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            out.push(0);
        }
        out.extend_from_slice(arg.as_ref().as_bytes());
    }
    out
}

/// Split a NUL-separated payload back into its arguments.
///
/// An empty payload yields no arguments, so a vector holding a single empty
/// string does not survive a join/split round trip.
pub fn split_args(payload: &[u8]) -> Vec<&[u8]> {
    if payload.is_empty() {
        return Vec::new();
    }
    payload.split(|b| *b == 0).collect()
}

/// Configuration for the frame codec.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum inbound payload size in bytes. Default: 256 MiB.
    pub max_payload_size: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{BLOCK_INPUT, LINE_INPUT, RESULT};

    #[test]
    fn test_parse_header() {
        assert_eq!(parse_header(&[LINE_INPUT, 0, 0, 0x10, 0]), (LINE_INPUT, 4096));
        assert!(check_payload_len(16, 16).is_ok());
        assert!(matches!(
            check_payload_len(17, 16),
            Err(FrameError::PayloadTooLarge { size: 17, max: 16 })
        ));
    }

    #[test]
    fn test_encode_block() {
        let mut buf = BytesMut::new();
        encode_block(b"log\0-l\x001", &mut buf).unwrap();
        assert_eq!(&buf[..4], &[0, 0, 0, 8]);
        assert_eq!(&buf[4..], b"log\0-l\x001");
    }

    #[test]
    fn test_encode_empty_block() {
        let mut buf = BytesMut::new();
        encode_block(b"", &mut buf).unwrap();
        assert_eq!(buf.as_ref(), &[0, 0, 0, 0]);
    }

    #[test]
    fn test_decode_result_codes() {
        assert_eq!(decode_result(&0i32.to_be_bytes()).unwrap(), 0);
        assert_eq!(decode_result(&1i32.to_be_bytes()).unwrap(), 1);
        assert_eq!(decode_result(&(-255i32).to_be_bytes()).unwrap(), -255);
        assert!(matches!(
            decode_result(b"\0\0\0"),
            Err(FrameError::InvalidResult { len: 3 })
        ));
    }

    #[test]
    fn test_args_join_and_split() {
        let args = ["log", "-r", "tip", "--template", "{node}\n"];
        let payload = join_args(&args);
        assert_eq!(payload, b"log\0-r\0tip\0--template\0{node}\n");

        let split: Vec<&[u8]> = split_args(&payload);
        let expected: Vec<&[u8]> = args.iter().map(|a| a.as_bytes()).collect();
        assert_eq!(split, expected);
    }

    #[test]
    fn test_args_keep_empty_members() {
        let args = ["commit", "-m", "", "a"];
        let payload = join_args(&args);
        assert_eq!(split_args(&payload).len(), 4);
        assert_eq!(split_args(&payload)[2], b"");
    }

    #[test]
    fn test_single_empty_arg_collapses_to_none() {
        let payload = join_args(&[""]);
        assert!(payload.is_empty());
        assert_eq!(payload, join_args::<&str>(&[]));
        assert!(split_args(&payload).is_empty());
    }

    #[test]
    fn test_empty_args() {
        let args: [&str; 0] = [];
        let payload = join_args(&args);
        assert!(payload.is_empty());
        assert!(split_args(&payload).is_empty());
    }

    #[test]
    fn test_frame_accessors() {
        let data = Frame::data(RESULT, Bytes::from_static(b"\0\0\0\0"));
        assert_eq!(data.channel(), RESULT);
        assert_eq!(data.wire_size(), HEADER_SIZE + 4);
        assert!(data.payload().is_some());

        let req = Frame::request(BLOCK_INPUT, 4096);
        assert_eq!(req.channel(), BLOCK_INPUT);
        assert_eq!(req.wire_size(), HEADER_SIZE);
        assert!(req.payload().is_none());
    }
}
