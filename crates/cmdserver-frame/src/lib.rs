//! Frame codec for the command server pipe protocol.
//!
//! The server speaks in channel-tagged frames:
//! - A 1-byte ASCII channel id
//! - A 4-byte big-endian length
//! - For data channels, exactly `length` payload bytes
//!
//! The two input channels (`I`, `L`) carry no payload; their length field is
//! the number of bytes the server is willing to accept in the reply. Replies
//! and command arguments travel the other way as bare length-prefixed blocks.

pub mod channel;
pub mod codec;
pub mod error;
pub mod reader;
pub mod writer;

pub use channel::{
    channel_name, is_request, is_required, BLOCK_INPUT, DEBUG, ERROR, LINE_INPUT, OUTPUT, RESULT,
};
pub use codec::{
    decode_result, encode_block, join_args, split_args, Frame, FrameConfig, BLOCK_HEADER_SIZE,
    DEFAULT_MAX_PAYLOAD, HEADER_SIZE,
};
pub use error::{FrameError, Result};
pub use reader::FrameReader;
pub use writer::BlockWriter;
