/// Errors that can occur while reading or writing frames.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The payload exceeds the configured maximum size.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The server's end of the pipe closed: EOF before a full frame header,
    /// or a write that could not be delivered.
    ///
    /// This is what a dead or crashed server looks like from the client side.
    #[error("server error: connection closed")]
    ConnectionClosed,

    /// The stream ended in the middle of a frame payload.
    #[error("truncated frame on channel '{channel}' ({received} of {expected} bytes)")]
    Truncated {
        channel: char,
        expected: usize,
        received: usize,
    },

    /// A result frame did not carry a 4-byte return code.
    #[error("result payload must be 4 bytes, got {len}")]
    InvalidResult { len: usize },
}

pub type Result<T> = std::result::Result<T, FrameError>;
