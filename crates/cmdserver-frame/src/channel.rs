//! Built-in channel ids.
//!
//! Channel ids are single ASCII bytes and case is significant: uppercase
//! channels are required (a client that does not understand one must fail),
//! lowercase channels are optional and may be skipped.

/// Command output (stdout of the command).
pub const OUTPUT: u8 = b'o';

/// Command error output (stderr of the command).
pub const ERROR: u8 = b'e';

/// Debug output, only sent when the server runs with debugging enabled.
pub const DEBUG: u8 = b'd';

/// Terminal channel carrying the signed 32-bit return code.
pub const RESULT: u8 = b'r';

/// Request for a block of raw input (e.g. a patch fed to `import -`).
pub const BLOCK_INPUT: u8 = b'I';

/// Request for a single line of input (interactive prompts).
pub const LINE_INPUT: u8 = b'L';

/// Returns a human-readable name for a channel id.
pub fn channel_name(id: u8) -> &'static str {
    match id {
        OUTPUT => "output",
        ERROR => "error",
        DEBUG => "debug",
        RESULT => "result",
        BLOCK_INPUT => "input",
        LINE_INPUT => "line-input",
        id if id.is_ascii_uppercase() => "unknown-required",
        _ => "unknown",
    }
}

/// Returns true if frames on this channel carry a size request instead of a payload.
pub fn is_request(id: u8) -> bool {
    matches!(id, BLOCK_INPUT | LINE_INPUT)
}

/// Returns true if a client must understand this channel or abort the exchange.
pub fn is_required(id: u8) -> bool {
    id.is_ascii_uppercase()
}
