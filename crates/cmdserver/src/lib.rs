//! Drive a Mercurial command server over its stdio pipes.
//!
//! cmdserver spawns `hg serve --cmdserver pipe`, reads its hello, and runs
//! commands through the channel protocol, capturing output and answering
//! prompts and input requests.
//!
//! # Crate Structure
//!
//! - [`frame`]: Channel-tagged frame codec
//! - [`client`]: Sessions, handshake and channel dispatch (behind `client` feature)

/// Re-export frame types.
pub mod frame {
    pub use cmdserver_frame::*;
}

/// Re-export client types (requires `client` feature).
#[cfg(feature = "client")]
pub mod client {
    pub use cmdserver_client::*;
}

#[cfg(feature = "client")]
pub use cmdserver_client::{open, ClientError, CommandOptions, Session};
