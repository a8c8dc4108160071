//! Client side of the Mercurial command server protocol.
//!
//! Spawn a server, read its hello, and run commands over its pipes:
//!
//! ```no_run
//! use cmdserver_client::{open, CommandOptions};
//!
//! let mut session = open(Some("/srv/repo"), None, &[])?;
//! let out = session.execute(&["log", "-l", "1"], CommandOptions::new())?;
//! print!("{}", String::from_utf8_lossy(&out));
//! session.close()?;
//! # Ok::<(), cmdserver_client::ClientError>(())
//! ```

pub mod config;
pub mod dispatch;
pub mod error;
pub mod executor;
pub mod handshake;
pub mod process;
pub mod session;

use std::path::Path;

pub use config::{ServerConfig, ENCODING_ENV};
pub use dispatch::{ChannelRole, Dispatcher, Handler, Handlers, RUNCOMMAND_LINE};
pub use error::{ClientError, CommandError, Result};
pub use executor::{
    BulkInputProducer, CommandExecutor, CommandOptions, CommandOutcome, ErrorHandler,
    PromptProducer,
};
pub use handshake::{parse_hello, read_hello, Hello, RUNCOMMAND};
pub use process::ServerProcess;
pub use session::Session;

/// Start a command server for `path` (or the repository around the current
/// directory), forcing `encoding` when given and applying `--config` overrides.
pub fn open(
    path: Option<impl AsRef<Path>>,
    encoding: Option<&str>,
    config_overrides: &[(&str, &str)],
) -> Result<Session> {
    Session::open(ServerConfig {
        repository: path.map(|p| p.as_ref().to_path_buf()),
        encoding: encoding.map(str::to_string),
        config_overrides: config_overrides
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect(),
        ..ServerConfig::default()
    })
}
