use std::fmt;
use std::path::PathBuf;

/// Errors that can occur in session operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The server process could not be started.
    #[error("failed to launch {}: {source}", .program.display())]
    Launch {
        program: PathBuf,
        source: std::io::Error,
    },

    /// Frame-level error (EOF, short read, oversized payload).
    #[error("protocol error: {0}")]
    Frame(#[from] cmdserver_frame::FrameError),

    /// The server sent something the protocol does not allow.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The server lacks a capability the caller needs.
    #[error("server lacks capability '{0}'")]
    Capability(String),

    /// A command finished with a nonzero return code and no handler accepted it.
    #[error(transparent)]
    Command(Box<CommandError>),

    /// Waiting on the server process failed.
    #[error("server process I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The session hit a protocol fault earlier and can no longer be used.
    #[error("session is unusable after a protocol fault")]
    Poisoned,
}

impl ClientError {
    /// Returns true for faults that leave the session unusable.
    pub fn is_protocol(&self) -> bool {
        matches!(self, Self::Frame(_) | Self::Protocol(_) | Self::Poisoned)
    }
}

impl From<CommandError> for ClientError {
    fn from(err: CommandError) -> Self {
        Self::Command(Box::new(err))
    }
}

/// A command that finished with a nonzero return code.
#[derive(Clone, PartialEq, Eq)]
pub struct CommandError {
    /// The argument vector that was sent.
    pub args: Vec<String>,
    /// The return code from the result channel.
    pub code: i32,
    /// Everything captured on the output channel.
    pub output: Vec<u8>,
    /// Everything captured on the error channel.
    pub error: Vec<u8>,
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "command {:?} failed with code {}", self.args, self.code)?;
        let err = String::from_utf8_lossy(&self.error);
        let err = err.trim_end();
        if !err.is_empty() {
            write!(f, ": {err}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandError")
            .field("args", &self.args)
            .field("code", &self.code)
            .field("output", &String::from_utf8_lossy(&self.output))
            .field("error", &String::from_utf8_lossy(&self.error))
            .finish()
    }
}

impl std::error::Error for CommandError {}

pub type Result<T> = std::result::Result<T, ClientError>;
