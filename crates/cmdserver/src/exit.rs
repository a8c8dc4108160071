use std::fmt;
use std::io;

use cmdserver_client::ClientError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const PROTOCOL_ERROR: i32 = 3;
pub const CAPABILITY_ERROR: i32 = 4;
pub const PERMISSION_DENIED: i32 = 50;
pub const USAGE: i32 = 64;
pub const INTERNAL: i32 = 125;
pub const LAUNCH_FAILED: i32 = 127;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::NotFound => USAGE,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

/// Process exit code for a command's own return code.
pub fn command_exit_code(code: i32) -> i32 {
    if (1..=255).contains(&code) {
        code
    } else {
        FAILURE
    }
}

pub fn client_error(context: &str, err: ClientError) -> CliError {
    let code = match &err {
        ClientError::Launch { .. } => LAUNCH_FAILED,
        ClientError::Frame(_) | ClientError::Protocol(_) | ClientError::Poisoned => PROTOCOL_ERROR,
        ClientError::Capability(_) => CAPABILITY_ERROR,
        ClientError::Command(err) => command_exit_code(err.code),
        ClientError::Io(_) => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_codes_pass_through_when_representable() {
        assert_eq!(command_exit_code(1), 1);
        assert_eq!(command_exit_code(255), 255);
        assert_eq!(command_exit_code(-1), FAILURE);
        assert_eq!(command_exit_code(256), FAILURE);
    }

    #[test]
    fn client_errors_map_to_exit_codes() {
        let launch = ClientError::Launch {
            program: "hg".into(),
            source: io::Error::from(io::ErrorKind::NotFound),
        };
        assert_eq!(client_error("open", launch).code, LAUNCH_FAILED);
        assert_eq!(
            client_error("run", ClientError::Protocol("bad".to_string())).code,
            PROTOCOL_ERROR
        );
        assert_eq!(
            client_error("run", ClientError::Capability("runcommand".to_string())).code,
            CAPABILITY_ERROR
        );
    }
}
