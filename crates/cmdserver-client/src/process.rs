use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, ExitStatus, Stdio};

use crate::config::ServerConfig;
use crate::error::{ClientError, Result};

/// Owns the spawned server process.
///
/// The child is reaped exactly once: by [`ServerProcess::wait`], or on drop.
/// Its stdin must be closed before either, or the server never exits.
#[derive(Debug)]
pub struct ServerProcess {
    child: Option<Child>,
    program: PathBuf,
    exit_code: Option<i32>,
}

impl ServerProcess {
    /// Spawn the server with piped stdin/stdout. stderr is inherited.
    pub fn spawn(config: &ServerConfig) -> Result<(Self, ChildStdin, ChildStdout)> {
        let launch_error = |source| ClientError::Launch {
            program: config.program.clone(),
            source,
        };

        let mut child = Command::new(&config.program)
            .args(config.command_args())
            .envs(config.command_env())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(launch_error)?;

        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        let process = Self {
            child: Some(child),
            program: config.program.clone(),
            exit_code: None,
        };
        tracing::debug!(
            program = %process.program.display(),
            pid = process.id(),
            "command server spawned"
        );

        process.with_pipes(stdin, stdout).map_err(launch_error)
    }

    /// Pair the process with both of its pipes. If either is missing, the
    /// other is closed before the child is reaped.
    fn with_pipes(
        self,
        stdin: Option<ChildStdin>,
        stdout: Option<ChildStdout>,
    ) -> std::io::Result<(Self, ChildStdin, ChildStdout)> {
        match (stdin, stdout) {
            (Some(stdin), Some(stdout)) => Ok((self, stdin, stdout)),
            (stdin, stdout) => {
                drop(stdin);
                drop(stdout);
                drop(self);
                Err(std::io::Error::other("child stdio pipes were not captured"))
            }
        }
    }

    /// OS process id, while the child is still owned.
    pub fn id(&self) -> Option<u32> {
        self.child.as_ref().map(Child::id)
    }

    /// Returns true until the process has been waited on.
    pub fn is_alive(&self) -> bool {
        self.child.is_some()
    }

    /// Exit code recorded by [`ServerProcess::wait`].
    pub fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }

    /// Block until the process exits and record its exit code.
    pub fn wait(&mut self) -> Result<i32> {
        let Some(mut child) = self.child.take() else {
            return self.exit_code.ok_or_else(|| {
                ClientError::Io(std::io::Error::other("server process already reaped"))
            });
        };
        let status = child.wait()?;
        let code = exit_code(status);
        self.exit_code = Some(code);
        tracing::debug!(program = %self.program.display(), code, "command server exited");
        Ok(code)
    }
}

impl Drop for ServerProcess {
    fn drop(&mut self) {
        if self.child.is_none() {
            return;
        }
        if let Err(err) = self.wait() {
            tracing::warn!(
                program = %self.program.display(),
                error = %err,
                "failed to reap command server"
            );
        }
    }
}

#[cfg(unix)]
fn exit_code(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;

    match (status.code(), status.signal()) {
        (Some(code), _) => code,
        (None, Some(signal)) => 128 + signal,
        (None, None) => -1,
    }
}

#[cfg(not(unix))]
fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}
