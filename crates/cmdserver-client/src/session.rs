use std::collections::BTreeSet;
use std::fmt;
use std::process::{ChildStdin, ChildStdout};

use cmdserver_frame::{BlockWriter, FrameReader};

use crate::config::ServerConfig;
use crate::dispatch::{Dispatcher, Handlers};
use crate::error::{ClientError, Result};
use crate::executor::{CommandExecutor, CommandOptions, CommandOutcome};
use crate::handshake::{read_hello, Hello};
use crate::process::ServerProcess;

/// One live connection to a spawned command server.
///
/// Commands run strictly one at a time. Dropping the session closes the
/// server's stdin and waits for it to exit; [`Session::close`] does the same
/// and reports the exit code.
pub struct Session {
    // Declared before `process`: the pipes must close before the child is reaped.
    executor: CommandExecutor<ChildStdout, ChildStdin>,
    hello: Hello,
    process: ServerProcess,
}

impl Session {
    /// Spawn a server and read its hello.
    ///
    /// If the hello is rejected the server is shut down before returning.
    pub fn open(config: ServerConfig) -> Result<Self> {
        let (process, stdin, stdout) = ServerProcess::spawn(&config)?;
        let mut reader = FrameReader::with_config(stdout, config.frame.clone());
        let writer = BlockWriter::new(stdin);

        let hello = read_hello(&mut reader)?;

        Ok(Self {
            executor: CommandExecutor::new(Dispatcher::new(reader, writer)),
            hello,
            process,
        })
    }

    /// Capabilities announced by the server.
    pub fn capabilities(&self) -> &BTreeSet<String> {
        &self.hello.capabilities
    }

    /// Encoding announced by the server.
    pub fn encoding(&self) -> &str {
        &self.hello.encoding
    }

    /// The full hello message.
    pub fn hello(&self) -> &Hello {
        &self.hello
    }

    /// OS process id of the server.
    pub fn pid(&self) -> Option<u32> {
        self.process.id()
    }

    /// Returns false once a protocol fault has made the session unusable.
    pub fn is_usable(&self) -> bool {
        !self.executor.dispatcher().is_faulted()
    }

    /// Fail with a capability error unless the server advertised `name`.
    pub fn require_capability(&self, name: &str) -> Result<()> {
        if self.hello.has_capability(name) {
            Ok(())
        } else {
            Err(ClientError::Capability(name.to_string()))
        }
    }

    /// Run a command and return its output; see [`CommandExecutor::execute`].
    pub fn execute<S: AsRef<str>>(
        &mut self,
        args: &[S],
        options: CommandOptions<'_>,
    ) -> Result<Vec<u8>> {
        self.executor.execute(args, options)
    }

    /// Run a command and return the code with both buffers.
    pub fn outcome<S: AsRef<str>>(
        &mut self,
        args: &[S],
        options: CommandOptions<'_>,
    ) -> Result<CommandOutcome> {
        self.executor.outcome(args, options)
    }

    /// Run a command with caller-supplied channel handlers and return its code.
    pub fn run_command<S: AsRef<str>>(
        &mut self,
        args: &[S],
        handlers: &mut Handlers<'_>,
    ) -> Result<i32> {
        self.executor.dispatcher_mut().run_command(args, handlers)
    }

    /// Close the server's stdin, wait for it to exit, and return its exit code.
    pub fn close(self) -> Result<i32> {
        let Session {
            executor,
            mut process,
            ..
        } = self;
        drop(executor);
        process.wait()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("pid", &self.process.id())
            .field("capabilities", &self.hello.capabilities)
            .field("encoding", &self.hello.encoding)
            .finish_non_exhaustive()
    }
}
