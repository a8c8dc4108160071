use std::cell::RefCell;
use std::fmt;
use std::io::{Read, Write};

use cmdserver_frame::{BLOCK_INPUT, ERROR, LINE_INPUT, OUTPUT};

use crate::dispatch::{Dispatcher, Handlers};
use crate::error::{ClientError, CommandError, Result};

/// Answers a line prompt, given the requested size and the output captured so far.
pub type PromptProducer<'a> = Box<dyn FnMut(usize, &[u8]) -> Result<Vec<u8>> + 'a>;

/// Supplies up to the requested number of raw input bytes. An empty reply ends the input.
pub type BulkInputProducer<'a> = Box<dyn FnMut(usize) -> Result<Vec<u8>> + 'a>;

/// Decides what a nonzero return code means, given `(code, output, error)`.
pub type ErrorHandler<'a> = Box<dyn FnOnce(i32, &[u8], &[u8]) -> Result<Vec<u8>> + 'a>;

/// Optional callbacks for one command.
#[derive(Default)]
pub struct CommandOptions<'a> {
    prompt: Option<PromptProducer<'a>>,
    input: Option<BulkInputProducer<'a>>,
    on_error: Option<ErrorHandler<'a>>,
}

impl<'a> CommandOptions<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer requests on the line-input channel.
    pub fn prompt(mut self, producer: impl FnMut(usize, &[u8]) -> Result<Vec<u8>> + 'a) -> Self {
        self.prompt = Some(Box::new(producer));
        self
    }

    /// Answer requests on the block-input channel.
    pub fn input(mut self, producer: impl FnMut(usize) -> Result<Vec<u8>> + 'a) -> Self {
        self.input = Some(Box::new(producer));
        self
    }

    /// Handle nonzero return codes instead of failing with a command error.
    pub fn on_error(
        mut self,
        handler: impl FnOnce(i32, &[u8], &[u8]) -> Result<Vec<u8>> + 'a,
    ) -> Self {
        self.on_error = Some(Box::new(handler));
        self
    }

    /// Accept the listed nonzero codes as success, returning the captured output.
    ///
    /// Commands such as `incoming` or `outgoing` return 1 when there is nothing
    /// to report.
    pub fn accept_codes(self, codes: &'a [i32]) -> Self {
        self.on_error(move |code, out, err| {
            if codes.contains(&code) {
                Ok(out.to_vec())
            } else {
                Err(CommandError {
                    args: Vec::new(),
                    code,
                    output: out.to_vec(),
                    error: err.to_vec(),
                }
                .into())
            }
        })
    }
}

impl fmt::Debug for CommandOptions<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandOptions")
            .field("prompt", &self.prompt.is_some())
            .field("input", &self.input.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

/// Return code and captured output of one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    pub code: i32,
    pub output: Vec<u8>,
    pub error: Vec<u8>,
}

impl CommandOutcome {
    pub fn is_success(&self) -> bool {
        self.code == 0
    }
}

/// Runs commands with output and error capture and a uniform failure contract.
pub struct CommandExecutor<R, W> {
    dispatcher: Dispatcher<R, W>,
}

impl<R: Read, W: Write> CommandExecutor<R, W> {
    pub fn new(dispatcher: Dispatcher<R, W>) -> Self {
        Self { dispatcher }
    }

    /// Run a command and return its captured output.
    ///
    /// A nonzero code goes to the options' error handler when one is set, and
    /// fails with [`CommandError`] otherwise.
    pub fn execute<S: AsRef<str>>(
        &mut self,
        args: &[S],
        options: CommandOptions<'_>,
    ) -> Result<Vec<u8>> {
        let CommandOptions {
            mut prompt,
            mut input,
            on_error,
        } = options;
        let outcome = self.capture(args, prompt.as_mut(), input.as_mut())?;

        if outcome.is_success() {
            return Ok(outcome.output);
        }

        let owned_args = || args.iter().map(|arg| arg.as_ref().to_string()).collect();
        match on_error {
            Some(handler) => {
                handler(outcome.code, &outcome.output, &outcome.error).map_err(|err| match err {
                    ClientError::Command(mut err) if err.args.is_empty() => {
                        err.args = owned_args();
                        ClientError::Command(err)
                    }
                    other => other,
                })
            }
            None => Err(CommandError {
                args: owned_args(),
                code: outcome.code,
                output: outcome.output,
                error: outcome.error,
            }
            .into()),
        }
    }

    /// Run a command and return the code with both buffers, whatever the code.
    ///
    /// The options' error handler is not consulted.
    pub fn outcome<S: AsRef<str>>(
        &mut self,
        args: &[S],
        options: CommandOptions<'_>,
    ) -> Result<CommandOutcome> {
        let CommandOptions {
            mut prompt,
            mut input,
            ..
        } = options;
        self.capture(args, prompt.as_mut(), input.as_mut())
    }

    fn capture<S: AsRef<str>>(
        &mut self,
        args: &[S],
        prompt: Option<&mut PromptProducer<'_>>,
        input: Option<&mut BulkInputProducer<'_>>,
    ) -> Result<CommandOutcome> {
        let output = RefCell::new(Vec::new());
        let error = RefCell::new(Vec::new());

        let mut handlers = Handlers::new()
            .on_output(OUTPUT, |data| {
                output.borrow_mut().extend_from_slice(data);
                Ok(())
            })
            .on_output(ERROR, |data| {
                error.borrow_mut().extend_from_slice(data);
                Ok(())
            });
        if let Some(prompt) = prompt {
            let output = &output;
            handlers =
                handlers.on_input(LINE_INPUT, move |size| prompt(size, &output.borrow()[..]));
        }
        if let Some(input) = input {
            handlers = handlers.on_input(BLOCK_INPUT, move |size| input(size));
        }

        let code = self.dispatcher.run_command(args, &mut handlers)?;
        drop(handlers);

        if code != 0 {
            tracing::debug!(code, "command returned nonzero");
        }

        Ok(CommandOutcome {
            code,
            output: output.into_inner(),
            error: error.into_inner(),
        })
    }

    pub fn dispatcher(&self) -> &Dispatcher<R, W> {
        &self.dispatcher
    }

    /// Borrow the underlying dispatcher for handler-level access.
    pub fn dispatcher_mut(&mut self) -> &mut Dispatcher<R, W> {
        &mut self.dispatcher
    }

    pub fn into_dispatcher(self) -> Dispatcher<R, W> {
        self.dispatcher
    }
}
