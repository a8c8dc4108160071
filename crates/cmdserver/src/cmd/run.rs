use std::fs::File;
use std::io::Read;

use cmdserver_client::{CommandOptions, Session};

use crate::cmd::RunArgs;
use crate::exit::{client_error, command_exit_code, io_error, CliResult, SUCCESS};
use crate::output::{print_outcome, OutputFormat};

const MAX_INPUT_CHUNK: usize = 64 * 1024;

pub fn run(args: RunArgs, format: OutputFormat) -> CliResult<i32> {
    let mut input = args
        .input
        .as_ref()
        .map(|path| File::open(path).map_err(|e| io_error(&format!("open {}", path.display()), e)))
        .transpose()?;

    let mut session =
        Session::open(args.server.to_config()).map_err(|e| client_error("open failed", e))?;
    tracing::debug!(pid = session.pid(), args = ?args.args, "running command");

    let mut options = CommandOptions::new();
    if let Some(answer) = &args.answer {
        let line = format!("{answer}\n").into_bytes();
        options = options.prompt(move |_size, _output| Ok(line.clone()));
    }
    if let Some(file) = input.as_mut() {
        options = options.input(move |size| {
            let mut chunk = vec![0; size.min(MAX_INPUT_CHUNK)];
            let read = file.read(&mut chunk)?;
            chunk.truncate(read);
            Ok(chunk)
        });
    }

    let outcome = session
        .outcome(&args.args, options)
        .map_err(|e| client_error("command failed", e))?;
    print_outcome(&args.args, &outcome, format);

    if let Err(err) = session.close() {
        tracing::warn!(error = %err, "command server did not shut down cleanly");
    }

    if outcome.code == 0 || args.ok_codes.contains(&outcome.code) {
        Ok(SUCCESS)
    } else {
        Ok(command_exit_code(outcome.code))
    }
}
