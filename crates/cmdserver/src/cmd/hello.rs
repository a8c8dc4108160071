use cmdserver_client::Session;

use crate::cmd::HelloArgs;
use crate::exit::{client_error, CliResult, SUCCESS};
use crate::output::{print_hello, OutputFormat};

pub fn run(args: HelloArgs, format: OutputFormat) -> CliResult<i32> {
    let config = args.server.to_config();
    let session = Session::open(config).map_err(|e| client_error("open failed", e))?;

    let pid = session.pid();
    tracing::info!(pid, encoding = session.encoding(), "command server ready");
    print_hello(session.hello(), pid, format);

    let code = session
        .close()
        .map_err(|e| client_error("close failed", e))?;
    tracing::debug!(code, "command server closed");
    Ok(SUCCESS)
}
