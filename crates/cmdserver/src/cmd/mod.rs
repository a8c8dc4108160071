use clap::{Args, Subcommand};
use std::path::PathBuf;

use cmdserver_client::ServerConfig;

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod hello;
pub mod run;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start a server and print its hello.
    Hello(HelloArgs),
    /// Run one command through a server.
    Run(RunArgs),
    /// Show version information.
    Version(VersionArgs),
}

/// Hello output defaults to a table on a terminal; command output is passed
/// through unchanged unless a format is asked for.
pub fn run(command: Command, format: Option<OutputFormat>) -> CliResult<i32> {
    match command {
        Command::Hello(args) => hello::run(
            args,
            format.unwrap_or_else(OutputFormat::default_for_stdout),
        ),
        Command::Run(args) => run::run(args, format.unwrap_or(OutputFormat::Raw)),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct ServerArgs {
    /// Mercurial executable.
    #[arg(long, env = "HG", default_value = "hg", value_name = "PATH")]
    pub hg: PathBuf,
    /// Repository to serve. Default: found from the current directory.
    #[arg(long, short = 'R', value_name = "PATH")]
    pub repository: Option<PathBuf>,
    /// Force the server's encoding.
    #[arg(long)]
    pub encoding: Option<String>,
    /// Configuration override (repeatable).
    #[arg(long = "config", value_name = "KEY=VALUE", value_parser = parse_config_override)]
    pub config: Vec<(String, String)>,
}

impl ServerArgs {
    pub fn to_config(&self) -> ServerConfig {
        ServerConfig {
            program: self.hg.clone(),
            repository: self.repository.clone(),
            encoding: self.encoding.clone(),
            config_overrides: self.config.clone(),
            ..ServerConfig::default()
        }
    }
}

fn parse_config_override(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{raw}'")),
    }
}

#[derive(Args, Debug)]
pub struct HelloArgs {
    #[command(flatten)]
    pub server: ServerArgs,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub server: ServerArgs,
    /// Return code treated as success (repeatable).
    #[arg(long = "ok-code", value_name = "CODE", allow_negative_numbers = true)]
    pub ok_codes: Vec<i32>,
    /// File served to the command's input requests.
    #[arg(long, value_name = "FILE")]
    pub input: Option<PathBuf>,
    /// Line sent back to every prompt.
    #[arg(long, value_name = "TEXT")]
    pub answer: Option<String>,
    /// Command and arguments, after `--`.
    #[arg(last = true, required = true, value_name = "ARGS")]
    pub args: Vec<String>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
