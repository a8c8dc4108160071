use cmdserver_client::{ServerConfig, ENCODING_ENV};
use cmdserver_frame::DEFAULT_MAX_PAYLOAD;

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    let version = env!("CARGO_PKG_VERSION");
    if !args.extended {
        println!("cmdserver {version}");
        return Ok(SUCCESS);
    }

    let target = option_env!("CMDSERVER_BUILD_TARGET").unwrap_or("unknown");
    let profile = option_env!("CMDSERVER_BUILD_PROFILE").unwrap_or("unknown");
    println!("name: cmdserver");
    println!("version: {version}");
    println!("target: {target}");
    println!("profile: {profile}");
    println!("server_args: {}", ServerConfig::default().server_args.join(" "));
    println!("encoding_env: {ENCODING_ENV}");
    println!("max_payload: {DEFAULT_MAX_PAYLOAD}");

    Ok(SUCCESS)
}
