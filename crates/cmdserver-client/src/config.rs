use std::ffi::OsString;
use std::path::PathBuf;

use cmdserver_frame::FrameConfig;

/// Environment variable the server reads to pick its output encoding.
pub const ENCODING_ENV: &str = "HGENCODING";

/// How to launch a command server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Program to run. Default: `hg` looked up on `PATH`.
    pub program: PathBuf,
    /// Arguments that put the program into pipe command-server mode.
    pub server_args: Vec<String>,
    /// Repository to serve (`-R <path>`). Default: the repository found from
    /// the current directory.
    pub repository: Option<PathBuf>,
    /// Forces the server's encoding through `HGENCODING`.
    pub encoding: Option<String>,
    /// `--config key=value` overrides, in order.
    pub config_overrides: Vec<(String, String)>,
    /// Extra environment entries for the child process.
    pub env: Vec<(String, String)>,
    /// Frame codec limits for the session.
    pub frame: FrameConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from("hg"),
            server_args: vec![
                "serve".to_string(),
                "--cmdserver".to_string(),
                "pipe".to_string(),
            ],
            repository: None,
            encoding: None,
            config_overrides: Vec::new(),
            env: Vec::new(),
            frame: FrameConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Full argument list passed to `program`.
    pub fn command_args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = self.server_args.iter().map(OsString::from).collect();
        if let Some(repo) = &self.repository {
            args.push("-R".into());
            args.push(repo.clone().into_os_string());
        }
        for (key, value) in &self.config_overrides {
            args.push("--config".into());
            args.push(format!("{key}={value}").into());
        }
        args
    }

    /// Environment entries applied on top of the inherited environment.
    pub fn command_env(&self) -> Vec<(String, String)> {
        let mut env = self.env.clone();
        if let Some(encoding) = &self.encoding {
            env.push((ENCODING_ENV.to_string(), encoding.clone()));
        }
        env
    }
}
