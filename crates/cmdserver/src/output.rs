use std::collections::BTreeMap;
use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use cmdserver_client::{CommandOutcome, Hello};
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct HelloOutput<'a> {
    capabilities: Vec<&'a str>,
    encoding: &'a str,
    fields: &'a BTreeMap<String, String>,
    /// OS pid of the spawned child; `fields.pid` is what the server announced.
    process_id: Option<u32>,
}

pub fn print_hello(hello: &Hello, process_id: Option<u32>, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = HelloOutput {
                capabilities: hello.capabilities.iter().map(String::as_str).collect(),
                encoding: &hello.encoding,
                fields: &hello.fields,
                process_id,
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["FIELD", "VALUE"])
                .add_row(vec!["capabilities".to_string(), capability_list(hello)])
                .add_row(vec!["encoding".to_string(), hello.encoding.clone()]);
            for (key, value) in &hello.fields {
                table.add_row(vec![key.clone(), value.clone()]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "capabilities=[{}] encoding={} process_id={}",
                capability_list(hello),
                hello.encoding,
                process_id.map_or_else(|| "-".to_string(), |pid| pid.to_string())
            );
        }
        OutputFormat::Raw => {
            println!("capabilities: {}", capability_list(hello));
            println!("encoding: {}", hello.encoding);
            for (key, value) in &hello.fields {
                println!("{key}: {value}");
            }
        }
    }
}

#[derive(Serialize)]
struct OutcomeOutput<'a> {
    args: &'a [String],
    code: i32,
    output: String,
    error: String,
}

/// Print a finished command. Every format but JSON passes the bytes through.
pub fn print_outcome(args: &[String], outcome: &CommandOutcome, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = OutcomeOutput {
                args,
                code: outcome.code,
                output: String::from_utf8_lossy(&outcome.output).into_owned(),
                error: String::from_utf8_lossy(&outcome.error).into_owned(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table | OutputFormat::Pretty | OutputFormat::Raw => {
            print_raw(&mut std::io::stdout(), &outcome.output);
            print_raw(&mut std::io::stderr(), &outcome.error);
        }
    }
}

pub fn print_raw(out: &mut impl Write, data: &[u8]) {
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn capability_list(hello: &Hello) -> String {
    hello
        .capabilities
        .iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(" ")
}
