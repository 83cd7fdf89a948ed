//! Request Dry-Run Tool
//!
//! Reads item keys from stdin, one per line, and prints how the agent would
//! serve each of them as a JSON line on stdout. Commands are built but never
//! executed.
//!
//! ## Usage
//!
//! ```text
//! keycheck [--config <path>] < requests.txt
//! keycheck [--config <path>] --list
//! ```
//!
//! `--list` prints the configured user parameters instead of reading stdin.
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | AGENT_CONFIG | - | Config file, when `--config` is not given |
//! | AGENT_UNSAFE_USER_PARAMETERS | 0 | Allow shell metacharacters in parameters |
//! | RUST_LOG | info | Log filter (logs go to stderr) |

use agent_request::{AgentConfig, Dispatch, RequestPipeline};
use serde::Serialize;
use std::io::{BufRead, Write};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Serialize)]
struct Report<'a> {
    request: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    resolved: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dispatch: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn report<'a>(pipeline: &RequestPipeline, request: &'a str) -> Report<'a> {
    match pipeline.dispatch(request) {
        Ok(Dispatch::Builtin(key)) => Report {
            request,
            resolved: Some(key.to_key_string()),
            dispatch: Some("builtin"),
            command: None,
            error: None,
        },
        Ok(Dispatch::Command { key, command }) => Report {
            request,
            resolved: Some(key.to_key_string()),
            dispatch: Some("user_parameter"),
            command: Some(command),
            error: None,
        },
        Err(e) => Report {
            request,
            resolved: None,
            dispatch: None,
            command: None,
            error: Some(e.to_string()),
        },
    }
}

#[derive(Debug, Serialize)]
struct Listing<'a> {
    key: &'a str,
    wildcard: bool,
    description: String,
}

#[derive(Debug, Default)]
struct Args {
    config: Option<String>,
    list: bool,
}

fn parse_args() -> Result<Args, String> {
    let mut args = std::env::args().skip(1);
    let mut parsed = Args::default();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                parsed.config = Some(args.next().ok_or("--config requires a path")?);
            }
            "--list" | "-l" => parsed.list = true,
            "--help" | "-h" => {
                println!("usage: keycheck [--config <path>] [--list] < requests.txt");
                std::process::exit(0);
            }
            other => return Err(format!("unknown argument '{}'", other)),
        }
    }

    if parsed.config.is_none() {
        parsed.config = std::env::var("AGENT_CONFIG").ok();
    }
    Ok(parsed)
}

fn list_bindings(pipeline: &RequestPipeline, out: &mut impl Write) -> std::io::Result<()> {
    let snapshot = pipeline.snapshot();
    for name in snapshot.bindings.key_names() {
        if let Some(binding) = snapshot.bindings.get(name) {
            let listing = Listing {
                key: name,
                wildcard: binding.accepts_wildcard_params,
                description: binding.describe(),
            };
            serde_json::to_writer(&mut *out, &listing)?;
            out.write_all(b"\n")?;
        }
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = parse_args()?;
    let config = match args.config {
        Some(path) => {
            info!(path = %path, "loading configuration");
            AgentConfig::from_file(&path)
        }
        None => AgentConfig::from_env(),
    };

    let pipeline = match config.and_then(|c| RequestPipeline::from_config(&c)) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            error!(error = %e, "cannot build request pipeline");
            std::process::exit(1);
        }
    };

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    if args.list {
        list_bindings(&pipeline, &mut out)?;
        out.flush()?;
        return Ok(());
    }

    for line in stdin.lock().lines() {
        let line = line?;
        let request = line.trim_end_matches('\r');
        if request.is_empty() {
            continue;
        }
        serde_json::to_writer(&mut out, &report(&pipeline, request))?;
        out.write_all(b"\n")?;
    }

    out.flush()?;
    Ok(())
}
