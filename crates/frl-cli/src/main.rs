// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
//! `frl`: construct and dispatch error records from the command line.
//!
//! The binary is the demo boundary for the `cli` channel: it loads a TOML
//! taxonomy, builds the registry and factory, dispatches one record, and
//! prints the rendered response.

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use frl_config::{build_registry, load_config};
use frl_core::ErrorContext;
use frl_dispatch::{DispatchPipeline, TracingSink};
use frl_render::{ChannelTag, RendererRegistry};
use frl_taxonomy::ErrorFactory;
use http::StatusCode;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "frl", version, about = "Fault Relay CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging.
    #[arg(long)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the kinds registered in a taxonomy config.
    Kinds {
        /// Path to the taxonomy TOML file.
        #[arg(long)]
        config: PathBuf,

        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Construct a record through the factory and dispatch it.
    Dispatch {
        /// Path to the taxonomy TOML file.
        #[arg(long)]
        config: PathBuf,

        /// Kind to construct (must be registered).
        #[arg(long)]
        kind: String,

        /// Context fields as key=value. Values parse as JSON scalars with a
        /// string fallback. Can be repeated.
        #[arg(long = "context")]
        context: Vec<String>,

        /// Channel tag: api | cli | browser | anything else.
        #[arg(long, default_value = "cli")]
        channel: String,

        /// Internal diagnostic message overriding the kind's summary.
        #[arg(long)]
        message: Option<String>,

        /// Per-instance status override.
        #[arg(long)]
        status: Option<u16>,

        /// Print the response as JSON instead of text.
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.debug {
        EnvFilter::new("frl=debug,frl.pipeline=debug,frl.sink=debug")
    } else {
        EnvFilter::new("frl=info,frl.sink=error")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Kinds { config, json } => cmd_kinds(&config, json),
        Commands::Dispatch {
            config,
            kind,
            context,
            channel,
            message,
            status,
            json,
        } => cmd_dispatch(&config, &kind, &context, &channel, message, status, json),
    }
}

fn cmd_kinds(config_path: &PathBuf, json: bool) -> Result<()> {
    let config = load_config(config_path).context("loading taxonomy config")?;
    for warning in frl_config::validate_config(&config).context("validating taxonomy config")? {
        eprintln!("warning: {warning}");
    }
    let registry = build_registry(&config).context("building taxonomy registry")?;

    if json {
        let kinds: Vec<serde_json::Value> = registry
            .kinds()
            .map(|spec| {
                serde_json::json!({
                    "kind": spec.kind().as_str(),
                    "code": spec.code(),
                    "status": spec.capabilities().http_status.as_u16(),
                    "loggable": spec.capabilities().loggable,
                    "public_message": spec.capabilities().public_message.as_deref(),
                    "required_context": spec.required_context(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&kinds)?);
    } else {
        println!("{:<28} {:>6} {:>6} {:>8}  {}", "kind", "code", "status", "loggable", "public message");
        for spec in registry.kinds() {
            let caps = spec.capabilities();
            println!(
                "{:<28} {:>6} {:>6} {:>8}  {}",
                spec.kind(),
                spec.code(),
                caps.http_status.as_u16(),
                caps.loggable,
                caps.public_message.as_deref().unwrap_or("-"),
            );
        }
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn cmd_dispatch(
    config_path: &PathBuf,
    kind: &str,
    context_args: &[String],
    channel: &str,
    message: Option<String>,
    status: Option<u16>,
    json: bool,
) -> Result<()> {
    let config = load_config(config_path).context("loading taxonomy config")?;
    let registry = Arc::new(build_registry(&config).context("building taxonomy registry")?);
    let factory = ErrorFactory::new(Arc::clone(&registry));

    let mut context = ErrorContext::new();
    for pair in context_args {
        let (key, value) = parse_context_pair(pair)?;
        context = context.with(key, value);
    }

    let kind = frl_core::ErrorKind::new(kind);
    let mut record = match message {
        Some(message) => factory
            .create_with_message(&kind, message, context)
            .context("constructing record")?,
        None => factory.create(&kind, context).context("constructing record")?,
    };
    if let Some(status) = status {
        let status = StatusCode::from_u16(status)
            .with_context(|| format!("invalid status override {status}"))?;
        record = record.with_status_override(status);
    }

    let pipeline = DispatchPipeline::new(registry, RendererRegistry::with_defaults(), TracingSink);
    let pipeline = match config.generic_fallback {
        Some(fallback) => pipeline.with_generic_fallback(fallback),
        None => pipeline,
    };

    let channel = ChannelTag::from(channel);
    let response = pipeline.dispatch(record, &channel);

    if json {
        let out = serde_json::json!({
            "status": response.status.as_u16(),
            "content_type": response.content_type,
            "body": response.body,
        });
        println!("{out}");
    } else {
        println!("status: {}", response.status);
        println!("content-type: {}", response.content_type);
        println!();
        print!("{}", response.body);
        if !response.body.ends_with('\n') {
            println!();
        }
    }

    if response.status.is_server_error() {
        std::process::exit(1);
    }
    Ok(())
}

/// Split a `key=value` argument.
///
/// Values parse as JSON with a string fallback: `attempts=3` is numeric,
/// `dry_run=true` is boolean, anything unparseable stays a string.
fn parse_context_pair(pair: &str) -> Result<(String, serde_json::Value)> {
    let Some((key, value)) = pair.split_once('=') else {
        bail!("context argument '{pair}' is not of the form key=value");
    };
    if key.is_empty() {
        bail!("context argument '{pair}' has an empty key");
    }
    let value = serde_json::from_str(value)
        .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_pair_string_value() {
        let (k, v) = parse_context_pair("user_id=abc").unwrap();
        assert_eq!(k, "user_id");
        assert_eq!(v, serde_json::json!("abc"));
    }

    #[test]
    fn context_pair_json_scalar() {
        let (_, v) = parse_context_pair("attempts=3").unwrap();
        assert_eq!(v, serde_json::json!(3));
        let (_, v) = parse_context_pair("dry_run=true").unwrap();
        assert_eq!(v, serde_json::json!(true));
    }

    #[test]
    fn context_pair_value_may_contain_equals() {
        let (k, v) = parse_context_pair("query=a=b").unwrap();
        assert_eq!(k, "query");
        assert_eq!(v, serde_json::json!("a=b"));
    }

    #[test]
    fn context_pair_rejects_missing_separator() {
        assert!(parse_context_pair("nope").is_err());
    }

    #[test]
    fn context_pair_rejects_empty_key() {
        assert!(parse_context_pair("=v").is_err());
    }
}
