//! Capture MCP Server - Main Entry Point
//!
//! The actual implementation is in the `capture_mcp` library.

use anyhow::Result;
use capture_mcp::{CaptureConfig, CaptureServerHandler};
use clap::{CommandFactory, Parser};
use mcp_attr::server::serve_stdio;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Capture MCP Server - turn household captures into tasks via Model Context Protocol
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the task data file
    file: String,

    /// Path to the TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,
}

/// Log to stderr; stdout carries the MCP stdio transport
fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_env("CAPTURE_MCP_LOG")
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Check if no arguments were provided (except the program name)
    if std::env::args().len() == 1 {
        let mut cmd = Args::command();
        cmd.print_help().ok();
        println!();
        std::process::exit(2);
    }

    let args = Args::parse();
    let config = CaptureConfig::load(args.config.as_deref())?;
    init_tracing(&config.log_level);

    info!(file = %args.file, model = ?config.model.command, "starting capture server");
    let handler = CaptureServerHandler::new(&args.file, config)?;
    serve_stdio(handler).await?;
    Ok(())
}
