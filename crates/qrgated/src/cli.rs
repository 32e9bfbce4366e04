//! Command-line interface.

use std::net::IpAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "qrgated", about = "WhatsApp pairing QR relay", version)]
pub struct Cli {
    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Serve the API and pairing page.
    Serve(ServeArgs),
}

/// Flags for `serve`. Unset flags fall back to the config file, then to
/// built-in defaults.
#[derive(Args, Debug, Clone, Default)]
pub struct ServeArgs {
    /// TOML config file.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Address to bind.
    #[arg(long)]
    pub bind: Option<IpAddr>,

    /// Port to listen on.
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// Seconds a received QR counts as fresh.
    #[arg(long)]
    pub freshness_secs: Option<u64>,

    /// Milliseconds a QR submission waits for its render.
    #[arg(long)]
    pub render_timeout_ms: Option<u64>,

    /// URL to ping periodically (disabled when unset).
    #[arg(long, env = "KEEPALIVE_URL")]
    pub keepalive_url: Option<String>,

    /// Seconds between keep-alive pings.
    #[arg(long, env = "KEEPALIVE_INTERVAL_SECS")]
    pub keepalive_interval_secs: Option<u64>,
}
