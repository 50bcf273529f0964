//! devdb - a disposable Oracle database in a Podman container
//!
//! Provisions (or reuses) a healthy Oracle Database Free container and runs
//! a short data demonstration against it.

use std::path::PathBuf;

use clap::Parser;
use commands::Commands;
use devdb::common::config::Config;
use devdb::common::logging;
use devdb::{cli, commands};

#[derive(Parser)]
#[command(name = "devdb", about = "Disposable Oracle database in a Podman container")]
#[command(version, long_about = None)]
struct Cli {
    /// Configuration file (default: ~/.config/devdb/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Podman API socket (default: $XDG_RUNTIME_DIR/podman/podman.sock)
    #[arg(long, global = true)]
    socket: Option<PathBuf>,

    /// Also write logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match cli.config.as_deref() {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let log_file = cli.log_file.or_else(|| config.logging.file.clone());
    logging::init(cli.verbose, log_file.as_deref());

    let result = cli::dispatch(cli.command, &config, cli.socket).await;

    if let Err(e) = result {
        tracing::debug!(code = e.code(), "Command failed");
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
