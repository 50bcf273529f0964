//! CLI command handling
//!
//! Wires config, the Podman engine, the reconciler and the data session
//! together for each command, and prints the results.

pub mod status;

use std::path::PathBuf;

use colored::Colorize;

use crate::commands::Commands;
use crate::common::config::Config;
use crate::common::{paths, Result};
use crate::engine::{ContainerEngine, PodmanEngine};
use crate::reconcile::clock::{Clock, SystemClock};
use crate::reconcile::poll::PollPolicy;
use crate::reconcile::{DesiredEnvironment, Provisioned, ReconcileAction, Reconciler};
use crate::session::{self, SessionReport};
use crate::store::{DatabaseEndpoint, OracleConnector, StoreConnector};

/// Dispatch a CLI command
///
/// `socket` overrides both the config file and the default socket path.
pub async fn dispatch(command: Commands, config: &Config, socket: Option<PathBuf>) -> Result<()> {
    match command {
        Commands::Run => {
            let engine = connect_engine(config, socket).await?;
            let (provisioned, report) =
                provision_and_run(&engine, &SystemClock, &OracleConnector, config).await?;
            print_provisioned(&provisioned, config);
            print_report(&report);
            Ok(())
        }

        Commands::Up => {
            let engine = connect_engine(config, socket).await?;
            let provisioned = provision(&engine, &SystemClock, config).await?;
            print_provisioned(&provisioned, config);
            Ok(())
        }

        Commands::Demo => {
            let endpoint = DatabaseEndpoint::from_config(config);
            let report = session::run(&OracleConnector, &endpoint, &config.credentials()).await?;
            print_report(&report);
            Ok(())
        }

        Commands::Status { json } => {
            let engine = connect_engine(config, socket).await?;
            let desired = DesiredEnvironment::from_config(&config.container);
            let status =
                status::collect(&engine, &desired.image, &desired.container_name).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                status::print(&status);
            }
            Ok(())
        }

        Commands::Down => {
            let engine = connect_engine(config, socket).await?;
            let name = &config.container.name;
            if down(&engine, name).await? {
                println!("  {} Removed container {}", "✓".green(), name.bold());
            } else {
                println!("  {} No container named {}", "✓".green(), name.bold());
            }
            Ok(())
        }
    }
}

/// Socket to use: flag, then config file, then the per-user default
pub fn resolve_socket(config: &Config, socket: Option<PathBuf>) -> PathBuf {
    socket
        .or_else(|| config.engine.socket.clone())
        .unwrap_or_else(paths::engine_socket_path)
}

async fn connect_engine(config: &Config, socket: Option<PathBuf>) -> Result<PodmanEngine> {
    let socket = resolve_socket(config, socket);
    tracing::info!(socket = %paths::socket_uri(&socket), "Connecting to Podman...");
    PodmanEngine::connect(&socket).await
}

/// Reconcile the configured environment
pub async fn provision<E, C>(engine: &E, clock: &C, config: &Config) -> Result<Provisioned>
where
    E: ContainerEngine + ?Sized,
    C: Clock + ?Sized,
{
    let desired = DesiredEnvironment::from_config(&config.container);
    let credentials = config.credentials();

    Reconciler::new(engine, clock, &desired, &credentials)
        .with_poll_policy(PollPolicy::from_config(&config.health))
        .reconcile()
        .await
}

/// Reconcile, then run the data session with the same credentials
///
/// The session only starts once the container reports healthy.
pub async fn provision_and_run<E, C, S>(
    engine: &E,
    clock: &C,
    connector: &S,
    config: &Config,
) -> Result<(Provisioned, SessionReport)>
where
    E: ContainerEngine + ?Sized,
    C: Clock + ?Sized,
    S: StoreConnector + ?Sized,
{
    let provisioned = provision(engine, clock, config).await?;

    let endpoint = DatabaseEndpoint::from_config(config);
    let report = session::run(connector, &endpoint, &config.credentials()).await?;

    Ok((provisioned, report))
}

/// Force-remove the named container if there is one
///
/// Returns whether a container was removed. Running it twice is fine.
pub async fn down<E>(engine: &E, name: &str) -> Result<bool>
where
    E: ContainerEngine + ?Sized,
{
    if !engine.container_exists(name).await? {
        tracing::debug!(container = %name, "Nothing to remove");
        return Ok(false);
    }
    engine.remove_container(name).await?;
    tracing::info!(container = %name, "Container removed");
    Ok(true)
}

fn print_provisioned(provisioned: &Provisioned, config: &Config) {
    let how = match provisioned.action {
        ReconcileAction::Reused => "reused",
        ReconcileAction::Created => "created",
    };
    println!(
        "  {} Container {} is healthy ({})",
        "✓".green(),
        provisioned.container_name.bold(),
        how
    );
    if let Some(dir) = &provisioned.data_dir {
        println!("    data directory: {}", dir.display());
    }
    println!(
        "    endpoint: {} (user {})",
        DatabaseEndpoint::from_config(config),
        config.database.username
    );
}

fn print_report(report: &SessionReport) {
    println!(
        "  {} Renamed product {} to {}, deleted product {}",
        "✓".green(),
        report.updated.id,
        report.updated.name.bold(),
        report.deleted_id
    );
}
