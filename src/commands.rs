//! CLI command definitions
//!
//! Defines the clap commands for devdb.

use clap::Subcommand;

#[derive(Subcommand)]
pub enum Commands {
    /// Provision the database container, then run the data demonstration
    Run,

    /// Provision the database container and wait until it is healthy
    Up,

    /// Run the data demonstration against an already running database
    Demo,

    /// Show image and container state
    Status {
        /// Output results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Force-remove the database container
    Down,
}
