//! devdb - a disposable Oracle database in a Podman container
//!
//! The library holds the environment reconciler, the data session driver
//! and the clients they run against, so each piece can be driven with the
//! in-process fakes of the `testing` module (built for tests, or with the
//! `testing` feature).

pub mod cli;
pub mod commands;
pub mod common;
pub mod engine;
pub mod reconcile;
pub mod session;
pub mod store;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Re-export commonly used types for tests
pub use common::{Credentials, Error, Result, Secret};
pub use reconcile::{DesiredEnvironment, Provisioned, ReconcileAction, Reconciler};
