//! Common utilities shared by the reconciler, the data session and the CLI

pub mod config;
pub mod credentials;
pub mod error;
pub mod logging;
pub mod paths;

pub use credentials::{Credentials, Secret};
pub use error::{Error, Result};
