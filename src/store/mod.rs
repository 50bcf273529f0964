//! Record store used by the data session
//!
//! [`RecordStore`] is the CRUD surface the session needs, and
//! [`StoreConnector`] opens one for an endpoint. The Oracle implementation
//! lives in [`oracle_db`]; tests use `testing::MemoryConnector`.

pub mod oracle_db;

use std::fmt;

use async_trait::async_trait;
use serde::Serialize;

use crate::common::config::Config;
use crate::common::{Credentials, Result};

pub use oracle_db::{OracleConnector, OracleStore};

/// A priced item as stored, with its store-assigned identity
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub price: f64,
}

/// A product that has not been inserted yet
#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    pub name: String,
    pub price: f64,
}

impl NewProduct {
    pub fn new(name: impl Into<String>, price: f64) -> Self {
        Self {
            name: name.into(),
            price,
        }
    }
}

/// Where the database listener can be reached
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseEndpoint {
    pub host: String,
    pub port: u16,
    /// Service name of the pluggable database
    pub service: String,
}

impl DatabaseEndpoint {
    /// Endpoint for the configured database. The port is the one the
    /// container publishes.
    pub fn from_config(config: &Config) -> Self {
        Self {
            host: config.database.host.clone(),
            port: config.container.port,
            service: config.database.service.clone(),
        }
    }

    /// Easy Connect string, `//host:port/service`
    pub fn connect_string(&self) -> String {
        format!("//{}:{}/{}", self.host, self.port, self.service)
    }
}

impl fmt::Display for DatabaseEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}/{}", self.host, self.port, self.service)
    }
}

/// CRUD operations on the `products` table
///
/// Every call commits on its own; nothing spans calls.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Drop the table if it exists, then create it
    async fn reset_schema(&self) -> Result<()>;

    /// Insert a batch; identities are assigned by the store
    async fn insert_products(&self, products: &[NewProduct]) -> Result<u64>;

    /// All rows ordered by identity
    async fn select_products(&self) -> Result<Vec<Product>>;

    /// Persist only the `name` column of `product`, keyed by its identity
    async fn update_product_name(&self, product: &Product) -> Result<()>;

    /// Delete a row by identity
    async fn delete_product(&self, id: i64) -> Result<()>;
}

/// Opens a [`RecordStore`] for an endpoint
#[async_trait]
pub trait StoreConnector: Send + Sync {
    type Store: RecordStore;

    async fn connect(
        &self,
        endpoint: &DatabaseEndpoint,
        credentials: &Credentials,
    ) -> Result<Self::Store>;
}
