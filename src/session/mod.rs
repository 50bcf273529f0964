//! Data session driver
//!
//! Runs the fixed demonstration against a reachable database: reset the
//! `products` table, insert two rows, read them back, rename the first and
//! delete the second. Each step stops the sequence on failure; earlier
//! steps stay committed.

use crate::common::{Credentials, Error, Result};
use crate::store::{DatabaseEndpoint, NewProduct, Product, RecordStore, StoreConnector};

/// Rows inserted by the demonstration
pub const DEMO_PRODUCTS: [(&str, f64); 2] = [("apple", 5.99), ("orange", 4.99)];

/// New name given to the first row read back
pub const RENAMED_TO: &str = "banana";

/// What the session did
#[derive(Debug, Clone, PartialEq)]
pub struct SessionReport {
    /// Rows as read back after the insert
    pub records: Vec<Product>,
    /// The first row after renaming
    pub updated: Product,
    /// Identity of the deleted second row
    pub deleted_id: i64,
}

/// One report line, e.g. `Product 1: apple - $5.99`
pub fn format_product(product: &Product) -> String {
    format!(
        "Product {}: {} - ${:.2}",
        product.id, product.name, product.price
    )
}

/// Connect to `endpoint` and run the demonstration
pub async fn run<C>(
    connector: &C,
    endpoint: &DatabaseEndpoint,
    credentials: &Credentials,
) -> Result<SessionReport>
where
    C: StoreConnector + ?Sized,
{
    tracing::info!(endpoint = %endpoint, "Connecting to database...");
    let store = connector.connect(endpoint, credentials).await?;
    tracing::info!(endpoint = %endpoint, "Connected to database...");

    run_with_store(&store).await
}

/// Run the demonstration on an open store
pub async fn run_with_store<S>(store: &S) -> Result<SessionReport>
where
    S: RecordStore + ?Sized,
{
    tracing::info!("Creating table...");
    store.reset_schema().await?;
    tracing::info!("Created table...");

    tracing::info!("Inserting data to the table...");
    let batch: Vec<NewProduct> = DEMO_PRODUCTS
        .iter()
        .map(|(name, price)| NewProduct::new(*name, *price))
        .collect();
    let inserted = store.insert_products(&batch).await?;
    tracing::info!(rows = inserted, "Inserted data to the table...");

    tracing::info!("Reading data from the table...");
    let records = store.select_products().await?;
    for product in &records {
        println!("{}", format_product(product));
    }
    tracing::info!(rows = records.len(), "Read data from the table...");

    if records.len() < 2 {
        return Err(Error::UnexpectedRecordCount {
            expected: 2,
            found: records.len(),
        });
    }

    tracing::info!("Updating data in the table...");
    let mut updated = records[0].clone();
    updated.name = RENAMED_TO.to_string();
    store.update_product_name(&updated).await?;
    tracing::info!(id = updated.id, name = %updated.name, "Updated data in the table...");

    tracing::info!("Deleting data from the table...");
    let deleted_id = records[1].id;
    store.delete_product(deleted_id).await?;
    tracing::info!(id = deleted_id, "Deleted data from the table...");

    Ok(SessionReport {
        records,
        updated,
        deleted_id,
    })
}
