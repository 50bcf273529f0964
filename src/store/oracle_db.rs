//! Oracle-backed record store
//!
//! The `oracle` crate is synchronous, so each call runs on the blocking
//! pool and is awaited right away. Autocommit is on: every statement is
//! its own unit of work.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::common::{Credentials, Error, Result};

use super::{DatabaseEndpoint, NewProduct, Product, RecordStore, StoreConnector};

const DROP_PRODUCTS: &str = "BEGIN
   EXECUTE IMMEDIATE 'DROP TABLE products CASCADE CONSTRAINTS';
EXCEPTION
   WHEN OTHERS THEN
      IF SQLCODE != -942 THEN
         RAISE;
      END IF;
END;";

const CREATE_PRODUCTS: &str = "CREATE TABLE products (
    id NUMBER(19) GENERATED BY DEFAULT ON NULL AS IDENTITY PRIMARY KEY,
    name VARCHAR2(255) NOT NULL,
    price BINARY_DOUBLE NOT NULL
)";

const INSERT_PRODUCT: &str = "INSERT INTO products (name, price) VALUES (:1, :2)";
const SELECT_PRODUCTS: &str = "SELECT id, name, price FROM products ORDER BY id";
const UPDATE_PRODUCT_NAME: &str = "UPDATE products SET name = :1 WHERE id = :2";
const DELETE_PRODUCT: &str = "DELETE FROM products WHERE id = :1";

/// Connects with the Oracle client library
#[derive(Debug, Default, Clone, Copy)]
pub struct OracleConnector;

#[async_trait]
impl StoreConnector for OracleConnector {
    type Store = OracleStore;

    async fn connect(
        &self,
        endpoint: &DatabaseEndpoint,
        credentials: &Credentials,
    ) -> Result<OracleStore> {
        let target = endpoint.to_string();
        let connect_string = endpoint.connect_string();
        let username = credentials.username.clone();
        let password = credentials.password.clone();

        tracing::debug!(endpoint = %target, user = %username, "Opening Oracle connection");

        let conn = tokio::task::spawn_blocking(move || {
            let mut conn =
                oracle::Connection::connect(&username, password.expose(), &connect_string)?;
            conn.set_autocommit(true);
            Ok::<_, oracle::Error>(conn)
        })
        .await
        .map_err(|e| Error::Internal(format!("database connect task failed: {}", e)))?
        .map_err(|e| Error::database_connection_failed(&target, e))?;

        Ok(OracleStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

/// An open Oracle session
pub struct OracleStore {
    conn: Arc<Mutex<oracle::Connection>>,
}

impl OracleStore {
    /// Run `f` against the connection on the blocking pool
    async fn blocking<T, F>(&self, operation: &'static str, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&oracle::Connection) -> oracle::Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|_| Error::Internal("database connection lock poisoned".to_string()))?;
            f(&conn).map_err(|e| Error::database(operation, e))
        })
        .await
        .map_err(|e| Error::Internal(format!("database task failed: {}", e)))?
    }
}

#[async_trait]
impl RecordStore for OracleStore {
    async fn reset_schema(&self) -> Result<()> {
        self.blocking("reset schema", |conn| {
            conn.execute(DROP_PRODUCTS, &[])?;
            conn.execute(CREATE_PRODUCTS, &[])?;
            Ok(())
        })
        .await
    }

    async fn insert_products(&self, products: &[NewProduct]) -> Result<u64> {
        if products.is_empty() {
            return Ok(0);
        }
        let products = products.to_vec();
        self.blocking("insert", move |conn| {
            let mut batch = conn.batch(INSERT_PRODUCT, products.len()).build()?;
            for product in &products {
                batch.append_row(&[&product.name, &product.price])?;
            }
            batch.execute()?;
            Ok(products.len() as u64)
        })
        .await
    }

    async fn select_products(&self) -> Result<Vec<Product>> {
        self.blocking("select", |conn| {
            conn.query_as::<(i64, String, f64)>(SELECT_PRODUCTS, &[])?
                .map(|row| row.map(|(id, name, price)| Product { id, name, price }))
                .collect()
        })
        .await
    }

    async fn update_product_name(&self, product: &Product) -> Result<()> {
        let id = product.id;
        let name = product.name.clone();
        let affected = self
            .blocking("update", move |conn| {
                conn.execute(UPDATE_PRODUCT_NAME, &[&name, &id])?.row_count()
            })
            .await?;
        if affected == 0 {
            return Err(Error::RecordNotFound { id });
        }
        Ok(())
    }

    async fn delete_product(&self, id: i64) -> Result<()> {
        let affected = self
            .blocking("delete", move |conn| {
                conn.execute(DELETE_PRODUCT, &[&id])?.row_count()
            })
            .await?;
        if affected == 0 {
            return Err(Error::RecordNotFound { id });
        }
        Ok(())
    }
}
