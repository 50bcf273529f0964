//! In-memory record store

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::common::{Credentials, Error, Result};
use crate::store::{DatabaseEndpoint, NewProduct, Product, RecordStore, StoreConnector};

/// Kind of store call, for ordering checks and failure injection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    ResetSchema,
    Insert,
    Select,
    Update,
    Delete,
}

impl StoreOp {
    fn name(&self) -> &'static str {
        match self {
            StoreOp::ResetSchema => "reset schema",
            StoreOp::Insert => "insert",
            StoreOp::Select => "select",
            StoreOp::Update => "update",
            StoreOp::Delete => "delete",
        }
    }
}

#[derive(Debug, Default)]
struct State {
    table_exists: bool,
    rows: BTreeMap<i64, Product>,
    next_id: i64,
    failing: HashSet<StoreOp>,
    ops: Vec<StoreOp>,
}

/// A `products` table in memory
///
/// Identities start at 1 and restart when the table is recreated, like an
/// identity column. Clones share the same table.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call of kind `op` fail
    pub fn failing_on(self, op: StoreOp) -> Self {
        self.state().failing.insert(op);
        self
    }

    /// Calls made so far, including failed ones
    pub fn ops(&self) -> Vec<StoreOp> {
        self.state().ops.clone()
    }

    /// Current rows, ordered by identity
    pub fn snapshot(&self) -> Vec<Product> {
        self.state().rows.values().cloned().collect()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn record(&self, op: StoreOp) -> Result<MutexGuard<'_, State>> {
        let mut state = self.state();
        state.ops.push(op);
        if state.failing.contains(&op) {
            return Err(Error::database(op.name(), "simulated failure"));
        }
        if op != StoreOp::ResetSchema && !state.table_exists {
            return Err(Error::database(
                op.name(),
                "ORA-00942: table or view does not exist",
            ));
        }
        Ok(state)
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn reset_schema(&self) -> Result<()> {
        let mut state = self.record(StoreOp::ResetSchema)?;
        state.rows.clear();
        state.next_id = 0;
        state.table_exists = true;
        Ok(())
    }

    async fn insert_products(&self, products: &[NewProduct]) -> Result<u64> {
        let mut state = self.record(StoreOp::Insert)?;
        for product in products {
            state.next_id += 1;
            let id = state.next_id;
            state.rows.insert(
                id,
                Product {
                    id,
                    name: product.name.clone(),
                    price: product.price,
                },
            );
        }
        Ok(products.len() as u64)
    }

    async fn select_products(&self) -> Result<Vec<Product>> {
        let state = self.record(StoreOp::Select)?;
        Ok(state.rows.values().cloned().collect())
    }

    async fn update_product_name(&self, product: &Product) -> Result<()> {
        let mut state = self.record(StoreOp::Update)?;
        match state.rows.get_mut(&product.id) {
            Some(row) => {
                row.name = product.name.clone();
                Ok(())
            }
            None => Err(Error::RecordNotFound { id: product.id }),
        }
    }

    async fn delete_product(&self, id: i64) -> Result<()> {
        let mut state = self.record(StoreOp::Delete)?;
        state
            .rows
            .remove(&id)
            .map(|_| ())
            .ok_or(Error::RecordNotFound { id })
    }
}

/// Hands out a shared [`MemoryStore`] and remembers who connected
#[derive(Debug, Default)]
pub struct MemoryConnector {
    store: MemoryStore,
    refuse: bool,
    connections: Mutex<Vec<(DatabaseEndpoint, Credentials)>>,
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_store(store: MemoryStore) -> Self {
        Self {
            store,
            ..Self::default()
        }
    }

    /// Make `connect` fail as if the listener were down
    pub fn refusing_connections(mut self) -> Self {
        self.refuse = true;
        self
    }

    pub fn store(&self) -> MemoryStore {
        self.store.clone()
    }

    pub fn connections(&self) -> Vec<(DatabaseEndpoint, Credentials)> {
        self.connections
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl StoreConnector for MemoryConnector {
    type Store = MemoryStore;

    async fn connect(
        &self,
        endpoint: &DatabaseEndpoint,
        credentials: &Credentials,
    ) -> Result<MemoryStore> {
        self.connections
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((endpoint.clone(), credentials.clone()));

        if self.refuse {
            return Err(Error::database_connection_failed(
                &endpoint.to_string(),
                "ORA-12541: TNS:no listener",
            ));
        }
        Ok(self.store.clone())
    }
}
