use std::{
    path::Path,
    sync::{Arc, RwLock},
};

use log::info;

use crate::{
    buffer_pool::BufferPool,
    config::DatabaseConfig,
    error::SmallError,
    storage::{Catalog, HeapFile, TableSchema},
    transaction::Transaction,
    types::{Pod, SmallResult},
    utils::HandyRwLock,
};

/// Owns the catalog and the buffer pool.
///
/// There is no global instance, share it with an `Arc` when more than
/// one thread needs it.
pub struct Database {
    config: DatabaseConfig,
    catalog: Pod<Catalog>,
    buffer_pool: Arc<BufferPool>,
}

impl Database {
    pub fn new(config: DatabaseConfig) -> Self {
        let catalog = Arc::new(RwLock::new(Catalog::new()));
        let buffer_pool = Arc::new(BufferPool::new(&config, Arc::clone(&catalog)));
        Self {
            config,
            catalog,
            buffer_pool,
        }
    }

    pub fn get_config(&self) -> &DatabaseConfig {
        &self.config
    }

    pub fn get_catalog(&self) -> Pod<Catalog> {
        Arc::clone(&self.catalog)
    }

    pub fn get_buffer_pool(&self) -> Arc<BufferPool> {
        Arc::clone(&self.buffer_pool)
    }

    /// Open the heap file at `path` (created if missing) and register
    /// it under `name`.
    pub fn create_table<P: AsRef<Path>>(
        &self,
        path: P,
        name: &str,
        schema: &TableSchema,
    ) -> Result<Arc<HeapFile>, SmallError> {
        let table = Arc::new(HeapFile::new(path, schema, self.config.page_size)?);
        self.catalog.wl().add_table(Arc::clone(&table), name);
        Ok(table)
    }

    pub fn get_table(&self, name: &str) -> Option<Arc<HeapFile>> {
        let catalog = self.catalog.rl();
        catalog
            .get_table_id(name)
            .and_then(|id| catalog.get_table(&id))
    }

    pub fn begin(&self) -> Transaction {
        let tx = Transaction::new();
        info!("{} started", tx);
        tx
    }

    pub fn commit(&self, tx: &Transaction) -> SmallResult {
        self.buffer_pool.transaction_complete(tx, true)
    }

    pub fn abort(&self, tx: &Transaction) -> SmallResult {
        self.buffer_pool.transaction_complete(tx, false)
    }
}

impl Default for Database {
    fn default() -> Self {
        Self::new(DatabaseConfig::default())
    }
}
