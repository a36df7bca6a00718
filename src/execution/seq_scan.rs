use std::sync::Arc;

use super::{not_opened, OpIterator};
use crate::{
    buffer_pool::BufferPool,
    error::SmallError,
    storage::{Field, HeapFile, HeapFileIterator, TableSchema, Tuple},
    transaction::Transaction,
    types::SmallResult,
    utils::HandyRwLock,
};

/// Reads every tuple of a table, in page order, through the buffer
/// pool.
pub struct SeqScan {
    tx: Transaction,
    pool: Arc<BufferPool>,
    table: Arc<HeapFile>,
    alias: String,

    // the table's schema, every field name prefixed with "<alias>."
    schema: TableSchema,

    it: Option<HeapFileIterator>,
}

impl SeqScan {
    pub fn new(
        tx: &Transaction,
        pool: &Arc<BufferPool>,
        table_id: u32,
        alias: &str,
    ) -> Result<Self, SmallError> {
        let table = pool
            .get_catalog()
            .rl()
            .get_table(&table_id)
            .ok_or_else(|| SmallError::new(&format!("table {} not found", table_id)))?;

        let fields = table
            .get_schema()
            .get_fields()
            .iter()
            .map(|f| Field::new(&format!("{}.{}", alias, f.name), f.t))
            .collect();

        Ok(Self {
            tx: *tx,
            pool: Arc::clone(pool),
            table,
            alias: alias.to_string(),
            schema: TableSchema::new(fields),
            it: None,
        })
    }

    pub fn get_alias(&self) -> &str {
        &self.alias
    }

    pub fn get_table_name(&self) -> Option<String> {
        self.pool
            .get_catalog()
            .rl()
            .get_table_name(&self.table.get_id())
    }
}

impl OpIterator for SeqScan {
    fn open(&mut self) -> SmallResult {
        self.it = Some(self.table.iter(&self.tx, &self.pool));
        Ok(())
    }

    fn next(&mut self) -> Result<Option<Tuple>, SmallError> {
        let it = self.it.as_mut().ok_or_else(|| not_opened("SeqScan"))?;
        it.next().transpose()
    }

    fn rewind(&mut self) -> SmallResult {
        let it = self.it.as_mut().ok_or_else(|| not_opened("SeqScan"))?;
        it.rewind();
        Ok(())
    }

    fn close(&mut self) {
        self.it = None;
    }

    fn get_schema(&self) -> &TableSchema {
        &self.schema
    }
}
