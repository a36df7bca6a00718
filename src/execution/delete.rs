use std::sync::Arc;

use log::debug;

use super::{insert::count_schema, not_opened, OpIterator};
use crate::{
    buffer_pool::BufferPool,
    error::SmallError,
    storage::{Cell, TableSchema, Tuple},
    transaction::Transaction,
    types::SmallResult,
};

/// Deletes every tuple the child produces from the table it was read
/// from, so the child must yield tuples carrying a record id.
///
/// Yields a single tuple holding the number of deleted rows, then
/// nothing.
pub struct Delete {
    tx: Transaction,
    pool: Arc<BufferPool>,
    child: Box<dyn OpIterator>,
    schema: TableSchema,
    opened: bool,
    done: bool,
}

impl Delete {
    pub fn new(tx: &Transaction, pool: &Arc<BufferPool>, child: Box<dyn OpIterator>) -> Self {
        Self {
            tx: *tx,
            pool: Arc::clone(pool),
            child,
            schema: count_schema(),
            opened: false,
            done: false,
        }
    }
}

impl OpIterator for Delete {
    fn open(&mut self) -> SmallResult {
        self.child.open()?;
        self.opened = true;
        self.done = false;
        Ok(())
    }

    fn next(&mut self) -> Result<Option<Tuple>, SmallError> {
        if !self.opened {
            return Err(not_opened("Delete"));
        }
        if self.done {
            return Ok(None);
        }

        let mut count = 0;
        while let Some(tuple) = self.child.next()? {
            self.pool.delete_tuple(&self.tx, &tuple)?;
            count += 1;
        }
        debug!("{} deleted {} rows", self.tx, count);

        self.done = true;
        Ok(Some(Tuple::new(vec![Cell::Int64(count)])))
    }

    fn rewind(&mut self) -> SmallResult {
        self.child.rewind()?;
        self.done = false;
        Ok(())
    }

    fn close(&mut self) {
        self.child.close();
        self.opened = false;
    }

    fn get_schema(&self) -> &TableSchema {
        &self.schema
    }
}
