use std::sync::Arc;

use log::debug;

use super::{not_opened, OpIterator};
use crate::{
    buffer_pool::BufferPool,
    error::SmallError,
    storage::{Cell, Field, TableSchema, Tuple, Type},
    transaction::Transaction,
    types::SmallResult,
    utils::HandyRwLock,
};

/// Inserts every tuple of the child into a table.
///
/// Yields a single tuple holding the number of inserted rows, then
/// nothing.
pub struct Insert {
    tx: Transaction,
    pool: Arc<BufferPool>,
    child: Box<dyn OpIterator>,
    table_id: u32,
    schema: TableSchema,
    opened: bool,
    done: bool,
}

impl Insert {
    pub fn new(
        tx: &Transaction,
        pool: &Arc<BufferPool>,
        child: Box<dyn OpIterator>,
        table_id: u32,
    ) -> Result<Self, SmallError> {
        let table_schema = pool
            .get_catalog()
            .rl()
            .get_schema(&table_id)
            .ok_or_else(|| SmallError::new(&format!("table {} not found", table_id)))?;

        let child_types: Vec<Type> = child.get_schema().get_fields().iter().map(|f| f.t).collect();
        let table_types: Vec<Type> = table_schema.get_fields().iter().map(|f| f.t).collect();
        if child_types != table_types {
            return Err(SmallError::new(&format!(
                "can't insert [{}] into table {} with schema [{}]",
                child.get_schema(),
                table_id,
                table_schema
            )));
        }

        Ok(Self {
            tx: *tx,
            pool: Arc::clone(pool),
            child,
            table_id,
            schema: count_schema(),
            opened: false,
            done: false,
        })
    }
}

pub(super) fn count_schema() -> TableSchema {
    TableSchema::new(vec![Field::new("count", Type::Int64)])
}

impl OpIterator for Insert {
    fn open(&mut self) -> SmallResult {
        self.child.open()?;
        self.opened = true;
        self.done = false;
        Ok(())
    }

    fn next(&mut self) -> Result<Option<Tuple>, SmallError> {
        if !self.opened {
            return Err(not_opened("Insert"));
        }
        if self.done {
            return Ok(None);
        }

        let mut count = 0;
        while let Some(tuple) = self.child.next()? {
            // the child's record id points into another table, if any
            let mut row = Tuple::new(tuple.get_cells().clone());
            self.pool.insert_tuple(&self.tx, self.table_id, &mut row)?;
            count += 1;
        }
        debug!("{} inserted {} rows into table {}", self.tx, count, self.table_id);

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
