use super::{not_opened, OpIterator};
use crate::{
    error::SmallError,
    storage::{TableSchema, Tuple},
    types::SmallResult,
};

/// Serves a fixed list of tuples, e.g. the rows of an insert.
pub struct TupleIterator {
    schema: TableSchema,
    tuples: Vec<Tuple>,
    cursor: Option<usize>,
}

impl TupleIterator {
    pub fn new(schema: &TableSchema, tuples: Vec<Tuple>) -> Self {
        Self {
            schema: schema.clone(),
            tuples,
            cursor: None,
        }
    }
}

impl OpIterator for TupleIterator {
    fn open(&mut self) -> SmallResult {
        self.cursor = Some(0);
        Ok(())
    }

    fn next(&mut self) -> Result<Option<Tuple>, SmallError> {
        let cursor = self.cursor.as_mut().ok_or_else(|| not_opened("TupleIterator"))?;
        let tuple = self.tuples.get(*cursor).cloned();
        if tuple.is_some() {
            *cursor += 1;
        }
        Ok(tuple)
    }

    fn rewind(&mut self) -> SmallResult {
        self.open()
    }

    fn close(&mut self) {
        self.cursor = None;
    }

    fn get_schema(&self) -> &TableSchema {
        &self.schema
    }
}
