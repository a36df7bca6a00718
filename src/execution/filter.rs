use super::{not_opened, OpIterator};
use crate::{
    error::SmallError,
    operator::Predicate,
    storage::{TableSchema, Tuple},
    types::SmallResult,
};

/// Passes through the child's tuples that satisfy the predicate.
pub struct Filter {
    predicate: Predicate,
    child: Box<dyn OpIterator>,
    opened: bool,
}

impl Filter {
    pub fn new(predicate: Predicate, child: Box<dyn OpIterator>) -> Result<Self, SmallError> {
        let schema = child.get_schema();
        let field = schema.get_field(predicate.field_index).ok_or_else(|| {
            SmallError::new(&format!(
                "predicate {} refers to a missing field, schema: [{}]",
                predicate, schema
            ))
        })?;
        if !predicate.cell.matches(&field.t) {
            return Err(SmallError::new(&format!(
                "predicate {} can't be applied to {} field {}",
                predicate, field.t, field.name
            )));
        }

        Ok(Self {
            predicate,
            child,
            opened: false,
        })
    }

    pub fn get_predicate(&self) -> &Predicate {
        &self.predicate
    }
}

impl OpIterator for Filter {
    fn open(&mut self) -> SmallResult {
        self.child.open()?;
        self.opened = true;
        Ok(())
    }

    fn next(&mut self) -> Result<Option<Tuple>, SmallError> {
        if !self.opened {
            return Err(not_opened("Filter"));
        }

        while let Some(tuple) = self.child.next()? {
            if self.predicate.filter(&tuple) {
                return Ok(Some(tuple));
            }
        }
        Ok(None)
    }

    fn rewind(&mut self) -> SmallResult {
        self.child.rewind()
    }

    fn close(&mut self) {
        self.child.close();
        self.opened = false;
    }

    fn get_schema(&self) -> &TableSchema {
        self.child.get_schema()
    }
}
