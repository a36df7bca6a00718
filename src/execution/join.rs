use super::{not_opened, OpIterator};
use crate::{
    error::SmallError,
    operator::JoinPredicate,
    storage::{TableSchema, Tuple},
    types::SmallResult,
};

/// Nested loop join: for every tuple of the left child, the right child
/// is scanned from the start.
///
/// Output tuples are the left cells followed by the right cells.
pub struct Join {
    predicate: JoinPredicate,
    left: Box<dyn OpIterator>,
    right: Box<dyn OpIterator>,
    schema: TableSchema,

    // the left tuple being matched, `None` before the first one
    current: Option<Tuple>,
    opened: bool,
}

impl Join {
    pub fn new(
        predicate: JoinPredicate,
        left: Box<dyn OpIterator>,
        right: Box<dyn OpIterator>,
    ) -> Result<Self, SmallError> {
        let left_field = left.get_schema().get_field(predicate.field1);
        let right_field = right.get_schema().get_field(predicate.field2);
        match (left_field, right_field) {
            (Some(a), Some(b)) if a.t == b.t => {}
            (Some(a), Some(b)) => {
                return Err(SmallError::new(&format!(
                    "can't join {} field {} with {} field {}",
                    a.t, a.name, b.t, b.name
                )))
            }
            _ => {
                return Err(SmallError::new(&format!(
                    "join predicate {} refers to a missing field, schemas: [{}] and [{}]",
                    predicate,
                    left.get_schema(),
                    right.get_schema()
                )))
            }
        }

        let schema = TableSchema::merge(left.get_schema(), right.get_schema());
        Ok(Self {
            predicate,
            left,
            right,
            schema,
            current: None,
            opened: false,
        })
    }

    pub fn get_join_predicate(&self) -> &JoinPredicate {
        &self.predicate
    }

    pub fn get_join_field_name1(&self) -> &str {
        self.schema.get_fields()[self.predicate.field1].name.as_str()
    }

    pub fn get_join_field_name2(&self) -> &str {
        let offset = self.left.get_schema().fields_count();
        self.schema.get_fields()[offset + self.predicate.field2]
            .name
            .as_str()
    }
}

impl OpIterator for Join {
    fn open(&mut self) -> SmallResult {
        self.left.open()?;
        self.right.open()?;
        self.current = None;
        self.opened = true;
        Ok(())
    }

    fn next(&mut self) -> Result<Option<Tuple>, SmallError> {
        if !self.opened {
            return Err(not_opened("Join"));
        }

        loop {
            if self.current.is_none() {
                match self.left.next()? {
                    Some(tuple) => self.current = Some(tuple),
                    None => return Ok(None),
                }
            }

            if let Some(outer) = self.current.as_ref() {
                while let Some(inner) = self.right.next()? {
                    if self.predicate.filter(outer, &inner) {
                        let mut cells = outer.get_cells().clone();
                        cells.extend(inner.get_cells().iter().cloned());
                        return Ok(Some(Tuple::new(cells)));
                    }
                }
            }

            // the right side is exhausted for this left tuple
            self.current = None;
            self.right.rewind()?;
        }
    }

    fn rewind(&mut self) -> SmallResult {
        self.left.rewind()?;
        self.right.rewind()?;
        self.current = None;
        Ok(())
    }

    fn close(&mut self) {
        self.left.close();
        self.right.close();
        self.current = None;
        self.opened = false;
    }

    fn get_schema(&self) -> &TableSchema {
        &self.schema
    }
}
