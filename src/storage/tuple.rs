use std::fmt;

use itertools::Itertools;

use super::{Cell, RecordID, TableSchema};
use crate::{
    error::SmallError,
    io::{Serializeable, SmallReader, SmallWriter},
};

#[derive(Clone)]
pub struct Tuple {
    cells: Vec<Cell>,

    /// Where the tuple is stored, `None` if it hasn't been inserted
    /// into a page yet.
    rid: Option<RecordID>,
}

// constructors
impl Tuple {
    pub fn new(cells: Vec<Cell>) -> Self {
        Self { cells, rid: None }
    }

    /// A tuple of `width` int cells, all set to `value`.
    pub fn new_int_tuple(value: i64, width: usize) -> Self {
        Self::new(vec![Cell::Int64(value); width])
    }
}

impl Tuple {
    pub fn get_cell(&self, i: usize) -> Cell {
        self.cells[i].clone()
    }

    pub fn get_cells(&self) -> &Vec<Cell> {
        &self.cells
    }

    pub fn set_cell(&mut self, i: usize, cell: Cell) {
        self.cells[i] = cell;
    }

    pub fn cells_count(&self) -> usize {
        self.cells.len()
    }

    pub fn get_rid(&self) -> Option<RecordID> {
        self.rid
    }

    pub fn set_rid(&mut self, rid: Option<RecordID>) {
        self.rid = rid;
    }

    /// Check whether the tuple can be stored in a table with the
    /// given schema.
    pub fn matches(&self, schema: &TableSchema) -> bool {
        self.cells.len() == schema.fields_count()
            && self
                .cells
                .iter()
                .zip(schema.get_fields())
                .all(|(cell, field)| cell.matches(&field.t))
    }
}

impl Serializeable for Tuple {
    type Reference = TableSchema;

    fn encode(&self, writer: &mut SmallWriter, schema: &TableSchema) {
        for (cell, field) in self.cells.iter().zip(schema.get_fields()) {
            cell.encode(writer, &field.t);
        }
    }

    fn decode(reader: &mut SmallReader, schema: &TableSchema) -> Result<Self, SmallError> {
        let mut cells = Vec::with_capacity(schema.fields_count());
        for field in schema.get_fields() {
            cells.push(Cell::decode(reader, &field.t)?);
        }
        Ok(Self::new(cells))
    }
}

// The location is not part of the tuple's value.
impl PartialEq for Tuple {
    fn eq(&self, other: &Self) -> bool {
        self.cells == other.cells
    }
}

impl Eq for Tuple {}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{{{}}}", self.cells.iter().join(", "))
    }
}

impl fmt::Debug for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.rid {
            Some(rid) => write!(f, "{}@{}", self, rid),
            None => write!(f, "{}", self),
        }
    }
}
