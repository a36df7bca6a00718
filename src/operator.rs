use std::fmt;

use crate::storage::{Cell, Tuple};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Op {
    Equals,
    GreaterThan,
    GreaterThanOrEq,
    LessThan,
    LessThanOrEq,
    NotEquals,
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            Op::Equals => "=",
            Op::GreaterThan => ">",
            Op::GreaterThanOrEq => ">=",
            Op::LessThan => "<",
            Op::LessThanOrEq => "<=",
            Op::NotEquals => "<>",
        };
        write!(f, "{}", s)
    }
}

impl Op {
    /// `a <op> b`. Cells of different variants are never related.
    pub fn compare(&self, a: &Cell, b: &Cell) -> bool {
        if std::mem::discriminant(a) != std::mem::discriminant(b) {
            return *self == Op::NotEquals;
        }

        match self {
            Op::Equals => a == b,
            Op::NotEquals => a != b,
            Op::GreaterThan => a > b,
            Op::GreaterThanOrEq => a >= b,
            Op::LessThan => a < b,
            Op::LessThanOrEq => a <= b,
        }
    }
}

/// Compares one field of a tuple against a constant.
#[derive(Clone, Debug)]
pub struct Predicate {
    pub field_index: usize,
    pub op: Op,
    pub cell: Cell,
}

impl Predicate {
    pub fn new(field_index: usize, op: Op, cell: &Cell) -> Self {
        Self {
            field_index,
            op,
            cell: cell.clone(),
        }
    }

    /// `tuple[field_index] <op> cell`. A tuple without that field never
    /// matches.
    pub fn filter(&self, tuple: &Tuple) -> bool {
        if self.field_index >= tuple.cells_count() {
            return false;
        }

        self.op
            .compare(&tuple.get_cells()[self.field_index], &self.cell)
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "field_{} {} {}", self.field_index, self.op, self.cell)
    }
}

/// Compares a field of one tuple against a field of another, the
/// condition of a join.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct JoinPredicate {
    pub field1: usize,
    pub op: Op,
    pub field2: usize,
}

impl JoinPredicate {
    pub fn new(field1: usize, op: Op, field2: usize) -> Self {
        Self { field1, op, field2 }
    }

    /// `t1[field1] <op> t2[field2]`.
    pub fn filter(&self, t1: &Tuple, t2: &Tuple) -> bool {
        match (t1.get_cells().get(self.field1), t2.get_cells().get(self.field2)) {
            (Some(a), Some(b)) => self.op.compare(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for JoinPredicate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "left.field_{} {} right.field_{}", self.field1, self.op, self.field2)
    }
}
