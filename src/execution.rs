//! Pull-based query operators.
//!
//! Every operator produces tuples one at a time via `next`, after
//! `open` has been called. Operators are stacked by owning their child
//! as a `Box<dyn OpIterator>`.

mod aggregate;
mod delete;
mod filter;
mod insert;
mod join;
mod seq_scan;
mod tuple_iterator;

pub use aggregate::{Aggregate, AggregateOp};
pub use delete::Delete;
pub use filter::Filter;
pub use insert::Insert;
pub use join::Join;
pub use seq_scan::SeqScan;
pub use tuple_iterator::TupleIterator;

use crate::{
    error::SmallError,
    storage::{TableSchema, Tuple},
    types::SmallResult,
};

pub trait OpIterator {
    fn open(&mut self) -> SmallResult;

    /// The next tuple, `None` once the operator is exhausted. Fails if
    /// the operator hasn't been opened.
    fn next(&mut self) -> Result<Option<Tuple>, SmallError>;

    /// Start over from the first tuple.
    fn rewind(&mut self) -> SmallResult;

    fn close(&mut self);

    fn get_schema(&self) -> &TableSchema;
}

fn not_opened(name: &str) -> SmallError {
    SmallError::new(&format!("{} is not opened", name))
}
