//! On-disk layout of tables: heap files made of fixed-size pages, and
//! the values stored in them.

mod catalog;
mod cell;
mod heap_file;
mod heap_page;
mod page;
mod page_id;
mod record_id;
mod schema;
mod tuple;

pub use catalog::Catalog;
pub use cell::Cell;
pub use heap_file::{HeapFile, HeapFileIterator};
pub use heap_page::HeapPage;
pub use page::Page;
pub use page_id::HeapPageID;
pub use record_id::RecordID;
pub use schema::{small_int_schema, Field, TableSchema, Type};
pub use tuple::Tuple;
