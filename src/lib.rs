pub mod buffer_pool;
pub mod config;
pub mod database;
pub mod execution;
pub mod io;
pub mod storage;
pub mod transaction;
pub mod types;
pub mod utils;

mod error;
mod log;
mod operator;

pub use buffer_pool::BufferPool;
pub use config::DatabaseConfig;
pub use database::Database;
pub use error::{ErrorKind, SmallError};
pub use operator::{JoinPredicate, Op, Predicate};
pub use storage::{small_int_schema, Cell, HeapFile, TableSchema, Tuple};
