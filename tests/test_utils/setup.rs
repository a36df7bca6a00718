use std::{
    ops::Deref,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use small_heap::{small_int_schema, utils, Database, DatabaseConfig, HeapFile};

/// Page size that holds exactly 3 tuples of 2 int columns.
pub const SMALL_PAGE_SIZE: usize = 64;

/// Page size that holds exactly 2 tuples of 2 int columns.
pub const TINY_PAGE_SIZE: usize = 40;

static TABLE_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// # Conduct the initialization
///
/// - Setting up log configurations.
pub fn setup() {
    utils::init_log();
}

/// A config with short lock waits, so tests that run into a held lock
/// give up quickly.
pub fn test_config() -> DatabaseConfig {
    DatabaseConfig::default().with_lock_wait(Duration::from_millis(100), Duration::from_millis(200))
}

/// A table file under the system temp dir, removed when the guard goes
/// out of scope.
///
/// An open `HeapFile` keeps working after its file is removed, so the
/// guard may be dropped before the table.
pub struct TablePath(PathBuf);

impl Deref for TablePath {
    type Target = Path;

    fn deref(&self) -> &Path {
        &self.0
    }
}

impl AsRef<Path> for TablePath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl Drop for TablePath {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.0);
    }
}

/// A path under the system temp dir that no other test uses. Any
/// leftover file from a previous run is removed.
pub fn new_table_path() -> TablePath {
    let path = std::env::temp_dir().join(format!(
        "small-heap-{}-{}.dat",
        std::process::id(),
        TABLE_COUNTER.fetch_add(1, Ordering::SeqCst),
    ));
    let _ = std::fs::remove_file(&path);
    TablePath(path)
}

fn table_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "table".to_string())
}

/// Create an empty table with `columns` int columns in a fresh file.
pub fn new_int_table(db: &Database, columns: usize) -> Arc<HeapFile> {
    let path = new_table_path();
    open_int_table(db, &path, columns)
}

/// Open (or create) the int table stored at `path`.
pub fn open_int_table(db: &Database, path: &Path, columns: usize) -> Arc<HeapFile> {
    db.create_table(path, &table_name(path), &small_int_schema(columns, ""))
        .unwrap()
}
