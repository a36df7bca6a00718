use std::{
    collections::hash_map::DefaultHasher,
    fmt,
    fs::{File, OpenOptions},
    hash::{Hash, Hasher},
    io::{Read, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard},
};

use log::debug;

use super::{HeapPage, HeapPageID, Page, TableSchema, Tuple};
use crate::{
    buffer_pool::BufferPool,
    error::SmallError,
    transaction::{Permission, Transaction},
    types::{Pod, SmallResult},
    utils::{HandyMutex, HandyRwLock},
};

/// A table stored as an unordered collection of fixed-size pages.
///
/// The file is nothing but the pages, page `i` starts at
/// `i * page_size`. The page count is always derived from the file
/// length, so it never goes stale when another transaction appends a
/// page.
pub struct HeapFile {
    table_id: u32,
    path: PathBuf,
    schema: TableSchema,
    page_size: usize,

    // Serializes positioned reads/writes, and makes "count pages then
    // append one" atomic.
    file: Mutex<File>,
}

impl HeapFile {
    /// Open the heap file at `path`, create it if it doesn't exist.
    ///
    /// The table id is derived from the absolute path of the file, so
    /// it's stable across restarts.
    pub fn new<P: AsRef<Path>>(
        path: P,
        schema: &TableSchema,
        page_size: usize,
    ) -> Result<Self, SmallError> {
        if HeapPage::calculate_slots_count(schema, page_size) == 0 {
            return Err(SmallError::new(&format!(
                "a page of {} bytes can't hold a single tuple of schema [{}]",
                page_size, schema
            )));
        }

        let file = OpenOptions::new()
            .write(true)
            .read(true)
            .create(true)
            .open(path.as_ref())?;
        let path = std::fs::canonicalize(path.as_ref())?;

        let len = file.metadata()?.len();
        if len % page_size as u64 != 0 {
            return Err(SmallError::new(&format!(
                "file {:?} has {} bytes, not a multiple of the page size {}",
                path, len, page_size
            )));
        }

        let mut hasher = DefaultHasher::new();
        path.hash(&mut hasher);
        let table_id = hasher.finish() as u32;

        Ok(Self {
            table_id,
            path,
            schema: schema.clone(),
            page_size,
            file: Mutex::new(file),
        })
    }

    fn get_file(&self) -> MutexGuard<'_, File> {
        self.file.lk()
    }

    pub fn get_id(&self) -> u32 {
        self.table_id
    }

    pub fn get_schema(&self) -> &TableSchema {
        &self.schema
    }

    pub fn get_path(&self) -> &Path {
        &self.path
    }

    pub fn get_page_size(&self) -> usize {
        self.page_size
    }

    pub fn num_pages(&self) -> Result<usize, SmallError> {
        let len = self.get_file().metadata()?.len();
        Ok((len / self.page_size as u64) as usize)
    }

    /// Read a page from disk, bypassing the buffer pool.
    pub fn read_page(&self, pid: &HeapPageID) -> Result<HeapPage, SmallError> {
        self.check_pid(pid)?;

        let mut file = self.get_file();
        let pages = (file.metadata()?.len() / self.page_size as u64) as u32;
        if pid.page_index >= pages {
            return Err(SmallError::new(&format!(
                "page {:?} out of range, table has {} pages",
                pid, pages
            )));
        }

        let mut buf = HeapPage::empty_page_data(self.page_size);
        file.seek(SeekFrom::Start(pid.offset(self.page_size)))?;
        file.read_exact(&mut buf)?;
        drop(file);

        HeapPage::new(pid, &buf, &self.schema)
    }

    /// Write the page to its slot in the file, overwriting the old
    /// content.
    pub fn write_page(&self, page: &HeapPage) -> SmallResult {
        let pid = page.get_pid();
        self.check_pid(&pid)?;

        let data = page.get_page_data();
        let mut file = self.get_file();
        file.seek(SeekFrom::Start(pid.offset(self.page_size)))?;
        file.write_all(&data)?;
        file.sync_data()?;

        debug!("write page {:?} to disk", pid);
        Ok(())
    }

    /// Append an empty page to the file, return its id.
    fn append_empty_page(&self) -> Result<HeapPageID, SmallError> {
        let mut file = self.get_file();
        let index = file.metadata()?.len() / self.page_size as u64;
        let pid = HeapPageID::new(self.table_id, index as u32);

        file.seek(SeekFrom::Start(pid.offset(self.page_size)))?;
        file.write_all(&HeapPage::empty_page_data(self.page_size))?;
        file.sync_data()?;

        debug!("append new page {:?}", pid);
        Ok(pid)
    }

    fn check_pid(&self, pid: &HeapPageID) -> SmallResult {
        if pid.table_id != self.table_id {
            return Err(SmallError::new(&format!(
                "page {:?} doesn't belong to table {}",
                pid, self.table_id
            )));
        }
        Ok(())
    }

    /// Insert the tuple into the first page that has a free slot. The
    /// tuple's record id is set to its new location.
    ///
    /// Existing pages are fetched through the buffer pool with write
    /// permission. If all of them are full, an empty page is appended
    /// to the file directly and then fetched the same way.
    ///
    /// Return the pages that were modified.
    pub fn insert_tuple(
        &self,
        tx: &Transaction,
        tuple: &mut Tuple,
        pool: &BufferPool,
    ) -> Result<Vec<Pod<HeapPage>>, SmallError> {
        if !tuple.matches(&self.schema) {
            return Err(SmallError::new(&format!(
                "tuple {} doesn't match schema [{}] of table {}",
                tuple, self.schema, self.table_id
            )));
        }

        let mut page_index = 0;
        while page_index < self.num_pages()? {
            let pid = HeapPageID::new(self.table_id, page_index as u32);
            let page_pod = pool.get_page(tx, Permission::ReadWrite, &pid)?;
            if Self::insert_into_page(&page_pod, tuple)? {
                return Ok(vec![page_pod]);
            }
            page_index += 1;
        }

        // All pages are full.
        let pid = self.append_empty_page()?;
        let page_pod = pool.get_page(tx, Permission::ReadWrite, &pid)?;
        if Self::insert_into_page(&page_pod, tuple)? {
            return Ok(vec![page_pod]);
        }
        Err(SmallError::new(&format!(
            "new page {:?} has no free slot for tuple {}",
            pid, tuple
        )))
    }

    // Insert the tuple if the page has a free slot, return whether it
    // did.
    fn insert_into_page(page_pod: &Pod<HeapPage>, tuple: &mut Tuple) -> Result<bool, SmallError> {
        let mut page = page_pod.wl();
        if page.empty_slots_count() == 0 {
            return Ok(false);
        }
        let rid = page.insert_tuple(tuple)?;
        tuple.set_rid(Some(rid));
        Ok(true)
    }

    /// Remove the tuple from the page its record id points to.
    ///
    /// Return the pages that were modified.
    pub fn delete_tuple(
        &self,
        tx: &Transaction,
        tuple: &Tuple,
        pool: &BufferPool,
    ) -> Result<Vec<Pod<HeapPage>>, SmallError> {
        let rid = tuple
            .get_rid()
            .ok_or_else(|| SmallError::new(&format!("tuple {} has no record id", tuple)))?;
        self.check_pid(&rid.pid)?;

        let page_pod = pool.get_page(tx, Permission::ReadWrite, &rid.pid)?;
        page_pod.wl().delete_tuple(tuple)?;
        Ok(vec![page_pod])
    }

    /// Iterate over all tuples of the table, one page at a time through
    /// the buffer pool.
    pub fn iter(self: &Arc<Self>, tx: &Transaction, pool: &Arc<BufferPool>) -> HeapFileIterator {
        HeapFileIterator::new(Arc::clone(self), Arc::clone(pool), tx)
    }
}

impl fmt::Display for HeapFile {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "HeapFile(id: {}, path: {:?})", self.table_id, self.path)
    }
}

impl fmt::Debug for HeapFile {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self)
    }
}

/// A lazy, restartable scan over a heap file.
///
/// Pages are requested with read permission, so the transaction ends
/// up holding a shared lock on every page it has visited.
pub struct HeapFileIterator {
    file: Arc<HeapFile>,
    pool: Arc<BufferPool>,
    tx: Transaction,

    // the page count when the scan started
    pages_count: Option<usize>,
    next_page: usize,
    page_tuples: std::vec::IntoIter<Tuple>,
    done: bool,
}

impl HeapFileIterator {
    pub fn new(file: Arc<HeapFile>, pool: Arc<BufferPool>, tx: &Transaction) -> Self {
        Self {
            file,
            pool,
            tx: *tx,
            pages_count: None,
            next_page: 0,
            page_tuples: Vec::new().into_iter(),
            done: false,
        }
    }

    /// Restart the scan from the first page.
    pub fn rewind(&mut self) {
        self.pages_count = None;
        self.next_page = 0;
        self.page_tuples = Vec::new().into_iter();
        self.done = false;
    }

    fn load_next_page(&mut self) -> Result<bool, SmallError> {
        let pages_count = match self.pages_count {
            Some(count) => count,
            None => {
                let count = self.file.num_pages()?;
                self.pages_count = Some(count);
                count
            }
        };

        if self.next_page >= pages_count {
            return Ok(false);
        }

        let pid = HeapPageID::new(self.file.get_id(), self.next_page as u32);
        let page_pod = self.pool.get_page(&self.tx, Permission::ReadOnly, &pid)?;
        let tuples: Vec<Tuple> = page_pod.rl().iter().cloned().collect();

        self.page_tuples = tuples.into_iter();
        self.next_page += 1;
        Ok(true)
    }
}

impl Iterator for HeapFileIterator {
    type Item = Result<Tuple, SmallError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        loop {
            if let Some(tuple) = self.page_tuples.next() {
                return Some(Ok(tuple));
            }

            match self.load_next_page() {
                Ok(true) => continue,
                Ok(false) => {
                    self.done = true;
                    return None;
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
    }
}
