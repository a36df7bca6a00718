use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex, MutexGuard, RwLock},
    time::{Duration, Instant},
};

use log::{debug, info};
use rand::Rng;

use crate::{
    config::DatabaseConfig,
    error::SmallError,
    storage::{Catalog, HeapFile, HeapPage, HeapPageID, Page, Tuple},
    transaction::{Lock, LockManager, Permission, Transaction},
    types::{Pod, ResultPod, SmallResult},
    utils::{HandyMutex, HandyRwLock},
};

type Key = HeapPageID;

/// Resident pages, plus the order they were brought in.
struct PageCache {
    buffer: HashMap<Key, Pod<HeapPage>>,
    queue: VecDeque<Key>,
}

impl PageCache {
    fn new() -> Self {
        Self {
            buffer: HashMap::new(),
            queue: VecDeque::new(),
        }
    }

    fn len(&self) -> usize {
        self.buffer.len()
    }

    fn get(&self, pid: &Key) -> Option<Pod<HeapPage>> {
        self.buffer.get(pid).cloned()
    }

    /// Add the page, or replace the cached version of it. A replaced
    /// page keeps its position in the eviction queue.
    fn insert(&mut self, pid: Key, page: Pod<HeapPage>) {
        if self.buffer.insert(pid, page).is_none() {
            self.queue.push_back(pid);
        }
    }

    fn remove(&mut self, pid: &Key) -> Option<Pod<HeapPage>> {
        let page = self.buffer.remove(pid)?;
        self.queue.retain(|k| k != pid);
        Some(page)
    }

    /// Evict the oldest clean page.
    ///
    /// Dirty pages are never evicted: without a log there is no way to
    /// undo them once they hit the disk.
    fn evict(&mut self) -> SmallResult {
        let victim = self
            .queue
            .iter()
            .find(|pid| match self.buffer.get(*pid) {
                Some(page) => page.rl().is_dirty().is_none(),
                None => true,
            })
            .copied();

        match victim {
            Some(pid) => {
                self.remove(&pid);
                debug!("evict page {:?}", pid);
                Ok(())
            }
            None if self.buffer.is_empty() => {
                Err(SmallError::new("buffer pool is empty, cannot evict page"))
            }
            None => Err(SmallError::new(&format!(
                "all {} pages in the buffer pool are dirty, cannot evict page",
                self.buffer.len()
            ))),
        }
    }

    /// Resident pages dirtied by the given transaction, in queue order.
    fn dirty_pages(&self, tx: &Transaction) -> Vec<Key> {
        self.queue
            .iter()
            .filter(|pid| {
                self.buffer
                    .get(*pid)
                    .map(|page| page.rl().is_dirty() == Some(*tx))
                    .unwrap_or(false)
            })
            .copied()
            .collect()
    }
}

/// The bounded page cache every page access goes through.
///
/// A page is handed out only after the requesting transaction holds
/// the matching lock on it. Locks follow strict two-phase locking: they
/// are released all together when the transaction completes.
///
/// Commit forces the transaction's dirty pages to disk, abort discards
/// them and rereads the pages from disk.
pub struct BufferPool {
    config: DatabaseConfig,
    catalog: Pod<Catalog>,
    lock_manager: LockManager,
    cache: Mutex<PageCache>,
}

impl BufferPool {
    pub fn new(config: &DatabaseConfig, catalog: Pod<Catalog>) -> Self {
        Self {
            config: config.clone(),
            catalog,
            lock_manager: LockManager::new(),
            cache: Mutex::new(PageCache::new()),
        }
    }

    fn cache(&self) -> MutexGuard<'_, PageCache> {
        self.cache.lk()
    }

    pub fn get_page_size(&self) -> usize {
        self.config.page_size
    }

    pub fn get_capacity(&self) -> usize {
        self.config.buffer_pool_pages
    }

    pub fn get_catalog(&self) -> Pod<Catalog> {
        Arc::clone(&self.catalog)
    }

    pub fn get_lock_manager(&self) -> &LockManager {
        &self.lock_manager
    }

    fn get_table(&self, table_id: u32) -> Result<Arc<HeapFile>, SmallError> {
        self.catalog
            .rl()
            .get_table(&table_id)
            .ok_or_else(|| SmallError::new(&format!("table {} not found", table_id)))
    }

    // Every request gets its own random deadline, so two transactions
    // waiting on each other are unlikely to give up at the same time.
    fn lock_deadline(&self) -> Instant {
        let min = self.config.lock_wait_min.as_millis() as u64;
        let max = self.config.lock_wait_max.as_millis() as u64;
        let wait = if max > min {
            rand::thread_rng().gen_range(min, max)
        } else {
            min
        };
        Instant::now() + Duration::from_millis(wait)
    }

    /// Retrieve the specified page with the associated permissions.
    /// Will acquire a lock and may block if that lock is held by
    /// another transaction.
    ///
    /// The retrieved page should be looked up in the buffer pool. If
    /// it is present, it should be returned. If it is not present, it
    /// should be added to the buffer pool and returned. If there is
    /// insufficient space in the buffer pool, a clean page is evicted
    /// and the new page is added in its place.
    ///
    /// Fails with `TransactionAborted` if the lock isn't granted before
    /// a randomized deadline, the caller should then abort the
    /// transaction.
    pub fn get_page(&self, tx: &Transaction, perm: Permission, pid: &Key) -> ResultPod<HeapPage> {
        self.lock_manager
            .request_lock(tx, perm.to_lock(), pid, self.lock_deadline())?;

        let mut cache = self.cache();
        if let Some(page) = cache.get(pid) {
            return Ok(page);
        }

        let table = self.get_table(pid.get_table_id())?;
        let page = table.read_page(pid)?;
        debug!("load page {:?} from disk", pid);

        if cache.len() >= self.get_capacity() {
            cache.evict()?;
        }

        let page_pod = Arc::new(RwLock::new(page));
        cache.insert(*pid, Arc::clone(&page_pod));
        Ok(page_pod)
    }

    /// Releases the lock on a page.
    ///
    /// Calling this is very risky: it breaks two-phase locking, other
    /// transactions may see or overwrite changes before they are
    /// committed.
    pub fn unsafe_release_page(&self, tx: &Transaction, pid: &Key) {
        self.lock_manager.release_lock(tx, pid);
    }

    /// Return true if the specified transaction has a lock on the
    /// specified page.
    pub fn holds_lock(&self, tx: &Transaction, pid: &Key) -> bool {
        self.lock_manager.holds_lock(tx, pid)
    }

    /// Add a tuple to the specified table on behalf of the transaction.
    /// The tuple's record id is set to its new location.
    ///
    /// The modified pages are marked dirty and (re)placed in the cache,
    /// so future requests see the up-to-date version.
    ///
    /// Return the ids of the modified pages.
    pub fn insert_tuple(
        &self,
        tx: &Transaction,
        table_id: u32,
        tuple: &mut Tuple,
    ) -> Result<Vec<Key>, SmallError> {
        let table = self.get_table(table_id)?;
        let pages = table.insert_tuple(tx, tuple, self)?;
        self.adopt_pages(tx, pages)
    }

    /// Remove the tuple from the page its record id points to.
    ///
    /// Return the ids of the modified pages.
    pub fn delete_tuple(&self, tx: &Transaction, tuple: &Tuple) -> Result<Vec<Key>, SmallError> {
        let rid = tuple
            .get_rid()
            .ok_or_else(|| SmallError::new(&format!("tuple {} has no record id", tuple)))?;
        let table = self.get_table(rid.pid.get_table_id())?;
        let pages = table.delete_tuple(tx, tuple, self)?;
        self.adopt_pages(tx, pages)
    }

    fn adopt_pages(&self, tx: &Transaction, pages: Vec<Pod<HeapPage>>) -> Result<Vec<Key>, SmallError> {
        let mut pids = Vec::with_capacity(pages.len());

        for page_pod in pages {
            let pid = page_pod.rl().get_pid();

            // The page was handed out under a write lock, this only
            // matters for pages that didn't come from `get_page`.
            if self.lock_manager.get_lock(tx, &pid) != Some(Lock::XLock) {
                self.lock_manager
                    .request_lock(tx, Lock::XLock, &pid, self.lock_deadline())?;
            }

            page_pod.wl().mark_dirty(true, tx);

            let mut cache = self.cache();
            if cache.get(&pid).is_none() && cache.len() >= self.get_capacity() {
                cache.evict()?;
            }
            cache.insert(pid, page_pod);
            pids.push(pid);
        }

        Ok(pids)
    }

    /// Commit or abort a given transaction, then release all locks
    /// associated to the transaction.
    ///
    /// Commit writes every page dirtied by the transaction to disk.
    /// Abort drops those pages and reads them again from disk, which
    /// discards the in-memory changes.
    ///
    /// Safe to call for a transaction that holds no lock and dirtied no
    /// page.
    pub fn transaction_complete(&self, tx: &Transaction, commit: bool) -> SmallResult {
        let result = if commit {
            // Pages left dirty by a failed flush would never be evicted
            // again, drop them as an abort does.
            self.flush_pages(tx).map_err(|e| {
                if let Err(discard_err) = self.discard_pages(tx) {
                    debug!("{} failed to discard pages: {}", tx, discard_err);
                }
                e
            })
        } else {
            self.discard_pages(tx)
        };

        self.lock_manager.release_all_locks(tx);

        match &result {
            Ok(_) if commit => info!("{} committed", tx),
            Ok(_) => info!("{} aborted", tx),
            Err(e) => info!("{} failed to complete (commit: {}): {}", tx, commit, e),
        }
        result
    }

    /// Write all pages of the specified transaction to disk.
    pub fn flush_pages(&self, tx: &Transaction) -> SmallResult {
        let pids = self.cache().dirty_pages(tx);
        for pid in pids {
            self.flush_page(&pid)?;
        }
        Ok(())
    }

    // Replace the pages dirtied by the transaction with their on-disk
    // version. A page that can't be read again is dropped from the
    // cache, the remaining pages are still handled and the first error
    // is returned.
    fn discard_pages(&self, tx: &Transaction) -> SmallResult {
        let mut cache = self.cache();
        let mut result = Ok(());
        for pid in cache.dirty_pages(tx) {
            cache.remove(&pid);

            let page = self
                .get_table(pid.get_table_id())
                .and_then(|table| table.read_page(&pid));
            match page {
                Ok(page) => {
                    cache.insert(pid, Arc::new(RwLock::new(page)));
                    debug!("{} reverted page {:?}", tx, pid);
                }
                Err(e) => {
                    debug!("{} dropped page {:?}: {}", tx, pid, e);
                    if result.is_ok() {
                        result = Err(e);
                    }
                }
            }
        }
        result
    }

    /// Write the content of a specific page to disk, the page is clean
    /// afterwards. Nothing happens if the page is not cached.
    pub fn flush_page(&self, pid: &Key) -> SmallResult {
        let page_pod = match self.cache().get(pid) {
            Some(page_pod) => page_pod,
            None => return Ok(()),
        };

        let table = self.get_table(pid.get_table_id())?;
        let mut page = page_pod.wl();
        table.write_page(&page)?;

        if let Some(tx) = page.is_dirty() {
            page.mark_dirty(false, &tx);
        }
        Ok(())
    }

    /// Flush all dirty pages to disk.
    ///
    /// NB: Be careful using this routine -- it writes uncommitted data
    /// to disk, and abort can't undo it afterwards.
    pub fn flush_all_pages(&self) -> SmallResult {
        let pids: Vec<Key> = self.cache().queue.iter().copied().collect();
        for pid in pids {
            self.flush_page(&pid)?;
        }
        Ok(())
    }

    /// Remove the specific page id from the buffer pool, without
    /// flushing it.
    ///
    /// Needed by recovery tooling to make sure the buffer pool doesn't
    /// keep a rolled back page in its cache.
    pub fn remove_page(&self, pid: &Key) {
        self.cache().remove(pid);
    }

    pub fn contains_page(&self, pid: &Key) -> bool {
        self.cache().get(pid).is_some()
    }

    pub fn cached_pages_count(&self) -> usize {
        self.cache().len()
    }

    /// Ids of the resident pages, oldest first.
    pub fn cached_pids(&self) -> Vec<Key> {
        self.cache().queue.iter().copied().collect()
    }

    /// Drop all cached pages and all locks.
    pub fn clear(&self) {
        let mut cache = self.cache();
        cache.buffer.clear();
        cache.queue.clear();
        self.lock_manager.clear();
    }
}
