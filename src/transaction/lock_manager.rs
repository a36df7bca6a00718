use core::fmt;
use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Condvar, Mutex, MutexGuard},
    time::Instant,
};

use log::{debug, warn};

use super::Transaction;
use crate::{error::SmallError, storage::HeapPageID, types::SmallResult, utils::HandyMutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lock {
    XLock,
    SLock,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    ReadOnly,
    ReadWrite,
}

impl Permission {
    pub fn to_lock(&self) -> Lock {
        match self {
            Permission::ReadOnly => Lock::SLock,
            Permission::ReadWrite => Lock::XLock,
        }
    }
}

/// A lock granted to a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeldLock {
    pub lock: Lock,
    pub tx: Transaction,
}

/// Lock state of a single page.
///
/// `holders` is either empty, a single `XLock`, or one or more
/// `SLock`s. The entry is dropped from the table once it has neither
/// holders nor waiters.
struct PageLocks {
    holders: Vec<HeldLock>,

    // Transactions blocked on this page wait on this condvar, it's
    // notified every time a holder goes away.
    cv: Arc<Condvar>,
    waiters: usize,
}

impl PageLocks {
    fn new() -> Self {
        Self {
            holders: Vec::new(),
            cv: Arc::new(Condvar::new()),
            waiters: 0,
        }
    }

    fn is_idle(&self) -> bool {
        self.holders.is_empty() && self.waiters == 0
    }
}

struct LockTable {
    pages: HashMap<HeapPageID, PageLocks>,

    // Reverse index, used to release all locks of a transaction
    // without scanning the whole table.
    hold_pages: HashMap<Transaction, HashSet<HeapPageID>>,
}

impl LockTable {
    // Grant or deny a lock request. This is a single attempt and never
    // blocks.
    fn add_lock(&mut self, tx: &Transaction, lock: Lock, pid: &HeapPageID) -> bool {
        let entry = self.pages.entry(*pid).or_insert_with(PageLocks::new);

        let granted = match entry.holders.len() {
            0 => {
                entry.holders.push(HeldLock { lock, tx: *tx });
                true
            }
            1 => {
                let first = &mut entry.holders[0];
                if first.tx == *tx {
                    // upgrade in place
                    if first.lock == Lock::SLock && lock == Lock::XLock {
                        first.lock = Lock::XLock;
                    }
                    true
                } else if first.lock == Lock::SLock && lock == Lock::SLock {
                    entry.holders.push(HeldLock { lock, tx: *tx });
                    true
                } else {
                    false
                }
            }
            _ => {
                // more than one holder, all of them are readers
                if lock == Lock::XLock {
                    false
                } else if entry.holders.iter().any(|h| h.tx == *tx) {
                    true
                } else {
                    entry.holders.push(HeldLock { lock, tx: *tx });
                    true
                }
            }
        };

        if granted {
            self.hold_pages.entry(*tx).or_insert_with(HashSet::new).insert(*pid);
        } else if entry.is_idle() {
            self.pages.remove(pid);
        }

        granted
    }

    fn remove_lock(&mut self, tx: &Transaction, pid: &HeapPageID) {
        if let Some(entry) = self.pages.get_mut(pid) {
            let before = entry.holders.len();
            entry.holders.retain(|h| h.tx != *tx);
            if entry.holders.len() != before {
                entry.cv.notify_all();
            }
            if entry.is_idle() {
                self.pages.remove(pid);
            }
        }
    }
}

/// Page-granularity shared/exclusive locks.
///
/// All operations are serialized by a single mutex. Blocking waits
/// happen on a per-page condvar paired with that mutex.
pub struct LockManager {
    table: Mutex<LockTable>,
}

impl LockManager {
    pub fn new() -> Self {
        Self {
            table: Mutex::new(LockTable {
                pages: HashMap::new(),
                hold_pages: HashMap::new(),
            }),
        }
    }

    fn table(&self) -> MutexGuard<'_, LockTable> {
        self.table.lk()
    }

    /// A single, non-blocking attempt to lock the page.
    ///
    /// Return whether the lock is granted. Requesting a lock the
    /// transaction already holds (or a weaker one) is granted without
    /// change.
    pub fn acquire_lock(&self, tx: &Transaction, lock: Lock, pid: &HeapPageID) -> bool {
        self.table().add_lock(tx, lock, pid)
    }

    /// Request a lock on the given page. This api is blocking.
    ///
    /// Wait until the lock is granted or `deadline` is reached, the
    /// latter yields a `TransactionAborted` error. At least one attempt
    /// is made even if the deadline has already passed.
    pub fn request_lock(
        &self,
        tx: &Transaction,
        lock: Lock,
        pid: &HeapPageID,
        deadline: Instant,
    ) -> SmallResult {
        let mut table = self.table();
        loop {
            if table.add_lock(tx, lock, pid) {
                debug!("{} got {:?} on {:?}", tx, lock, pid);
                return Ok(());
            }

            let now = Instant::now();
            if now >= deadline {
                let holders = table
                    .pages
                    .get(pid)
                    .map(|e| e.holders.clone())
                    .unwrap_or_default();
                drop(table);

                warn!(
                    "{} timed out waiting for {:?} on {:?}, holders: {:?}",
                    tx, lock, pid, holders
                );
                let err = SmallError::aborted(&format!(
                    "acquire lock timeout, args: {:?}, {:?}, {:?}",
                    tx, lock, pid
                ));
                err.show_backtrace();
                return Err(err);
            }

            // A denied request always leaves the entry in place (it has
            // holders), register as a waiter so it survives the wait.
            let cv = {
                let entry = table.pages.entry(*pid).or_insert_with(PageLocks::new);
                entry.waiters += 1;
                Arc::clone(&entry.cv)
            };

            let (guard, _) = cv.wait_timeout(table, deadline - now).unwrap();
            table = guard;

            if let Some(entry) = table.pages.get_mut(pid) {
                entry.waiters -= 1;
                if entry.is_idle() {
                    table.pages.remove(pid);
                }
            }
        }
    }

    pub fn release_lock(&self, tx: &Transaction, pid: &HeapPageID) {
        let mut table = self.table();
        table.remove_lock(tx, pid);
        if let Some(pages) = table.hold_pages.get_mut(tx) {
            pages.remove(pid);
            if pages.is_empty() {
                table.hold_pages.remove(tx);
            }
        }
    }

    /// Release every lock held by the transaction. Calling it for a
    /// transaction that holds nothing is a no-op.
    pub fn release_all_locks(&self, tx: &Transaction) {
        let mut table = self.table();
        let pages = match table.hold_pages.remove(tx) {
            Some(pages) => pages,
            None => return,
        };

        for pid in pages.iter() {
            table.remove_lock(tx, pid);
        }
        debug!("{} released {} locks", tx, pages.len());
    }

    pub fn holds_lock(&self, tx: &Transaction, pid: &HeapPageID) -> bool {
        self.get_lock(tx, pid).is_some()
    }

    /// The lock the transaction holds on the page, if any.
    pub fn get_lock(&self, tx: &Transaction, pid: &HeapPageID) -> Option<Lock> {
        self.table()
            .pages
            .get(pid)
            .and_then(|e| e.holders.iter().find(|h| h.tx == *tx))
            .map(|h| h.lock)
    }

    /// All locks currently granted on the page.
    pub fn get_holders(&self, pid: &HeapPageID) -> Vec<HeldLock> {
        self.table()
            .pages
            .get(pid)
            .map(|e| e.holders.clone())
            .unwrap_or_default()
    }

    /// Pages the transaction holds a lock on.
    pub fn get_hold_pages(&self, tx: &Transaction) -> HashSet<HeapPageID> {
        self.table().hold_pages.get(tx).cloned().unwrap_or_default()
    }

    pub fn clear(&self) {
        let mut table = self.table();
        for entry in table.pages.values() {
            entry.cv.notify_all();
        }
        table.pages.clear();
        table.hold_pages.clear();
    }
}

impl Default for LockManager {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LockManager {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let table = self.table();
        let mut depiction = "\n".to_string();

        depiction.push_str("lock_map: {");
        for (pid, entry) in table.pages.iter() {
            depiction.push_str(&format!("\n\t{:?} -> [", pid));
            for h in entry.holders.iter() {
                depiction.push_str(&format!("\n\t\t{:?} {:?}, ", h.tx, h.lock));
            }
            depiction.push_str(&format!("\n\t] waiters: {}", entry.waiters));
        }
        depiction.push_str("\n}\n");

        depiction.push_str("hold_pages: {");
        for (tx, pages) in table.hold_pages.iter() {
            depiction.push_str(&format!("\n\t{:?} -> [", tx));
            for pid in pages {
                depiction.push_str(&format!("\n\t\t{:?}, ", pid));
            }
            depiction.push_str("\n\t]");
        }
        depiction.push_str("\n}\n");

        write!(f, "{}", depiction)
    }
}

impl fmt::Debug for LockManager {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self)
    }
}
