mod test_utils;

use std::sync::Arc;

use small_heap::{
    storage::{HeapPageID, Page},
    transaction::{Lock, Permission},
    utils::HandyRwLock,
    Database, ErrorKind,
};
use test_utils::{
    insert_row, insert_rows, new_int_table, new_table_path, open_int_table, read_keys, setup,
    test_config, SMALL_PAGE_SIZE,
};

fn small_db(pages: usize) -> Database {
    Database::new(
        test_config()
            .with_page_size(SMALL_PAGE_SIZE)
            .with_buffer_pool_pages(pages),
    )
}

#[test]
fn test_get_page_caches_page() {
    setup();

    let db = small_db(10);
    let table = new_int_table(&db, 2);
    insert_rows(&db, &table, 0..9);
    assert_eq!(table.num_pages().unwrap(), 3);

    let pool = db.get_buffer_pool();
    pool.clear();

    let tx = db.begin();
    let pid = HeapPageID::new(table.get_id(), 1);
    let first = pool.get_page(&tx, Permission::ReadOnly, &pid).unwrap();
    let second = pool.get_page(&tx, Permission::ReadOnly, &pid).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(pool.cached_pages_count(), 1);
    assert_eq!(first.rl().tuples_count(), 3);

    assert!(pool.holds_lock(&tx, &pid));
    assert_eq!(pool.get_lock_manager().get_lock(&tx, &pid), Some(Lock::SLock));

    // asking for write permission upgrades the lock
    pool.get_page(&tx, Permission::ReadWrite, &pid).unwrap();
    assert_eq!(pool.get_lock_manager().get_lock(&tx, &pid), Some(Lock::XLock));

    db.commit(&tx).unwrap();
    assert!(!pool.holds_lock(&tx, &pid));
}

#[test]
fn test_get_page_out_of_range() {
    setup();

    let db = small_db(10);
    let table = new_int_table(&db, 2);

    let tx = db.begin();
    let pid = HeapPageID::new(table.get_id(), 0);
    let err = db
        .get_buffer_pool()
        .get_page(&tx, Permission::ReadOnly, &pid)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Storage);
    db.abort(&tx).unwrap();
}

/// Pool of one page: reading a second page evicts the first one, which
/// is loaded from disk again when it's needed.
#[test]
fn test_evict_single_page_pool() {
    setup();

    let path = new_table_path();
    {
        let db = small_db(10);
        let table = open_int_table(&db, &path, 2);
        insert_rows(&db, &table, 0..6);
        assert_eq!(table.num_pages().unwrap(), 2);
    }

    let db = small_db(1);
    let table = open_int_table(&db, &path, 2);
    let pool = db.get_buffer_pool();
    let page_a = HeapPageID::new(table.get_id(), 0);
    let page_b = HeapPageID::new(table.get_id(), 1);

    let tx = db.begin();
    let a = pool.get_page(&tx, Permission::ReadOnly, &page_a).unwrap();
    pool.unsafe_release_page(&tx, &page_a);
    assert!(!pool.holds_lock(&tx, &page_a));

    pool.get_page(&tx, Permission::ReadOnly, &page_b).unwrap();
    assert_eq!(pool.cached_pids(), vec![page_b]);
    assert!(!pool.contains_page(&page_a));

    let a_again = pool.get_page(&tx, Permission::ReadOnly, &page_a).unwrap();
    assert!(!Arc::ptr_eq(&a, &a_again));
    assert_eq!(pool.cached_pids(), vec![page_a]);
    assert_eq!(a_again.rl().tuples_count(), 3);

    db.commit(&tx).unwrap();
}

#[test]
fn test_evict_skips_dirty_pages() {
    setup();

    let path = new_table_path();
    {
        let db = small_db(10);
        let table = open_int_table(&db, &path, 2);
        insert_rows(&db, &table, 0..9);
    }

    let db = small_db(2);
    let table = open_int_table(&db, &path, 2);
    let pool = db.get_buffer_pool();
    let pids: Vec<HeapPageID> = (0..3).map(|i| HeapPageID::new(table.get_id(), i)).collect();

    let tx = db.begin();

    // dirty the oldest page
    let page = pool.get_page(&tx, Permission::ReadWrite, &pids[0]).unwrap();
    let victim = page.rl().iter().next().cloned().unwrap();
    pool.delete_tuple(&tx, &victim).unwrap();
    assert_eq!(page.rl().is_dirty(), Some(tx));

    pool.get_page(&tx, Permission::ReadOnly, &pids[1]).unwrap();
    pool.get_page(&tx, Permission::ReadOnly, &pids[2]).unwrap();

    // the clean page goes, even though the dirty one is older
    assert!(pool.contains_page(&pids[0]));
    assert!(!pool.contains_page(&pids[1]));
    assert!(pool.contains_page(&pids[2]));

    db.abort(&tx).unwrap();
}

#[test]
fn test_evict_all_dirty_fails() {
    setup();

    let path = new_table_path();
    {
        let db = small_db(10);
        let table = open_int_table(&db, &path, 2);
        insert_rows(&db, &table, 0..6);
    }

    let db = small_db(1);
    let table = open_int_table(&db, &path, 2);
    let pool = db.get_buffer_pool();
    let page_a = HeapPageID::new(table.get_id(), 0);
    let page_b = HeapPageID::new(table.get_id(), 1);

    let tx = db.begin();
    let page = pool.get_page(&tx, Permission::ReadWrite, &page_a).unwrap();
    let victim = page.rl().iter().next().cloned().unwrap();
    pool.delete_tuple(&tx, &victim).unwrap();

    let err = pool
        .get_page(&tx, Permission::ReadOnly, &page_b)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Storage);

    // the uncommitted change is still in memory
    assert!(pool.contains_page(&page_a));
    assert_eq!(page.rl().tuples_count(), 2);

    // and it never reached the disk
    db.abort(&tx).unwrap();
    assert_eq!(read_keys(&db, &table).len(), 6);
}

#[test]
fn test_commit_is_durable() {
    setup();

    let path = new_table_path();
    {
        let db = small_db(10);
        let table = open_int_table(&db, &path, 2);
        let pool = db.get_buffer_pool();

        let tx = db.begin();
        for value in 0..5 {
            insert_row(&db, &tx, &table, value);
        }
        db.commit(&tx).unwrap();

        // flushed pages are clean
        let check_tx = db.begin();
        for pid in pool.cached_pids() {
            let page = pool.get_page(&check_tx, Permission::ReadOnly, &pid).unwrap();
            assert_eq!(page.rl().is_dirty(), None);
        }
        db.commit(&check_tx).unwrap();

        // evicted and reloaded from disk
        pool.clear();
        assert_eq!(read_keys(&db, &table), vec![0, 1, 2, 3, 4]);
    }

    // a fresh pool reads the committed content too
    let db = small_db(10);
    let table = open_int_table(&db, &path, 2);
    assert_eq!(read_keys(&db, &table), vec![0, 1, 2, 3, 4]);
}

#[test]
fn test_abort_discards_changes() {
    setup();

    let db = small_db(10);
    let table = new_int_table(&db, 2);
    insert_rows(&db, &table, 0..3);

    let pool = db.get_buffer_pool();
    let tx = db.begin();
    insert_row(&db, &tx, &table, 10);
    insert_row(&db, &tx, &table, 11);

    let pid = HeapPageID::new(table.get_id(), 0);
    let page = pool.get_page(&tx, Permission::ReadWrite, &pid).unwrap();
    let victim = page.rl().iter().next().cloned().unwrap();
    pool.delete_tuple(&tx, &victim).unwrap();

    db.abort(&tx).unwrap();

    // the page allocated by the aborted transaction stays, but empty
    assert_eq!(table.num_pages().unwrap(), 2);
    assert_eq!(read_keys(&db, &table), vec![0, 1, 2]);
    assert!(pool.get_lock_manager().get_hold_pages(&tx).is_empty());
}

#[test]
fn test_flush_page_clears_dirty() {
    setup();

    let db = small_db(10);
    let table = new_int_table(&db, 2);
    let pool = db.get_buffer_pool();

    let tx = db.begin();
    insert_row(&db, &tx, &table, 7);

    let pid = HeapPageID::new(table.get_id(), 0);
    let page = pool.get_page(&tx, Permission::ReadOnly, &pid).unwrap();
    assert_eq!(page.rl().is_dirty(), Some(tx));

    pool.flush_page(&pid).unwrap();
    assert_eq!(page.rl().is_dirty(), None);

    let on_disk = table.read_page(&pid).unwrap();
    assert_eq!(on_disk.tuples_count(), 1);
    assert_eq!(on_disk.get_page_data(), page.rl().get_page_data());

    db.commit(&tx).unwrap();
}

/// Pages flushed before the transaction ends can't be rolled back.
#[test]
fn test_flush_all_pages_defeats_abort() {
    setup();

    let db = small_db(10);
    let table = new_int_table(&db, 2);
    let pool = db.get_buffer_pool();

    let tx = db.begin();
    for value in 0..4 {
        insert_row(&db, &tx, &table, value);
    }
    pool.flush_all_pages().unwrap();
    db.abort(&tx).unwrap();

    assert_eq!(read_keys(&db, &table), vec![0, 1, 2, 3]);
}

#[test]
fn test_remove_page() {
    setup();

    let db = small_db(10);
    let table = new_int_table(&db, 2);
    insert_rows(&db, &table, 0..3);

    let pool = db.get_buffer_pool();
    let pid = HeapPageID::new(table.get_id(), 0);

    let tx = db.begin();
    let page = pool.get_page(&tx, Permission::ReadOnly, &pid).unwrap();
    assert!(pool.contains_page(&pid));

    pool.remove_page(&pid);
    assert!(!pool.contains_page(&pid));
    assert_eq!(pool.cached_pages_count(), 0);

    // removing only drops the cached copy, the lock is kept
    assert!(pool.holds_lock(&tx, &pid));
    let reloaded = pool.get_page(&tx, Permission::ReadOnly, &pid).unwrap();
    assert!(!Arc::ptr_eq(&page, &reloaded));

    db.commit(&tx).unwrap();
}

#[test]
fn test_complete_idle_transaction() {
    setup();

    let db = small_db(10);
    let tx = db.begin();
    db.commit(&tx).unwrap();
    db.abort(&tx).unwrap();

    let tx = db.begin();
    db.abort(&tx).unwrap();
}

/// A commit whose flush fails still leaves the pool usable: the pages
/// it couldn't write are dropped instead of staying dirty forever.
#[test]
fn test_failed_commit_frees_pages() {
    setup();

    let db = small_db(1);
    let a = new_int_table(&db, 2);
    let b = new_int_table(&db, 2);
    insert_rows(&db, &b, 0..3);

    let pool = db.get_buffer_pool();
    let tx = db.begin();
    insert_row(&db, &tx, &a, 42);
    let pid = HeapPageID::new(a.get_id(), 0);
    assert!(pool.contains_page(&pid));

    // the page's table is gone, so the page can't be written
    let catalog = db.get_catalog();
    let table = catalog.wl().remove_table(&a.get_id()).unwrap();
    assert!(db.commit(&tx).is_err());
    assert!(pool.get_lock_manager().get_hold_pages(&tx).is_empty());
    assert!(!pool.contains_page(&pid));

    // the only slot of the pool can be used again
    assert_eq!(read_keys(&db, &b), vec![0, 1, 2]);

    catalog.wl().add_table(table, "a");
    assert!(read_keys(&db, &a).is_empty());
}
