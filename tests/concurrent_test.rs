mod test_utils;

use std::{
    collections::HashSet,
    sync::Barrier,
    thread,
    time::Duration,
};

use log::debug;
use small_heap::{
    storage::HeapPageID,
    transaction::{Permission, Transaction},
    Database, HeapFile, SmallError, Tuple,
};
use test_utils::{insert_rows, new_int_table, read_keys, scan_table, setup, test_config};

/// Run `action` in a fresh transaction until it commits, aborting and
/// retrying every time a lock wait times out.
fn run_with_retry<F, T>(db: &Database, mut action: F) -> T
where
    F: FnMut(&Transaction) -> Result<T, SmallError>,
{
    loop {
        let tx = db.begin();
        match action(&tx) {
            Ok(v) => {
                db.commit(&tx).unwrap();
                return v;
            }
            Err(e) if e.is_aborted() => {
                debug!("{} aborted, retry: {}", tx, e);
                db.abort(&tx).unwrap();
                thread::sleep(Duration::from_millis(rand::random::<u64>() % 20));
            }
            Err(e) => panic!("unexpected error: {}", e),
        }
    }
}

/// A writer blocked by a reader gives up, and succeeds once the reader
/// is gone.
#[test]
fn test_writer_blocked_by_reader() {
    setup();

    let db = Database::new(test_config());
    let table = new_int_table(&db, 2);
    insert_rows(&db, &table, 0..3);

    let pool = db.get_buffer_pool();
    let pid = HeapPageID::new(table.get_id(), 0);

    let t1 = db.begin();
    let t2 = db.begin();
    pool.get_page(&t1, Permission::ReadOnly, &pid).unwrap();

    let err = pool
        .get_page(&t2, Permission::ReadWrite, &pid)
        .unwrap_err();
    assert!(err.is_aborted());
    assert!(!pool.holds_lock(&t2, &pid));
    db.abort(&t2).unwrap();

    db.commit(&t1).unwrap();
    pool.get_page(&t2, Permission::ReadWrite, &pid).unwrap();
    assert!(pool.holds_lock(&t2, &pid));
    db.commit(&t2).unwrap();
}

/// A blocked writer is woken up as soon as the reader commits.
#[test]
fn test_writer_waits_for_reader() {
    setup();

    let config = test_config().with_lock_wait(Duration::from_secs(5), Duration::from_secs(6));
    let db = Database::new(config);
    let table = new_int_table(&db, 2);
    insert_rows(&db, &table, 0..3);

    let pool = db.get_buffer_pool();
    let pid = HeapPageID::new(table.get_id(), 0);

    let reader = db.begin();
    pool.get_page(&reader, Permission::ReadOnly, &pid).unwrap();

    crossbeam::thread::scope(|s| {
        let writer = s.spawn(|_| {
            let tx = db.begin();
            let mut tuple = Tuple::new_int_tuple(100, 2);
            pool.insert_tuple(&tx, table.get_id(), &mut tuple)?;
            db.commit(&tx)?;
            Ok::<_, SmallError>(tuple)
        });

        thread::sleep(Duration::from_millis(100));
        db.commit(&reader).unwrap();

        let tuple = writer.join().unwrap().unwrap();
        assert_eq!(tuple.get_rid().unwrap().pid, pid);
    })
    .unwrap();

    assert_eq!(read_keys(&db, &table), vec![0, 1, 2, 100]);
}

/// Readers don't block each other: all of them hold a shared lock on
/// every page at the same time.
#[test]
fn test_concurrent_readers() {
    setup();

    let db = Database::new(test_config());
    let table = new_int_table(&db, 2);
    insert_rows(&db, &table, 0..600);

    let readers = 4;
    let barrier = Barrier::new(readers);
    let pool = db.get_buffer_pool();

    crossbeam::thread::scope(|s| {
        for _ in 0..readers {
            s.spawn(|_| {
                let tx = db.begin();
                assert_eq!(scan_table(&db, &tx, &table).len(), 600);

                barrier.wait();
                for i in 0..3 {
                    let pid = HeapPageID::new(table.get_id(), i);
                    assert!(pool.holds_lock(&tx, &pid));
                }
                barrier.wait();

                db.commit(&tx).unwrap();
            });
        }
    })
    .unwrap();

    let pid = HeapPageID::new(table.get_id(), 0);
    assert!(pool.get_lock_manager().get_holders(&pid).is_empty());
}

/// Lots of small transactions inserting at the same time, no insert is
/// lost and no slot is handed out twice.
#[test]
fn test_concurrent_inserts() {
    setup();

    let config = test_config().with_lock_wait(Duration::from_millis(50), Duration::from_millis(500));
    let db = Database::new(config);
    let table = new_int_table(&db, 2);

    let threads = 8;
    let rows_per_thread = 40;

    crossbeam::thread::scope(|s| {
        for t in 0..threads {
            let db = &db;
            let table = &table;
            s.spawn(move |_| {
                for i in 0..rows_per_thread {
                    let value = (t * rows_per_thread + i) as i64;
                    run_with_retry(db, |tx| {
                        let mut tuple = Tuple::new_int_tuple(value, 2);
                        db.get_buffer_pool()
                            .insert_tuple(tx, table.get_id(), &mut tuple)
                    });
                }
            });
        }
    })
    .unwrap();

    let tx = db.begin();
    let tuples = scan_table(&db, &tx, &table);
    db.commit(&tx).unwrap();

    assert_eq!(tuples.len(), threads * rows_per_thread);
    let rids: HashSet<_> = tuples.iter().map(|t| t.get_rid().unwrap()).collect();
    assert_eq!(rids.len(), tuples.len());

    let mut keys: Vec<i64> = tuples
        .iter()
        .map(|t| t.get_cell(0).get_int64().unwrap())
        .collect();
    keys.sort_unstable();
    let expected: Vec<i64> = (0..(threads * rows_per_thread) as i64).collect();
    assert_eq!(keys, expected);

    // 320 rows fit in 2 pages
    assert_eq!(table.num_pages().unwrap(), 2);
}

fn inserter(db: &Database, table: &HeapFile, count: usize, s: &crossbeam::channel::Sender<Tuple>) {
    for value in 0..count as i64 {
        let tuple = run_with_retry(db, |tx| {
            let mut tuple = Tuple::new_int_tuple(value, 2);
            db.get_buffer_pool()
                .insert_tuple(tx, table.get_id(), &mut tuple)?;
            Ok(tuple)
        });
        s.send(tuple).unwrap();
    }
}

fn deleter(db: &Database, count: usize, r: &crossbeam::channel::Receiver<Tuple>) {
    for _ in 0..count {
        let tuple = r.recv().unwrap();
        run_with_retry(db, |tx| db.get_buffer_pool().delete_tuple(tx, &tuple));
    }
}

/// Inserts and deletes of committed rows running side by side.
#[test]
fn test_concurrent_insert_delete() {
    setup();

    let config = test_config().with_lock_wait(Duration::from_millis(50), Duration::from_millis(500));
    let db = Database::new(config);
    let table = new_int_table(&db, 2);
    insert_rows(&db, &table, 1000..1010);

    let count = 100;
    let (sender, receiver) = crossbeam::channel::unbounded();

    crossbeam::thread::scope(|s| {
        s.spawn(|_| inserter(&db, &table, count, &sender));
        s.spawn(|_| deleter(&db, count, &receiver));
    })
    .unwrap();

    let keys = read_keys(&db, &table);
    assert_eq!(keys, (1000..1010).collect::<Vec<i64>>());
}
