use std::sync::Arc;

use small_heap::{transaction::Transaction, Cell, Database, HeapFile, Tuple};

/// Insert one row `(value, value, ...)` on behalf of `tx`.
pub fn insert_row(db: &Database, tx: &Transaction, table: &HeapFile, value: i64) -> Tuple {
    let mut tuple = Tuple::new_int_tuple(value, table.get_schema().fields_count());
    db.get_buffer_pool()
        .insert_tuple(tx, table.get_id(), &mut tuple)
        .unwrap();
    tuple
}

/// Insert rows with the given values in a single transaction and
/// commit it.
pub fn insert_rows<I: IntoIterator<Item = i64>>(db: &Database, table: &HeapFile, values: I) {
    let tx = db.begin();
    for value in values {
        insert_row(db, &tx, table, value);
    }
    db.commit(&tx).unwrap();
}

/// Insert rows built from the given cells in a single transaction and
/// commit it.
pub fn insert_cells(db: &Database, table: &HeapFile, rows: Vec<Vec<Cell>>) {
    let tx = db.begin();
    let pool = db.get_buffer_pool();
    for cells in rows {
        let mut tuple = Tuple::new(cells);
        pool.insert_tuple(&tx, table.get_id(), &mut tuple).unwrap();
    }
    db.commit(&tx).unwrap();
}

pub fn scan_table(db: &Database, tx: &Transaction, table: &Arc<HeapFile>) -> Vec<Tuple> {
    table
        .iter(tx, &db.get_buffer_pool())
        .collect::<Result<Vec<_>, _>>()
        .unwrap()
}

/// The first cell of every row of the table, read in a transaction of
/// its own.
pub fn read_keys(db: &Database, table: &Arc<HeapFile>) -> Vec<i64> {
    let tx = db.begin();
    let keys = scan_table(db, &tx, table)
        .iter()
        .map(|t| t.get_cell(0).get_int64().unwrap())
        .collect();
    db.commit(&tx).unwrap();
    keys
}
