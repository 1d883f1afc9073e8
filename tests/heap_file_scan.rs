//! Heap file insert placement and full-table scans through the buffer
//! pool.

use std::sync::Arc;

use relstore::{
    Database, Field, FieldType, HeapFile, PageId, TableId, TransactionId, Tuple, TupleDesc,
};
use tempfile::TempDir;

fn two_int_desc() -> TupleDesc {
    TupleDesc::new(&[FieldType::Int, FieldType::Int])
}

fn row(a: i32, b: i32) -> Tuple {
    Tuple::new(two_int_desc(), vec![Field::Int(a), Field::Int(b)]).unwrap()
}

fn make_table(db: &Database, dir: &TempDir, name: &str) -> TableId {
    let file = HeapFile::open(dir.path().join(format!("{name}.dat")), two_int_desc()).unwrap();
    let id = file.id();
    db.catalog().add_table(Arc::new(file), name);
    id
}

// 8-byte records at the default 4096-byte page size.
const SLOTS_PER_PAGE: usize = 504;

#[test]
fn test_insert_reuses_free_slots_before_growing() {
    let dir = TempDir::new().unwrap();
    let db = Database::new(10);
    let table = make_table(&db, &dir, "t");
    let file = db.catalog().file(table).unwrap();

    let txn = TransactionId::new();
    db.buffer_pool().insert_tuple(&db, txn, table, row(0, 0)).unwrap();
    assert_eq!(file.page_count().unwrap(), 1);

    // Plenty of free slots left; the file must not grow.
    for i in 1..10 {
        db.buffer_pool()
            .insert_tuple(&db, txn, table, row(i, 0))
            .unwrap();
    }
    assert_eq!(file.page_count().unwrap(), 1);
}

#[test]
fn test_insert_appends_one_page_when_full() {
    let dir = TempDir::new().unwrap();
    let db = Database::new(10);
    let table = make_table(&db, &dir, "t");
    let file = db.catalog().file(table).unwrap();

    let txn = TransactionId::new();
    for i in 0..SLOTS_PER_PAGE {
        db.buffer_pool()
            .insert_tuple(&db, txn, table, row(i as i32, 0))
            .unwrap();
    }
    assert_eq!(file.page_count().unwrap(), 1);

    // One more record spills onto a second page, and only one.
    db.buffer_pool()
        .insert_tuple(&db, txn, table, row(-1, 0))
        .unwrap();
    assert_eq!(file.page_count().unwrap(), 2);
}

#[test]
fn test_scan_yields_all_records_in_slot_order() {
    let dir = TempDir::new().unwrap();
    let db = Database::new(10);
    let table = make_table(&db, &dir, "t");
    let file = db.catalog().file(table).unwrap();

    let total = SLOTS_PER_PAGE + 20;
    let txn = TransactionId::new();
    for i in 0..total {
        db.buffer_pool()
            .insert_tuple(&db, txn, table, row(i as i32, 0))
            .unwrap();
    }

    let values: Vec<i32> = file
        .scan(&db, txn)
        .map(|r| match r.unwrap().field(0) {
            Field::Int(v) => *v,
            other => panic!("unexpected field {other:?}"),
        })
        .collect();
    // Records were inserted into ascending slots across ascending pages.
    assert_eq!(values, (0..total as i32).collect::<Vec<_>>());
}

#[test]
fn test_scan_skips_deleted_records() {
    let dir = TempDir::new().unwrap();
    let db = Database::new(10);
    let table = make_table(&db, &dir, "t");
    let file = db.catalog().file(table).unwrap();

    let txn = TransactionId::new();
    for i in 0..20 {
        db.buffer_pool().insert_tuple(&db, txn, table, row(i, 0)).unwrap();
    }

    // Delete the even-valued records; scanned tuples carry record ids.
    let victims: Vec<Tuple> = file
        .scan(&db, txn)
        .map(|r| r.unwrap())
        .filter(|t| matches!(t.field(0), Field::Int(v) if v % 2 == 0))
        .collect();
    for victim in &victims {
        db.buffer_pool().delete_tuple(&db, txn, victim).unwrap();
    }

    let remaining: Vec<i32> = file
        .scan(&db, txn)
        .map(|r| match r.unwrap().field(0) {
            Field::Int(v) => *v,
            other => panic!("unexpected field {other:?}"),
        })
        .collect();
    assert_eq!(remaining, vec![1, 3, 5, 7, 9, 11, 13, 15, 17, 19]);
}

#[test]
fn test_scan_rewind_restarts() {
    let dir = TempDir::new().unwrap();
    let db = Database::new(10);
    let table = make_table(&db, &dir, "t");
    let file = db.catalog().file(table).unwrap();

    let txn = TransactionId::new();
    for i in 0..5 {
        db.buffer_pool().insert_tuple(&db, txn, table, row(i, 0)).unwrap();
    }

    let mut scan = file.scan(&db, txn);
    assert_eq!(scan.by_ref().count(), 5);
    scan.rewind();
    assert_eq!(scan.count(), 5);
}

#[test]
fn test_committed_data_visible_to_new_database_instance() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("t.dat");

    {
        let db = Database::new(10);
        let file = HeapFile::open(&path, two_int_desc()).unwrap();
        let table = file.id();
        db.catalog().add_table(Arc::new(file), "t");

        let txn = TransactionId::new();
        for i in 0..3 {
            db.buffer_pool().insert_tuple(&db, txn, table, row(i, i)).unwrap();
        }
        db.buffer_pool().transaction_complete(&db, txn, true).unwrap();
    }

    // A second instance sees what the first committed.
    let db = Database::new(10);
    let file = HeapFile::open(&path, two_int_desc()).unwrap();
    db.catalog().add_table(Arc::new(file), "t");
    let file = db.catalog().file(db.catalog().table_id("t").unwrap()).unwrap();
    let txn = TransactionId::new();
    assert_eq!(file.scan(&db, txn).count(), 3);
}
