//! Many threads sharing one `Database`

mod common;

use std::sync::{Arc, Barrier};
use std::thread;

use anyhow::Result;
use common::{doc, temp_db};
use kenobi::{Database, Document};
use serde_json::json;

#[test]
fn test_concurrent_inserts_are_all_kept() -> Result<()> {
    let (_dir, db) = temp_db()?;
    let db = Arc::new(db);
    let threads = 16;
    let per_thread = 25;
    let barrier = Arc::new(Barrier::new(threads));

    let workers: Vec<_> = (0..threads)
        .map(|t| {
            let db = db.clone();
            let barrier = barrier.clone();
            thread::spawn(move || -> kenobi::Result<()> {
                barrier.wait();
                for i in 0..per_thread {
                    db.insert(doc(json!({"thread": t, "seq": i})))?;
                }
                Ok(())
            })
        })
        .collect();
    for worker in workers {
        worker.join().expect("insert thread panicked")?;
    }

    assert_eq!(db.count()?, (threads * per_thread) as u64);
    for t in 0..threads {
        let rows = db.search("thread", t as i64, None, None)?;
        let seqs: Vec<i64> = rows.iter().filter_map(|d| d.get("seq").and_then(|v| v.as_i64())).collect();
        // rows from a single thread keep that thread's order
        assert_eq!(seqs, (0..per_thread as i64).collect::<Vec<_>>());
    }
    Ok(())
}

#[test]
fn test_readers_never_see_partial_batches() -> Result<()> {
    let db = Arc::new(Database::open_in_memory()?);
    let batch = 20;

    let writer = {
        let db = db.clone();
        thread::spawn(move || -> kenobi::Result<()> {
            for round in 0..10 {
                db.insert_many((0..batch).map(|i| Document::new().with("round", round).with("i", i)))?;
            }
            Ok(())
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let db = db.clone();
            thread::spawn(move || -> kenobi::Result<()> {
                for _ in 0..50 {
                    let seen = db.all(None, None)?.len();
                    assert_eq!(seen % batch as usize, 0, "observed a partial batch of {seen} rows");
                }
                Ok(())
            })
        })
        .collect();

    writer.join().expect("writer panicked")?;
    for reader in readers {
        reader.join().expect("reader panicked")?;
    }
    assert_eq!(db.count()?, 200);
    Ok(())
}

#[test]
fn test_updates_from_many_threads() -> Result<()> {
    let (_dir, db) = temp_db()?;
    let db = Arc::new(db);
    db.insert_many((0..8).map(|i| doc(json!({"slot": i, "hits": 0}))))?;

    let workers: Vec<_> = (0..8i64)
        .map(|slot| {
            let db = db.clone();
            thread::spawn(move || db.update("slot", slot, doc(json!({"hits": slot * 10, "owner": format!("thread-{}", slot)}))))
        })
        .collect();
    for worker in workers {
        assert_eq!(worker.join().expect("update thread panicked")?, 1);
    }

    for slot in 0..8i64 {
        let rows = db.search("slot", slot, None, None)?;
        assert_eq!(rows, vec![doc(json!({"slot": slot, "hits": slot * 10, "owner": format!("thread-{}", slot)}))]);
    }
    Ok(())
}

#[test]
fn test_two_databases_on_one_file() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("shared.db");
    let first = Arc::new(Database::open(&path)?);
    let second = Arc::new(Database::open(&path)?);

    let a = {
        let db = first.clone();
        thread::spawn(move || db.insert_many((0..50).map(|i| doc(json!({"from": "first", "i": i})))))
    };
    let b = {
        let db = second.clone();
        thread::spawn(move || db.insert_many((0..50).map(|i| doc(json!({"from": "second", "i": i})))))
    };
    assert_eq!(a.join().expect("first writer panicked")?, 50);
    assert_eq!(b.join().expect("second writer panicked")?, 50);

    assert_eq!(first.count()?, 100);
    assert_eq!(second.search("from", "first", None, None)?.len(), 50);
    Ok(())
}
