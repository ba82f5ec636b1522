//! Concurrency checks against a real file-backed database.
//!
//! Interleaved deducts from multiple threads must be exactly additive:
//! the single-statement pool split leaves no window for lost updates.

use lumen_store::{AccountRepo, ConnectionConfig, new_file, run_migrations};

#[test]
fn concurrent_deducts_are_additive() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.db");
    let pool = new_file(path.to_str().unwrap(), &ConnectionConfig::default()).unwrap();

    {
        let conn = pool.get().unwrap();
        let _ = run_migrations(&conn).unwrap();
        AccountRepo::rollover(&conn, "u1", 100_000).unwrap();
    }

    const THREADS: usize = 8;
    const DEDUCTS_PER_THREAD: i64 = 50;
    const AMOUNT: i64 = 7;

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let pool = pool.clone();
            std::thread::spawn(move || {
                for _ in 0..DEDUCTS_PER_THREAD {
                    let conn = pool.get().unwrap();
                    AccountRepo::deduct(&conn, "u1", AMOUNT).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let conn = pool.get().unwrap();
    let acct = AccountRepo::get(&conn, "u1").unwrap().unwrap();
    let spent = THREADS as i64 * DEDUCTS_PER_THREAD * AMOUNT;
    assert_eq!(acct.total_balance, 100_000 - spent);
    assert_eq!(acct.allowance_used, spent);
    assert_eq!(acct.purchased_balance, 0);
}

#[test]
fn concurrent_duplicate_purchases_grant_once() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.db");
    let pool = new_file(path.to_str().unwrap(), &ConnectionConfig::default()).unwrap();

    {
        let conn = pool.get().unwrap();
        let _ = run_migrations(&conn).unwrap();
    }

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let pool = pool.clone();
            std::thread::spawn(move || {
                let conn = pool.get().unwrap();
                AccountRepo::grant_purchase(&conn, "u1", "pay-dup", 1, 1000).unwrap()
            })
        })
        .collect();
    let applied = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|granted| *granted)
        .count();
    assert_eq!(applied, 1);

    let conn = pool.get().unwrap();
    let acct = AccountRepo::get(&conn, "u1").unwrap().unwrap();
    assert_eq!(acct.purchased_balance, 1000);
    assert_eq!(acct.total_balance, 1000);
}
