#![cfg(feature = "sqlite")]

use sql_rowbind::pool::ConnectionPool;
use sql_rowbind::types::ConnectionConfig;
use sql_rowbind::RowBindError;

fn file_db(dir: &tempfile::TempDir) -> ConnectionConfig {
    let path = dir.path().join("pool_test.db");
    ConnectionConfig::sqlite(path.to_string_lossy())
}

#[test]
fn idle_connections_stay_within_max_spare() -> Result<(), RowBindError> {
    let dir = tempfile::tempdir().unwrap();
    let pool = ConnectionPool::with_max_spare(file_db(&dir), 2);

    let a = pool.acquire()?;
    let b = pool.acquire()?;
    let c = pool.acquire()?;
    assert_eq!(pool.idle_count(), 0);

    drop(a);
    drop(b);
    drop(c);
    assert_eq!(pool.idle_count(), 2);

    pool.clear_cache();
    assert_eq!(pool.idle_count(), 0);

    // A cap of zero disables caching outright.
    pool.set_max_spare(0);
    drop(pool.acquire()?);
    assert_eq!(pool.idle_count(), 0);
    Ok(())
}

#[test]
fn acquire_reuses_a_cached_connection() -> Result<(), RowBindError> {
    let dir = tempfile::tempdir().unwrap();
    let pool = ConnectionPool::with_max_spare(file_db(&dir), 4);

    drop(pool.acquire()?);
    assert_eq!(pool.idle_count(), 1);
    let handle = pool.acquire()?;
    assert_eq!(pool.idle_count(), 0);
    assert!(handle.valid());
    Ok(())
}

#[test]
fn clones_share_one_connection_and_release_returns_it_early() -> Result<(), RowBindError> {
    let dir = tempfile::tempdir().unwrap();
    let pool = ConnectionPool::with_max_spare(file_db(&dir), 4);

    let handle = pool.acquire()?;
    let twin = handle.clone();
    handle.push("select 1");
    assert_eq!(twin.current_statement(), "select 1");

    twin.release();
    assert_eq!(pool.idle_count(), 1);
    // Releasing again is a no-op; the connection went back once.
    handle.release();
    assert_eq!(pool.idle_count(), 1);
    Ok(())
}

#[test]
#[should_panic(expected = "handle used after release")]
fn using_a_released_handle_panics() {
    let dir = tempfile::tempdir().unwrap();
    let pool = ConnectionPool::with_max_spare(file_db(&dir), 4);
    let handle = pool.acquire().unwrap();
    handle.release();
    handle.push("select 1");
}

#[test]
fn returned_connections_come_back_clean() -> Result<(), RowBindError> {
    let dir = tempfile::tempdir().unwrap();
    let pool = ConnectionPool::with_max_spare(file_db(&dir), 4);

    let handle = pool.acquire()?;
    handle.push("create table t (a int)");
    assert!(handle.exec());
    handle.push("leftover text never executed");
    assert!(handle.begin_trans());
    drop(handle);

    // The same connection comes back with no pending statement and no
    // open transaction.
    let handle = pool.acquire()?;
    assert_eq!(handle.current_statement(), "");
    assert!(!handle.in_trans());
    Ok(())
}

#[test]
fn error_msg_reads_once() -> Result<(), RowBindError> {
    let dir = tempfile::tempdir().unwrap();
    let pool = ConnectionPool::with_max_spare(file_db(&dir), 4);

    let handle = pool.acquire()?;
    handle.push("select definitely from nonsense");
    assert_eq!(handle.select().num_rows(), -1);

    let msg = handle.error_msg();
    assert!(msg.contains("select definitely from nonsense"));
    assert_eq!(handle.error_msg(), "");
    Ok(())
}

#[test]
fn failed_statement_poisons_the_open_transaction() -> Result<(), RowBindError> {
    let dir = tempfile::tempdir().unwrap();
    let pool = ConnectionPool::with_max_spare(file_db(&dir), 4);

    let handle = pool.acquire()?;
    handle.push("create table t (a int)");
    assert!(handle.exec());

    assert!(handle.begin_trans());
    assert!(!handle.begin_trans(), "nested begin must be refused");

    handle.push("insert into nowhere values (1)");
    assert!(!handle.exec());
    assert!(handle.trans_error());

    // Later statements in the poisoned transaction are skipped entirely.
    handle.push("insert into t values (42)");
    assert!(!handle.exec());

    assert!(!handle.commit_trans(), "commit of a poisoned transaction fails");
    assert!(!handle.in_trans());

    handle.push("select count(*) from t");
    assert_eq!(handle.single_value(), "0");

    // A fresh transaction works normally afterwards.
    assert!(handle.begin_trans());
    handle.push("insert into t values (7)");
    assert!(handle.exec());
    assert!(handle.commit_trans());
    handle.push("select count(*) from t");
    assert_eq!(handle.single_value(), "1");
    Ok(())
}

#[test]
fn epoch_date_builds_a_working_timestamp_expression() -> Result<(), RowBindError> {
    let dir = tempfile::tempdir().unwrap();
    let pool = ConnectionPool::with_max_spare(file_db(&dir), 4);

    let handle = pool.acquire()?;
    assert_eq!(handle.epoch_date("added"), "strftime('%s',added)");

    handle.push(
        "create table events (added text);
         insert into events values ('2024-01-02 03:04:05');",
    );
    assert!(handle.exec());

    handle.push("select ");
    handle.push(&handle.epoch_date("added"));
    handle.push(" from events");
    assert_eq!(handle.single_value(), "1704164645");
    Ok(())
}

#[test]
fn insert_reports_the_new_row_id() -> Result<(), RowBindError> {
    let dir = tempfile::tempdir().unwrap();
    let pool = ConnectionPool::with_max_spare(file_db(&dir), 4);

    let handle = pool.acquire()?;
    handle.push("create table t (id integer primary key autoincrement, a text)");
    assert!(handle.exec());

    handle.push("insert into t (a) values ('x')");
    assert_eq!(handle.insert("t_id_seq"), "1");
    handle.push("insert into t (a) values ('y')");
    assert_eq!(handle.insert("t_id_seq"), "2");

    // No sequence name means no id comes back, though the insert still runs.
    handle.push("insert into t (a) values ('z')");
    assert_eq!(handle.insert(""), "");
    handle.push("select count(*) from t");
    assert_eq!(handle.single_value(), "3");
    Ok(())
}
