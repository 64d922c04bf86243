#![cfg(feature = "sqlite")]

use sql_rowbind::manifest;
use sql_rowbind::pool::ConnectionPool;
use sql_rowbind::query::{CompareOp, Query};
use sql_rowbind::quote::quote;
use sql_rowbind::types::ConnectionConfig;
use sql_rowbind::RowBindError;

manifest! {
    BookRow with BookRowAccess {
        primary id: i64 => ("id", "books"),
        updateable title: String => ("title", "books"),
        field pages: i64 => ("pages", "books"),
    }
}

manifest! {
    ShelfRow with ShelfRowAccess {
        primary id: i64 => ("id", "books"),
        field title: String => ("title", "books"),
        field shelf_ref: i64 => ("shelf_id", "books"),
        field shelf_name: String => ("name", "shelves"),
        primary shelf_key: i64 => ("id", "shelves"),
    }
}

fn library_pool(dir: &tempfile::TempDir) -> Result<ConnectionPool, RowBindError> {
    let path = dir.path().join("library.db");
    let pool = ConnectionPool::new(ConnectionConfig::sqlite(path.to_string_lossy()));
    let handle = pool.acquire()?;
    handle.push(
        "create table books (id integer primary key, title text, pages int, shelf_id int);
         create table shelves (id integer primary key, name text);
         insert into shelves values (1, 'fiction'), (2, 'history');
         insert into books values (1, 'Dune', 412, 1);
         insert into books values (2, 'Hyperion', 482, 1);
         insert into books values (3, 'SPQR', 606, 2);",
    );
    assert!(handle.exec());
    Ok(pool)
}

#[test]
fn compile_lists_columns_and_keys_the_from_table() {
    let dir = tempfile::tempdir().unwrap();
    let pool = ConnectionPool::new(ConnectionConfig::sqlite(
        dir.path().join("x.db").to_string_lossy(),
    ));
    let mut query = Query::<BookRow>::new(&pool);
    assert_eq!(
        query.compile(None),
        "select books.id,books.title,books.pages from books"
    );

    query.set_limit(2);
    assert_eq!(
        query.compile(None),
        "select books.id,books.title,books.pages from books limit 2"
    );
    assert_eq!(
        query.compile(Some(1)),
        "select books.id,books.title,books.pages from books limit 1"
    );

    query
        .set_filter_literal(2, 400, CompareOp::gt())
        .unwrap();
    assert_eq!(
        query.compile(None),
        "select books.id,books.title,books.pages from books where books.pages>400 limit 2"
    );
}

#[test]
fn straight_select_reads_typed_rows() -> Result<(), RowBindError> {
    let dir = tempfile::tempdir().unwrap();
    let pool = library_pool(&dir)?;

    let mut query = Query::<BookRow>::new(&pool);
    let mut titles = Vec::new();
    for row in query.rows()? {
        titles.push(row.title()?.get());
        assert!(row.id()?.get() > 0);
    }
    assert_eq!(titles, ["Dune", "Hyperion", "SPQR"]);

    // Raw access sees the untyped result text.
    let rows: Vec<_> = query.rows()?.collect();
    assert_eq!(rows[2].raw(1), Some("SPQR"));
    assert_eq!(rows[2].raw(9), None);
    Ok(())
}

#[test]
fn limit_caps_the_result() -> Result<(), RowBindError> {
    let dir = tempfile::tempdir().unwrap();
    let pool = library_pool(&dir)?;

    let mut query = Query::<BookRow>::new(&pool);
    assert_eq!(query.size()?, 3);
    query.set_limit(1);
    assert_eq!(query.size()?, 1);
    Ok(())
}

#[test]
fn filters_narrow_by_literal_and_by_field() -> Result<(), RowBindError> {
    let dir = tempfile::tempdir().unwrap();
    let pool = library_pool(&dir)?;

    let mut long_books = Query::<BookRow>::new(&pool);
    long_books.set_filter_literal(2, 500, CompareOp::ge())?;
    let rows: Vec<_> = long_books.rows()?.map(|r| r.index()).collect();
    assert_eq!(rows.len(), 1);

    // A field plucked from one query's row can filter another query.
    let title = long_books.rows()?.next().unwrap().title()?;
    assert_eq!(title.get(), "SPQR");

    let mut by_title = Query::<BookRow>::new(&pool);
    by_title.set_filter(&title, CompareOp::eq());
    assert_eq!(
        by_title.compile(None),
        "select books.id,books.title,books.pages from books where books.title='SPQR'"
    );
    assert_eq!(by_title.size()?, 1);

    let mut none = Query::<BookRow>::new(&pool);
    none.set_filter_literal(1, quote("No Such Book"), CompareOp::eq())?;
    assert_eq!(none.size()?, 0);

    let oob = none.set_filter_literal(99, 1, CompareOp::eq());
    assert!(matches!(
        oob,
        Err(RowBindError::PositionOutOfRange { position: 99, .. })
    ));
    Ok(())
}

#[test]
fn a_later_filter_replaces_the_earlier_one() -> Result<(), RowBindError> {
    let dir = tempfile::tempdir().unwrap();
    let pool = library_pool(&dir)?;

    let mut query = Query::<BookRow>::new(&pool);
    query.set_filter_literal(2, 600, CompareOp::gt())?;
    assert_eq!(query.size()?, 1);

    query.set_filter_literal(2, 500, CompareOp::lt())?;
    assert_eq!(
        query.compile(None),
        "select books.id,books.title,books.pages from books where books.pages<500"
    );
    assert_eq!(query.size()?, 2);
    Ok(())
}

#[test]
fn subquery_filters_via_a_parenthesized_sub_select() -> Result<(), RowBindError> {
    let dir = tempfile::tempdir().unwrap();
    let pool = library_pool(&dir)?;

    // Sub-select picks the longest book's id; outer query matches on it.
    let mut longest = Query::<BookRow>::new(&pool);
    longest.set_filter_literal(2, 600, CompareOp::gt())?;

    let mut query = Query::<BookRow>::new(&pool);
    query.set_filter_subquery(&BookRow::id(), &longest, CompareOp::within());
    assert_eq!(
        query.compile(None),
        "select books.id,books.title,books.pages from books where books.id in \
         ( select books.id,books.title,books.pages from books where books.pages>600 limit 1 )"
    );

    let titles: Vec<_> = query.rows()?.map(|r| r.title().unwrap().get()).collect();
    assert_eq!(titles, ["SPQR"]);
    Ok(())
}

#[test]
fn inner_join_reads_columns_from_both_tables() -> Result<(), RowBindError> {
    let dir = tempfile::tempdir().unwrap();
    let pool = library_pool(&dir)?;

    let mut query = Query::<ShelfRow>::new(&pool);
    query.set_inner_join(2, 4, CompareOp::eq())?;
    query.set_filter_literal(3, quote("history"), CompareOp::eq())?;
    assert_eq!(
        query.compile(None),
        "select books.id,books.title,books.shelf_id,shelves.name,shelves.id \
         from books inner join shelves on books.shelf_id=shelves.id \
         where shelves.name='history'"
    );

    let rows: Vec<_> = query.rows()?.collect();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].title()?.get(), "SPQR");
    assert_eq!(rows[0].shelf_name()?.get(), "history");
    Ok(())
}

#[test]
fn outer_join_keeps_unmatched_left_rows() -> Result<(), RowBindError> {
    let dir = tempfile::tempdir().unwrap();
    let pool = library_pool(&dir)?;

    let handle = pool.acquire()?;
    handle.push("insert into books values (4, 'Unshelved', 90, NULL)");
    assert!(handle.exec());
    handle.release();

    let mut query = Query::<ShelfRow>::new(&pool);
    query.set_outer_join(2, 4, CompareOp::eq())?;
    assert_eq!(
        query.compile(None),
        "select books.id,books.title,books.shelf_id,shelves.name,shelves.id \
         from books left outer join shelves on books.shelf_id=shelves.id"
    );

    let rows: Vec<_> = query.rows()?.collect();
    assert_eq!(rows.len(), 4);

    let loose = rows
        .iter()
        .find(|r| r.title().unwrap().get() == "Unshelved")
        .unwrap();
    assert_eq!(loose.raw(3), None);
    assert_eq!(loose.shelf_name()?.get(), "");
    Ok(())
}

#[test]
fn failed_select_yields_the_sentinel_result() -> Result<(), RowBindError> {
    let dir = tempfile::tempdir().unwrap();
    let pool = library_pool(&dir)?;

    let handle = pool.acquire()?;
    handle.push("select * from no_such_table");
    let rs = handle.select();
    assert_eq!(rs.num_rows(), -1);
    assert_eq!(rs.num_fields(), -1);
    assert_eq!(rs.size(), 0);
    assert_eq!(rs.rows().count(), 0);
    assert!(!handle.error_msg().is_empty());
    Ok(())
}
