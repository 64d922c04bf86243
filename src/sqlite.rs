//! `SQLite` backend session, built on `rusqlite`.

use rusqlite::OpenFlags;
use rusqlite::types::ValueRef;

use crate::driver::RawRows;
use crate::error::RowBindError;
use crate::types::ConnectionConfig;

pub struct SqliteSession {
    conn: rusqlite::Connection,
}

impl SqliteSession {
    pub(crate) fn open(config: &ConnectionConfig) -> Result<Self, RowBindError> {
        let path = config
            .dbname
            .as_deref()
            .ok_or_else(|| RowBindError::ConfigError("SQLite requires a dbname (path)".into()))?;
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = rusqlite::Connection::open_with_flags(path, flags)?;
        // Writers from other pooled connections may hold the file briefly.
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        Ok(Self { conn })
    }

    pub(crate) fn run_command(&mut self, sql: &str) -> Result<(), RowBindError> {
        // execute_batch so a pending buffer holding several statements works.
        self.conn.execute_batch(sql)?;
        Ok(())
    }

    pub(crate) fn run_query(&mut self, sql: &str) -> Result<RawRows, RowBindError> {
        let mut stmt = self.conn.prepare(sql)?;
        let columns = stmt.column_count();
        let mut out = RawRows {
            columns,
            rows: Vec::new(),
        };
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let mut values = Vec::with_capacity(columns);
            for idx in 0..columns {
                values.push(render_text(row.get_ref(idx)?));
            }
            out.rows.push(values);
        }
        Ok(out)
    }

    pub(crate) fn alive(&self) -> bool {
        self.conn.query_row("select 1", [], |_| Ok(())).is_ok()
    }
}

fn render_text(value: ValueRef<'_>) -> Option<String> {
    match value {
        ValueRef::Null => None,
        ValueRef::Integer(i) => Some(i.to_string()),
        ValueRef::Real(f) => Some(f.to_string()),
        ValueRef::Text(t) => Some(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Some(String::from_utf8_lossy(b).into_owned()),
    }
}
