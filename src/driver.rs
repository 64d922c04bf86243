//! Raw driver seam: one live backend session executing SQL text and
//! streaming tuples back as text.

use crate::error::RowBindError;
use crate::types::{Backend, ConnectionConfig};

/// Tuples from one completed query, every value rendered as text.
#[derive(Debug, Default)]
pub struct RawRows {
    pub columns: usize,
    pub rows: Vec<Vec<Option<String>>>,
}

/// SQL dialect differences the core needs to know about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    #[cfg(feature = "sqlite")]
    Sqlite,
    #[cfg(feature = "postgres")]
    Postgres,
}

impl Dialect {
    pub(crate) fn begin_sql(self) -> &'static str {
        "BEGIN TRANSACTION"
    }

    pub(crate) fn commit_sql(self) -> &'static str {
        "COMMIT TRANSACTION"
    }

    pub(crate) fn abort_sql(self) -> &'static str {
        match self {
            #[cfg(feature = "sqlite")]
            Dialect::Sqlite => "ROLLBACK TRANSACTION",
            #[cfg(feature = "postgres")]
            Dialect::Postgres => "ABORT TRANSACTION",
        }
    }

    /// Query returning the current value of `sequence` after an insert.
    ///
    /// `SQLite` has no sequences; the rowid of the last insert plays the part
    /// and the sequence name is ignored.
    pub(crate) fn currval_sql(self, sequence: &str) -> String {
        match self {
            #[cfg(feature = "sqlite")]
            Dialect::Sqlite => {
                let _ = sequence;
                "select last_insert_rowid()".to_string()
            }
            #[cfg(feature = "postgres")]
            Dialect::Postgres => format!("select currval({})", crate::quote::quote(sequence)),
        }
    }

    /// Expression extracting a Unix timestamp from `column` in a SELECT.
    #[must_use]
    pub fn epoch_expr(self, column: &str) -> String {
        match self {
            #[cfg(feature = "sqlite")]
            Dialect::Sqlite => format!("strftime('%s',{column})"),
            #[cfg(feature = "postgres")]
            Dialect::Postgres => format!("date_part('epoch',{column})"),
        }
    }
}

/// One open backend session.
pub enum Session {
    #[cfg(feature = "sqlite")]
    Sqlite(crate::sqlite::SqliteSession),
    #[cfg(feature = "postgres")]
    Postgres(crate::postgres::PostgresSession),
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            #[cfg(feature = "sqlite")]
            Session::Sqlite(_) => f.debug_tuple("Sqlite").finish(),
            #[cfg(feature = "postgres")]
            Session::Postgres(_) => f.debug_tuple("Postgres").finish(),
        }
    }
}

impl Session {
    /// Open a new session for `config`.
    pub fn open(config: &ConnectionConfig) -> Result<Session, RowBindError> {
        match config.backend {
            #[cfg(feature = "sqlite")]
            Backend::Sqlite => Ok(Session::Sqlite(crate::sqlite::SqliteSession::open(config)?)),
            #[cfg(feature = "postgres")]
            Backend::Postgres => Ok(Session::Postgres(crate::postgres::PostgresSession::open(
                config,
            )?)),
        }
    }

    #[must_use]
    pub fn dialect(&self) -> Dialect {
        match self {
            #[cfg(feature = "sqlite")]
            Session::Sqlite(_) => Dialect::Sqlite,
            #[cfg(feature = "postgres")]
            Session::Postgres(_) => Dialect::Postgres,
        }
    }

    /// Execute statements that return no rows.
    pub fn run_command(&mut self, sql: &str) -> Result<(), RowBindError> {
        match self {
            #[cfg(feature = "sqlite")]
            Session::Sqlite(s) => s.run_command(sql),
            #[cfg(feature = "postgres")]
            Session::Postgres(s) => s.run_command(sql),
        }
    }

    /// Execute a query and materialize its tuples as text.
    pub fn run_query(&mut self, sql: &str) -> Result<RawRows, RowBindError> {
        match self {
            #[cfg(feature = "sqlite")]
            Session::Sqlite(s) => s.run_query(sql),
            #[cfg(feature = "postgres")]
            Session::Postgres(s) => s.run_query(sql),
        }
    }

    /// Check the session is alive, reconnecting transparently on failure.
    pub fn ping(&mut self, config: &ConnectionConfig) -> bool {
        let alive = match self {
            #[cfg(feature = "sqlite")]
            Session::Sqlite(s) => s.alive(),
            #[cfg(feature = "postgres")]
            Session::Postgres(s) => s.alive(),
        };
        if alive {
            return true;
        }
        tracing::debug!("session ping failed, reconnecting");
        match Session::open(config) {
            Ok(fresh) => {
                *self = fresh;
                true
            }
            Err(err) => {
                tracing::error!(error = %err, "reconnect failed");
                false
            }
        }
    }
}
