//! A live database connection: pending-statement buffer, transaction state,
//! and the one-shot error message contract.

use std::fmt;

use crate::driver::{Dialect, Session};
use crate::error::RowBindError;
use crate::results::ResultSet;
use crate::types::ConnectionConfig;

/// One open connection with a write-then-execute statement buffer.
///
/// Statement text accumulates via [`Connection::push`] (or `fmt::Write`) and
/// runs when `exec`/`select`/`single_value` is called; each of those clears
/// the buffer whether or not the statement succeeded.
///
/// Failures never propagate as errors from the execution surface: `exec`
/// returns `false`, `select` returns a result set with the `-1` sentinel,
/// `single_value` returns an empty string, and the failure text is readable
/// exactly once through [`Connection::error_msg`].
#[derive(Debug)]
pub struct Connection {
    session: Session,
    config: ConnectionConfig,
    buffer: String,
    in_trans: bool,
    trans_error: bool,
    last_error: String,
}

impl Connection {
    pub(crate) fn open(config: &ConnectionConfig) -> Result<Self, RowBindError> {
        let session = Session::open(config)?;
        Ok(Self {
            session,
            config: config.clone(),
            buffer: String::new(),
            in_trans: false,
            trans_error: false,
            last_error: String::new(),
        })
    }

    /// Append text to the pending statement.
    pub fn push(&mut self, text: &str) {
        self.buffer.push_str(text);
    }

    /// Current contents of the pending statement buffer.
    #[must_use]
    pub fn current_statement(&self) -> &str {
        &self.buffer
    }

    /// Discard the pending statement without executing it.
    pub fn abandon_statement(&mut self) {
        self.buffer.clear();
    }

    /// SQL dialect of the underlying session.
    #[must_use]
    pub fn dialect(&self) -> Dialect {
        self.session.dialect()
    }

    /// Dialect expression extracting a Unix timestamp from `column`.
    #[must_use]
    pub fn epoch_date(&self, column: &str) -> String {
        self.dialect().epoch_expr(column)
    }

    /// Execute the pending statement; for inserts, updates, deletes —
    /// anything that returns no rows.
    ///
    /// Do not begin or end transactions this way; use `begin_trans` and
    /// friends so overlapping transactions stay impossible.
    pub fn exec(&mut self) -> bool {
        let stmt = std::mem::take(&mut self.buffer);
        if self.poisoned() {
            return false;
        }
        tracing::debug!(statement = %stmt, "exec");
        match self.session.run_command(&stmt) {
            Ok(()) => true,
            Err(err) => {
                self.log_error(&stmt, &err);
                false
            }
        }
    }

    /// Execute the pending statement and return its rows.
    ///
    /// A non-select statement or a failure yields a result set whose
    /// `num_rows()` is the `-1` sentinel; iteration treats it as empty.
    pub fn select(&mut self) -> ResultSet {
        let stmt = std::mem::take(&mut self.buffer);
        if self.poisoned() {
            return ResultSet::failed();
        }
        tracing::debug!(statement = %stmt, "select");
        match self.session.run_query(&stmt) {
            Ok(raw) => ResultSet::from_raw(raw),
            Err(err) => {
                self.log_error(&stmt, &err);
                ResultSet::failed()
            }
        }
    }

    /// Execute the pending statement and return only the first field of the
    /// first row; empty string on failure or an empty result.
    pub fn single_value(&mut self) -> String {
        let stmt = std::mem::take(&mut self.buffer);
        if self.poisoned() {
            return String::new();
        }
        tracing::debug!(statement = %stmt, "single_value");
        match self.session.run_query(&stmt) {
            Ok(raw) => raw
                .rows
                .first()
                .and_then(|row| row.first())
                .and_then(Clone::clone)
                .unwrap_or_default(),
            Err(err) => {
                self.log_error(&stmt, &err);
                String::new()
            }
        }
    }

    /// Execute the pending insert, then return the current value of
    /// `sequence` as text; empty string when the insert failed or no
    /// sequence name was given.
    pub fn insert(&mut self, sequence: &str) -> String {
        if self.exec() && !sequence.is_empty() {
            let currval = self.dialect().currval_sql(sequence);
            self.push(&currval);
            self.single_value()
        } else {
            String::new()
        }
    }

    /// Begin a transaction. Fails if one is already open.
    pub fn begin_trans(&mut self) -> bool {
        if self.in_trans {
            return false;
        }
        let sql = self.dialect().begin_sql();
        let ok = match self.session.run_command(sql) {
            Ok(()) => {
                self.in_trans = true;
                true
            }
            Err(err) => {
                self.log_raw_error(sql, &err);
                false
            }
        };
        self.trans_error = false;
        ok
    }

    /// Commit the open transaction. With no open transaction, or after a
    /// statement in it failed, this aborts instead and returns false.
    pub fn commit_trans(&mut self) -> bool {
        if self.in_trans && !self.trans_error {
            let sql = self.dialect().commit_sql();
            let ok = match self.session.run_command(sql) {
                Ok(()) => true,
                Err(err) => {
                    self.log_raw_error(sql, &err);
                    false
                }
            };
            self.in_trans = false;
            self.trans_error = false;
            ok
        } else {
            self.abort_trans();
            false
        }
    }

    /// Abort the open transaction; false if none was open.
    pub fn abort_trans(&mut self) -> bool {
        let mut ok = false;
        if self.in_trans {
            let sql = self.dialect().abort_sql();
            match self.session.run_command(sql) {
                Ok(()) => ok = true,
                Err(err) => self.log_raw_error(sql, &err),
            }
        }
        self.in_trans = false;
        self.trans_error = false;
        ok
    }

    /// Is a transaction currently open?
    #[must_use]
    pub fn in_trans(&self) -> bool {
        self.in_trans
    }

    /// Has a statement failed inside the open transaction?
    #[must_use]
    pub fn trans_error(&self) -> bool {
        self.trans_error
    }

    /// Description of the last failure. Reading it clears it: a second call
    /// with no intervening failure returns an empty string.
    pub fn error_msg(&mut self) -> String {
        std::mem::take(&mut self.last_error)
    }

    /// Check the connection is still good, reconnecting transparently.
    pub fn ping(&mut self) -> bool {
        self.session.ping(&self.config)
    }

    fn poisoned(&self) -> bool {
        self.in_trans && self.trans_error
    }

    fn log_error(&mut self, stmt: &str, err: &RowBindError) {
        tracing::error!(statement = stmt, error = %err, "sql statement failed");
        self.last_error = format!("Statement: \n{stmt}\n{err}");
        if self.in_trans {
            self.trans_error = true;
        }
    }

    // Transaction control failures do not poison; they reset state instead.
    fn log_raw_error(&mut self, stmt: &str, err: &RowBindError) {
        tracing::error!(statement = stmt, error = %err, "sql statement failed");
        self.last_error = format!("Statement: \n{stmt}\n{err}");
    }
}

impl fmt::Write for Connection {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.push(s);
        Ok(())
    }
}
