//! Connection pooling: a shared pool of idle connections and the refcounted
//! handles that borrow from it.

use std::cell::{RefCell, RefMut};
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;
use std::sync::{Arc, Mutex};

use crate::connection::Connection;
use crate::driver::Dialect;
use crate::error::RowBindError;
use crate::results::ResultSet;
use crate::types::ConnectionConfig;

const DEFAULT_MAX_SPARE: usize = 10;

struct PoolState {
    idle: VecDeque<Connection>,
    max_spare: usize,
}

struct PoolInner {
    config: ConnectionConfig,
    state: Mutex<PoolState>,
}

/// A pool of idle connections for one database.
///
/// [`ConnectionPool::acquire`] hands back the most recently returned idle
/// connection, or opens a fresh one when none are spare. Returned connections
/// are kept up to `max_spare`; past that the oldest idle connection is closed
/// to make room. A `max_spare` of zero disables caching entirely.
///
/// Cloning is cheap and shares the pool.
#[derive(Clone)]
pub struct ConnectionPool {
    inner: Arc<PoolInner>,
}

impl fmt::Debug for ConnectionPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionPool")
            .field("idle", &self.idle_count())
            .field("max_spare", &self.max_spare())
            .finish()
    }
}

impl ConnectionPool {
    /// Create a pool for `config` with the default spare-connection cap.
    #[must_use]
    pub fn new(config: ConnectionConfig) -> Self {
        Self::with_max_spare(config, DEFAULT_MAX_SPARE)
    }

    /// Create a pool keeping at most `max_spare` idle connections.
    #[must_use]
    pub fn with_max_spare(config: ConnectionConfig, max_spare: usize) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                config,
                state: Mutex::new(PoolState {
                    idle: VecDeque::new(),
                    max_spare,
                }),
            }),
        }
    }

    /// Adjust the spare-connection cap, closing idle connections past it.
    pub fn set_max_spare(&self, max_spare: usize) {
        let mut state = self.lock();
        state.max_spare = max_spare;
        while state.idle.len() > max_spare {
            state.idle.pop_front();
        }
    }

    #[must_use]
    pub fn max_spare(&self) -> usize {
        self.lock().max_spare
    }

    /// Number of idle connections currently cached.
    #[must_use]
    pub fn idle_count(&self) -> usize {
        self.lock().idle.len()
    }

    /// Close every cached idle connection. Handles already out stay live.
    pub fn clear_cache(&self) {
        self.lock().idle.clear();
    }

    /// Borrow a connection from the pool, opening one if none are spare.
    ///
    /// # Errors
    ///
    /// Fails when no cached connection answers a ping and a fresh one cannot
    /// be opened.
    pub fn acquire(&self) -> Result<Handle, RowBindError> {
        let cached = self.lock().idle.pop_back();
        let mut conn = match cached {
            Some(conn) => {
                tracing::debug!("reusing an idle connection");
                conn
            }
            None => {
                tracing::debug!("opening a new connection");
                Connection::open(&self.inner.config)?
            }
        };
        if !conn.ping() {
            return Err(RowBindError::ConnectionError(
                "database is not responding".into(),
            ));
        }
        Ok(Handle {
            inner: Rc::new(HandleShared {
                conn: RefCell::new(Some(conn)),
                pool: self.clone(),
            }),
        })
    }

    fn give_back(&self, mut conn: Connection) {
        if conn.in_trans() {
            tracing::warn!("connection returned with an open transaction, aborting it");
            conn.abort_trans();
        }
        conn.abandon_statement();
        let mut state = self.lock();
        if state.max_spare == 0 {
            return;
        }
        if state.idle.len() >= state.max_spare {
            state.idle.pop_front();
        }
        state.idle.push_back(conn);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, PoolState> {
        match self.inner.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

struct HandleShared {
    conn: RefCell<Option<Connection>>,
    pool: ConnectionPool,
}

impl Drop for HandleShared {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.borrow_mut().take() {
            self.pool.give_back(conn);
        }
    }
}

/// A refcounted lease on one pooled connection.
///
/// Clones share the same connection; it returns to its pool when the last
/// clone drops, or immediately on [`Handle::release`]. Using a handle after
/// release is a caller bug and panics.
#[derive(Clone)]
pub struct Handle {
    inner: Rc<HandleShared>,
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("released", &self.inner.conn.borrow().is_none())
            .finish()
    }
}

impl Handle {
    /// Return the connection to the pool now instead of at last drop.
    pub fn release(&self) {
        if let Some(conn) = self.inner.conn.borrow_mut().take() {
            self.inner.pool.give_back(conn);
        }
    }

    /// The pool this handle leases from.
    #[must_use]
    pub fn pool(&self) -> &ConnectionPool {
        &self.inner.pool
    }

    /// Is the underlying connection still answering?
    pub fn valid(&self) -> bool {
        self.conn_mut().ping()
    }

    pub fn push(&self, text: &str) {
        self.conn_mut().push(text);
    }

    #[must_use]
    pub fn current_statement(&self) -> String {
        self.conn_mut().current_statement().to_string()
    }

    pub fn abandon_statement(&self) {
        self.conn_mut().abandon_statement();
    }

    #[must_use]
    pub fn dialect(&self) -> Dialect {
        self.conn_mut().dialect()
    }

    #[must_use]
    pub fn epoch_date(&self, column: &str) -> String {
        self.conn_mut().epoch_date(column)
    }

    pub fn exec(&self) -> bool {
        self.conn_mut().exec()
    }

    pub fn select(&self) -> ResultSet {
        self.conn_mut().select()
    }

    pub fn single_value(&self) -> String {
        self.conn_mut().single_value()
    }

    pub fn insert(&self, sequence: &str) -> String {
        self.conn_mut().insert(sequence)
    }

    pub fn begin_trans(&self) -> bool {
        self.conn_mut().begin_trans()
    }

    pub fn commit_trans(&self) -> bool {
        self.conn_mut().commit_trans()
    }

    pub fn abort_trans(&self) -> bool {
        self.conn_mut().abort_trans()
    }

    #[must_use]
    pub fn in_trans(&self) -> bool {
        self.conn_mut().in_trans()
    }

    #[must_use]
    pub fn trans_error(&self) -> bool {
        self.conn_mut().trans_error()
    }

    pub fn error_msg(&self) -> String {
        self.conn_mut().error_msg()
    }

    fn conn_mut(&self) -> RefMut<'_, Connection> {
        RefMut::map(self.inner.conn.borrow_mut(), |slot| match slot {
            Some(conn) => conn,
            None => panic!("handle used after release"),
        })
    }
}

impl fmt::Write for Handle {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.push(s);
        Ok(())
    }
}
