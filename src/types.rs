//! Connection configuration shared by every backend.

/// The database backend a pool connects to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    /// `SQLite` database (path or URI in `dbname`)
    #[cfg(feature = "sqlite")]
    Sqlite,
    /// `PostgreSQL` database
    #[cfg(feature = "postgres")]
    Postgres,
}

/// Connection parameters for a pool.
///
/// All parts are optional text; whatever is present is assembled into the
/// driver's native connection string. For `SQLite`, `dbname` is the database
/// path (or a `file:` URI such as `file::memory:?cache=shared`).
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    pub backend: Backend,
    pub dbname: Option<String>,
    pub login: Option<String>,
    pub password: Option<String>,
    pub host: Option<String>,
    pub port: Option<String>,
}

impl ConnectionConfig {
    /// Configuration for a `SQLite` database at `path`.
    #[cfg(feature = "sqlite")]
    #[must_use]
    pub fn sqlite(path: impl Into<String>) -> Self {
        Self {
            backend: Backend::Sqlite,
            dbname: Some(path.into()),
            login: None,
            password: None,
            host: None,
            port: None,
        }
    }

    /// Configuration for a `PostgreSQL` database; fill in parts with the
    /// `with_*` builders.
    #[cfg(feature = "postgres")]
    #[must_use]
    pub fn postgres() -> Self {
        Self {
            backend: Backend::Postgres,
            dbname: None,
            login: None,
            password: None,
            host: None,
            port: None,
        }
    }

    #[must_use]
    pub fn with_dbname(mut self, dbname: impl Into<String>) -> Self {
        self.dbname = Some(dbname.into());
        self
    }

    #[must_use]
    pub fn with_login(mut self, login: impl Into<String>) -> Self {
        self.login = Some(login.into());
        self
    }

    #[must_use]
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    #[must_use]
    pub fn with_port(mut self, port: impl Into<String>) -> Self {
        self.port = Some(port.into());
        self
    }

    /// Assemble the `key=value` connect string used by the Postgres driver.
    #[cfg(feature = "postgres")]
    pub(crate) fn postgres_conn_string(&self) -> String {
        fn push(out: &mut String, key: &str, val: Option<&String>) {
            if let Some(v) = val {
                if !v.is_empty() {
                    if !out.is_empty() {
                        out.push(' ');
                    }
                    out.push_str(key);
                    out.push('=');
                    out.push_str(v);
                }
            }
        }
        let mut out = String::new();
        push(&mut out, "user", self.login.as_ref());
        push(&mut out, "password", self.password.as_ref());
        push(&mut out, "host", self.host.as_ref());
        push(&mut out, "port", self.port.as_ref());
        push(&mut out, "dbname", self.dbname.as_ref());
        out
    }
}
