//! `PostgreSQL` backend session, built on the blocking `postgres` client.
//!
//! Uses the simple-query protocol so every tuple comes back as text, which is
//! what the typed field layer parses from.

use postgres::{Client, NoTls, SimpleQueryMessage};

use crate::driver::RawRows;
use crate::error::RowBindError;
use crate::types::ConnectionConfig;

pub struct PostgresSession {
    client: Client,
}

impl PostgresSession {
    pub(crate) fn open(config: &ConnectionConfig) -> Result<Self, RowBindError> {
        let conn_string = config.postgres_conn_string();
        let client = Client::connect(&conn_string, NoTls)?;
        Ok(Self { client })
    }

    pub(crate) fn run_command(&mut self, sql: &str) -> Result<(), RowBindError> {
        self.client.batch_execute(sql)?;
        Ok(())
    }

    pub(crate) fn run_query(&mut self, sql: &str) -> Result<RawRows, RowBindError> {
        let messages = self.client.simple_query(sql)?;
        let mut out = RawRows::default();
        for message in messages {
            if let SimpleQueryMessage::Row(row) = message {
                out.columns = row.len();
                let mut values = Vec::with_capacity(row.len());
                for idx in 0..row.len() {
                    values.push(row.get(idx).map(str::to_string));
                }
                out.rows.push(values);
            }
        }
        Ok(out)
    }

    pub(crate) fn alive(&mut self) -> bool {
        !self.client.is_closed() && self.client.simple_query("select 1").is_ok()
    }
}
