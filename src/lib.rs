//! Typed row access over a relational database, with deferred write-back.
//!
//! The crate pools connections ([`pool::ConnectionPool`]), builds SELECTs
//! from declarative column manifests ([`manifest!`] and [`query::Query`]),
//! and hands out typed fields over the result text. Fields from a keyed row
//! share value slots; assigning through an
//! [`UpdateableField`](fields::UpdateableField) schedules an UPDATE that runs
//! when the last clone of the slot goes away, so scattered mutations of one
//! row collapse into a single statement.
//!
//! Backends are feature-gated: `sqlite` (default, via `rusqlite`) and
//! `postgres` (via the blocking `postgres` client).

pub mod commas;
pub mod connection;
pub mod error;
pub mod fields;
pub mod macros;
pub mod pool;
pub mod prelude;
pub mod query;
pub mod quote;
pub mod results;
pub mod row_saver;
pub mod types;

mod driver;
#[cfg(feature = "postgres")]
mod postgres;
#[cfg(feature = "sqlite")]
mod sqlite;

pub use driver::Dialect;
pub use error::RowBindError;
pub use pool::{ConnectionPool, Handle};
pub use query::{CompareOp, Query};
