//! Convenient imports for common functionality.
//!
//! Pulls in the pool, query, and field types most callers touch, so a
//! single glob import is enough to get going.

pub use crate::commas::Commas;
pub use crate::connection::Connection;
pub use crate::error::RowBindError;
pub use crate::fields::{BindableField, Field, FieldSpec, FieldValue, UpdateableField};
pub use crate::manifest;
pub use crate::pool::{ConnectionPool, Handle};
pub use crate::query::{CompareOp, Manifest, Query, RowHandle, Rows, SubSelect};
pub use crate::quote::{quote, quote_opt};
pub use crate::results::{ResultSet, RowRef};
pub use crate::row_saver::RowSync;
pub use crate::types::{Backend, ConnectionConfig};
pub use crate::Dialect;
