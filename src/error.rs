use thiserror::Error;

/// Error type shared across the crate.
///
/// Driver errors convert via `#[from]`; the remaining variants carry either
/// configuration/connection context or a typed-row-access contract violation.
#[derive(Debug, Error)]
pub enum RowBindError {
    #[cfg(feature = "sqlite")]
    #[error(transparent)]
    SqliteError(#[from] rusqlite::Error),

    #[cfg(feature = "postgres")]
    #[error(transparent)]
    PostgresError(#[from] postgres::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("SQL execution error: {0}")]
    ExecutionError(String),

    /// The field's table contributes no primary key to the query manifest,
    /// so no row saver can write it back.
    #[error(
        "field {table}.{column} is not updatable: no primary key for its table in the manifest"
    )]
    NotUpdatable {
        column: &'static str,
        table: &'static str,
    },

    /// A typed accessor asked for a field kind that does not match the slot
    /// materialized at that manifest position.
    #[error("field type mismatch at manifest position {position} ({table}.{column})")]
    FieldTypeMismatch {
        position: usize,
        column: &'static str,
        table: &'static str,
    },

    /// Manifest position out of range for this query shape.
    #[error("manifest position {position} out of range (manifest has {len} fields)")]
    PositionOutOfRange { position: usize, len: usize },
}
