//! Storage-layer error taxonomy and the parameter-binding value type.
//!
//! Rows are concrete structs rather than a dynamic value type, but
//! parameter binding still goes through a plain `HashMap<String, _>`
//! named-parameter shape for `execute`/`query`.

use rusqlite::types::Value as SqlValue;
use std::collections::HashMap;
use thiserror::Error;

/// Named parameters bound into a `$name` placeholder SQL string.
pub type Params = HashMap<String, SqlValue>;

/// One result row: column name to raw SQLite value.
pub type Row = HashMap<String, SqlValue>;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    #[error("schema error: {0}")]
    SchemaError(String),

    #[error("query error: {0}")]
    QueryError(String),

    #[error("serialization error: {0}")]
    SerializationError(String),

    #[error("pool error: {0}")]
    PoolError(String),

    #[error("database error: {0}")]
    DatabaseError(String),
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        StorageError::DatabaseError(err.to_string())
    }
}

/// Storage failures surface to domain services as `Internal` errors; the
/// caller never needs to distinguish a query error from a pool error.
impl From<StorageError> for holon_core::CoreError {
    fn from(err: StorageError) -> Self {
        holon_core::CoreError::internal(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StorageError>;
