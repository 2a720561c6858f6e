pub mod backend;
pub mod pool;
pub mod schema;
pub mod types;

pub use backend::{Backend, Tx};
pub use pool::{ConnectionPool, DbTarget, PooledConnection};
pub use types::{Params, Result, Row, StorageError};
