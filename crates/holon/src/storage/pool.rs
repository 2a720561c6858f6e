//! Connection pool for the SQLite-backed storage adapter.
//!
//! A semaphore bounds the number of connections ever created; a channel
//! recycles connections returned by `Drop`. The engine underneath is
//! `rusqlite::Connection`, which is synchronous, so every call that
//! touches a `PooledConnection` runs inside `tokio::task::spawn_blocking`
//! (see `storage::backend`).

use std::ops::{Deref, DerefMut};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex, Semaphore};

use super::types::{Result, StorageError};

static CONNECTION_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Where the backing SQLite database lives.
#[derive(Clone, Debug)]
pub enum DbTarget {
    File(std::path::PathBuf),
    Memory,
}

impl DbTarget {
    pub fn from_path_str(raw: &str) -> Self {
        if raw == ":memory:" {
            DbTarget::Memory
        } else {
            DbTarget::File(Path::new(raw).to_path_buf())
        }
    }

    fn open(&self) -> rusqlite::Result<rusqlite::Connection> {
        match self {
            DbTarget::File(path) => rusqlite::Connection::open(path),
            DbTarget::Memory => rusqlite::Connection::open_in_memory(),
        }
    }
}

/// Bounded pool of pre-opened `rusqlite::Connection`s.
#[derive(Clone)]
pub struct ConnectionPool {
    semaphore: Arc<Semaphore>,
    available: Arc<Mutex<mpsc::UnboundedReceiver<rusqlite::Connection>>>,
    return_tx: mpsc::UnboundedSender<rusqlite::Connection>,
    target: DbTarget,
    pub max_pool_size: usize,
}

impl ConnectionPool {
    pub fn new(target: DbTarget, max_pool_size: usize) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            semaphore: Arc::new(Semaphore::new(max_pool_size)),
            available: Arc::new(Mutex::new(rx)),
            return_tx: tx,
            target,
            max_pool_size,
        }
    }

    /// Acquire a permit, then either reuse a returned connection or open a
    /// fresh one. Opening and `PRAGMA` setup happen on the calling thread;
    /// callers invoke this from inside `spawn_blocking`.
    pub fn get_connection(&self) -> Result<PooledConnection> {
        let conn_id = CONNECTION_COUNTER.fetch_add(1, Ordering::SeqCst);

        let mut available = self
            .available
            .try_lock()
            .map_err(|_| StorageError::PoolError("failed to lock connection pool".to_string()))?;

        match available.try_recv() {
            Ok(conn) => {
                tracing::debug!("[CONN-{conn_id}] reusing connection from pool");
                return Ok(PooledConnection {
                    conn: Some(conn),
                    return_tx: Some(self.return_tx.clone()),
                    conn_id,
                });
            }
            Err(mpsc::error::TryRecvError::Empty) => {}
            Err(mpsc::error::TryRecvError::Disconnected) => {}
        }

        tracing::debug!("[CONN-{conn_id}] opening new database connection");
        let conn = self.target.open().map_err(|e| {
            tracing::error!("[CONN-{conn_id}] failed to open connection: {e}");
            StorageError::DatabaseError(e.to_string())
        })?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(|e| StorageError::DatabaseError(e.to_string()))?;

        Ok(PooledConnection {
            conn: Some(conn),
            return_tx: Some(self.return_tx.clone()),
            conn_id,
        })
    }
}

/// A connection that returns itself to the pool on drop.
pub struct PooledConnection {
    conn: Option<rusqlite::Connection>,
    return_tx: Option<mpsc::UnboundedSender<rusqlite::Connection>>,
    conn_id: u64,
}

impl Deref for PooledConnection {
    type Target = rusqlite::Connection;

    fn deref(&self) -> &Self::Target {
        self.conn.as_ref().expect("connection already taken")
    }
}

impl DerefMut for PooledConnection {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.conn.as_mut().expect("connection already taken")
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        if let (Some(conn), Some(tx)) = (self.conn.take(), self.return_tx.take()) {
            if tx.send(conn).is_err() {
                tracing::debug!("[CONN-{}] pool return channel closed, dropping connection", self.conn_id);
            } else {
                tracing::debug!("[CONN-{}] connection returned to pool", self.conn_id);
            }
        }
    }
}
