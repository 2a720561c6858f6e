//! Raw-SQL execution and transaction scoping.
//!
//! The named-parameter rewrite (`$name` -> positional `?`) is a single
//! character-walk over the SQL text paired with an ordered argument list.
//! Every call that touches the connection runs inside `spawn_blocking`
//! since `rusqlite` is synchronous.

use std::collections::HashMap;
use std::sync::Arc;

use rusqlite::types::Value as SqlValue;
use tokio::sync::Mutex;

use super::pool::{ConnectionPool, PooledConnection};
use super::types::{Params, Result, Row, StorageError};

fn bind_named(sql: &str, params: &Params) -> Result<(String, Vec<SqlValue>)> {
    let mut result_sql = String::with_capacity(sql.len());
    let mut values = Vec::new();
    let mut chars = sql.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' {
            let mut name = String::new();
            while let Some(&next) = chars.peek() {
                if next.is_alphanumeric() || next == '_' {
                    name.push(chars.next().unwrap());
                } else {
                    break;
                }
            }
            match params.get(&name) {
                Some(value) => {
                    result_sql.push('?');
                    values.push(value.clone());
                }
                None => {
                    return Err(StorageError::QueryError(format!(
                        "parameter ${name} not found"
                    )))
                }
            }
        } else {
            result_sql.push(ch);
        }
    }

    Ok((result_sql, values))
}

fn execute_on(conn: &rusqlite::Connection, sql: &str, params: &Params) -> Result<usize> {
    let (sql, values) = bind_named(sql, params)?;
    let refs: Vec<&dyn rusqlite::ToSql> = values.iter().map(|v| v as &dyn rusqlite::ToSql).collect();
    conn.execute(&sql, refs.as_slice()).map_err(Into::into)
}

fn query_on(conn: &rusqlite::Connection, sql: &str, params: &Params) -> Result<Vec<Row>> {
    let (sql, values) = bind_named(sql, params)?;
    let mut stmt = conn.prepare(&sql)?;
    let column_names: Vec<String> = stmt.column_names().into_iter().map(str::to_string).collect();
    let refs: Vec<&dyn rusqlite::ToSql> = values.iter().map(|v| v as &dyn rusqlite::ToSql).collect();

    let rows = stmt.query_map(refs.as_slice(), move |row| {
        let mut out: Row = HashMap::with_capacity(column_names.len());
        for (idx, name) in column_names.iter().enumerate() {
            let value: SqlValue = row.get(idx)?;
            out.insert(name.clone(), value);
        }
        Ok(out)
    })?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row.map_err(StorageError::from)?);
    }
    Ok(results)
}

async fn run_blocking<F, T>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| StorageError::DatabaseError(format!("blocking task panicked: {e}")))?
}

/// Thin facade over the pool for statements that don't need an explicit
/// transaction (plain reads).
#[derive(Clone)]
pub struct Backend {
    pool: Arc<ConnectionPool>,
}

impl Backend {
    pub fn new(pool: Arc<ConnectionPool>) -> Self {
        Self { pool }
    }

    pub async fn execute(&self, sql: &str, params: Params) -> Result<usize> {
        let pool = self.pool.clone();
        let sql = sql.to_string();
        run_blocking(move || {
            let conn = pool.get_connection()?;
            execute_on(&conn, &sql, &params)
        })
        .await
    }

    pub async fn query(&self, sql: &str, params: Params) -> Result<Vec<Row>> {
        let pool = self.pool.clone();
        let sql = sql.to_string();
        run_blocking(move || {
            let conn = pool.get_connection()?;
            query_on(&conn, &sql, &params)
        })
        .await
    }

    pub async fn execute_batch(&self, sql: &str) -> Result<()> {
        let pool = self.pool.clone();
        let sql = sql.to_string();
        run_blocking(move || {
            let conn = pool.get_connection()?;
            conn.execute_batch(&sql).map_err(Into::into)
        })
        .await
    }

    pub async fn begin(&self) -> Result<Tx> {
        Tx::begin(self.pool.clone()).await
    }
}

/// An open transaction, begun with `BEGIN IMMEDIATE` so writers serialize
/// against each other for the transaction's full duration. Dropping an
/// uncommitted `Tx` issues a best-effort `ROLLBACK`.
pub struct Tx {
    conn: Arc<Mutex<Option<PooledConnection>>>,
    finished: bool,
}

impl Tx {
    async fn begin(pool: Arc<ConnectionPool>) -> Result<Self> {
        let conn = run_blocking(move || {
            let conn = pool.get_connection()?;
            conn.execute_batch("BEGIN IMMEDIATE")?;
            Ok(conn)
        })
        .await?;

        Ok(Self {
            conn: Arc::new(Mutex::new(Some(conn))),
            finished: false,
        })
    }

    pub async fn execute(&self, sql: &str, params: Params) -> Result<usize> {
        let sql = sql.to_string();
        self.with_conn(move |conn| execute_on(conn, &sql, &params)).await
    }

    pub async fn query(&self, sql: &str, params: Params) -> Result<Vec<Row>> {
        let sql = sql.to_string();
        self.with_conn(move |conn| query_on(conn, &sql, &params)).await
    }

    pub async fn last_insert_rowid(&self) -> Result<i64> {
        self.with_conn(|conn| Ok(conn.last_insert_rowid())).await
    }

    async fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&rusqlite::Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn_arc = self.conn.clone();
        run_blocking(move || {
            let guard = conn_arc.blocking_lock();
            let conn = guard
                .as_ref()
                .ok_or_else(|| StorageError::DatabaseError("transaction already finished".into()))?;
            f(conn)
        })
        .await
    }

    pub async fn commit(mut self) -> Result<()> {
        self.finish("COMMIT").await
    }

    pub async fn rollback(mut self) -> Result<()> {
        self.finish("ROLLBACK").await
    }

    async fn finish(&mut self, stmt: &'static str) -> Result<()> {
        self.finished = true;
        let conn_arc = self.conn.clone();
        run_blocking(move || {
            let mut guard = conn_arc.blocking_lock();
            if let Some(conn) = guard.take() {
                conn.execute_batch(stmt)?;
            }
            Ok(())
        })
        .await
    }
}

impl Drop for Tx {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        if let Ok(mut guard) = self.conn.try_lock() {
            if let Some(conn) = guard.take() {
                if let Err(e) = conn.execute_batch("ROLLBACK") {
                    tracing::warn!("rollback on drop failed: {e}");
                }
            }
        } else {
            tracing::warn!("Tx dropped while connection locked; relying on pool reset");
        }
    }
}
