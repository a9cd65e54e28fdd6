//! Transaction context: one connection, at most one physical transaction.
//!
//! A [`TransContext`] is the starting point of every database operation. Its
//! lifecycle has two states: it is created in [`TcStatus::Init`] with a
//! connection checked out (and a transaction begun unless the request style
//! is [`RequestStyle::None`]), and it reaches [`TcStatus::Invalid`] exactly
//! once, when finalize commits or rolls back and releases the connection.
//!
//! Finalize never reports commit, rollback or close failures to the caller.
//! They are logged; the outcome of the caller's own work is what counts.

use crate::db::datasource::{Datasource, DbConnection};
use crate::db::macros::DatabaseType;
use crate::db::params::{bind_mysql_values, bind_sqlite_values};
use crate::db::trace::TraceContext;
use crate::error::{DaoError, DaoResult};
use crate::impl_db_dispatch;
use crate::models::Value;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use sqlx::Row;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::panic;
use std::time::Instant;
use tracing::{Span, debug, error, info, warn};

/// Logged as the failure when finalize runs because the work panicked.
pub(crate) const MET_RECOVER: &str = "met recover";

/// Which kind of physical transaction a context opens.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum RequestStyle {
    /// No transaction; statements run in autocommit mode on the connection.
    #[default]
    None,
    ReadOnly,
    ReadWrite,
}

impl RequestStyle {
    pub fn opens_transaction(self) -> bool {
        self != RequestStyle::None
    }

    pub fn is_read_only(self) -> bool {
        self == RequestStyle::ReadOnly
    }
}

impl fmt::Display for RequestStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::ReadOnly => write!(f, "read-only"),
            Self::ReadWrite => write!(f, "read-write"),
        }
    }
}

/// Lifecycle status of a [`TransContext`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TcStatus {
    Init,
    /// Terminal: finalized and the connection is gone.
    Invalid,
}

impl fmt::Display for TcStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Init => write!(f, "init"),
            Self::Invalid => write!(f, "invalid"),
        }
    }
}

#[derive(Debug)]
struct OpenTransaction {
    read_only: bool,
    begun_at: Instant,
}

fn begin_statement(db_type: DatabaseType, read_only: bool) -> &'static str {
    match (db_type, read_only) {
        (DatabaseType::MySql, true) => "START TRANSACTION READ ONLY",
        (DatabaseType::MySql, false) => "START TRANSACTION",
        (DatabaseType::SQLite, true) => "BEGIN DEFERRED",
        (DatabaseType::SQLite, false) => "BEGIN IMMEDIATE",
    }
}

/// Statements switching a connection into and out of query-only mode, for
/// backends without a read-only transaction.
fn query_only_statements(db_type: DatabaseType) -> Option<(&'static str, &'static str)> {
    match db_type {
        DatabaseType::SQLite => Some(("PRAGMA query_only = ON", "PRAGMA query_only = OFF")),
        DatabaseType::MySql => None,
    }
}

/// A single unit of work bound to one pooled connection.
///
/// Owned by the task that created it; it is not meant to be shared between
/// concurrent workers. Every context must end with [`TransContext::complete`]
/// or [`TransContext::complete_with_panic`] (the `auto_trans` wrappers do
/// this for you).
pub struct TransContext {
    request_style: RequestStyle,
    tx: Option<OpenTransaction>,
    conn: Option<DbConnection>,
    status: TcStatus,
    trace: TraceContext,
    log_sql: bool,
    /// Free-form values callers attach to the unit of work.
    pub ext_info: HashMap<String, serde_json::Value>,
}

impl fmt::Debug for TransContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransContext")
            .field("request_style", &self.request_style)
            .field("status", &self.status)
            .field("trace", &self.trace)
            .field("tx_open", &self.tx.is_some())
            .field("log_sql", &self.log_sql)
            .finish_non_exhaustive()
    }
}

impl TransContext {
    /// Create a transaction context on `datasource`.
    ///
    /// `trace_id` identifies the business request and is attached to every
    /// log line; an empty string is allowed.
    pub async fn new(
        datasource: &Datasource,
        request_style: RequestStyle,
        trace_id: impl Into<String>,
    ) -> DaoResult<Self> {
        let trace = TraceContext::new(trace_id);
        let mut conn = datasource.acquire(&trace).await?;

        let tx = match Self::begin(&mut conn, request_style, &trace).await {
            Ok(tx) => tx,
            Err(e) => {
                close_conn(conn, &trace).await;
                return Err(e);
            }
        };

        Ok(Self {
            request_style,
            tx,
            conn: Some(conn),
            status: TcStatus::Init,
            trace,
            log_sql: datasource.is_log_sql(),
            ext_info: HashMap::new(),
        })
    }

    async fn begin(
        conn: &mut DbConnection,
        request_style: RequestStyle,
        trace: &TraceContext,
    ) -> DaoResult<Option<OpenTransaction>> {
        if !request_style.opens_transaction() {
            return Ok(None);
        }
        let read_only = request_style.is_read_only();
        let statement = begin_statement(conn.db_type(), read_only);
        if let Err(e) = conn.execute_raw(statement).await {
            error!(
                trace_id = %trace.trace_id(),
                thread_id = trace.thread_id(),
                error = %e,
                "Begin transaction failed"
            );
            return Err(DaoError::transaction_begin(e.to_string()));
        }
        if let (true, Some((enable, _))) = (read_only, query_only_statements(conn.db_type())) {
            if let Err(e) = conn.execute_raw(enable).await {
                error!(
                    trace_id = %trace.trace_id(),
                    thread_id = trace.thread_id(),
                    error = %e,
                    "Enable query-only mode failed"
                );
                return Err(DaoError::transaction_begin(e.to_string()));
            }
        }
        debug!(
            trace_id = %trace.trace_id(),
            thread_id = trace.thread_id(),
            read_only = read_only,
            "Transaction started"
        );
        Ok(Some(OpenTransaction {
            read_only,
            begun_at: Instant::now(),
        }))
    }

    pub fn request_style(&self) -> RequestStyle {
        self.request_style
    }

    pub fn status(&self) -> TcStatus {
        self.status
    }

    /// Whether a physical transaction is currently open.
    pub fn in_transaction(&self) -> bool {
        self.tx.is_some()
    }

    pub fn trace(&self) -> &TraceContext {
        &self.trace
    }

    /// Span carrying this context's trace fields.
    pub fn span(&self) -> Span {
        self.trace.span()
    }

    pub fn is_log_sql(&self) -> bool {
        self.log_sql
    }

    fn check(&self) -> DaoResult<()> {
        if self.status != TcStatus::Init {
            return Err(DaoError::invalid_state(self.status.to_string()));
        }
        Ok(())
    }

    /// The connection bound to this context, while it is live.
    pub fn connection(&mut self) -> DaoResult<&mut DbConnection> {
        self.check()?;
        self.conn
            .as_mut()
            .ok_or_else(|| DaoError::invalid_state(self.status.to_string()))
    }

    /// Log a statement if the datasource asked for it.
    pub fn trace_sql(&self, sql: &str, args: &[Value]) {
        if !self.log_sql {
            return;
        }
        let args = serde_json::to_string(args).unwrap_or_default();
        info!(
            trace_id = %self.trace.trace_id(),
            thread_id = self.trace.thread_id(),
            sql = %sql,
            args = %args,
            "exec sql"
        );
    }

    /// Execute a statement and return the number of affected rows.
    pub async fn execute(&mut self, sql: &str, args: &[Value]) -> DaoResult<u64> {
        self.check()?;
        self.trace_sql(sql, args);
        let conn = self.connection()?;
        let affected = impl_db_dispatch!(DbConnection, conn, {
            MySql(c) => bind_mysql_values(sqlx::query(sql), args)
                .execute(&mut **c)
                .await?
                .rows_affected(),
            SQLite(c) => bind_sqlite_values(sqlx::query(sql), args)
                .execute(&mut **c)
                .await?
                .rows_affected(),
        });
        Ok(affected)
    }

    /// Fetch the first column of the first row as an integer, if any row
    /// comes back.
    pub async fn fetch_optional_i64(&mut self, sql: &str, args: &[Value]) -> DaoResult<Option<i64>> {
        self.check()?;
        self.trace_sql(sql, args);
        let conn = self.connection()?;
        let value = impl_db_dispatch!(DbConnection, conn, {
            MySql(c) => bind_mysql_values(sqlx::query(sql), args)
                .fetch_optional(&mut **c)
                .await?
                .map(|row| row.try_get::<i64, _>(0))
                .transpose()?,
            SQLite(c) => bind_sqlite_values(sqlx::query(sql), args)
                .fetch_optional(&mut **c)
                .await?
                .map(|row| row.try_get::<i64, _>(0))
                .transpose()?,
        });
        Ok(value)
    }

    /// Finalize, re-raising `fatal` afterwards when the work panicked.
    ///
    /// `fatal` is the payload caught from an unwinding work function. When it
    /// is present the context is always rolled back and the original panic
    /// resumes once the connection is released. Otherwise this behaves like
    /// [`TransContext::complete`].
    pub async fn complete_with_panic<E>(
        &mut self,
        failure: Option<&E>,
        fatal: Option<Box<dyn Any + Send>>,
    ) where
        E: fmt::Display + Sync + ?Sized,
    {
        if let Some(payload) = fatal {
            self.complete(Some(MET_RECOVER)).await;
            panic::resume_unwind(payload);
        }
        self.complete(failure).await;
    }

    /// Finalize: roll back when `failure` is present, commit otherwise, then
    /// release the connection. Only the first call has any effect.
    pub async fn complete<E>(&mut self, failure: Option<&E>)
    where
        E: fmt::Display + Sync + ?Sized,
    {
        let failed = failure.is_some();
        if let Some(e) = failure {
            error!(
                trace_id = %self.trace.trace_id(),
                thread_id = self.trace.thread_id(),
                error = %e,
                "Transaction work failed"
            );
        }
        if self.status == TcStatus::Invalid {
            return;
        }

        let Some(mut conn) = self.conn.take() else {
            self.status = TcStatus::Invalid;
            return;
        };

        let mut reusable = true;
        if let Some(tx) = self.tx.take() {
            let (statement, action) = if failed {
                ("ROLLBACK", "rollback")
            } else {
                ("COMMIT", "commit")
            };
            match conn.execute_raw(statement).await {
                Ok(()) => debug!(
                    trace_id = %self.trace.trace_id(),
                    thread_id = self.trace.thread_id(),
                    read_only = tx.read_only,
                    elapsed_ms = tx.begun_at.elapsed().as_millis() as u64,
                    "Transaction {}", action
                ),
                Err(e) => {
                    error!(
                        trace_id = %self.trace.trace_id(),
                        thread_id = self.trace.thread_id(),
                        error = %e,
                        "Transaction {} failed", action
                    );
                    reusable = false;
                }
            }
            // A query-only connection must not go back to the pool.
            if let (true, true, Some((_, disable))) = (
                reusable,
                tx.read_only,
                query_only_statements(conn.db_type()),
            ) {
                if let Err(e) = conn.execute_raw(disable).await {
                    error!(
                        trace_id = %self.trace.trace_id(),
                        thread_id = self.trace.thread_id(),
                        error = %e,
                        "Reset query-only mode failed"
                    );
                    reusable = false;
                }
            }
        }

        if reusable {
            conn.release();
        } else {
            close_conn(conn, &self.trace).await;
        }
        self.status = TcStatus::Invalid;
    }
}

impl Drop for TransContext {
    fn drop(&mut self) {
        if self.status == TcStatus::Invalid {
            return;
        }
        let Some(conn) = self.conn.take() else {
            return;
        };
        if self.tx.take().is_some() {
            // The open transaction must not go back to the pool.
            warn!(
                trace_id = %self.trace.trace_id(),
                thread_id = self.trace.thread_id(),
                "TransContext dropped before completion, discarding connection"
            );
            conn.discard();
        } else {
            conn.release();
        }
        self.status = TcStatus::Invalid;
    }
}

/// Close a connection for good; failures are only logged.
async fn close_conn(conn: DbConnection, trace: &TraceContext) {
    if let Err(e) = conn.close().await {
        error!(
            trace_id = %trace.trace_id(),
            thread_id = trace.thread_id(),
            error = %e,
            "Close connection failed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_style_flags() {
        assert!(!RequestStyle::None.opens_transaction());
        assert!(RequestStyle::ReadOnly.opens_transaction());
        assert!(RequestStyle::ReadOnly.is_read_only());
        assert!(RequestStyle::ReadWrite.opens_transaction());
        assert!(!RequestStyle::ReadWrite.is_read_only());
    }

    #[test]
    fn test_request_style_default_is_none() {
        assert_eq!(RequestStyle::default(), RequestStyle::None);
    }

    #[test]
    fn test_request_style_serde() {
        let json = serde_json::to_string(&RequestStyle::ReadOnly).unwrap();
        assert_eq!(json, "\"read-only\"");
        let style: RequestStyle = serde_json::from_str("\"read-write\"").unwrap();
        assert_eq!(style, RequestStyle::ReadWrite);
    }

    #[test]
    fn test_begin_statements() {
        assert_eq!(
            begin_statement(DatabaseType::MySql, true),
            "START TRANSACTION READ ONLY"
        );
        assert_eq!(
            begin_statement(DatabaseType::MySql, false),
            "START TRANSACTION"
        );
        assert_eq!(begin_statement(DatabaseType::SQLite, true), "BEGIN DEFERRED");
        assert_eq!(
            begin_statement(DatabaseType::SQLite, false),
            "BEGIN IMMEDIATE"
        );
    }

    #[test]
    fn test_query_only_statements() {
        assert_eq!(query_only_statements(DatabaseType::MySql), None);
        assert_eq!(
            query_only_statements(DatabaseType::SQLite),
            Some(("PRAGMA query_only = ON", "PRAGMA query_only = OFF"))
        );
    }

    #[test]
    fn test_status_display() {
        assert_eq!(TcStatus::Init.to_string(), "init");
        assert_eq!(TcStatus::Invalid.to_string(), "invalid");
    }
}
