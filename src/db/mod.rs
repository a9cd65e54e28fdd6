//! Database access layer.
//!
//! This module provides:
//! - Datasources owning a connection pool per shard
//! - Transaction contexts and their finalize lifecycle
//! - Wrappers that run work inside a transaction with panic safety
//! - Backend dispatch macros and parameter binding
//! - Per-transaction diagnostic context

pub mod auto_trans;
pub mod datasource;
#[macro_use]
pub mod macros;
mod params;
pub mod trace;
pub mod transaction;

pub use auto_trans::{auto_trans, auto_trans_with_result};
pub use datasource::{Datasource, DbConnection, DbPool};
pub use macros::DatabaseType;
pub use trace::{TraceContext, current_thread_id, new_trace_id};
pub use transaction::{RequestStyle, TcStatus, TransContext};
