//! daog Library
//!
//! A lightweight, reflection-free data access layer for MySQL. It provides
//! the transactional execution lifecycle (connection checkout, begin,
//! commit/rollback with panic safety) and the metadata-driven extraction of
//! entity fields into column values. Entity metadata comes from generated
//! code, never from runtime type inspection.

pub mod config;
pub mod db;
pub mod error;
pub mod meta;
pub mod models;

pub use config::{Config, DatasourceConfig, normalize_url};
pub use db::{
    Datasource, RequestStyle, TcStatus, TraceContext, TransContext, auto_trans,
    auto_trans_with_result,
};
pub use error::{DaoError, DaoResult};
pub use meta::{ColumnValues, EditHooks, Field, Modifier, TableMeta};
pub use models::{NormalDatetime, Value};
