//! Parameter binding utilities for database queries.
//!
//! This module binds [`Value`]s to backend-specific query objects, in the
//! order produced by table metadata extraction.

use crate::models::Value;
use sqlx::mysql::MySqlArguments;
use sqlx::sqlite::SqliteArguments;
use sqlx::types::Json;
use sqlx::{MySql, Sqlite};

/// Bind a value to a MySQL query.
pub(crate) fn bind_mysql_value<'q>(
    query: sqlx::query::Query<'q, MySql, MySqlArguments>,
    value: &'q Value,
) -> sqlx::query::Query<'q, MySql, MySqlArguments> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(v) => query.bind(*v),
        Value::Int(v) => query.bind(*v),
        Value::UInt(v) => query.bind(*v),
        Value::Float(v) => query.bind(*v),
        Value::Text(v) => query.bind(v.as_str()),
        Value::Bytes(v) => query.bind(v.as_slice()),
        Value::Datetime(v) => query.bind(v.into_naive()),
        Value::Json(v) => query.bind(Json(v)),
    }
}

/// Bind a value to a SQLite query.
pub(crate) fn bind_sqlite_value<'q>(
    query: sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>,
    value: &'q Value,
) -> sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(v) => query.bind(*v),
        Value::Int(v) => query.bind(*v),
        // SQLite integers are signed; out-of-range values are stored as text
        Value::UInt(v) => match i64::try_from(*v) {
            Ok(signed) => query.bind(signed),
            Err(_) => query.bind(v.to_string()),
        },
        Value::Float(v) => query.bind(*v),
        Value::Text(v) => query.bind(v.as_str()),
        Value::Bytes(v) => query.bind(v.as_slice()),
        Value::Datetime(v) => query.bind(v.into_naive()),
        // SQLite doesn't have native JSON type, store as string
        Value::Json(v) => query.bind(v.to_string()),
    }
}

pub(crate) fn bind_mysql_values<'q>(
    query: sqlx::query::Query<'q, MySql, MySqlArguments>,
    values: &'q [Value],
) -> sqlx::query::Query<'q, MySql, MySqlArguments> {
    values.iter().fold(query, bind_mysql_value)
}

pub(crate) fn bind_sqlite_values<'q>(
    query: sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>,
    values: &'q [Value],
) -> sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>> {
    values.iter().fold(query, bind_sqlite_value)
}
