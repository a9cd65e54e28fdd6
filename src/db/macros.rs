//! Backend dispatch macros for reducing code duplication.
//!
//! This module provides declarative macros that generate backend-specific
//! match arms while maintaining linear readability. The macros expand at
//! compile time with zero runtime overhead.

use std::fmt;

/// Database backend type for dispatch operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatabaseType {
    /// Includes MariaDB
    MySql,
    SQLite,
}

impl DatabaseType {
    /// Detect the backend from a connection URL scheme.
    pub fn from_url(url: &str) -> Option<Self> {
        let lower = url.to_ascii_lowercase();
        if lower.starts_with("mysql://") || lower.starts_with("mariadb://") {
            Some(Self::MySql)
        } else if lower.starts_with("sqlite:") {
            Some(Self::SQLite)
        } else {
            None
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::MySql => "MySQL",
            Self::SQLite => "SQLite",
        }
    }
}

impl fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Macro for generating backend dispatch match arms.
///
/// The first argument names the enum in `crate::db::datasource` whose
/// variants are matched (`DbPool` or `DbConnection`).
///
/// # Example
///
/// ```ignore
/// impl_db_dispatch!(DbConnection, conn, {
///     MySql(c) => do_mysql(c),
///     SQLite(c) => do_sqlite(c),
/// });
/// ```
#[macro_export]
macro_rules! impl_db_dispatch {
    ($kind:ident, $value:expr, { $($variant:ident($p:ident) => $body:expr),+ $(,)? }) => {
        match $value {
            $(
                $crate::db::datasource::$kind::$variant($p) => $body,
            )+
        }
    };
}

pub use impl_db_dispatch;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_type_from_url() {
        assert_eq!(
            DatabaseType::from_url("mysql://root@localhost/app"),
            Some(DatabaseType::MySql)
        );
        assert_eq!(
            DatabaseType::from_url("MariaDB://root@localhost/app"),
            Some(DatabaseType::MySql)
        );
        assert_eq!(
            DatabaseType::from_url("sqlite:data.db"),
            Some(DatabaseType::SQLite)
        );
        assert_eq!(DatabaseType::from_url("postgres://localhost/app"), None);
    }

    #[test]
    fn test_database_type_display() {
        assert_eq!(DatabaseType::MySql.to_string(), "MySQL");
        assert_eq!(DatabaseType::SQLite.to_string(), "SQLite");
    }
}
