//! # Driver Abstraction Module
//!
//! The narrow contract between the ORM core and the low-level database
//! drivers: execute a query (optionally feeding each result row to a
//! handler), execute an `INSERT` and report the last autogenerated key, and
//! control transactions. One implementation backed by sqlx covers both
//! supported dialects; tests substitute a mock to assert on executed SQL.

// ============================================================================
// External Crate Imports
// ============================================================================

use async_trait::async_trait;

// ============================================================================
// Internal Crate Imports
// ============================================================================

use crate::errors::Error;

// ============================================================================
// Dialect Enumeration
// ============================================================================

/// The database families supported by the ORM.
///
/// The dialect selects identifier/type rendering rules in the schema editor
/// and the last-insert-id query in the connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dialect {
    /// SQLite (3.x), file-based or in-memory.
    Sqlite,

    /// PostgreSQL (9.5+).
    Postgres,
}

impl Dialect {
    /// The DBMS name reported by connections of this dialect.
    pub fn dbms_name(self) -> &'static str {
        match self {
            Dialect::Sqlite => "sqlite",
            Dialect::Postgres => "postgresql",
        }
    }

    /// Detects the dialect from a connection URL scheme.
    pub fn from_url(url: &str) -> Result<Self, Error> {
        let (scheme, _) = url.split_once(':').unwrap_or((url, ""));
        match scheme {
            "sqlite" => Ok(Dialect::Sqlite),
            "postgres" | "postgresql" => Ok(Dialect::Postgres),
            other => Err(Error::database(format!("unsupported database scheme '{other}'"))),
        }
    }

    /// Whether DDL statements participate in transactions on this dialect.
    ///
    /// Migration atomicity is only honoured where this holds.
    pub fn supports_transactional_ddl(self) -> bool {
        match self {
            Dialect::Sqlite | Dialect::Postgres => true,
        }
    }
}

// ============================================================================
// Result Row
// ============================================================================

/// A single materialised result row.
///
/// Cells are the driver's textual renderings; a `None` cell is SQL `NULL`.
/// Cells are addressable both by column name and by position.
#[derive(Debug, Clone, Default)]
pub struct SqlRow {
    cells: Vec<(String, Option<String>)>,
}

impl SqlRow {
    /// Creates a row from `(column name, cell)` pairs in result order.
    pub fn new(cells: Vec<(String, Option<String>)>) -> Self {
        Self { cells }
    }

    /// Looks a cell up by column name.
    ///
    /// Outer `None` means the column is not present in the row; inner
    /// `None` means the cell is SQL `NULL`.
    pub fn get(&self, name: &str) -> Option<Option<&str>> {
        self.cells
            .iter()
            .find(|(cell_name, _)| cell_name == name)
            .map(|(_, value)| value.as_deref())
    }

    /// Looks a cell up by position.
    pub fn get_at(&self, index: usize) -> Option<Option<&str>> {
        self.cells.get(index).map(|(_, value)| value.as_deref())
    }

    /// The number of cells in the row.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Whether the row has no cells.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

// ============================================================================
// Driver Trait
// ============================================================================

/// A per-row callback invoked synchronously while results materialise.
pub type RowHandler<'h> = &'h mut (dyn FnMut(&SqlRow) + Send);

/// The contract each database driver implements.
///
/// Connections are not thread-safe: a connection is held exclusively from
/// acquire to release and statements on it execute in program order. The
/// transaction methods are idempotent with respect to "no active
/// transaction".
#[async_trait]
pub trait SqlDriver: Send {
    /// Reports the DBMS name, one of `"sqlite"` or `"postgresql"`.
    fn dbms_name(&self) -> &'static str;

    /// The dialect of this connection.
    fn dialect(&self) -> Dialect;

    /// Whether a transaction is currently active on this connection.
    fn in_transaction(&self) -> bool;

    /// Executes a statement (or a `;`-separated script) without collecting
    /// results.
    async fn run_query(&mut self, sql: &str) -> Result<(), Error>;

    /// Executes a query, feeding every result row to `handler` while the
    /// result set materialises.
    async fn run_query_with(&mut self, sql: &str, handler: RowHandler<'_>) -> Result<(), Error>;

    /// Executes an `INSERT` and returns the last autogenerated key as a
    /// string.
    async fn run_insert(&mut self, sql: &str) -> Result<String, Error>;

    /// Begins a transaction. No-op if one is already active.
    async fn begin_transaction(&mut self) -> Result<(), Error>;

    /// Commits the active transaction. No-op if none is active.
    async fn end_transaction(&mut self) -> Result<(), Error>;

    /// Rolls the active transaction back. No-op if none is active.
    async fn rollback_transaction(&mut self) -> Result<(), Error>;
}

/// Forwarding implementation so statement builders can hold either an owned
/// pooled connection or a borrowed one.
#[async_trait]
impl<T: SqlDriver + ?Sized> SqlDriver for &mut T {
    fn dbms_name(&self) -> &'static str {
        (**self).dbms_name()
    }

    fn dialect(&self) -> Dialect {
        (**self).dialect()
    }

    fn in_transaction(&self) -> bool {
        (**self).in_transaction()
    }

    async fn run_query(&mut self, sql: &str) -> Result<(), Error> {
        (**self).run_query(sql).await
    }

    async fn run_query_with(&mut self, sql: &str, handler: RowHandler<'_>) -> Result<(), Error> {
        (**self).run_query_with(sql, handler).await
    }

    async fn run_insert(&mut self, sql: &str) -> Result<String, Error> {
        (**self).run_insert(sql).await
    }

    async fn begin_transaction(&mut self) -> Result<(), Error> {
        (**self).begin_transaction().await
    }

    async fn end_transaction(&mut self) -> Result<(), Error> {
        (**self).end_transaction().await
    }

    async fn rollback_transaction(&mut self) -> Result<(), Error> {
        (**self).rollback_transaction().await
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dialect_detection_from_url() {
        assert_eq!(Dialect::from_url("sqlite::memory:").unwrap(), Dialect::Sqlite);
        assert_eq!(Dialect::from_url("postgres://localhost/db").unwrap(), Dialect::Postgres);
        assert_eq!(Dialect::from_url("postgresql://localhost/db").unwrap(), Dialect::Postgres);
        assert!(Dialect::from_url("mysql://localhost/db").is_err());
    }

    #[test]
    fn test_row_lookup_distinguishes_null_from_missing() {
        let row = SqlRow::new(vec![
            ("id".to_string(), Some("1".to_string())),
            ("age".to_string(), None),
        ]);
        assert_eq!(row.get("id"), Some(Some("1")));
        assert_eq!(row.get("age"), Some(None));
        assert_eq!(row.get("name"), None);
        assert_eq!(row.get_at(0), Some(Some("1")));
    }
}
