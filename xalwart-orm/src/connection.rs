//! # Connection Module
//!
//! The sqlx-backed implementation of the [`SqlDriver`] contract. One
//! connection type covers both dialects through `sqlx::Any`; the dialect is
//! detected from the connection URL scheme.
//!
//! Statements are executed through sqlx's raw-SQL path because rendered
//! statements carry inline literals and, for the SQLite table-recreation
//! flow, multiple `;`-separated statements in one script.

// ============================================================================
// External Crate Imports
// ============================================================================

use async_trait::async_trait;
use sqlx::any::AnyRow;
use sqlx::{AnyConnection, Column, Connection as _, Executor, Row};

// ============================================================================
// Internal Crate Imports
// ============================================================================

use crate::driver::{Dialect, RowHandler, SqlDriver, SqlRow};
use crate::errors::Error;

// ============================================================================
// Database Connection
// ============================================================================

/// A single database connection.
///
/// Not thread-safe by design: a connection is held exclusively by one
/// caller from pool acquire to release, and at most one transaction is
/// active on it at a time.
pub struct DatabaseConnection {
    conn: AnyConnection,
    dialect: Dialect,
    in_transaction: bool,
}

impl DatabaseConnection {
    /// Opens a connection to `url`.
    ///
    /// Supported schemes: `sqlite:` (including `sqlite::memory:`) and
    /// `postgres:`/`postgresql:`.
    pub async fn connect(url: &str) -> Result<Self, Error> {
        sqlx::any::install_default_drivers();
        let dialect = Dialect::from_url(url)?;
        let conn = AnyConnection::connect(url)
            .await
            .map_err(|e| Error::database(format!("failed to connect to '{url}': {e}")))?;

        Ok(Self { conn, dialect, in_transaction: false })
    }

    /// Closes the connection, flushing any driver-side state.
    pub async fn close(self) -> Result<(), Error> {
        self.conn.close().await?;
        Ok(())
    }

    async fn execute_unsafe(&mut self, sql: &str) -> Result<(), Error> {
        if sql.is_empty() {
            return Err(Error::database(format!("{}: 'query' is required", self.dbms_name())));
        }

        Executor::execute(&mut self.conn, sqlx::raw_sql(sql)).await?;
        Ok(())
    }

    async fn fetch_scalar_text(&mut self, sql: &str) -> Result<String, Error> {
        let row = Executor::fetch_one(&mut self.conn, sqlx::raw_sql(sql)).await?;
        cell_text(&row, 0)?
            .ok_or_else(|| Error::database(format!("{}: empty scalar result", self.dbms_name())))
    }
}

/// Decodes one result cell into its textual rendering.
///
/// The `Any` driver exposes a narrow type surface, so decoding walks a type
/// ladder: text, 64-bit integer, double, bool.
fn cell_text(row: &AnyRow, index: usize) -> Result<Option<String>, Error> {
    if let Ok(value) = row.try_get::<Option<String>, _>(index) {
        return Ok(value);
    }
    if let Ok(value) = row.try_get::<Option<i64>, _>(index) {
        return Ok(value.map(|v| v.to_string()));
    }
    if let Ok(value) = row.try_get::<Option<f64>, _>(index) {
        return Ok(value.map(|v| v.to_string()));
    }
    if let Ok(value) = row.try_get::<Option<bool>, _>(index) {
        return Ok(value.map(|v| if v { "1".to_string() } else { "0".to_string() }));
    }

    Err(Error::value(format!("can not decode result column {index} as text")))
}

fn to_sql_row(row: &AnyRow) -> Result<SqlRow, Error> {
    let mut cells = Vec::with_capacity(row.columns().len());
    for (index, column) in row.columns().iter().enumerate() {
        cells.push((column.name().to_string(), cell_text(row, index)?));
    }

    Ok(SqlRow::new(cells))
}

// ============================================================================
// Driver Implementation
// ============================================================================

#[async_trait]
impl SqlDriver for DatabaseConnection {
    fn dbms_name(&self) -> &'static str {
        self.dialect.dbms_name()
    }

    fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    async fn run_query(&mut self, sql: &str) -> Result<(), Error> {
        log::debug!("SQL: {sql}");
        match self.execute_unsafe(sql).await {
            Ok(()) => Ok(()),
            Err(e) => {
                // A failed statement aborts the caller's work unit.
                if self.in_transaction {
                    self.rollback_transaction().await?;
                }

                Err(e)
            }
        }
    }

    async fn run_query_with(&mut self, sql: &str, handler: RowHandler<'_>) -> Result<(), Error> {
        log::debug!("SQL: {sql}");
        let rows = match Executor::fetch_all(&mut self.conn, sqlx::raw_sql(sql)).await {
            Ok(rows) => rows,
            Err(e) => {
                if self.in_transaction {
                    self.rollback_transaction().await?;
                }

                return Err(e.into());
            }
        };

        for row in &rows {
            handler(&to_sql_row(row)?);
        }

        Ok(())
    }

    async fn run_insert(&mut self, sql: &str) -> Result<String, Error> {
        self.run_query(sql).await?;
        let last_id_query = match self.dialect {
            Dialect::Sqlite => "SELECT last_insert_rowid();",
            Dialect::Postgres => "SELECT LASTVAL();",
        };

        self.fetch_scalar_text(last_id_query).await
    }

    async fn begin_transaction(&mut self) -> Result<(), Error> {
        if !self.in_transaction {
            self.in_transaction = true;
            self.execute_unsafe("BEGIN TRANSACTION;").await?;
        }

        Ok(())
    }

    async fn end_transaction(&mut self) -> Result<(), Error> {
        if self.in_transaction {
            self.in_transaction = false;
            self.execute_unsafe("COMMIT TRANSACTION;").await?;
        }

        Ok(())
    }

    async fn rollback_transaction(&mut self) -> Result<(), Error> {
        if self.in_transaction {
            self.in_transaction = false;
            self.execute_unsafe("ROLLBACK TRANSACTION;").await?;
        }

        Ok(())
    }
}
