//! # Migration Recorder Module
//!
//! Persists which migrations have been applied in the bookkeeping table
//! `xalwart_migrations` (`id` integer primary key autoincrement, `name`
//! VARCHAR(255) unique not null, `applied` datetime). The table is created
//! lazily on first use.

// ============================================================================
// External Crate Imports
// ============================================================================

use chrono::{NaiveDateTime, Utc};

// ============================================================================
// Internal Crate Imports
// ============================================================================

use crate::conditions::{Column, Ordering};
use crate::driver::{Dialect, SqlDriver, SqlRow};
use crate::errors::Error;
use crate::model::{ColumnMeta, FromSqlText, Model, ToSqlLiteral};
use crate::operations::{CreateTable, Operation};
use crate::queries::{Delete, Insert};
use crate::schema_editor::editor_for;
use crate::sql_builder::{SelectParts, SqlBuilder};
use crate::state::{Constraints, ProjectState};

/// Name of the bookkeeping table.
pub const MIGRATIONS_TABLE: &str = "xalwart_migrations";

// ============================================================================
// Applied-Migration Record
// ============================================================================

/// One row of the bookkeeping table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MigrationRecord {
    /// Autogenerated key.
    pub id: i64,

    /// The migration identifier.
    pub name: String,

    /// When the migration was applied.
    pub applied: Option<NaiveDateTime>,
}

impl MigrationRecord {
    /// Typed reference to the `name` column.
    pub const NAME: Column<MigrationRecord, String> = Column::new("name");
}

impl Model for MigrationRecord {
    const TABLE_NAME: &'static str = MIGRATIONS_TABLE;

    fn columns() -> Vec<ColumnMeta<Self>> {
        vec![
            ColumnMeta {
                name: "id",
                primary_key: true,
                get: |record| record.id.to_sql_literal(),
                set: |record, text| {
                    record.id = i64::from_sql_text(text)?;
                    Ok(())
                },
            },
            ColumnMeta {
                name: "name",
                primary_key: false,
                get: |record| record.name.to_sql_literal(),
                set: |record, text| {
                    record.name = text.to_string();
                    Ok(())
                },
            },
            ColumnMeta {
                name: "applied",
                primary_key: false,
                get: |record| record.applied.to_sql_literal(),
                set: |record, text| {
                    record.applied = Some(NaiveDateTime::from_sql_text(text)?);
                    Ok(())
                },
            },
        ]
    }

    fn pk_name() -> &'static str {
        "id"
    }
}

// ============================================================================
// Migration Recorder
// ============================================================================

/// Bookkeeping over the applied-migration log.
#[derive(Debug, Clone, Copy, Default)]
pub struct MigrationRecorder {
    builder: SqlBuilder,
}

impl MigrationRecorder {
    /// Creates a recorder.
    pub fn new() -> Self {
        Self { builder: SqlBuilder }
    }

    /// Whether the bookkeeping table exists.
    pub async fn has_table(&self, conn: &mut (dyn SqlDriver + Send)) -> Result<bool, Error> {
        let sql = match conn.dialect() {
            Dialect::Sqlite => format!(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name = '{MIGRATIONS_TABLE}';"
            ),
            Dialect::Postgres => format!(
                "SELECT table_name FROM information_schema.tables WHERE table_name = '{MIGRATIONS_TABLE}';"
            ),
        };

        let mut found = false;
        conn.run_query_with(&sql, &mut |_row: &SqlRow| found = true).await?;
        Ok(found)
    }

    /// Ensures the bookkeeping table exists with the correct schema.
    ///
    /// If the table is there its schema is assumed current, since it never
    /// changes in the codebase.
    pub async fn ensure_schema(&self, conn: &mut (dyn SqlDriver + Send)) -> Result<(), Error> {
        if self.has_table(conn).await? {
            return Ok(());
        }

        let mut operation = CreateTable::new(MIGRATIONS_TABLE)?;
        operation
            .column::<i32>(
                "id",
                Constraints { primary_key: true, autoincrement: true, ..Default::default() },
            )?
            .column::<String>(
                "name",
                Constraints {
                    max_len: Some(255),
                    unique: true,
                    null: Some(false),
                    ..Default::default()
                },
            )?
            .column::<NaiveDateTime>("applied", Constraints { null: Some(true), ..Default::default() })?;

        let mut scratch = ProjectState::default();
        operation.update_state(&mut scratch)?;
        let table = scratch.get_table(MIGRATIONS_TABLE)?;
        editor_for(conn.dialect()).create_table(table, conn).await
    }

    /// Returns all applied records, ordered by migration name.
    pub async fn applied_migrations(
        &self,
        conn: &mut (dyn SqlDriver + Send),
    ) -> Result<Vec<MigrationRecord>, Error> {
        if !self.has_table(conn).await? {
            return Ok(Vec::new());
        }

        let parts = SelectParts {
            order_by: vec![Ordering::asc::<MigrationRecord>("name")],
            ..SelectParts::default()
        };
        let columns = MigrationRecord::columns();
        let names: Vec<&str> = columns.iter().map(|column| column.name).collect();
        let sql = self.builder.sql_select(MIGRATIONS_TABLE, &names, &parts)?;

        let mut rows: Vec<SqlRow> = Vec::new();
        conn.run_query_with(&sql, &mut |row| rows.push(row.clone())).await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in &rows {
            records.push(MigrationRecord::from_row(row)?);
        }

        Ok(records)
    }

    /// Notes that a migration was applied.
    pub async fn record_applied(
        &self,
        conn: &mut (dyn SqlDriver + Send),
        name: &str,
    ) -> Result<(), Error> {
        self.ensure_schema(conn).await?;
        let record = MigrationRecord {
            id: 0,
            name: name.to_string(),
            applied: Some(Utc::now().naive_utc()),
        };
        Insert::new(conn).model(&record).bulk().await
    }

    /// Notes that a migration was rolled back.
    pub async fn record_rolled_back(
        &self,
        conn: &mut (dyn SqlDriver + Send),
        name: &str,
    ) -> Result<(), Error> {
        self.ensure_schema(conn).await?;
        Delete::<_, MigrationRecord>::new(conn)
            .where_cond(MigrationRecord::NAME.eq(name.to_string()))
            .commit()
            .await
    }

    /// Deletes all applied-migration records. Useful when testing
    /// migrations.
    pub async fn flush(&self, conn: &mut (dyn SqlDriver + Send)) -> Result<(), Error> {
        if !self.has_table(conn).await? {
            return Ok(());
        }

        let sql = self.builder.sql_delete(MIGRATIONS_TABLE, None)?;
        conn.run_query(&sql).await
    }
}
