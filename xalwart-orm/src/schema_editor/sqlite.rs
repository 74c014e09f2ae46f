//! # SQLite Schema Editor
//!
//! SQLite cannot alter columns in place, so `alter_column` and
//! `drop_column` rewrite the table: create a new table with the target
//! schema, copy the projected columns (coalescing `NULL` into the default
//! when a column turns `NOT NULL`), drop the original and rename. The whole
//! script runs between `PRAGMA foreign_keys=off` and `=on`.

// ============================================================================
// External Crate Imports
// ============================================================================

use std::collections::BTreeMap;

use async_trait::async_trait;

// ============================================================================
// Internal Crate Imports
// ============================================================================

use crate::driver::SqlDriver;
use crate::errors::Error;
use crate::schema_editor::{SchemaEditor, render_sql_column};
use crate::state::{ColumnState, Constraints, SqlType, TableState};

// ============================================================================
// Editor
// ============================================================================

/// The SQLite dialect editor.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteSchemaEditor;

impl SqliteSchemaEditor {
    /// Rebuilds `table` under its own name, copying columns through
    /// `mapping` (old column expression by new column name).
    async fn recreate_table(
        &self,
        table: &TableState,
        mapping: &BTreeMap<String, String>,
        conn: &mut (dyn SqlDriver + Send),
    ) -> Result<(), Error> {
        let mut definitions = Vec::with_capacity(table.columns.len() + table.foreign_keys.len());
        for column in table.columns.values() {
            definitions.push(self.sql_column(column)?);
        }

        for (column_name, fk) in &table.foreign_keys {
            definitions.push(self.sql_foreign_key(column_name, fk));
        }

        let insert_columns = mapping
            .keys()
            .map(|name| self.quote_name(name))
            .collect::<Vec<_>>()
            .join(", ");
        let select_columns = mapping.values().cloned().collect::<Vec<_>>().join(", ");

        let table_name = self.quote_name(&table.name);
        let new_table_name = self.quote_name(&format!("new_{}_table_to_alter", table.name));
        let script = format!(
            "PRAGMA foreign_keys=off; \
             CREATE TABLE {new_table_name} ({definitions}); \
             INSERT INTO {new_table_name} ({insert_columns}) SELECT {select_columns} FROM {table_name}; \
             DROP TABLE {table_name}; \
             ALTER TABLE {new_table_name} RENAME TO {table_name}; \
             PRAGMA foreign_keys=on;",
            definitions = definitions.join(", "),
        );
        self.execute(&script, conn).await
    }
}

#[async_trait]
impl SchemaEditor for SqliteSchemaEditor {
    fn sql_type_string(&self, sql_type: SqlType) -> &'static str {
        match sql_type {
            SqlType::SmallSerial => "SMALLINT",
            SqlType::Serial => "INT",
            SqlType::BigSerial => "BIGINT",
            SqlType::DateTime => "DATETIME",
            SqlType::Double => "DOUBLE",
            SqlType::Bool => "BOOL",
            SqlType::VarChar => "VARCHAR",
            SqlType::Text => "TEXT",
            SqlType::SmallInt => "SMALLINT",
            SqlType::Int => "INTEGER",
            SqlType::BigInt => "BIGINT",
            SqlType::Real => "REAL",
            SqlType::Date => "DATE",
            SqlType::Time => "TIME",
        }
    }

    fn sql_column(&self, column: &ColumnState) -> Result<String, Error> {
        let mut column = column.clone();
        // SQLite ties AUTOINCREMENT to the INTEGER rowid alias.
        if column.constraints.autoincrement {
            column.sql_type = match column.sql_type {
                SqlType::SmallSerial
                | SqlType::Serial
                | SqlType::BigSerial
                | SqlType::SmallInt
                | SqlType::BigInt => SqlType::Int,
                other => other,
            };
        }

        render_sql_column(self, &column)
    }

    fn sql_column_constraints(&self, constraints: &Constraints, default_value: &str) -> String {
        let mut result = String::new();
        if constraints.primary_key {
            result.push_str(" PRIMARY KEY");
        }

        if constraints.autoincrement {
            result.push_str(" AUTOINCREMENT");
        }

        if constraints.unique {
            result.push_str(" UNIQUE");
        }

        if let Some(null) = constraints.null {
            result.push_str(if null { " NULL" } else { " NOT NULL" });
        }

        if let Some(check) = &constraints.check {
            result.push_str(&format!(" CHECK ({check})"));
        }

        if !default_value.is_empty() {
            result.push_str(&format!(" DEFAULT {default_value}"));
        }

        result
    }

    fn sql_column_autoincrement_check(
        &self,
        sql_type: SqlType,
        autoincrement: bool,
        primary_key: bool,
    ) -> Result<(), Error> {
        if autoincrement && (sql_type != SqlType::Int || !primary_key) {
            return Err(Error::value(
                "'autoincrement' is only allowed on an integer primary key",
            ));
        }

        Ok(())
    }

    fn sql_drop_table(&self, name: &str) -> String {
        format!("DROP TABLE {}", self.quote_name(name))
    }

    async fn drop_column(
        &self,
        table: &TableState,
        column: &ColumnState,
        conn: &mut (dyn SqlDriver + Send),
    ) -> Result<(), Error> {
        let mut table = table.clone();
        table.columns.remove(&column.name);
        table.foreign_keys.remove(&column.name);

        let mut mapping = BTreeMap::new();
        for name in table.columns.keys() {
            mapping.insert(name.clone(), self.quote_name(name));
        }

        self.recreate_table(&table, &mapping, conn).await
    }

    async fn alter_column(
        &self,
        table: &TableState,
        old_column: &ColumnState,
        new_column: &ColumnState,
        _strict: bool,
        conn: &mut (dyn SqlDriver + Send),
    ) -> Result<(), Error> {
        let mut table = table.clone();
        let mut mapping = BTreeMap::new();
        for name in table.columns.keys() {
            mapping.insert(name.clone(), self.quote_name(name));
        }

        table.columns.remove(&old_column.name);
        mapping.remove(&old_column.name);
        table.columns.insert(new_column.name.clone(), new_column.clone());

        let old_null = old_column.constraints.null.unwrap_or(false);
        let new_null = new_column.constraints.null.unwrap_or(false);
        if old_null && !new_null {
            let fallback = if new_column.default_value.is_empty() {
                "NULL".to_string()
            } else {
                new_column.default_value.clone()
            };
            mapping.insert(
                new_column.name.clone(),
                format!("coalesce({}, {})", self.quote_name(&old_column.name), fallback),
            );
        } else {
            mapping.insert(new_column.name.clone(), self.quote_name(&old_column.name));
        }

        if old_column.name != new_column.name
            && let Some(fk) = table.foreign_keys.remove(&old_column.name)
        {
            table.foreign_keys.insert(new_column.name.clone(), fk);
        }

        self.recreate_table(&table, &mapping, conn).await
    }
}

// ============================================================================
// Tests
// ============================================================================
