//! # Schema Editor Module
//!
//! Converts high-level schema operations (create/drop/rename/alter table or
//! column, add unique) into dialect SQL and executes them through a
//! connection. The [`SchemaEditor`] trait carries a complete generic
//! implementation; dialects override the small hooks that differ —
//! type names, autoincrement rules and, for SQLite, the table-recreation
//! strategy for column alteration.

pub mod postgres;
pub mod sqlite;

pub use postgres::PostgresSchemaEditor;
pub use sqlite::SqliteSchemaEditor;

// ============================================================================
// External Crate Imports
// ============================================================================

use async_trait::async_trait;

// ============================================================================
// Internal Crate Imports
// ============================================================================

use crate::driver::{Dialect, SqlDriver};
use crate::errors::Error;
use crate::state::{ColumnState, Constraints, ForeignKey, OnAction, SqlType, TableState};

/// Returns the schema editor for a dialect.
pub fn editor_for(dialect: Dialect) -> &'static dyn SchemaEditor {
    match dialect {
        Dialect::Sqlite => &SqliteSchemaEditor,
        Dialect::Postgres => &PostgresSchemaEditor,
    }
}

/// Renders `name TYPE [constraints]` with the editor's hooks.
///
/// Shared by the trait default and the dialect overrides of
/// [`SchemaEditor::sql_column`].
pub(crate) fn render_sql_column<E: SchemaEditor + ?Sized>(
    editor: &E,
    column: &ColumnState,
) -> Result<String, Error> {
    if column.name.is_empty() {
        return Err(Error::value("sql_column: 'name' can not be empty"));
    }

    let constraints = &column.constraints;
    let mut sql_type = editor.sql_type_string(column.sql_type).to_string();
    if editor.sql_column_max_len_check(&column.name, column.sql_type, constraints.max_len)? {
        sql_type.push_str(&format!(
            "({})",
            constraints.max_len.expect("checked by sql_column_max_len_check")
        ));
    }

    editor.sql_column_autoincrement_check(
        column.sql_type,
        constraints.autoincrement,
        constraints.primary_key,
    )?;

    Ok(format!(
        "{} {}{}",
        column.name,
        sql_type,
        editor.sql_column_constraints(constraints, &column.default_value)
    ))
}

// ============================================================================
// Schema Editor Trait
// ============================================================================

/// Renders and executes schema-changing SQL.
///
/// Editors are stateless and freely shared; every executing method takes
/// the connection to run on. The default methods implement the generic
/// (PostgreSQL-shaped) behaviour.
#[async_trait]
pub trait SchemaEditor: Send + Sync {
    // ========================================================================
    // Rendering Hooks
    // ========================================================================

    /// Quotes an identifier. Idempotent.
    fn quote_name(&self, name: &str) -> String {
        crate::util::quote_ident(name)
    }

    /// The dialect's name for a logical column type.
    fn sql_type_string(&self, sql_type: SqlType) -> &'static str {
        match sql_type {
            SqlType::Bool => "BOOL",
            SqlType::VarChar => "VARCHAR",
            SqlType::Text => "TEXT",
            SqlType::SmallInt => "SMALLINT",
            SqlType::Int => "INTEGER",
            SqlType::BigInt => "BIGINT",
            SqlType::SmallSerial => "SMALLSERIAL",
            SqlType::Serial => "SERIAL",
            SqlType::BigSerial => "BIGSERIAL",
            SqlType::Real => "REAL",
            SqlType::Double => "DOUBLE PRECISION",
            SqlType::Date => "DATE",
            SqlType::Time => "TIME",
            SqlType::DateTime => "TIMESTAMP",
        }
    }

    /// Renders the constraint fragment appended to a column definition.
    fn sql_column_constraints(&self, constraints: &Constraints, default_value: &str) -> String {
        let mut result = String::new();
        if constraints.primary_key {
            result.push_str(" PRIMARY KEY");
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

    /// Validates the dialect's autoincrement rule.
    fn sql_column_autoincrement_check(
        &self,
        sql_type: SqlType,
        autoincrement: bool,
        primary_key: bool,
    ) -> Result<(), Error> {
        if autoincrement && (!sql_type.is_integer() || !primary_key) {
            return Err(Error::value(
                "'autoincrement' is only allowed on an integer primary key",
            ));
        }

        Ok(())
    }

    /// Validates `max_len`; returns whether a length suffix is rendered.
    fn sql_column_max_len_check(
        &self,
        name: &str,
        sql_type: SqlType,
        max_len: Option<u32>,
    ) -> Result<bool, Error> {
        match max_len {
            Some(_) if sql_type != SqlType::VarChar => Err(Error::value(format!(
                "unable to set 'max_len' constraint for column '{}' with type '{}'",
                name,
                self.sql_type_string(sql_type)
            ))),
            Some(_) => Ok(true),
            None => Ok(false),
        }
    }

    /// Renders a full column definition: `name TYPE [constraints]`.
    ///
    /// Dialect overrides rewrite the column type first and delegate back to
    /// [`render_sql_column`].
    fn sql_column(&self, column: &ColumnState) -> Result<String, Error> {
        render_sql_column(self, column)
    }

    /// Renders a referential action.
    fn sql_on_action(&self, action: OnAction) -> &'static str {
        match action {
            OnAction::SetNull => "SET NULL",
            OnAction::SetDefault => "SET DEFAULT",
            OnAction::Restrict => "RESTRICT",
            OnAction::NoAction => "NO ACTION",
            OnAction::Cascade => "CASCADE",
        }
    }

    /// Renders a foreign-key table constraint.
    fn sql_foreign_key(&self, column_name: &str, fk: &ForeignKey) -> String {
        let mut result =
            format!("FOREIGN KEY({}) REFERENCES {}({})", column_name, fk.to, fk.key);
        if fk.on_delete != OnAction::NoAction {
            result.push_str(&format!(" ON DELETE {}", self.sql_on_action(fk.on_delete)));
        }

        if fk.on_update != OnAction::NoAction {
            result.push_str(&format!(" ON UPDATE {}", self.sql_on_action(fk.on_update)));
        }

        result
    }

    /// Renders `CREATE TABLE "T"(columns, fks)`.
    fn sql_create_table(&self, table: &TableState) -> Result<String, Error> {
        let mut parts = Vec::with_capacity(table.columns.len() + table.foreign_keys.len());
        for column in table.columns.values() {
            parts.push(self.sql_column(column)?);
        }

        for (column_name, fk) in &table.foreign_keys {
            parts.push(self.sql_foreign_key(column_name, fk));
        }

        Ok(format!("CREATE TABLE {}({})", self.quote_name(&table.name), parts.join(", ")))
    }

    /// Renders `DROP TABLE`.
    fn sql_drop_table(&self, name: &str) -> String {
        format!("DROP TABLE {} CASCADE", self.quote_name(name))
    }

    /// Renders `ALTER TABLE ... RENAME TO ...`.
    fn sql_rename_table(&self, old_name: &str, new_name: &str) -> String {
        format!(
            "ALTER TABLE {} RENAME TO {}",
            self.quote_name(old_name),
            self.quote_name(new_name)
        )
    }

    /// Renders `ALTER TABLE "T" <actions>`.
    fn sql_alter_table(&self, table: &TableState, actions: &str) -> String {
        format!("ALTER TABLE {} {}", self.quote_name(&table.name), actions)
    }

    /// Renders `ALTER TABLE "T" ADD COLUMN <definition>`.
    fn sql_add_column(&self, table: &TableState, column: &ColumnState) -> Result<String, Error> {
        Ok(self.sql_alter_table(table, &format!("ADD COLUMN {}", self.sql_column(column)?)))
    }

    /// Renders `ALTER TABLE "T" DROP COLUMN c`.
    fn sql_drop_column(&self, table: &TableState, column: &ColumnState) -> String {
        self.sql_alter_table(table, &format!("DROP COLUMN {}", column.name))
    }

    /// Hook to specialise column renaming for different dialects.
    fn sql_rename_column(
        &self,
        table: &TableState,
        old_column: &ColumnState,
        new_column: &ColumnState,
    ) -> String {
        self.sql_alter_table(
            table,
            &format!("RENAME COLUMN {} TO {}", old_column.name, new_column.name),
        )
    }

    /// Renders the row backfill used when a column turns `NOT NULL`:
    /// `UPDATE "T" SET "c" = <default> WHERE "c" IS NULL`.
    fn sql_update_with_default(&self, table: &TableState, column: &ColumnState) -> String {
        let column_name = self.quote_name(&column.name);
        format!(
            "UPDATE {} SET {} = {} WHERE {} IS NULL",
            self.quote_name(&table.name),
            column_name,
            column.default_value,
            column_name
        )
    }

    /// Renders `DROP CONSTRAINT` wrapped in `ALTER TABLE`.
    fn sql_delete_constraint(&self, table: &TableState, constraint_name: &str) -> String {
        self.sql_alter_table(table, &format!("DROP CONSTRAINT {constraint_name}"))
    }

    /// Hook to specialise primary-key constraint removal.
    fn sql_delete_primary_key(&self, table: &TableState, constraint_name: &str) -> String {
        self.sql_delete_constraint(table, constraint_name)
    }

    /// Renders the named unique constraint `"col1_col2_..._unique"`.
    fn sql_create_unique(&self, table: &TableState, columns: &[&ColumnState]) -> String {
        let column_names =
            columns.iter().map(|c| c.name.as_str()).collect::<Vec<_>>().join(", ");
        self.sql_alter_table(
            table,
            &format!(
                "ADD CONSTRAINT {} UNIQUE ({})",
                self.create_unique_name(columns, "_unique"),
                column_names
            ),
        )
    }

    /// Hook to specialise column type alteration; returns the partial
    /// `ALTER TABLE` action plus any post-actions to run afterwards.
    fn partial_sql_alter_column_type(
        &self,
        _table: &TableState,
        _old_column: &ColumnState,
        new_column: &ColumnState,
    ) -> Result<(String, Vec<String>), Error> {
        let mut sql_type = self.sql_type_string(new_column.sql_type).to_string();
        if self.sql_column_max_len_check(
            &new_column.name,
            new_column.sql_type,
            new_column.constraints.max_len,
        )? {
            sql_type.push_str(&format!(
                "({})",
                new_column.constraints.max_len.expect("checked by sql_column_max_len_check")
            ));
        }

        Ok((
            format!("ALTER COLUMN {} TYPE {}", self.quote_name(&new_column.name), sql_type),
            Vec::new(),
        ))
    }

    /// Returns the SQL used in a `DEFAULT` clause.
    fn partial_sql_column_default(&self, column: &ColumnState) -> String {
        column.default_value.clone()
    }

    /// Hook to specialise column default alteration.
    fn partial_sql_alter_column_default(&self, column: &ColumnState, drop: bool) -> String {
        let column_name = self.quote_name(&column.name);
        if drop {
            format!("ALTER COLUMN {column_name} DROP DEFAULT")
        } else {
            format!(
                "ALTER COLUMN {} SET DEFAULT {}",
                column_name,
                self.partial_sql_column_default(column)
            )
        }
    }

    /// Hook to specialise column null alteration.
    fn partial_sql_alter_column_null(&self, new_column: &ColumnState) -> String {
        let column_name = self.quote_name(&new_column.name);
        if new_column.constraints.null.unwrap_or(false) {
            format!("ALTER COLUMN {column_name} DROP NOT NULL")
        } else {
            format!("ALTER COLUMN {column_name} SET NOT NULL")
        }
    }

    /// Some dialects do not accept defaults for certain column types.
    fn skip_default(&self, _column: &ColumnState) -> bool {
        false
    }

    /// Whether the alteration introduces a unique constraint, including a
    /// demoted primary key that must stay unique.
    fn unique_should_be_added(&self, old_column: &ColumnState, new_column: &ColumnState) -> bool {
        (!old_column.constraints.unique && new_column.constraints.unique)
            || (old_column.constraints.primary_key
                && !new_column.constraints.primary_key
                && new_column.constraints.unique)
    }

    /// Builds the generated unique-constraint name.
    fn create_unique_name(&self, columns: &[&ColumnState], suffix: &str) -> String {
        let joined =
            columns.iter().map(|c| c.name.as_str()).collect::<Vec<_>>().join("_");
        format!("{joined}{suffix}")
    }

    /// Discovers constraint names on a table. The generic editor performs
    /// no introspection and reports none.
    fn constraint_names(&self, _table: &TableState, _primary_key: bool) -> Vec<String> {
        Vec::new()
    }

    // ========================================================================
    // Executing Operations
    // ========================================================================

    /// Executes one rendered statement, appending the terminating `;` when
    /// missing.
    async fn execute(&self, sql: &str, conn: &mut (dyn SqlDriver + Send)) -> Result<(), Error> {
        if sql.ends_with(';') {
            conn.run_query(sql).await
        } else {
            conn.run_query(&format!("{sql};")).await
        }
    }

    /// Creates a table from its state.
    async fn create_table(
        &self,
        table: &TableState,
        conn: &mut (dyn SqlDriver + Send),
    ) -> Result<(), Error> {
        let sql = self.sql_create_table(table)?;
        self.execute(&sql, conn).await
    }

    /// Drops a table by name.
    async fn drop_table(
        &self,
        name: &str,
        conn: &mut (dyn SqlDriver + Send),
    ) -> Result<(), Error> {
        let sql = self.sql_drop_table(name);
        self.execute(&sql, conn).await
    }

    /// Renames a table. Identical names are a no-op.
    async fn rename_table(
        &self,
        old_name: &str,
        new_name: &str,
        conn: &mut (dyn SqlDriver + Send),
    ) -> Result<(), Error> {
        if old_name == new_name {
            return Ok(());
        }

        let sql = self.sql_rename_table(old_name, new_name);
        self.execute(&sql, conn).await
    }

    /// Adds a column to an existing table.
    async fn create_column(
        &self,
        table: &TableState,
        column: &ColumnState,
        conn: &mut (dyn SqlDriver + Send),
    ) -> Result<(), Error> {
        let sql = self.sql_add_column(table, column)?;
        self.execute(&sql, conn).await
    }

    /// Drops a column from an existing table.
    async fn drop_column(
        &self,
        table: &TableState,
        column: &ColumnState,
        conn: &mut (dyn SqlDriver + Send),
    ) -> Result<(), Error> {
        let sql = self.sql_drop_column(table, column);
        self.execute(&sql, conn).await
    }

    /// Deletes the primary-key constraint of a table.
    ///
    /// In strict mode the number of discovered constraints must be exactly
    /// one.
    async fn delete_primary_key(
        &self,
        table: &TableState,
        strict: bool,
        conn: &mut (dyn SqlDriver + Send),
    ) -> Result<(), Error> {
        let constraint_names = self.constraint_names(table, true);
        if strict && constraint_names.len() != 1 {
            return Err(Error::migrations(format!(
                "got wrong number {} of primary key constraints for '{}'",
                constraint_names.len(),
                table.name
            )));
        }

        for constraint_name in constraint_names {
            let sql = self.sql_delete_primary_key(table, &constraint_name);
            self.execute(&sql, conn).await?;
        }

        Ok(())
    }

    /// Alters a column in place, running the multi-phase plan:
    /// rename, type change, the four-step null-to-not-null default dance,
    /// bare null alteration, primary-key removal and unique addition.
    async fn alter_column(
        &self,
        table: &TableState,
        old_column: &ColumnState,
        new_column: &ColumnState,
        strict: bool,
        conn: &mut (dyn SqlDriver + Send),
    ) -> Result<(), Error> {
        if old_column.name != new_column.name {
            let sql = self.sql_rename_column(table, old_column, new_column);
            self.execute(&sql, conn).await?;
        }

        let mut actions = Vec::new();
        let mut null_actions = Vec::new();
        let mut post_actions = Vec::new();

        if old_column.sql_type != new_column.sql_type {
            let (partial_sql, extra_actions) =
                self.partial_sql_alter_column_type(table, old_column, new_column)?;
            actions.push(partial_sql);
            post_actions.extend(extra_actions);
        }

        // Turning a NULL column into NOT NULL with a fresh default takes
        // four steps: set the default for incoming writes, backfill NULL
        // rows, switch the constraint, drop the default again.
        let old_null = old_column.constraints.null;
        let new_null = new_column.constraints.null;
        let null_to_not_null = old_null.unwrap_or(false) && !new_null.unwrap_or(false);
        let mut needs_db_default = false;
        if null_to_not_null
            && !self.skip_default(new_column)
            && old_column.default_value != new_column.default_value
            && !new_column.default_value.is_empty()
        {
            needs_db_default = true;
            actions.push(self.partial_sql_alter_column_default(new_column, false));
        }

        if old_null != new_null {
            null_actions.push(self.partial_sql_alter_column_null(new_column));
        }

        let four_way_default_alteration =
            !new_column.default_value.is_empty() && null_to_not_null;
        if !actions.is_empty() || !null_actions.is_empty() {
            if !four_way_default_alteration {
                actions.append(&mut null_actions);
            }

            for partial_sql in &actions {
                let sql = self.sql_alter_table(table, partial_sql);
                self.execute(&sql, conn).await?;
            }

            if four_way_default_alteration {
                let sql = self.sql_update_with_default(table, new_column);
                self.execute(&sql, conn).await?;

                for partial_sql in &null_actions {
                    let sql = self.sql_alter_table(table, partial_sql);
                    self.execute(&sql, conn).await?;
                }
            }
        }

        for sql in &post_actions {
            self.execute(sql, conn).await?;
        }

        if needs_db_default {
            let partial_sql = self.partial_sql_alter_column_default(new_column, true);
            let sql = self.sql_alter_table(table, &partial_sql);
            self.execute(&sql, conn).await?;
        }

        if old_column.constraints.primary_key && !new_column.constraints.primary_key {
            self.delete_primary_key(table, strict, conn).await?;
        }

        if self.unique_should_be_added(old_column, new_column) {
            let sql = self.sql_create_unique(table, &[new_column]);
            self.execute(&sql, conn).await?;
        }

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::RowHandler;
    use crate::state::SqlValue;

    struct RecordingDriver {
        executed: Vec<String>,
    }

    #[async_trait]
    impl SqlDriver for RecordingDriver {
        fn dbms_name(&self) -> &'static str {
            "postgresql"
        }

        fn dialect(&self) -> Dialect {
            Dialect::Postgres
        }

        fn in_transaction(&self) -> bool {
            false
        }

        async fn run_query(&mut self, sql: &str) -> Result<(), Error> {
            self.executed.push(sql.to_string());
            Ok(())
        }

        async fn run_query_with(
            &mut self,
            sql: &str,
            _handler: RowHandler<'_>,
        ) -> Result<(), Error> {
            self.executed.push(sql.to_string());
            Ok(())
        }

        async fn run_insert(&mut self, sql: &str) -> Result<String, Error> {
            self.executed.push(sql.to_string());
            Ok("1".to_string())
        }

        async fn begin_transaction(&mut self) -> Result<(), Error> {
            Ok(())
        }

        async fn end_transaction(&mut self) -> Result<(), Error> {
            Ok(())
        }

        async fn rollback_transaction(&mut self) -> Result<(), Error> {
            Ok(())
        }
    }

    fn table_with(column: &ColumnState) -> TableState {
        let mut table = TableState { name: "persons".to_string(), ..Default::default() };
        table.columns.insert(column.name.clone(), column.clone());
        table
    }

    #[tokio::test]
    async fn test_null_to_not_null_runs_four_phases() {
        let old_column = ColumnState::create(
            "age",
            SqlType::Int,
            Constraints { null: Some(true), ..Default::default() },
        )
        .unwrap();
        let new_column = ColumnState::create(
            "age",
            SqlType::Int,
            Constraints {
                null: Some(false),
                default: Some(SqlValue::Int(0)),
                ..Default::default()
            },
        )
        .unwrap();

        let mut conn = RecordingDriver { executed: Vec::new() };
        let editor = PostgresSchemaEditor;
        editor
            .alter_column(&table_with(&old_column), &old_column, &new_column, false, &mut conn)
            .await
            .unwrap();

        assert_eq!(
            conn.executed,
            vec![
                "ALTER TABLE \"persons\" ALTER COLUMN \"age\" SET DEFAULT 0;",
                "UPDATE \"persons\" SET \"age\" = 0 WHERE \"age\" IS NULL;",
                "ALTER TABLE \"persons\" ALTER COLUMN \"age\" SET NOT NULL;",
                "ALTER TABLE \"persons\" ALTER COLUMN \"age\" DROP DEFAULT;",
            ]
        );
    }

    #[tokio::test]
    async fn test_plain_null_change_is_single_statement() {
        let old_column = ColumnState::create(
            "age",
            SqlType::Int,
            Constraints { null: Some(false), ..Default::default() },
        )
        .unwrap();
        let new_column = ColumnState::create(
            "age",
            SqlType::Int,
            Constraints { null: Some(true), ..Default::default() },
        )
        .unwrap();

        let mut conn = RecordingDriver { executed: Vec::new() };
        let editor = PostgresSchemaEditor;
        editor
            .alter_column(&table_with(&old_column), &old_column, &new_column, false, &mut conn)
            .await
            .unwrap();

        assert_eq!(
            conn.executed,
            vec!["ALTER TABLE \"persons\" ALTER COLUMN \"age\" DROP NOT NULL;"]
        );
    }

    #[tokio::test]
    async fn test_demoted_primary_key_gains_named_unique() {
        let old_column = ColumnState::create(
            "id",
            SqlType::Int,
            Constraints { primary_key: true, ..Default::default() },
        )
        .unwrap();
        let new_column = ColumnState::create(
            "id",
            SqlType::Int,
            Constraints { unique: true, ..Default::default() },
        )
        .unwrap();

        let mut conn = RecordingDriver { executed: Vec::new() };
        let editor = PostgresSchemaEditor;
        editor
            .alter_column(&table_with(&old_column), &old_column, &new_column, false, &mut conn)
            .await
            .unwrap();

        assert_eq!(
            conn.executed,
            vec!["ALTER TABLE \"persons\" ADD CONSTRAINT id_unique UNIQUE (id);"]
        );
    }

    #[tokio::test]
    async fn test_strict_primary_key_removal_requires_one_constraint() {
        let old_column = ColumnState::create(
            "id",
            SqlType::Int,
            Constraints { primary_key: true, ..Default::default() },
        )
        .unwrap();
        let new_column =
            ColumnState::create("id", SqlType::Int, Constraints::default()).unwrap();

        let mut conn = RecordingDriver { executed: Vec::new() };
        let editor = PostgresSchemaEditor;
        let result = editor
            .alter_column(&table_with(&old_column), &old_column, &new_column, true, &mut conn)
            .await;
        assert!(matches!(result, Err(Error::Migrations(_))));
    }
}
