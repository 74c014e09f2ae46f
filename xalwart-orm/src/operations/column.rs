//! # Column Operations
//!
//! `AddColumn`, `DropColumn`, `RenameColumn` and `AlterColumn`. Adding or
//! altering into a mandatory column requires either an explicit nullability
//! or a default value, since the database would otherwise not know how to
//! fill the existing rows.

// ============================================================================
// External Crate Imports
// ============================================================================

use async_trait::async_trait;

// ============================================================================
// Internal Crate Imports
// ============================================================================

use crate::driver::SqlDriver;
use crate::errors::Error;
use crate::operations::Operation;
use crate::schema_editor::SchemaEditor;
use crate::state::{ColumnState, ColumnType, Constraints, ProjectState};

fn require_fillable(
    table_name: &str,
    column_name: &str,
    constraints: &Constraints,
    action: &str,
) -> Result<(), Error> {
    if !constraints.null.unwrap_or(false) && constraints.default.is_none() {
        return Err(Error::migrations(format!(
            "the column '{column_name}' ('{table_name}' table) can not be {action} because it \
             is mandatory (not null) but it is unknown how to fill it for the existing rows; \
             either add a default value or make the column nullable"
        )));
    }

    Ok(())
}

// ============================================================================
// AddColumn
// ============================================================================

/// Adds a column to a table in the database.
pub struct AddColumn {
    table_name: String,
    column: ColumnState,
}

impl AddColumn {
    /// Adds column `column_name` typed after `T` to `table_name`.
    pub fn new<T: ColumnType>(
        table_name: &str,
        column_name: &str,
        constraints: Constraints,
    ) -> Result<Self, Error> {
        require_fillable(table_name, column_name, &constraints, "created")?;
        Ok(Self {
            table_name: table_name.to_string(),
            column: ColumnState::of::<T>(column_name, constraints)?,
        })
    }
}

#[async_trait]
impl Operation for AddColumn {
    fn update_state(&self, state: &mut ProjectState) -> Result<(), Error> {
        let table = state.get_table_mut(&self.table_name)?;
        if table.columns.contains_key(&self.column.name) {
            return Err(Error::value(format!(
                "column with name '{}' already exists, consider altering it instead of creating",
                self.column.name
            )));
        }

        table.columns.insert(self.column.name.clone(), self.column.clone());
        Ok(())
    }

    async fn forward(
        &self,
        editor: &dyn SchemaEditor,
        from_state: &ProjectState,
        to_state: &ProjectState,
        conn: &mut (dyn SqlDriver + Send),
    ) -> Result<(), Error> {
        let from_table = from_state.get_table(&self.table_name)?;
        let column = to_state.get_table(&self.table_name)?.get_column(&self.column.name)?;
        editor.create_column(from_table, column, conn).await
    }

    async fn backward(
        &self,
        editor: &dyn SchemaEditor,
        from_state: &ProjectState,
        _to_state: &ProjectState,
        conn: &mut (dyn SqlDriver + Send),
    ) -> Result<(), Error> {
        let table = from_state.get_table(&self.table_name)?;
        editor.drop_column(table, table.get_column(&self.column.name)?, conn).await
    }
}

// ============================================================================
// DropColumn
// ============================================================================

/// Drops a column from a table in the database.
pub struct DropColumn {
    table_name: String,
    column_name: String,
}

impl DropColumn {
    /// Drops `column_name` from `table_name`.
    pub fn new(table_name: &str, column_name: &str) -> Result<Self, Error> {
        if table_name.is_empty() || column_name.is_empty() {
            return Err(Error::value("drop column: names can not be empty"));
        }

        Ok(Self { table_name: table_name.to_string(), column_name: column_name.to_string() })
    }
}

#[async_trait]
impl Operation for DropColumn {
    fn update_state(&self, state: &mut ProjectState) -> Result<(), Error> {
        let table = state.get_table_mut(&self.table_name)?;
        table.get_column(&self.column_name)?;
        table.columns.remove(&self.column_name);
        table.foreign_keys.remove(&self.column_name);
        Ok(())
    }

    async fn forward(
        &self,
        editor: &dyn SchemaEditor,
        from_state: &ProjectState,
        _to_state: &ProjectState,
        conn: &mut (dyn SqlDriver + Send),
    ) -> Result<(), Error> {
        let table = from_state.get_table(&self.table_name)?;
        editor.drop_column(table, table.get_column(&self.column_name)?, conn).await
    }

    async fn backward(
        &self,
        editor: &dyn SchemaEditor,
        _from_state: &ProjectState,
        to_state: &ProjectState,
        conn: &mut (dyn SqlDriver + Send),
    ) -> Result<(), Error> {
        // Re-add from the pre-drop state snapshot.
        let table = to_state.get_table(&self.table_name)?;
        editor.create_column(table, table.get_column(&self.column_name)?, conn).await
    }
}

// ============================================================================
// RenameColumn
// ============================================================================

/// Renames a column of a table in the database.
pub struct RenameColumn {
    table_name: String,
    old_name: String,
    new_name: String,
}

impl RenameColumn {
    /// Renames `old_name` to `new_name` in `table_name`.
    pub fn new(table_name: &str, old_name: &str, new_name: &str) -> Result<Self, Error> {
        if table_name.is_empty() || old_name.is_empty() || new_name.is_empty() {
            return Err(Error::value("rename column: names can not be empty"));
        }

        Ok(Self {
            table_name: table_name.to_string(),
            old_name: old_name.to_string(),
            new_name: new_name.to_string(),
        })
    }
}

#[async_trait]
impl Operation for RenameColumn {
    fn update_state(&self, state: &mut ProjectState) -> Result<(), Error> {
        let table = state.get_table_mut(&self.table_name)?;
        let mut column = table.get_column(&self.old_name)?.clone();
        if table.columns.contains_key(&self.new_name) {
            return Err(Error::value(format!(
                "column with name '{}' already exists, consider altering it instead",
                self.new_name
            )));
        }

        table.columns.remove(&self.old_name);
        column.name = self.new_name.clone();
        table.columns.insert(column.name.clone(), column);
        if let Some(fk) = table.foreign_keys.remove(&self.old_name) {
            table.foreign_keys.insert(self.new_name.clone(), fk);
        }

        Ok(())
    }

    async fn forward(
        &self,
        editor: &dyn SchemaEditor,
        from_state: &ProjectState,
        to_state: &ProjectState,
        conn: &mut (dyn SqlDriver + Send),
    ) -> Result<(), Error> {
        let from_table = from_state.get_table(&self.table_name)?;
        editor
            .alter_column(
                from_table,
                from_table.get_column(&self.old_name)?,
                to_state.get_table(&self.table_name)?.get_column(&self.new_name)?,
                false,
                conn,
            )
            .await
    }

    async fn backward(
        &self,
        editor: &dyn SchemaEditor,
        from_state: &ProjectState,
        to_state: &ProjectState,
        conn: &mut (dyn SqlDriver + Send),
    ) -> Result<(), Error> {
        let from_table = from_state.get_table(&self.table_name)?;
        editor
            .alter_column(
                from_table,
                from_table.get_column(&self.new_name)?,
                to_state.get_table(&self.table_name)?.get_column(&self.old_name)?,
                false,
                conn,
            )
            .await
    }
}

// ============================================================================
// AlterColumn
// ============================================================================

/// Alters a column of a table in the database.
pub struct AlterColumn {
    table_name: String,
    column: ColumnState,
}

impl AlterColumn {
    /// Replaces the definition of `column_name` in `table_name` with one
    /// typed after `T` under the given constraints.
    pub fn new<T: ColumnType>(
        table_name: &str,
        column_name: &str,
        constraints: Constraints,
    ) -> Result<Self, Error> {
        require_fillable(table_name, column_name, &constraints, "altered")?;
        Ok(Self {
            table_name: table_name.to_string(),
            column: ColumnState::of::<T>(column_name, constraints)?,
        })
    }
}

#[async_trait]
impl Operation for AlterColumn {
    fn update_state(&self, state: &mut ProjectState) -> Result<(), Error> {
        let table = state.get_table_mut(&self.table_name)?;
        table.get_column(&self.column.name)?;
        table.columns.insert(self.column.name.clone(), self.column.clone());
        Ok(())
    }

    async fn forward(
        &self,
        editor: &dyn SchemaEditor,
        from_state: &ProjectState,
        to_state: &ProjectState,
        conn: &mut (dyn SqlDriver + Send),
    ) -> Result<(), Error> {
        let from_table = from_state.get_table(&self.table_name)?;
        editor
            .alter_column(
                from_table,
                from_table.get_column(&self.column.name)?,
                to_state.get_table(&self.table_name)?.get_column(&self.column.name)?,
                false,
                conn,
            )
            .await
    }

    async fn backward(
        &self,
        editor: &dyn SchemaEditor,
        from_state: &ProjectState,
        to_state: &ProjectState,
        conn: &mut (dyn SqlDriver + Send),
    ) -> Result<(), Error> {
        // Forward with the column snapshots swapped.
        let from_table = from_state.get_table(&self.table_name)?;
        editor
            .alter_column(
                from_table,
                from_table.get_column(&self.column.name)?,
                to_state.get_table(&self.table_name)?.get_column(&self.column.name)?,
                false,
                conn,
            )
            .await
    }
}

// ============================================================================
// Tests
// ============================================================================
