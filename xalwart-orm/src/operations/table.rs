//! # Table Operations
//!
//! `CreateTable`, `DropTable` and `RenameTable`. `CreateTable` doubles as
//! the fluent column/foreign-key collector used by
//! [`crate::migration::Migration::create_table`].

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
use crate::operations::Operation;
use crate::schema_editor::SchemaEditor;
use crate::state::{
    ColumnState, ColumnType, Constraints, ForeignKey, ProjectState, TableState,
};

// ============================================================================
// CreateTable
// ============================================================================

/// Creates a table in the database.
#[derive(Debug, Clone, Default)]
pub struct CreateTable {
    name: String,
    columns: BTreeMap<String, ColumnState>,
    foreign_keys: BTreeMap<String, ForeignKey>,
}

impl CreateTable {
    /// Starts collecting a table named `name`.
    pub fn new(name: &str) -> Result<Self, Error> {
        if name.is_empty() {
            return Err(Error::value("create table: 'name' can not be empty"));
        }

        Ok(Self { name: name.to_string(), ..Default::default() })
    }

    /// Adds a column typed after the Rust field type `T`.
    pub fn column<T: ColumnType>(
        &mut self,
        name: &str,
        constraints: Constraints,
    ) -> Result<&mut Self, Error> {
        let column = ColumnState::of::<T>(name, constraints)?;
        self.columns.insert(column.name.clone(), column);
        Ok(self)
    }

    /// Adds a foreign-key constraint on `column_name`. The column must be
    /// added through [`CreateTable::column`] as well.
    pub fn foreign_key(&mut self, column_name: &str, fk: ForeignKey) -> &mut Self {
        self.foreign_keys.insert(column_name.to_string(), fk);
        self
    }

    fn table_state(&self) -> TableState {
        TableState {
            name: self.name.clone(),
            columns: self.columns.clone(),
            foreign_keys: self.foreign_keys.clone(),
        }
    }
}

#[async_trait]
impl Operation for CreateTable {
    fn update_state(&self, state: &mut ProjectState) -> Result<(), Error> {
        for column_name in self.foreign_keys.keys() {
            if !self.columns.contains_key(column_name) {
                return Err(Error::value(format!(
                    "foreign key on unknown column '{}' in table '{}'",
                    column_name, self.name
                )));
            }
        }

        state.tables.insert(self.name.clone(), self.table_state());
        Ok(())
    }

    async fn forward(
        &self,
        editor: &dyn SchemaEditor,
        _from_state: &ProjectState,
        to_state: &ProjectState,
        conn: &mut (dyn SqlDriver + Send),
    ) -> Result<(), Error> {
        let table = to_state.get_table(&self.name)?;
        editor.create_table(table, conn).await
    }

    async fn backward(
        &self,
        editor: &dyn SchemaEditor,
        _from_state: &ProjectState,
        _to_state: &ProjectState,
        conn: &mut (dyn SqlDriver + Send),
    ) -> Result<(), Error> {
        editor.drop_table(&self.name, conn).await
    }
}

// ============================================================================
// DropTable
// ============================================================================

/// Drops a table from the database.
#[derive(Debug, Clone)]
pub struct DropTable {
    name: String,
}

impl DropTable {
    /// Drops the table named `name`.
    pub fn new(name: &str) -> Result<Self, Error> {
        if name.is_empty() {
            return Err(Error::value("drop table: 'name' can not be empty"));
        }

        Ok(Self { name: name.to_string() })
    }
}

#[async_trait]
impl Operation for DropTable {
    fn update_state(&self, state: &mut ProjectState) -> Result<(), Error> {
        state.get_table(&self.name)?;
        state.tables.remove(&self.name);
        Ok(())
    }

    async fn forward(
        &self,
        editor: &dyn SchemaEditor,
        from_state: &ProjectState,
        _to_state: &ProjectState,
        conn: &mut (dyn SqlDriver + Send),
    ) -> Result<(), Error> {
        let table = from_state.get_table(&self.name)?;
        editor.drop_table(&table.name, conn).await
    }

    async fn backward(
        &self,
        editor: &dyn SchemaEditor,
        _from_state: &ProjectState,
        to_state: &ProjectState,
        conn: &mut (dyn SqlDriver + Send),
    ) -> Result<(), Error> {
        // Re-create from the pre-drop state snapshot.
        let table = to_state.get_table(&self.name)?;
        editor.create_table(table, conn).await
    }
}

// ============================================================================
// RenameTable
// ============================================================================

/// Renames a table in the database.
#[derive(Debug, Clone)]
pub struct RenameTable {
    old_name: String,
    new_name: String,
}

impl RenameTable {
    /// Renames `old_name` to `new_name`.
    pub fn new(old_name: &str, new_name: &str) -> Result<Self, Error> {
        if old_name.is_empty() || new_name.is_empty() {
            return Err(Error::value("rename table: names can not be empty"));
        }

        Ok(Self { old_name: old_name.to_string(), new_name: new_name.to_string() })
    }
}

#[async_trait]
impl Operation for RenameTable {
    fn update_state(&self, state: &mut ProjectState) -> Result<(), Error> {
        let mut table = state.get_table(&self.old_name)?.clone();
        state.tables.remove(&self.old_name);
        table.name = self.new_name.clone();
        state.tables.insert(table.name.clone(), table);
        Ok(())
    }

    async fn forward(
        &self,
        editor: &dyn SchemaEditor,
        _from_state: &ProjectState,
        _to_state: &ProjectState,
        conn: &mut (dyn SqlDriver + Send),
    ) -> Result<(), Error> {
        editor.rename_table(&self.old_name, &self.new_name, conn).await
    }

    async fn backward(
        &self,
        editor: &dyn SchemaEditor,
        _from_state: &ProjectState,
        _to_state: &ProjectState,
        conn: &mut (dyn SqlDriver + Send),
    ) -> Result<(), Error> {
        editor.rename_table(&self.new_name, &self.old_name, conn).await
    }
}

// ============================================================================
// Tests
// ============================================================================
