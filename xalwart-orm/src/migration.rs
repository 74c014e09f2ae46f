//! # Migration Module
//!
//! One migration: a lexicographically orderable identifier plus an ordered
//! list of operations applied as a single unit. Application and rollback
//! wrap the operations in a transaction when the migration is atomic and
//! the dialect supports transactional DDL; the applied-migration record is
//! written inside the same transaction, so no partially-applied migration
//! is ever recorded.

// ============================================================================
// Internal Crate Imports
// ============================================================================

use crate::driver::SqlDriver;
use crate::errors::Error;
use crate::operations::{
    AddColumn, AlterColumn, CreateTable, DropColumn, DropTable, Operation, RenameColumn,
    RenameTable,
};
use crate::recorder::MigrationRecorder;
use crate::schema_editor::SchemaEditor;
use crate::state::{ColumnType, Constraints, ProjectState};

// ============================================================================
// Migration
// ============================================================================

/// An ordered list of schema operations applied as one unit.
///
/// The identifier defines the application order across migrations; a
/// common scheme is `0001_initial`, `0002_add_age`, ...
pub struct Migration {
    identifier: String,
    operations: Vec<Box<dyn Operation>>,
    atomic: bool,
}

impl Migration {
    /// Creates an empty, atomic migration.
    pub fn new(identifier: &str) -> Self {
        Self { identifier: identifier.to_string(), operations: Vec::new(), atomic: true }
    }

    /// Sets whether the migration runs inside a transaction. Only has an
    /// effect on dialects with transactional DDL.
    pub fn atomic(mut self, atomic: bool) -> Self {
        self.atomic = atomic;
        self
    }

    /// The migration identifier.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Whether the migration wants transactional application.
    pub fn is_atomic(&self) -> bool {
        self.atomic
    }

    /// Appends an arbitrary operation.
    pub fn operation(mut self, operation: impl Operation + 'static) -> Self {
        self.operations.push(Box::new(operation));
        self
    }

    // ========================================================================
    // Operation Shorthands
    // ========================================================================

    /// Appends a `CreateTable` operation built by `build`.
    pub fn create_table(
        self,
        name: &str,
        build: impl FnOnce(&mut CreateTable) -> Result<(), Error>,
    ) -> Result<Self, Error> {
        let mut operation = CreateTable::new(name)?;
        build(&mut operation)?;
        Ok(self.operation(operation))
    }

    /// Appends a `DropTable` operation.
    pub fn drop_table(self, name: &str) -> Result<Self, Error> {
        Ok(self.operation(DropTable::new(name)?))
    }

    /// Appends a `RenameTable` operation.
    pub fn rename_table(self, old_name: &str, new_name: &str) -> Result<Self, Error> {
        Ok(self.operation(RenameTable::new(old_name, new_name)?))
    }

    /// Appends an `AddColumn` operation typed after `T`.
    pub fn add_column<T: ColumnType>(
        self,
        table_name: &str,
        column_name: &str,
        constraints: Constraints,
    ) -> Result<Self, Error> {
        Ok(self.operation(AddColumn::new::<T>(table_name, column_name, constraints)?))
    }

    /// Appends a `DropColumn` operation.
    pub fn drop_column(self, table_name: &str, column_name: &str) -> Result<Self, Error> {
        Ok(self.operation(DropColumn::new(table_name, column_name)?))
    }

    /// Appends a `RenameColumn` operation.
    pub fn rename_column(
        self,
        table_name: &str,
        old_name: &str,
        new_name: &str,
    ) -> Result<Self, Error> {
        Ok(self.operation(RenameColumn::new(table_name, old_name, new_name)?))
    }

    /// Appends an `AlterColumn` operation typed after `T`.
    pub fn alter_column<T: ColumnType>(
        self,
        table_name: &str,
        column_name: &str,
        constraints: Constraints,
    ) -> Result<Self, Error> {
        Ok(self.operation(AlterColumn::new::<T>(table_name, column_name, constraints)?))
    }

    // ========================================================================
    // Execution
    // ========================================================================

    /// Replays this migration's state transformation without touching the
    /// database.
    pub(crate) fn update_state(&self, state: &mut ProjectState) -> Result<(), Error> {
        for operation in &self.operations {
            operation.update_state(state)?;
        }

        Ok(())
    }

    /// Applies every operation in order, recording the migration inside
    /// the same work unit. `state` ends up at the post-migration snapshot.
    pub(crate) async fn apply(
        &self,
        state: &mut ProjectState,
        editor: &dyn SchemaEditor,
        conn: &mut (dyn SqlDriver + Send),
        recorder: &MigrationRecorder,
    ) -> Result<(), Error> {
        let wrap = self.atomic && conn.dialect().supports_transactional_ddl();
        if wrap {
            conn.begin_transaction().await?;
        }

        let result = self.apply_operations(state, editor, conn, recorder).await;
        match result {
            Ok(()) => {
                if wrap {
                    conn.end_transaction().await?;
                }

                Ok(())
            }
            Err(e) => {
                conn.rollback_transaction().await?;
                Err(e)
            }
        }
    }

    async fn apply_operations(
        &self,
        state: &mut ProjectState,
        editor: &dyn SchemaEditor,
        conn: &mut (dyn SqlDriver + Send),
        recorder: &MigrationRecorder,
    ) -> Result<(), Error> {
        for operation in &self.operations {
            let old_state = state.clone();
            operation.update_state(state)?;
            operation.forward(editor, &old_state, state, conn).await?;
        }

        recorder.record_applied(conn, &self.identifier).await
    }

    /// Reverses every operation, newest first, starting from the project
    /// state as it was before this migration.
    pub(crate) async fn rollback(
        &self,
        state_before: &ProjectState,
        editor: &dyn SchemaEditor,
        conn: &mut (dyn SqlDriver + Send),
        recorder: &MigrationRecorder,
    ) -> Result<(), Error> {
        // Rebuild the (pre, post) snapshot for every operation.
        let mut snapshots = Vec::with_capacity(self.operations.len());
        let mut state = state_before.clone();
        for operation in &self.operations {
            let old_state = state.clone();
            operation.update_state(&mut state)?;
            snapshots.push((operation, old_state, state.clone()));
        }

        let wrap = self.atomic && conn.dialect().supports_transactional_ddl();
        if wrap {
            conn.begin_transaction().await?;
        }

        let result = async {
            for (operation, old_state, new_state) in snapshots.iter().rev() {
                operation.backward(editor, new_state, old_state, conn).await?;
            }

            recorder.record_rolled_back(conn, &self.identifier).await
        };
        match result.await {
            Ok(()) => {
                if wrap {
                    conn.end_transaction().await?;
                }

                Ok(())
            }
            Err(e) => {
                conn.rollback_transaction().await?;
                Err(e)
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
