//! # Migration Operations Module
//!
//! Each operation knows three things: how to mutate the in-memory project
//! state, how to drive the schema editor forward (pre-state to post-state)
//! and how to drive it backward. The executor threads two state snapshots
//! through every call, so operations stay pure over owned state and are
//! easy to test in isolation.

pub mod column;
pub mod table;

pub use column::{AddColumn, AlterColumn, DropColumn, RenameColumn};
pub use table::{CreateTable, DropTable, RenameTable};

// ============================================================================
// External Crate Imports
// ============================================================================

use async_trait::async_trait;

// ============================================================================
// Internal Crate Imports
// ============================================================================

use crate::driver::SqlDriver;
use crate::errors::Error;
use crate::schema_editor::SchemaEditor;
use crate::state::ProjectState;

// ============================================================================
// Operation Trait
// ============================================================================

/// One schema-transforming step inside a migration.
#[async_trait]
pub trait Operation: Send + Sync {
    /// Applies this operation to the in-memory project state.
    fn update_state(&self, state: &mut ProjectState) -> Result<(), Error>;

    /// Emits and executes the forward schema change. `from_state` is the
    /// snapshot before `update_state`, `to_state` the one after.
    async fn forward(
        &self,
        editor: &dyn SchemaEditor,
        from_state: &ProjectState,
        to_state: &ProjectState,
        conn: &mut (dyn SqlDriver + Send),
    ) -> Result<(), Error>;

    /// Emits and executes the reverse schema change. `from_state` is the
    /// post-operation snapshot, `to_state` the pre-operation one.
    async fn backward(
        &self,
        editor: &dyn SchemaEditor,
        from_state: &ProjectState,
        to_state: &ProjectState,
        conn: &mut (dyn SqlDriver + Send),
    ) -> Result<(), Error>;
}
