//! # Migration Executor Module
//!
//! Orchestrates apply and rollback sequences over a sorted migration list,
//! keeping the applied-migration log and the migration set consistent. Any
//! disagreement between the two is a [`Error::Migrations`] and aborts the
//! run; nothing is recorded for a migration that failed.

// ============================================================================
// Internal Crate Imports
// ============================================================================

use crate::driver::SqlDriver;
use crate::errors::Error;
use crate::migration::Migration;
use crate::recorder::{MigrationRecord, MigrationRecorder};
use crate::schema_editor::editor_for;
use crate::state::ProjectState;

// ============================================================================
// Migration Executor
// ============================================================================

/// Applies and rolls back migrations in identifier order.
pub struct MigrationExecutor {
    migrations: Vec<Migration>,
    recorder: MigrationRecorder,
}

impl MigrationExecutor {
    /// Creates an executor over `migrations`, sorted by identifier.
    pub fn new(mut migrations: Vec<Migration>) -> Self {
        migrations.sort_by(|left, right| left.identifier().cmp(right.identifier()));
        Self { migrations, recorder: MigrationRecorder::new() }
    }

    /// The sorted migration list.
    pub fn migrations(&self) -> &[Migration] {
        &self.migrations
    }

    /// The recorder used for bookkeeping.
    pub fn recorder(&self) -> &MigrationRecorder {
        &self.recorder
    }

    /// Checks the applied log against the migration set and returns the
    /// applied records.
    async fn checked_applied(
        &self,
        conn: &mut (dyn SqlDriver + Send),
    ) -> Result<Vec<MigrationRecord>, Error> {
        self.recorder.ensure_schema(conn).await?;
        let applied = self.recorder.applied_migrations(conn).await?;
        if applied.len() > self.migrations.len() {
            return Err(Error::migrations(
                "detected inconsistency - you must rollback migrations before deleting them",
            ));
        }

        for (migration, record) in self.migrations.iter().zip(&applied) {
            if migration.identifier() != record.name {
                return Err(Error::migrations(format!(
                    "detected inconsistency - check if '{}' migration exists and (or) is \
                     recorded to the database",
                    migration.identifier()
                )));
            }
        }

        Ok(applied)
    }

    /// Replays the applied prefix into a fresh project state.
    fn replay_applied(&self, applied_count: usize) -> Result<ProjectState, Error> {
        let mut state = ProjectState::default();
        for migration in &self.migrations[..applied_count] {
            migration.update_state(&mut state)?;
        }

        Ok(state)
    }

    /// Applies unapplied migrations in order, stopping after
    /// `to_migration` when given.
    pub async fn apply(
        &self,
        conn: &mut (dyn SqlDriver + Send),
        to_migration: &str,
    ) -> Result<(), Error> {
        let editor = editor_for(conn.dialect());
        let applied = self.checked_applied(conn).await?;

        log::info!("Apply migrations:");
        if applied.len() == self.migrations.len() {
            log::info!(" No migrations to apply.");
            return Ok(());
        }

        let apply_all = to_migration.is_empty();
        if !apply_all && applied.iter().any(|record| record.name == to_migration) {
            log::info!(" No migrations to apply.");
            return Ok(());
        }

        let mut state = self.replay_applied(applied.len())?;
        for migration in &self.migrations[applied.len()..] {
            log::info!(" Applying '{}'...", migration.identifier());
            migration.apply(&mut state, editor, conn, &self.recorder).await?;
            log::info!(" Applying '{}'... DONE", migration.identifier());

            if !apply_all && migration.identifier() == to_migration {
                break;
            }
        }

        Ok(())
    }

    /// Rolls applied migrations back, newest first, stopping when
    /// `to_migration` is reached (exclusively).
    pub async fn rollback(
        &self,
        conn: &mut (dyn SqlDriver + Send),
        to_migration: &str,
    ) -> Result<(), Error> {
        let editor = editor_for(conn.dialect());
        let applied = self.checked_applied(conn).await?;

        log::info!("Rollback migrations:");
        let rollback_all = to_migration.is_empty();
        if !rollback_all && !applied.iter().any(|record| record.name == to_migration) {
            log::info!(" No migrations to rollback.");
            return Ok(());
        }

        // Chain of intermediate states, one snapshot per applied migration.
        let mut states = Vec::with_capacity(applied.len());
        let mut state = ProjectState::default();
        for migration in &self.migrations[..applied.len()] {
            states.push(state.clone());
            migration.update_state(&mut state)?;
        }

        let mut rolled_back_any = false;
        for index in (0..applied.len()).rev() {
            let migration = &self.migrations[index];
            if !rollback_all && migration.identifier() == to_migration {
                break;
            }

            rolled_back_any = true;
            log::info!(" Rolling back '{}'...", migration.identifier());
            migration.rollback(&states[index], editor, conn, &self.recorder).await?;
            log::info!(" Rolling back '{}'... DONE", migration.identifier());
        }

        if !rolled_back_any {
            log::info!(" No migrations to roll back.");
        }

        Ok(())
    }
}
