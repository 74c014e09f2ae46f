//! # Transaction Module
//!
//! A transaction owns one pooled connection for its whole lifetime: `BEGIN`
//! runs when the transaction is created, `commit`/`rollback` consume it.
//! Statement builders obtained from the transaction route their execution
//! to that same connection, so all statements of the work unit are atomic.
//!
//! A transaction dropped without commit leaves the rollback to the pool,
//! which cleans the connection before handing it out again.

// ============================================================================
// Internal Crate Imports
// ============================================================================

use crate::connection::DatabaseConnection;
use crate::errors::Error;
use crate::model::Model;
use crate::pool::PooledConnection;
use crate::queries::{Delete, Insert, Select, Update};

// ============================================================================
// Transaction
// ============================================================================

/// An atomic work unit bound to a single pooled connection.
pub struct Transaction {
    conn: PooledConnection,
    finished: bool,
}

impl Transaction {
    /// Begins a transaction on `conn`.
    pub(crate) async fn begin(mut conn: PooledConnection) -> Result<Self, Error> {
        use crate::driver::SqlDriver;

        conn.begin_transaction().await?;
        Ok(Self { conn, finished: false })
    }

    // ========================================================================
    // Statement Builders
    // ========================================================================

    /// Starts an `INSERT` running on this transaction's connection.
    pub fn insert<M: Model>(&mut self) -> Insert<&mut DatabaseConnection, M> {
        Insert::new(self.conn.connection())
    }

    /// Starts a `SELECT` running on this transaction's connection.
    pub fn select<M: Model + 'static>(&mut self) -> Select<&mut DatabaseConnection, M> {
        Select::new(self.conn.connection())
    }

    /// Starts an `UPDATE` running on this transaction's connection.
    pub fn update<M: Model>(&mut self) -> Update<&mut DatabaseConnection, M> {
        Update::new(self.conn.connection())
    }

    /// Starts a `DELETE` running on this transaction's connection.
    pub fn delete<M: Model>(&mut self) -> Delete<&mut DatabaseConnection, M> {
        Delete::new(self.conn.connection())
    }

    // ========================================================================
    // Transaction Control
    // ========================================================================

    /// Commits the work unit and returns the connection to the pool.
    pub async fn commit(mut self) -> Result<(), Error> {
        use crate::driver::SqlDriver;

        self.finished = true;
        self.conn.end_transaction().await
    }

    /// Rolls the work unit back and returns the connection to the pool.
    pub async fn rollback(mut self) -> Result<(), Error> {
        use crate::driver::SqlDriver;

        self.finished = true;
        self.conn.rollback_transaction().await
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if !self.finished {
            // The pool rolls the connection back before its next hand-out.
            log::warn!("transaction dropped without commit, it will be rolled back");
        }
    }
}
