//! # Repository Module
//!
//! The statement-level entry point over a connection pool. Every builder
//! obtained from the repository holds a pooled connection for the duration
//! of its single statement and returns it when dropped; callers needing an
//! atomic multi-statement unit start a [`Transaction`] instead.

// ============================================================================
// External Crate Imports
// ============================================================================

use std::sync::Arc;

// ============================================================================
// Internal Crate Imports
// ============================================================================

use crate::errors::Error;
use crate::model::Model;
use crate::pool::{ConnectionPool, PooledConnection};
use crate::queries::{Delete, Insert, Select, Update};
use crate::transaction::Transaction;

// ============================================================================
// Repository
// ============================================================================

/// Hands out statement builders over pooled connections.
#[derive(Clone)]
pub struct Repository {
    pool: Arc<ConnectionPool>,
}

impl Repository {
    /// Creates a repository over `pool`.
    pub fn new(pool: Arc<ConnectionPool>) -> Self {
        Self { pool }
    }

    /// The underlying pool.
    pub fn pool(&self) -> &Arc<ConnectionPool> {
        &self.pool
    }

    /// Starts an `INSERT` on a freshly acquired connection.
    pub async fn insert<M: Model>(&self) -> Result<Insert<PooledConnection, M>, Error> {
        Ok(Insert::new(self.pool.acquire().await?))
    }

    /// Starts a `SELECT` on a freshly acquired connection.
    pub async fn select<M: Model + 'static>(
        &self,
    ) -> Result<Select<PooledConnection, M>, Error> {
        Ok(Select::new(self.pool.acquire().await?))
    }

    /// Starts an `UPDATE` on a freshly acquired connection.
    pub async fn update<M: Model>(&self) -> Result<Update<PooledConnection, M>, Error> {
        Ok(Update::new(self.pool.acquire().await?))
    }

    /// Starts a `DELETE` on a freshly acquired connection.
    pub async fn delete<M: Model>(&self) -> Result<Delete<PooledConnection, M>, Error> {
        Ok(Delete::new(self.pool.acquire().await?))
    }

    /// Acquires a connection and begins a transaction on it.
    pub async fn transaction(&self) -> Result<Transaction, Error> {
        Transaction::begin(self.pool.acquire().await?).await
    }
}
