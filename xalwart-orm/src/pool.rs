//! # Connection Pool Module
//!
//! A bounded pool of reusable database connections. All connections are
//! created up front; `acquire` waits while the available queue is empty and
//! `release` wakes exactly one waiter. Connections live as long as the pool.
//!
//! A connection returned while a transaction is still active (a dropped
//! [`crate::Transaction`]) is rolled back before it is handed out again, so
//! every acquired connection starts clean.

// ============================================================================
// External Crate Imports
// ============================================================================

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;
use tokio::sync::Notify;

// ============================================================================
// Internal Crate Imports
// ============================================================================

use crate::connection::DatabaseConnection;
use crate::driver::SqlDriver;
use crate::errors::Error;

// ============================================================================
// Type Aliases
// ============================================================================

/// Factory producing one pool connection.
///
/// Invoked `capacity` times during pool initialisation.
pub type ConnectionBuilder =
    Box<dyn Fn() -> BoxFuture<'static, Result<DatabaseConnection, Error>> + Send + Sync>;

// ============================================================================
// Connection Pool
// ============================================================================

/// A bounded, thread-safe pool of database connections.
///
/// The queue is guarded by a mutex; waiters park on a notifier. After the
/// initial fill, `available + checked out == capacity` always holds.
pub struct ConnectionPool {
    available: Mutex<VecDeque<DatabaseConnection>>,
    notify: Notify,
    capacity: usize,
}

impl ConnectionPool {
    /// Creates the pool and opens all `capacity` connections up front.
    ///
    /// `capacity` must be at least 1.
    pub async fn open(capacity: usize, builder: ConnectionBuilder) -> Result<Arc<Self>, Error> {
        if capacity < 1 {
            return Err(Error::value("pool capacity should be greater than zero"));
        }

        let mut connections = VecDeque::with_capacity(capacity);
        for _ in 0..capacity {
            connections.push_back(builder().await?);
        }

        Ok(Arc::new(Self {
            available: Mutex::new(connections),
            notify: Notify::new(),
            capacity,
        }))
    }

    /// The fixed number of connections this pool owns.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The number of connections currently available.
    pub fn available(&self) -> usize {
        self.available.lock().expect("pool mutex poisoned").len()
    }

    /// Takes a connection out of the pool, waiting while none is available.
    ///
    /// The returned guard releases the connection back to the pool on drop.
    pub async fn acquire(self: &Arc<Self>) -> Result<PooledConnection, Error> {
        loop {
            let conn = self.available.lock().expect("pool mutex poisoned").pop_front();
            if let Some(mut conn) = conn {
                // Left dirty by a dropped transaction; clean before reuse.
                if conn.in_transaction() {
                    conn.rollback_transaction().await?;
                }

                return Ok(PooledConnection { conn: Some(conn), pool: Arc::clone(self) });
            }

            self.notify.notified().await;
        }
    }

    fn release(&self, conn: DatabaseConnection) {
        self.available.lock().expect("pool mutex poisoned").push_back(conn);
        self.notify.notify_one();
    }
}

// ============================================================================
// Pooled Connection Guard
// ============================================================================

/// A scope-bound handle to one pooled connection.
///
/// Dereferences to [`DatabaseConnection`]; dropping the guard returns the
/// connection to the pool and wakes one waiter.
pub struct PooledConnection {
    conn: Option<DatabaseConnection>,
    pool: Arc<ConnectionPool>,
}

impl PooledConnection {
    /// Borrows the underlying connection.
    pub fn connection(&mut self) -> &mut DatabaseConnection {
        self.conn.as_mut().expect("pooled connection already released")
    }
}

impl std::ops::Deref for PooledConnection {
    type Target = DatabaseConnection;

    fn deref(&self) -> &Self::Target {
        self.conn.as_ref().expect("pooled connection already released")
    }
}

impl std::ops::DerefMut for PooledConnection {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.conn.as_mut().expect("pooled connection already released")
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool.release(conn);
        }
    }
}

// ============================================================================
// Driver Forwarding
// ============================================================================

// Statement builders are generic over `SqlDriver`, so the guard forwards the
// whole contract to the connection it holds.
#[async_trait::async_trait]
impl SqlDriver for PooledConnection {
    fn dbms_name(&self) -> &'static str {
        (**self).dbms_name()
    }

    fn dialect(&self) -> crate::driver::Dialect {
        (**self).dialect()
    }

    fn in_transaction(&self) -> bool {
        (**self).in_transaction()
    }

    async fn run_query(&mut self, sql: &str) -> Result<(), Error> {
        self.connection().run_query(sql).await
    }

    async fn run_query_with(
        &mut self,
        sql: &str,
        handler: crate::driver::RowHandler<'_>,
    ) -> Result<(), Error> {
        self.connection().run_query_with(sql, handler).await
    }

    async fn run_insert(&mut self, sql: &str) -> Result<String, Error> {
        self.connection().run_insert(sql).await
    }

    async fn begin_transaction(&mut self) -> Result<(), Error> {
        self.connection().begin_transaction().await
    }

    async fn end_transaction(&mut self) -> Result<(), Error> {
        self.connection().end_transaction().await
    }

    async fn rollback_transaction(&mut self) -> Result<(), Error> {
        self.connection().rollback_transaction().await
    }
}
