//! # xalwart ORM
//!
//! **xalwart-orm** maps user-declared record types onto relational SQL
//! databases. Tables are declared as typed structs with `#[derive(Model)]`,
//! rows are manipulated through composable, strongly-typed statement
//! builders, and schema evolution is tracked through versioned migrations
//! that apply and roll back transactionally.
//!
//! ## Features
//!
//! - **Typed query DSL**: column references, predicates, joins and
//!   aggregates rendering bit-exact SQL
//! - **Multi-dialect**: SQLite and PostgreSQL through `sqlx::Any`
//! - **Migration engine**: explicit operations over an in-memory project
//!   state, applied and reversed with consistency checks
//! - **Bounded connection pool**: all connections created up front, handed
//!   out through scope-bound guards
//! - **Transactions**: connection-scoped atomic work units with
//!   rollback-on-drop semantics
//!
//! ## Quick Start Example
//!
//! ```rust,ignore
//! use xalwart_orm::{Migration, MigrationExecutor, Model, Repository};
//!
//! #[derive(Model, Debug, Clone, Default)]
//! #[orm(table = "persons")]
//! struct Person {
//!     #[orm(primary_key)]
//!     id: i64,
//!     name: String,
//!     age: Option<i32>,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), xalwart_orm::Error> {
//!     let config = xalwart_orm::DatabaseConfig::Sqlite3 {
//!         file: "db.sqlite3".into(),
//!         connections: 3,
//!     };
//!     let pool = config.open_pool(None).await?;
//!
//!     let executor = MigrationExecutor::new(vec![Migration::new("0001_initial")
//!         .create_table("persons", |table| {
//!             table
//!                 .column::<i64>("id", Default::default())?
//!                 .column::<String>("name", Default::default())?;
//!             Ok(())
//!         })?]);
//!     executor.apply(&mut *pool.acquire().await?, "").await?;
//!
//!     let repo = Repository::new(pool);
//!     use person_cols as cols;
//!     let adults = repo
//!         .select::<Person>()
//!         .await?
//!         .where_cond(cols::AGE.ge(Some(18)))?
//!         .to_vector()
//!         .await?;
//!
//!     Ok(())
//! }
//! ```

// ============================================================================
// Macro Re-exports
// ============================================================================

/// Re-export of the procedural macro for deriving the `Model` trait.
pub use xalwart_orm_macro::Model;

// ============================================================================
// Module Declarations
// ============================================================================

/// Error types and helpers.
pub mod errors;

/// The `Model` trait and the column descriptor table behind it.
pub mod model;

/// Typed column references, predicates, ordering and joins.
pub mod conditions;

/// Aggregate function builders.
pub mod functions;

/// Dialect-independent statement rendering.
pub mod sql_builder;

/// The four fluent statement builders.
pub mod queries;

/// The driver contract and materialised result rows.
pub mod driver;

/// The sqlx-backed connection.
pub mod connection;

/// Bounded connection pool and the pooled-connection guard.
pub mod pool;

/// Statement-level entry points over the pool.
pub mod repository;

/// Connection-scoped atomic work units.
pub mod transaction;

/// Database entry configuration.
pub mod config;

/// In-memory schema state: types, constraints, tables, project.
pub mod state;

/// Migration operations over project state.
pub mod operations;

/// Dialect SQL rendering and execution of schema changes.
pub mod schema_editor;

/// The applied-migration log over `xalwart_migrations`.
pub mod recorder;

/// A single migration: identifier, operations, atomicity.
pub mod migration;

/// Apply/rollback orchestration with consistency checks.
pub mod executor;

/// Identifier and literal quoting helpers.
pub mod util;

// ============================================================================
// Public API Re-exports
// ============================================================================

pub use conditions::{Column, Condition, Join, JoinKind, Ordering, cross_on, inner_on, join_on, left_on};
pub use config::DatabaseConfig;
pub use connection::DatabaseConnection;
pub use driver::{Dialect, SqlDriver, SqlRow};
pub use errors::Error;
pub use executor::MigrationExecutor;
pub use functions::{avg, count, max, min, sum};
pub use migration::Migration;
pub use model::{ColumnMeta, FromSqlText, Model, ToSqlLiteral, make_fk};
pub use pool::{ConnectionPool, PooledConnection};
pub use queries::{Delete, Insert, Select, Update};
pub use recorder::{MIGRATIONS_TABLE, MigrationRecord, MigrationRecorder};
pub use repository::Repository;
pub use schema_editor::{PostgresSchemaEditor, SchemaEditor, SqliteSchemaEditor, editor_for};
pub use sql_builder::{SelectParts, SqlBuilder};
pub use state::{
    ColumnState, ColumnType, Constraints, ForeignKey, OnAction, ProjectState, SqlType, SqlValue,
    TableState,
};
pub use transaction::Transaction;
