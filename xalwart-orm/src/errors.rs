//! # Error Handling Module
//!
//! This module defines the error type used throughout xalwart ORM.
//! All fallible operations in the crate return [`enum@Error`]; the variants keep
//! the categories distinct so callers can match on them.
//!
//! ## Error Categories
//!
//! - **Query**: the caller composed an invalid statement, or the builder
//!   would emit malformed SQL (e.g. `OFFSET` without `LIMIT`)
//! - **Sql**: the database driver reported a failure while executing SQL
//! - **Database**: connection setup, credentials or configuration problems
//! - **Migrations**: the applied-migration log and the migration set disagree
//! - **Value** / **Type**: constraint or default-value mismatches detected
//!   while building column state
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use xalwart_orm::Error;
//!
//! match select.to_sql() {
//!     Ok(sql) => println!("{sql}"),
//!     Err(Error::Query(msg)) => eprintln!("bad statement: {msg}"),
//!     Err(e) => eprintln!("other error: {e}"),
//! }
//! ```

// ============================================================================
// External Crate Imports
// ============================================================================

use thiserror::Error;

// ============================================================================
// Error Enum Definition
// ============================================================================

/// The error type for all xalwart ORM operations.
///
/// Consistency errors ([`Error::Migrations`]) are fatal to a migration run
/// and require manual intervention. All other errors are local: the caller
/// may catch and retry with different inputs. The crate never retries on
/// its own.
#[derive(Error, Debug)]
pub enum Error {
    /// The caller composed an invalid statement or the builder would emit
    /// malformed SQL.
    ///
    /// Statement builders validate eagerly, so this surfaces at the call
    /// that introduced the violation where possible (e.g. calling
    /// `distinct()` twice), and at render time otherwise.
    #[error("query error: {0}")]
    Query(String),

    /// The driver reported a failure; the message is the driver's.
    #[error("sql error: {0}")]
    Sql(#[from] sqlx::Error),

    /// Connection setup, credential or configuration problems.
    #[error("database error: {0}")]
    Database(String),

    /// The applied-migration log and the migration set disagree.
    ///
    /// This is fatal to the migration run: the recorded history no longer
    /// matches the migrations on disk and must be reconciled by hand.
    #[error("migrations error: {0}")]
    Migrations(String),

    /// A constraint value is not usable for the column it was given to
    /// (e.g. `max_len` on a non-varchar column, an empty column name).
    #[error("value error: {0}")]
    Value(String),

    /// A default value's type does not match its column's type.
    #[error("type error: {0}")]
    Type(String),
}

// ============================================================================
// Helper Constructors
// ============================================================================

impl Error {
    /// Creates a `Query` error from a message.
    pub fn query(msg: impl Into<String>) -> Self {
        Error::Query(msg.into())
    }

    /// Creates a `Database` error from a message.
    pub fn database(msg: impl Into<String>) -> Self {
        Error::Database(msg.into())
    }

    /// Creates a `Migrations` error from a message.
    pub fn migrations(msg: impl Into<String>) -> Self {
        Error::Migrations(msg.into())
    }

    /// Creates a `Value` error from a message.
    pub fn value(msg: impl Into<String>) -> Self {
        Error::Value(msg.into())
    }

    /// Creates a `Type` error from a message.
    pub fn type_error(msg: impl Into<String>) -> Self {
        Error::Type(msg.into())
    }
}
