//! # Insert Statement Builder
//!
//! Accumulates one or more models and renders a single `INSERT` statement.
//! `one()` requires exactly one model and returns the last inserted primary
//! key as a string; `bulk()` accepts any non-zero number of models and
//! returns no id.

// ============================================================================
// External Crate Imports
// ============================================================================

use std::marker::PhantomData;

// ============================================================================
// Internal Crate Imports
// ============================================================================

use crate::driver::SqlDriver;
use crate::errors::Error;
use crate::model::Model;
use crate::sql_builder::SqlBuilder;

// ============================================================================
// Insert Builder
// ============================================================================

/// A fluent `INSERT` builder for model type `M`.
///
/// When `M::OMIT_PK` is set (the default), the primary-key column is left
/// out of the column list and of every values tuple, letting the database
/// assign it.
pub struct Insert<C, M> {
    conn: C,
    builder: SqlBuilder,
    columns: String,
    rows: Vec<String>,
    _marker: PhantomData<fn() -> M>,
}

impl<C, M> Insert<C, M>
where
    C: SqlDriver,
    M: Model,
{
    /// Creates an empty builder bound to `conn`.
    pub fn new(conn: C) -> Self {
        let columns = M::columns()
            .iter()
            .filter(|column| !(M::OMIT_PK && column.primary_key))
            .map(|column| column.name)
            .collect::<Vec<_>>()
            .join(", ");

        Self { conn, builder: SqlBuilder, columns, rows: Vec::new(), _marker: PhantomData }
    }

    /// Appends a model to the values list.
    pub fn model(mut self, model: &M) -> Self {
        let row = M::columns()
            .iter()
            .filter(|column| !(M::OMIT_PK && column.primary_key))
            .map(|column| (column.get)(model))
            .collect::<Vec<_>>()
            .join(", ");
        self.rows.push(row);
        self
    }

    /// Renders the statement.
    pub fn to_sql(&self) -> Result<String, Error> {
        self.builder.sql_insert(M::TABLE_NAME, &self.columns, &self.rows)
    }

    /// Inserts a single model and returns the last inserted primary key as
    /// a string.
    pub async fn one(mut self) -> Result<String, Error> {
        if self.rows.len() != 1 {
            return Err(Error::query(
                "insert: unable to return the inserted key, exactly one model is required",
            ));
        }

        let sql = self.to_sql()?;
        self.conn.run_insert(&sql).await
    }

    /// Inserts all accumulated models without returning an id.
    pub async fn bulk(mut self) -> Result<(), Error> {
        let sql = self.to_sql()?;
        self.conn.run_query(&sql).await
    }
}
