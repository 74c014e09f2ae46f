//! # Delete Statement Builder
//!
//! By default deletes the accumulated models by primary key:
//! `DELETE FROM "T" WHERE "T"."pk" IN (pk1, ...)`. A caller-supplied
//! condition overrides the key list; with neither, rendering fails.

// ============================================================================
// External Crate Imports
// ============================================================================

use std::marker::PhantomData;

// ============================================================================
// Internal Crate Imports
// ============================================================================

use crate::conditions::Condition;
use crate::driver::SqlDriver;
use crate::errors::Error;
use crate::model::Model;
use crate::sql_builder::SqlBuilder;
use crate::util::quote_ident;

// ============================================================================
// Delete Builder
// ============================================================================

/// A fluent `DELETE` builder for model type `M`.
pub struct Delete<C, M> {
    conn: C,
    builder: SqlBuilder,
    pks: Vec<String>,
    where_cond: Option<Condition>,
    _marker: PhantomData<fn() -> M>,
}

impl<C, M> Delete<C, M>
where
    C: SqlDriver,
    M: Model,
{
    /// Creates an empty builder bound to `conn`.
    pub fn new(conn: C) -> Self {
        Self {
            conn,
            builder: SqlBuilder,
            pks: Vec::new(),
            where_cond: None,
            _marker: PhantomData,
        }
    }

    /// Appends a model's primary key to the deletion list.
    pub fn model(mut self, model: &M) -> Result<Self, Error> {
        self.pks.push(model.pk_literal()?);
        Ok(self)
    }

    /// Sets the `WHERE` condition, overriding the primary-key list.
    /// Repeated calls AND the conditions together.
    pub fn where_cond(mut self, condition: Condition) -> Self {
        self.where_cond = Some(match self.where_cond.take() {
            Some(existing) => existing & condition,
            None => condition,
        });
        self
    }

    /// Renders the statement.
    pub fn to_sql(&self) -> Result<String, Error> {
        let condition = match (&self.where_cond, self.pks.is_empty()) {
            (Some(condition), _) => condition.clone(),
            (None, false) => Condition::raw(format!(
                "{}.{} IN ({})",
                quote_ident(M::TABLE_NAME),
                quote_ident(M::pk_name()),
                self.pks.join(", ")
            )),
            (None, true) => {
                return Err(Error::query("delete: no models and no condition were set"));
            }
        };

        self.builder.sql_delete(M::TABLE_NAME, Some(&condition))
    }

    /// Performs the deletion.
    pub async fn commit(mut self) -> Result<(), Error> {
        let sql = self.to_sql()?;
        self.conn.run_query(&sql).await
    }
}
