//! # Update Statement Builder
//!
//! Renders `UPDATE "T" SET col = v, ... WHERE "T"."pk" = <pk>` per
//! accumulated model. Batch commits wrap the statements in a transaction
//! unless the connection already has one active.

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
// Update Builder
// ============================================================================

/// A fluent `UPDATE` builder for model type `M`.
///
/// When `M::OMIT_PK` is set (the default), the primary key stays out of the
/// SET list but still anchors the `WHERE` clause.
pub struct Update<C, M> {
    conn: C,
    builder: SqlBuilder,
    rows: Vec<(String, Condition)>,
    _marker: PhantomData<fn() -> M>,
}

impl<C, M> Update<C, M>
where
    C: SqlDriver,
    M: Model,
{
    /// Creates an empty builder bound to `conn`.
    pub fn new(conn: C) -> Self {
        Self { conn, builder: SqlBuilder, rows: Vec::new(), _marker: PhantomData }
    }

    /// Appends a model: its non-pk columns form the SET list, its primary
    /// key the row condition.
    pub fn model(mut self, model: &M) -> Result<Self, Error> {
        let set_list = M::columns()
            .iter()
            .filter(|column| !(M::OMIT_PK && column.primary_key))
            .map(|column| format!("{} = {}", column.name, (column.get)(model)))
            .collect::<Vec<_>>()
            .join(", ");
        let condition = Condition::raw(format!(
            "{}.{} = {}",
            quote_ident(M::TABLE_NAME),
            quote_ident(M::pk_name()),
            model.pk_literal()?
        ));
        self.rows.push((set_list, condition));
        Ok(self)
    }

    /// Renders one `UPDATE` statement per accumulated model, joined with a
    /// single space.
    pub fn to_sql(&self) -> Result<String, Error> {
        let mut statements = Vec::with_capacity(self.rows.len());
        for (set_list, condition) in &self.rows {
            statements.push(self.builder.sql_update(M::TABLE_NAME, set_list, Some(condition))?);
        }

        if statements.is_empty() {
            return Err(Error::query("update: no models were set"));
        }

        Ok(statements.join(" "))
    }

    /// Updates a single row.
    pub async fn commit_one(mut self) -> Result<(), Error> {
        if self.rows.len() > 1 {
            return Err(Error::query(
                "update: trying to update one model, but multiple models were set",
            ));
        }

        let sql = self.to_sql()?;
        self.conn.run_query(&sql).await
    }

    /// Updates all accumulated rows, wrapped in a transaction unless the
    /// connection already runs inside one.
    pub async fn commit_batch(mut self) -> Result<(), Error> {
        let sql = self.to_sql()?;
        let wrap = !self.conn.in_transaction();
        if wrap {
            self.conn.begin_transaction().await?;
        }

        self.conn.run_query(&sql).await?;
        if wrap {
            self.conn.end_transaction().await?;
        }

        Ok(())
    }
}
