//! # Select Statement Builder
//!
//! A fluent `SELECT` builder with once-only options, joins and relation
//! hooks. Results materialise fully before returning; relation hooks run
//! after row materialisation and issue their secondary selects on the same
//! connection the statement executes on.

// ============================================================================
// External Crate Imports
// ============================================================================

use std::marker::PhantomData;
use std::sync::Arc;

use futures::future::BoxFuture;

// ============================================================================
// Internal Crate Imports
// ============================================================================

use crate::conditions::{Condition, Join, Ordering};
use crate::driver::{SqlDriver, SqlRow};
use crate::errors::Error;
use crate::functions::AggregateFn;
use crate::model::{FromSqlText, Model, make_fk};
use crate::sql_builder::{SelectParts, SqlBuilder};
use crate::util::quote_ident;

// ============================================================================
// Type Aliases
// ============================================================================

/// A post-materialisation hook: receives each freshly built record and the
/// statement's connection, and issues a secondary select.
type RelationHook<M> = Box<
    dyn for<'a> FnMut(&'a mut M, &'a mut (dyn SqlDriver + 'a)) -> BoxFuture<'a, Result<(), Error>>
        + Send,
>;

// ============================================================================
// Select Builder
// ============================================================================

/// A fluent `SELECT` builder for model type `M`.
///
/// Each option may be set only once with a meaningful value; empty lists
/// are tolerated and ignored. Violations surface as [`Error::Query`] at the
/// call that introduced them.
pub struct Select<C, M> {
    conn: C,
    builder: SqlBuilder,
    parts: SelectParts,
    hooks: Vec<RelationHook<M>>,
    _marker: PhantomData<fn() -> M>,
}

impl<C, M> Select<C, M>
where
    C: SqlDriver,
    M: Model + 'static,
{
    /// Creates a builder bound to `conn` with no options set.
    pub fn new(conn: C) -> Self {
        Self {
            conn,
            builder: SqlBuilder,
            parts: SelectParts::default(),
            hooks: Vec::new(),
            _marker: PhantomData,
        }
    }

    fn already_set(what: &str) -> Error {
        Error::query(format!("'{what}' is already set, check method call sequence"))
    }

    /// Emits `DISTINCT`.
    pub fn distinct(mut self) -> Result<Self, Error> {
        if self.parts.distinct {
            return Err(Self::already_set("distinct"));
        }

        self.parts.distinct = true;
        Ok(self)
    }

    /// Appends a join clause. Joins accumulate in caller order.
    pub fn join(mut self, join: Join) -> Self {
        self.parts.joins.push(join);
        self
    }

    /// Sets the `WHERE` condition.
    pub fn where_cond(mut self, condition: Condition) -> Result<Self, Error> {
        if self.parts.where_cond.is_some() {
            return Err(Self::already_set("where"));
        }

        self.parts.where_cond = Some(condition);
        Ok(self)
    }

    /// Sets the `ORDER BY` items.
    pub fn order_by(mut self, columns: Vec<Ordering>) -> Result<Self, Error> {
        if !self.parts.order_by.is_empty() {
            return Err(Self::already_set("order_by"));
        }

        self.parts.order_by = columns;
        Ok(self)
    }

    /// Sets the `LIMIT` value.
    pub fn limit(mut self, limit: u64) -> Result<Self, Error> {
        if self.parts.limit.is_some() {
            return Err(Self::already_set("limit"));
        }

        self.parts.limit = Some(limit);
        Ok(self)
    }

    /// Sets the `OFFSET` value. A zero offset is ignored.
    pub fn offset(mut self, offset: u64) -> Result<Self, Error> {
        if self.parts.offset.is_some() {
            return Err(Self::already_set("offset"));
        }

        if offset > 0 {
            self.parts.offset = Some(offset);
        }

        Ok(self)
    }

    /// Sets the `GROUP BY` items.
    pub fn group_by(mut self, columns: Vec<String>) -> Result<Self, Error> {
        if !self.parts.group_by.is_empty() {
            return Err(Self::already_set("group_by"));
        }

        self.parts.group_by = columns;
        Ok(self)
    }

    /// Sets the `HAVING` condition.
    pub fn having(mut self, condition: Condition) -> Result<Self, Error> {
        if self.parts.having.is_some() {
            return Err(Self::already_set("having"));
        }

        self.parts.having = Some(condition);
        Ok(self)
    }

    /// Renders the statement.
    pub fn to_sql(&self) -> Result<String, Error> {
        let columns = M::columns();
        let names: Vec<&str> = columns.iter().map(|column| column.name).collect();
        self.builder.sql_select(M::TABLE_NAME, &names, &self.parts)
    }

    // ========================================================================
    // Relation Hooks
    // ========================================================================

    /// For each selected record, fetches the `Other` rows whose foreign key
    /// points back at it and hands them to `setter`.
    ///
    /// `fk_to_this` names the foreign-key column in `Other`'s table; when
    /// empty it is derived from this model's table name (trailing `'s'`
    /// stripped, `"_" + pk_name` appended).
    pub fn one_to_many<Other, F>(mut self, setter: F, fk_to_this: &str) -> Self
    where
        Other: Model + 'static,
        F: Fn(&mut M, Vec<Other>) + Send + Sync + 'static,
    {
        let fk =
            if fk_to_this.is_empty() { make_fk::<M>() } else { fk_to_this.to_string() };
        let setter = Arc::new(setter);
        let builder = self.builder;
        let hook: RelationHook<M> = Box::new(move |model, conn| {
            let fk = fk.clone();
            let setter = Arc::clone(&setter);
            Box::pin(async move {
                let pk = model.pk_literal()?;
                let condition = Condition::raw(format!(
                    "{}.{} = {}",
                    quote_ident(Other::TABLE_NAME),
                    quote_ident(&fk),
                    pk
                ));
                let related =
                    fetch_related::<Other>(&builder, conn, condition, Vec::new(), false).await?;
                setter(model, related);
                Ok(())
            })
        });
        self.hooks.push(hook);
        self
    }

    /// For each selected record, fetches the single `Other` row it points
    /// at and hands it to `setter`. No row leaves the record untouched.
    pub fn many_to_one<Other, F>(mut self, setter: F, fk_to_other: &str) -> Self
    where
        Other: Model + 'static,
        F: Fn(&mut M, Other) + Send + Sync + 'static,
    {
        let fk =
            if fk_to_other.is_empty() { make_fk::<Other>() } else { fk_to_other.to_string() };
        let setter = Arc::new(setter);
        let builder = self.builder;
        let hook: RelationHook<M> = Box::new(move |model, conn| {
            let fk = fk.clone();
            let setter = Arc::clone(&setter);
            Box::pin(async move {
                // The record stores the referencing column; the joined select
                // resolves it against Other's primary key.
                let join = crate::conditions::left_on::<Other, M>(&fk, None);
                let condition = Condition::raw(format!(
                    "{}.{} = {}",
                    quote_ident(M::TABLE_NAME),
                    quote_ident(M::pk_name()),
                    model.pk_literal()?
                ));
                let mut related =
                    fetch_related::<Other>(&builder, conn, condition, vec![join], false).await?;
                if !related.is_empty() {
                    setter(model, related.remove(0));
                }

                Ok(())
            })
        });
        self.hooks.push(hook);
        self
    }

    /// For each selected record, fetches the `Other` rows connected through
    /// the junction table and hands them to `setter`.
    ///
    /// The junction table name is the alphabetically ordered concatenation
    /// of the two table names separated by `'_'`: tables `persons` and
    /// `cars` give `cars_persons`.
    pub fn many_to_many<Other, F>(mut self, setter: F, fk_to_this: &str) -> Self
    where
        Other: Model + 'static,
        F: Fn(&mut M, Vec<Other>) + Send + Sync + 'static,
    {
        let junction = if M::TABLE_NAME < Other::TABLE_NAME {
            format!("{}_{}", M::TABLE_NAME, Other::TABLE_NAME)
        } else {
            format!("{}_{}", Other::TABLE_NAME, M::TABLE_NAME)
        };
        let this_fk =
            if fk_to_this.is_empty() { make_fk::<M>() } else { fk_to_this.to_string() };
        let other_fk = make_fk::<Other>();
        let setter = Arc::new(setter);
        let builder = self.builder;
        let hook: RelationHook<M> = Box::new(move |model, conn| {
            let junction = junction.clone();
            let this_fk = this_fk.clone();
            let other_fk = other_fk.clone();
            let setter = Arc::clone(&setter);
            Box::pin(async move {
                let join = Join::new(
                    crate::conditions::JoinKind::Left,
                    junction.clone(),
                    Condition::raw(format!(
                        "{}.{} = {}.{}",
                        quote_ident(Other::TABLE_NAME),
                        quote_ident(Other::pk_name()),
                        quote_ident(&junction),
                        quote_ident(&other_fk)
                    )),
                );
                let condition = Condition::raw(format!(
                    "{}.{} = {}",
                    quote_ident(&junction),
                    quote_ident(&this_fk),
                    model.pk_literal()?
                ));
                let related =
                    fetch_related::<Other>(&builder, conn, condition, vec![join], true).await?;
                setter(model, related);
                Ok(())
            })
        });
        self.hooks.push(hook);
        self
    }

    // ========================================================================
    // Execution
    // ========================================================================

    /// Runs the query and materialises every row, then applies the relation
    /// hooks to each record.
    pub async fn to_vector(self) -> Result<Vec<M>, Error> {
        let sql = self.to_sql()?;
        let Select { mut conn, mut hooks, .. } = self;

        let mut rows: Vec<SqlRow> = Vec::new();
        conn.run_query_with(&sql, &mut |row| rows.push(row.clone())).await?;

        let mut models = Vec::with_capacity(rows.len());
        for row in &rows {
            models.push(M::from_row(row)?);
        }

        for model in &mut models {
            for hook in &mut hooks {
                let driver: &mut dyn SqlDriver = &mut conn;
                hook(model, driver).await?;
            }
        }

        Ok(models)
    }

    /// Runs the query with the limit forced to 1 (if unset) and returns the
    /// first row, or `None` when nothing matched.
    pub async fn first(mut self) -> Result<Option<M>, Error> {
        if self.parts.limit.is_none() {
            self.parts.limit = Some(1);
        }

        Ok(self.to_vector().await?.into_iter().next())
    }

    /// Runs `SELECT fn(args) FROM ...` for an aggregate and parses the
    /// scalar result.
    pub async fn aggregate<R: FromSqlText>(
        mut self,
        function: AggregateFn<R>,
    ) -> Result<R, Error> {
        let sql =
            self.builder.sql_select_raw(M::TABLE_NAME, &function.to_string(), &self.parts)?;
        let mut first_cell: Option<Option<String>> = None;
        self.conn
            .run_query_with(&sql, &mut |row| {
                if first_cell.is_none() {
                    first_cell = Some(row.get_at(0).flatten().map(str::to_string));
                }
            })
            .await?;

        match first_cell {
            Some(Some(text)) => R::from_sql_text(&text),
            _ => Err(Error::query("aggregate query returned no result")),
        }
    }
}

// ============================================================================
// Secondary Select Helper
// ============================================================================

/// Runs a secondary select for a relation hook on the hook's connection.
async fn fetch_related<Other: Model>(
    builder: &SqlBuilder,
    conn: &mut (dyn SqlDriver + '_),
    condition: Condition,
    joins: Vec<Join>,
    distinct: bool,
) -> Result<Vec<Other>, Error> {
    let parts = SelectParts {
        distinct,
        joins,
        where_cond: Some(condition),
        ..SelectParts::default()
    };
    let columns = Other::columns();
    let names: Vec<&str> = columns.iter().map(|column| column.name).collect();
    let sql = builder.sql_select(Other::TABLE_NAME, &names, &parts)?;

    let mut rows: Vec<SqlRow> = Vec::new();
    conn.run_query_with(&sql, &mut |row| rows.push(row.clone())).await?;

    let mut models = Vec::with_capacity(rows.len());
    for row in &rows {
        models.push(Other::from_row(row)?);
    }

    Ok(models)
}
