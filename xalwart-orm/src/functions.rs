//! # SQL Functions Module
//!
//! Aggregate function builders. Each aggregate renders as `name(arg)` where
//! the argument is either `*` or a qualified `"table"."column"` reference,
//! and carries its SQL return type as a phantom parameter: `avg` returns
//! `f64`, `count` returns `u64` and the rest return the column's own field
//! type.

// ============================================================================
// External Crate Imports
// ============================================================================

use std::fmt;
use std::marker::PhantomData;

// ============================================================================
// Internal Crate Imports
// ============================================================================

use crate::conditions::Column;
use crate::model::{Model, ToSqlLiteral};

// ============================================================================
// Aggregate Functions
// ============================================================================

/// A rendered aggregate call with return type `R`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateFn<R> {
    name: &'static str,
    args: String,
    _ret: PhantomData<fn() -> R>,
}

impl<R> AggregateFn<R> {
    fn new(name: &'static str, args: String) -> Self {
        Self { name, args, _ret: PhantomData }
    }

    fn over_column<M: Model, T: ToSqlLiteral>(name: &'static str, column: Column<M, T>) -> Self {
        Self::new(name, column.qualified())
    }
}

impl<R> fmt::Display for AggregateFn<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.args)
    }
}

/// Builds `count(*)`.
pub fn count() -> AggregateFn<u64> {
    AggregateFn::new("count", "*".to_string())
}

/// Builds `avg("T"."c")`.
pub fn avg<M: Model, T: ToSqlLiteral>(column: Column<M, T>) -> AggregateFn<f64> {
    AggregateFn::over_column("avg", column)
}

/// Builds `min("T"."c")`.
pub fn min<M: Model, T: ToSqlLiteral>(column: Column<M, T>) -> AggregateFn<T> {
    AggregateFn::over_column("min", column)
}

/// Builds `max("T"."c")`.
pub fn max<M: Model, T: ToSqlLiteral>(column: Column<M, T>) -> AggregateFn<T> {
    AggregateFn::over_column("max", column)
}

/// Builds `sum("T"."c")`.
pub fn sum<M: Model, T: ToSqlLiteral>(column: Column<M, T>) -> AggregateFn<T> {
    AggregateFn::over_column("sum", column)
}

// ============================================================================
// Tests
// ============================================================================
