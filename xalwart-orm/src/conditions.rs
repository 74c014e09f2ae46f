//! # Query Conditions Module
//!
//! Typed column references and the predicate algebra built on top of them.
//!
//! A [`Column<M, T>`] carries the model's table name and the column name; its
//! comparison methods render `"table"."column" OP literal` fragments as
//! [`Condition`] values. Conditions compose with the `&`, `|` and `!`
//! operators into `(x AND y)`, `(x OR y)` and `NOT (x)` forms.
//!
//! The `#[derive(Model)]` macro emits a `{model}_cols` module of `Column`
//! constants so call sites stay typed:
//!
//! ```rust,ignore
//! use crate::person_cols as cols;
//!
//! let cond = cols::AGE.ge(18) & !cols::NAME.eq("root");
//! assert_eq!(cond.to_string(), "(\"persons\".\"age\" >= 18 AND NOT (\"persons\".\"name\" = 'root'))");
//! ```

// ============================================================================
// External Crate Imports
// ============================================================================

use std::fmt;
use std::marker::PhantomData;
use std::ops::{BitAnd, BitOr, Not};

// ============================================================================
// Internal Crate Imports
// ============================================================================

use crate::errors::Error;
use crate::model::{Model, ToSqlLiteral, make_fk};
use crate::util::quote_ident;

// ============================================================================
// Condition
// ============================================================================

/// A rendered SQL boolean fragment, e.g. `"persons"."id" = 1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition(String);

impl Condition {
    /// Wraps an already-rendered SQL fragment.
    pub fn raw(condition: impl Into<String>) -> Self {
        Condition(condition.into())
    }

    /// The rendered fragment.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// `a & b` renders `(a AND b)`.
impl BitAnd for Condition {
    type Output = Condition;

    fn bitand(self, rhs: Condition) -> Condition {
        Condition(format!("({} AND {})", self.0, rhs.0))
    }
}

/// `a | b` renders `(a OR b)`.
impl BitOr for Condition {
    type Output = Condition;

    fn bitor(self, rhs: Condition) -> Condition {
        Condition(format!("({} OR {})", self.0, rhs.0))
    }
}

/// `!a` renders `NOT (a)`.
impl Not for Condition {
    type Output = Condition;

    fn not(self) -> Condition {
        Condition(format!("NOT ({})", self.0))
    }
}

// ============================================================================
// Typed Column Reference
// ============================================================================

/// A typed reference to column `name` of model `M` with field type `T`.
///
/// Constants of this type are generated per model by the derive macro.
pub struct Column<M, T> {
    name: &'static str,
    _marker: PhantomData<fn() -> (M, T)>,
}

impl<M, T> Clone for Column<M, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<M, T> Copy for Column<M, T> {}

impl<M: Model, T: ToSqlLiteral> Column<M, T> {
    /// Creates a column reference. Used by generated code.
    pub const fn new(name: &'static str) -> Self {
        Self { name, _marker: PhantomData }
    }

    /// The bare column name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The `"table"."column"` form used in rendered SQL.
    pub fn qualified(&self) -> String {
        format!("{}.{}", quote_ident(M::TABLE_NAME), quote_ident(self.name))
    }

    fn compare(&self, op: &str, value: T) -> Condition {
        Condition(format!("{} {} {}", self.qualified(), op, value.to_sql_literal()))
    }

    /// Renders `"T"."c" = literal`.
    pub fn eq(&self, value: T) -> Condition {
        self.compare("=", value)
    }

    /// Renders `"T"."c" != literal`.
    pub fn ne(&self, value: T) -> Condition {
        self.compare("!=", value)
    }

    /// Renders `"T"."c" < literal`.
    pub fn lt(&self, value: T) -> Condition {
        self.compare("<", value)
    }

    /// Renders `"T"."c" > literal`.
    pub fn gt(&self, value: T) -> Condition {
        self.compare(">", value)
    }

    /// Renders `"T"."c" <= literal`.
    pub fn le(&self, value: T) -> Condition {
        self.compare("<=", value)
    }

    /// Renders `"T"."c" >= literal`.
    pub fn ge(&self, value: T) -> Condition {
        self.compare(">=", value)
    }

    /// Renders `"T"."c" BETWEEN lower AND upper`.
    pub fn between(&self, lower: T, upper: T) -> Condition {
        Condition(format!(
            "{} BETWEEN {} AND {}",
            self.qualified(),
            lower.to_sql_literal(),
            upper.to_sql_literal()
        ))
    }

    /// Renders `"T"."c" IN (v1, v2, ...)`.
    ///
    /// An empty range is a composition failure.
    pub fn in_list<I>(&self, values: I) -> Result<Condition, Error>
    where
        I: IntoIterator<Item = T>,
    {
        let rendered: Vec<String> =
            values.into_iter().map(|value| value.to_sql_literal()).collect();
        if rendered.is_empty() {
            return Err(Error::query("in: list of values is empty"));
        }

        Ok(Condition(format!("{} IN ({})", self.qualified(), rendered.join(", "))))
    }

    /// Renders `"T"."c" LIKE 'pattern'`.
    pub fn like(&self, pattern: &str) -> Condition {
        Condition(format!("{} LIKE '{}'", self.qualified(), pattern))
    }

    /// Renders `"T"."c" LIKE 'pattern' ESCAPE 'escape'`.
    pub fn like_escape(&self, pattern: &str, escape: &str) -> Condition {
        Condition(format!("{} LIKE '{}' ESCAPE '{}'", self.qualified(), pattern, escape))
    }

    /// Renders `"T"."c" IS NULL`.
    pub fn is_null(&self) -> Condition {
        Condition(format!("{} IS NULL", self.qualified()))
    }

    /// Renders `"T"."c" IS NOT NULL`.
    pub fn is_not_null(&self) -> Condition {
        Condition(format!("{} IS NOT NULL", self.qualified()))
    }

    /// Ascending ordering on this column.
    pub fn asc(&self) -> Ordering {
        Ordering::asc::<M>(self.name)
    }

    /// Descending ordering on this column.
    pub fn desc(&self) -> Ordering {
        Ordering::desc::<M>(self.name)
    }
}

// ============================================================================
// Ordering
// ============================================================================

/// A single `ORDER BY` item, rendered as `"T"."c" ASC|DESC`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ordering {
    table: String,
    column: String,
    ascending: bool,
}

impl Ordering {
    /// Ascending ordering on a column of model `M`.
    pub fn asc<M: Model>(column: &str) -> Self {
        Self { table: M::TABLE_NAME.to_string(), column: column.to_string(), ascending: true }
    }

    /// Descending ordering on a column of model `M`.
    pub fn desc<M: Model>(column: &str) -> Self {
        Self { table: M::TABLE_NAME.to_string(), column: column.to_string(), ascending: false }
    }
}

impl fmt::Display for Ordering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{} {}",
            quote_ident(&self.table),
            quote_ident(&self.column),
            if self.ascending { "ASC" } else { "DESC" }
        )
    }
}

// ============================================================================
// Joins
// ============================================================================

/// The join families the builder can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    /// `INNER JOIN`
    Inner,
    /// `LEFT JOIN`
    Left,
    /// `CROSS JOIN`
    Cross,
}

impl JoinKind {
    fn as_str(self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER",
            JoinKind::Left => "LEFT",
            JoinKind::Cross => "CROSS",
        }
    }
}

/// A rendered join clause: `KIND JOIN "table" ON condition`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Join {
    kind: &'static str,
    table_name: String,
    condition: Condition,
}

impl Join {
    /// Builds a join from already-rendered parts.
    pub fn new(kind: JoinKind, table_name: impl Into<String>, condition: Condition) -> Self {
        Self { kind: kind.as_str(), table_name: table_name.into(), condition }
    }
}

impl fmt::Display for Join {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} JOIN {} ON {}", self.kind, quote_ident(&self.table_name), self.condition)
    }
}

/// Builds a join of `R` onto `L` over `L`'s primary key.
///
/// The condition is `"L.table"."L.pk" = "R.table"."fk"`. When `fk_to_left`
/// is empty it is derived from `L` by stripping a trailing `'s'` from the
/// table name and appending `"_" + pk_name`. An extra condition, when given,
/// is appended as `AND (extra)`.
pub fn join_on<L: Model, R: Model>(
    kind: JoinKind,
    fk_to_left: &str,
    extra: Option<Condition>,
) -> Join {
    let fk = if fk_to_left.is_empty() { make_fk::<L>() } else { fk_to_left.to_string() };
    let mut condition = format!(
        "{}.{} = {}.{}",
        quote_ident(L::TABLE_NAME),
        quote_ident(L::pk_name()),
        quote_ident(R::TABLE_NAME),
        quote_ident(&fk)
    );
    if let Some(extra) = extra {
        condition.push_str(&format!(" AND ({extra})"));
    }

    Join::new(kind, R::TABLE_NAME, Condition::raw(condition))
}

/// `join_on` with `INNER` kind.
pub fn inner_on<L: Model, R: Model>(fk_to_left: &str, extra: Option<Condition>) -> Join {
    join_on::<L, R>(JoinKind::Inner, fk_to_left, extra)
}

/// `join_on` with `LEFT` kind.
pub fn left_on<L: Model, R: Model>(fk_to_left: &str, extra: Option<Condition>) -> Join {
    join_on::<L, R>(JoinKind::Left, fk_to_left, extra)
}

/// `join_on` with `CROSS` kind.
pub fn cross_on<L: Model, R: Model>(fk_to_left: &str, extra: Option<Condition>) -> Join {
    join_on::<L, R>(JoinKind::Cross, fk_to_left, extra)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ColumnMeta;

    #[derive(Debug, Default)]
    struct TestModel {
        id: i32,
        name: String,
    }

    impl Model for TestModel {
        const TABLE_NAME: &'static str = "test_model";

        fn columns() -> Vec<ColumnMeta<Self>> {
            vec![
                ColumnMeta {
                    name: "id",
                    primary_key: true,
                    get: |m| m.id.to_sql_literal(),
                    set: |m, s| {
                        m.id = s.parse().map_err(|_| Error::value("bad id"))?;
                        Ok(())
                    },
                },
                ColumnMeta {
                    name: "name",
                    primary_key: false,
                    get: |m| m.name.to_sql_literal(),
                    set: |m, s| {
                        m.name = s.to_string();
                        Ok(())
                    },
                },
            ]
        }

        fn pk_name() -> &'static str {
            "id"
        }
    }

    const ID: Column<TestModel, i32> = Column::new("id");
    const NAME: Column<TestModel, &str> = Column::new("name");

    #[test]
    fn test_comparison_operators_render_qualified() {
        assert_eq!(ID.eq(1).to_string(), "\"test_model\".\"id\" = 1");
        assert_eq!(ID.ne(1).to_string(), "\"test_model\".\"id\" != 1");
        assert_eq!(ID.lt(2).to_string(), "\"test_model\".\"id\" < 2");
        assert_eq!(ID.gt(2).to_string(), "\"test_model\".\"id\" > 2");
        assert_eq!(ID.le(3).to_string(), "\"test_model\".\"id\" <= 3");
        assert_eq!(ID.ge(3).to_string(), "\"test_model\".\"id\" >= 3");
        assert_eq!(NAME.eq("John").to_string(), "\"test_model\".\"name\" = 'John'");
    }

    #[test]
    fn test_logical_combinators() {
        let a = ID.eq(1);
        let b = NAME.eq("John");
        assert_eq!(
            (a.clone() & b.clone()).to_string(),
            "(\"test_model\".\"id\" = 1 AND \"test_model\".\"name\" = 'John')"
        );
        assert_eq!(
            (a.clone() | b).to_string(),
            "(\"test_model\".\"id\" = 1 OR \"test_model\".\"name\" = 'John')"
        );
        assert_eq!((!a).to_string(), "NOT (\"test_model\".\"id\" = 1)");
    }

    #[test]
    fn test_between_quotes_strings() {
        assert_eq!(
            NAME.between("John", "Steve").to_string(),
            "\"test_model\".\"name\" BETWEEN 'John' AND 'Steve'"
        );
        assert_eq!(ID.between(1, 5).to_string(), "\"test_model\".\"id\" BETWEEN 1 AND 5");
    }

    #[test]
    fn test_in_list() {
        assert_eq!(
            ID.in_list([1, 2, 3]).unwrap().to_string(),
            "\"test_model\".\"id\" IN (1, 2, 3)"
        );
        assert_eq!(
            NAME.in_list(["a", "b"]).unwrap().to_string(),
            "\"test_model\".\"name\" IN ('a', 'b')"
        );
        assert!(matches!(ID.in_list([]), Err(Error::Query(_))));
    }

    #[test]
    fn test_like_and_null_checks() {
        assert_eq!(NAME.like("J%").to_string(), "\"test_model\".\"name\" LIKE 'J%'");
        assert_eq!(
            NAME.like_escape("J@%", "@").to_string(),
            "\"test_model\".\"name\" LIKE 'J@%' ESCAPE '@'"
        );
        assert_eq!(NAME.is_null().to_string(), "\"test_model\".\"name\" IS NULL");
        assert_eq!(NAME.is_not_null().to_string(), "\"test_model\".\"name\" IS NOT NULL");
    }

    #[test]
    fn test_ordering() {
        assert_eq!(ID.asc().to_string(), "\"test_model\".\"id\" ASC");
        assert_eq!(NAME.desc().to_string(), "\"test_model\".\"name\" DESC");
    }

    #[derive(Debug, Default)]
    struct Car {
        id: i32,
    }

    impl Model for Car {
        const TABLE_NAME: &'static str = "cars";

        fn columns() -> Vec<ColumnMeta<Self>> {
            vec![ColumnMeta {
                name: "id",
                primary_key: true,
                get: |m| m.id.to_sql_literal(),
                set: |m, s| {
                    m.id = s.parse().map_err(|_| Error::value("bad id"))?;
                    Ok(())
                },
            }]
        }

        fn pk_name() -> &'static str {
            "id"
        }
    }

    #[test]
    fn test_join_derives_fk_from_left_model() {
        let join = left_on::<Car, TestModel>("", None);
        assert_eq!(
            join.to_string(),
            "LEFT JOIN \"test_model\" ON \"cars\".\"id\" = \"test_model\".\"car_id\""
        );
    }

    #[test]
    fn test_join_with_explicit_fk_and_extra_condition() {
        const CAR_ID: Column<Car, i32> = Column::new("id");
        let join = inner_on::<Car, TestModel>("owner_id", Some(CAR_ID.gt(0)));
        assert_eq!(
            join.to_string(),
            "INNER JOIN \"test_model\" ON \"cars\".\"id\" = \"test_model\".\"owner_id\" \
             AND (\"cars\".\"id\" > 0)"
        );
    }
}