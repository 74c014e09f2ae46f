//! # Model Module
//!
//! This module defines the core [`Model`] trait and the column descriptor
//! table that backs it. A model is a user-declared struct carrying a table
//! name, exactly one primary-key column and, for every column, a pair of
//! accessors: one rendering the field as an SQL literal and one assigning a
//! field from a result-row cell.
//!
//! The descriptor table is built once per record type by the
//! `#[derive(Model)]` macro, giving the engine a uniform `[ColumnMeta]` view
//! without runtime reflection.
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use xalwart_orm::Model;
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
//! assert_eq!(Person::TABLE_NAME, "persons");
//! assert_eq!(Person::pk_name(), "id");
//! ```

// ============================================================================
// External Crate Imports
// ============================================================================

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};

// ============================================================================
// Internal Crate Imports
// ============================================================================

use crate::driver::SqlRow;
use crate::errors::Error;
use crate::util::quote_literal;

// ============================================================================
// Column Descriptor
// ============================================================================

/// Descriptor of a single model column.
///
/// The `get` accessor renders the field value of a model instance as an SQL
/// literal (strings single-quoted, numbers decimal, `NULL` for absent
/// optionals). The `set` accessor parses a result-row cell back into the
/// field. Both are plain function pointers generated by the derive macro.
pub struct ColumnMeta<M> {
    /// The column name in the database.
    pub name: &'static str,

    /// Whether this column is the primary key. Exactly one column per model
    /// has this set.
    pub primary_key: bool,

    /// Renders the field as an SQL literal.
    pub get: fn(&M) -> String,

    /// Assigns the field from a result cell. The cell text is the driver's
    /// textual rendering of the value.
    pub set: fn(&mut M, &str) -> Result<(), Error>,
}

// ============================================================================
// Model Trait
// ============================================================================

/// The core trait implemented by every record type.
///
/// Usually implemented via `#[derive(Model)]`; manual implementations only
/// need a table name, the descriptor table and the primary-key name.
pub trait Model: Default + Sized + Send {
    /// The table name used in every rendered statement.
    const TABLE_NAME: &'static str;

    /// Whether the primary key is omitted from `INSERT` column lists and
    /// from `UPDATE` SET lists. Defaults to `true`; override per record
    /// type with `#[orm(include_pk)]`.
    const OMIT_PK: bool = true;

    /// Returns the descriptor table, one entry per column, in declaration
    /// order.
    fn columns() -> Vec<ColumnMeta<Self>>;

    /// Returns the name of the primary-key column.
    fn pk_name() -> &'static str;

    /// Renders the primary-key field of this instance as an SQL literal.
    fn pk_literal(&self) -> Result<String, Error> {
        Self::columns()
            .into_iter()
            .find(|column| column.primary_key)
            .map(|column| (column.get)(self))
            .ok_or_else(|| {
                Error::query(format!("model '{}' has no primary key column", Self::TABLE_NAME))
            })
    }

    /// Builds an instance from a result row.
    ///
    /// A `NULL` cell skips the field assignment entirely, leaving the
    /// default-constructed value in place. Missing columns are skipped the
    /// same way.
    fn from_row(row: &SqlRow) -> Result<Self, Error> {
        let mut model = Self::default();
        for column in Self::columns() {
            if let Some(Some(text)) = row.get(column.name) {
                (column.set)(&mut model, text)?;
            }
        }

        Ok(model)
    }
}

/// Derives the conventional foreign-key column name pointing at `M`.
///
/// A trailing `'s'` is stripped from the table name and `"_" + pk_name` is
/// appended: table `persons` with pk `id` gives `person_id`.
pub fn make_fk<M: Model>() -> String {
    let table = M::TABLE_NAME.strip_suffix('s').unwrap_or(M::TABLE_NAME);
    format!("{}_{}", table, M::pk_name())
}

// ============================================================================
// SQL Literal Rendering
// ============================================================================

/// Renders a Rust value as a non-parameterised SQL literal.
///
/// Integers and floats render via their decimal form, strings are wrapped in
/// single quotes (no escaping is performed), `None` renders as `NULL` and
/// temporal values render single-quoted in ISO-8601-like form.
pub trait ToSqlLiteral {
    /// Returns the SQL literal rendering of the value.
    fn to_sql_literal(&self) -> String;
}

macro_rules! literal_via_display {
    ($($t:ty),* $(,)?) => {
        $(
            impl ToSqlLiteral for $t {
                fn to_sql_literal(&self) -> String {
                    self.to_string()
                }
            }
        )*
    };
}

literal_via_display!(i8, i16, i32, i64, u8, u16, u32, u64, usize, f32, f64);

impl ToSqlLiteral for bool {
    fn to_sql_literal(&self) -> String {
        if *self { "TRUE".to_string() } else { "FALSE".to_string() }
    }
}

impl ToSqlLiteral for String {
    fn to_sql_literal(&self) -> String {
        quote_literal(self)
    }
}

impl ToSqlLiteral for &str {
    fn to_sql_literal(&self) -> String {
        quote_literal(self)
    }
}

impl ToSqlLiteral for NaiveDate {
    fn to_sql_literal(&self) -> String {
        quote_literal(&self.format("%Y-%m-%d").to_string())
    }
}

impl ToSqlLiteral for NaiveTime {
    fn to_sql_literal(&self) -> String {
        quote_literal(&self.format("%H:%M:%S").to_string())
    }
}

impl ToSqlLiteral for NaiveDateTime {
    fn to_sql_literal(&self) -> String {
        quote_literal(&self.format("%Y-%m-%d %H:%M:%S").to_string())
    }
}

impl ToSqlLiteral for DateTime<Utc> {
    fn to_sql_literal(&self) -> String {
        self.naive_utc().to_sql_literal()
    }
}

impl<T: ToSqlLiteral> ToSqlLiteral for Option<T> {
    fn to_sql_literal(&self) -> String {
        match self {
            Some(value) => value.to_sql_literal(),
            None => "NULL".to_string(),
        }
    }
}

// ============================================================================
// Result Cell Parsing
// ============================================================================

/// Parses a field value from the driver's textual rendering of a result
/// cell.
pub trait FromSqlText: Sized {
    /// Parses the cell text into the field type.
    fn from_sql_text(text: &str) -> Result<Self, Error>;
}

macro_rules! from_text_via_parse {
    ($($t:ty),* $(,)?) => {
        $(
            impl FromSqlText for $t {
                fn from_sql_text(text: &str) -> Result<Self, Error> {
                    text.parse::<$t>().map_err(|e| {
                        Error::value(format!(
                            "can not parse '{}' as {}: {}", text, stringify!($t), e
                        ))
                    })
                }
            }
        )*
    };
}

from_text_via_parse!(i8, i16, i32, i64, u8, u16, u32, u64, usize, f32, f64);

impl FromSqlText for bool {
    fn from_sql_text(text: &str) -> Result<Self, Error> {
        match text {
            "1" | "t" | "true" | "TRUE" => Ok(true),
            "0" | "f" | "false" | "FALSE" => Ok(false),
            other => Err(Error::value(format!("can not parse '{other}' as bool"))),
        }
    }
}

impl FromSqlText for String {
    fn from_sql_text(text: &str) -> Result<Self, Error> {
        Ok(text.to_string())
    }
}

impl FromSqlText for NaiveDate {
    fn from_sql_text(text: &str) -> Result<Self, Error> {
        NaiveDate::parse_from_str(text, "%Y-%m-%d")
            .map_err(|e| Error::value(format!("can not parse '{text}' as date: {e}")))
    }
}

impl FromSqlText for NaiveTime {
    fn from_sql_text(text: &str) -> Result<Self, Error> {
        NaiveTime::parse_from_str(text, "%H:%M:%S%.f")
            .map_err(|e| Error::value(format!("can not parse '{text}' as time: {e}")))
    }
}

impl FromSqlText for NaiveDateTime {
    fn from_sql_text(text: &str) -> Result<Self, Error> {
        NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f")
            .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f"))
            .map_err(|e| Error::value(format!("can not parse '{text}' as datetime: {e}")))
    }
}

impl FromSqlText for DateTime<Utc> {
    fn from_sql_text(text: &str) -> Result<Self, Error> {
        DateTime::parse_from_rfc3339(text)
            .map(|dt| dt.with_timezone(&Utc))
            .or_else(|_| NaiveDateTime::from_sql_text(text).map(|naive| naive.and_utc()))
    }
}

impl<T: FromSqlText> FromSqlText for Option<T> {
    fn from_sql_text(text: &str) -> Result<Self, Error> {
        T::from_sql_text(text).map(Some)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_literal_is_single_quoted() {
        assert_eq!("John".to_sql_literal(), "'John'");
        assert_eq!(String::from("John").to_sql_literal(), "'John'");
    }

    #[test]
    fn test_numeric_literals_render_decimal() {
        assert_eq!(42i32.to_sql_literal(), "42");
        assert_eq!(2.5f64.to_sql_literal(), "2.5");
    }

    #[test]
    fn test_none_renders_null() {
        let age: Option<i32> = None;
        assert_eq!(age.to_sql_literal(), "NULL");
        assert_eq!(Some(7).to_sql_literal(), "7");
    }

    #[test]
    fn test_bool_round_trip() {
        assert_eq!(true.to_sql_literal(), "TRUE");
        assert!(bool::from_sql_text("1").unwrap());
        assert!(!bool::from_sql_text("FALSE").unwrap());
        assert!(bool::from_sql_text("yes").is_err());
    }

    #[test]
    fn test_datetime_parsing_accepts_both_separators() {
        assert!(NaiveDateTime::from_sql_text("2021-06-01 10:30:00").is_ok());
        assert!(NaiveDateTime::from_sql_text("2021-06-01T10:30:00").is_ok());
    }
}
