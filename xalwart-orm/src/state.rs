//! # Project State Module
//!
//! The in-memory description of the database schema as the ORM understands
//! it: column types, per-column constraints, tables with their foreign
//! keys, and the project-wide table mapping. Migration operations transform
//! this state monotonically; the schema editor renders it to dialect SQL.

// ============================================================================
// External Crate Imports
// ============================================================================

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

// ============================================================================
// Internal Crate Imports
// ============================================================================

use crate::errors::Error;
use crate::model::ToSqlLiteral;

// ============================================================================
// Column Types
// ============================================================================

/// The logical SQL column types the migration layer understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    Bool,
    VarChar,
    Text,
    SmallInt,
    Int,
    BigInt,
    SmallSerial,
    Serial,
    BigSerial,
    Real,
    Double,
    Date,
    Time,
    DateTime,
}

impl SqlType {
    /// Whether the type belongs to the integer family (serials included).
    pub fn is_integer(self) -> bool {
        matches!(
            self,
            SqlType::SmallInt
                | SqlType::Int
                | SqlType::BigInt
                | SqlType::SmallSerial
                | SqlType::Serial
                | SqlType::BigSerial
        )
    }
}

/// Referential actions for foreign-key constraints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OnAction {
    SetNull,
    SetDefault,
    Restrict,
    #[default]
    NoAction,
    Cascade,
}

// ============================================================================
// Default Values
// ============================================================================

/// A typed default value attached to a column constraint.
///
/// The variant must agree with the column's logical type; the mismatch is a
/// [`Error::Type`] at column-state construction.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
}

impl SqlValue {
    /// Whether this value is usable as a default for a column of `sql_type`.
    pub fn matches(&self, sql_type: SqlType) -> bool {
        match self {
            SqlValue::Bool(_) => sql_type == SqlType::Bool,
            SqlValue::Int(_) => sql_type.is_integer(),
            SqlValue::Float(_) => matches!(sql_type, SqlType::Real | SqlType::Double),
            SqlValue::String(_) => matches!(sql_type, SqlType::VarChar | SqlType::Text),
            SqlValue::Date(_) => sql_type == SqlType::Date,
            SqlValue::Time(_) => sql_type == SqlType::Time,
            SqlValue::DateTime(_) => sql_type == SqlType::DateTime,
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            SqlValue::Bool(_) => "bool",
            SqlValue::Int(_) => "integer",
            SqlValue::Float(_) => "float",
            SqlValue::String(_) => "string",
            SqlValue::Date(_) => "date",
            SqlValue::Time(_) => "time",
            SqlValue::DateTime(_) => "datetime",
        }
    }

    /// Renders the value as an SQL literal.
    pub fn to_sql_literal(&self) -> String {
        match self {
            SqlValue::Bool(value) => value.to_sql_literal(),
            SqlValue::Int(value) => value.to_sql_literal(),
            SqlValue::Float(value) => value.to_sql_literal(),
            SqlValue::String(value) => value.to_sql_literal(),
            SqlValue::Date(value) => value.to_sql_literal(),
            SqlValue::Time(value) => value.to_sql_literal(),
            SqlValue::DateTime(value) => value.to_sql_literal(),
        }
    }
}

/// Maps a Rust field type to its logical SQL column type and default-value
/// variant. Used by the typed column constructors on migration operations.
pub trait ColumnType: Sized {
    /// The logical SQL type.
    const SQL_TYPE: SqlType;

    /// Wraps a value of this type for use as a column default.
    fn into_sql_value(self) -> SqlValue;
}

macro_rules! column_type {
    ($rust:ty, $sql:expr, $variant:ident) => {
        impl ColumnType for $rust {
            const SQL_TYPE: SqlType = $sql;

            fn into_sql_value(self) -> SqlValue {
                SqlValue::$variant(self.into())
            }
        }
    };
}

column_type!(bool, SqlType::Bool, Bool);
column_type!(i16, SqlType::SmallInt, Int);
column_type!(i32, SqlType::Int, Int);
column_type!(i64, SqlType::BigInt, Int);
column_type!(f32, SqlType::Real, Float);
column_type!(f64, SqlType::Double, Float);
column_type!(String, SqlType::Text, String);
column_type!(NaiveDate, SqlType::Date, Date);
column_type!(NaiveTime, SqlType::Time, Time);
column_type!(NaiveDateTime, SqlType::DateTime, DateTime);

impl ColumnType for &str {
    const SQL_TYPE: SqlType = SqlType::Text;

    fn into_sql_value(self) -> SqlValue {
        SqlValue::String(self.to_string())
    }
}

// ============================================================================
// Constraints
// ============================================================================

/// Per-column constraints.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Constraints {
    /// Maximum length. Only valid for varchar columns; setting it on a
    /// plain text column promotes the type to varchar.
    pub max_len: Option<u32>,

    /// Explicit nullability. `None` leaves the dialect default.
    pub null: Option<bool>,

    /// `PRIMARY KEY`.
    pub primary_key: bool,

    /// `UNIQUE`.
    pub unique: bool,

    /// Autoincrement. Only allowed on an integer primary key; the concrete
    /// rule is dialect-specific.
    pub autoincrement: bool,

    /// A raw `CHECK (...)` expression.
    pub check: Option<String>,

    /// Typed default value.
    pub default: Option<SqlValue>,
}

// ============================================================================
// Column / Table / Project State
// ============================================================================

/// The state of one column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnState {
    /// Logical column type.
    pub sql_type: SqlType,

    /// Column name.
    pub name: String,

    /// The rendered default literal, empty when the column has no default.
    pub default_value: String,

    /// The column constraints.
    pub constraints: Constraints,
}

impl ColumnState {
    /// Builds a column state, validating the constraints against the type.
    ///
    /// A default value whose type does not match `sql_type` is a
    /// [`Error::Type`]; an empty name is a [`Error::Value`]. A text column
    /// with `max_len` set is promoted to varchar.
    pub fn create(
        name: &str,
        sql_type: SqlType,
        constraints: Constraints,
    ) -> Result<Self, Error> {
        if name.is_empty() {
            return Err(Error::value("column state: 'name' can not be empty"));
        }

        let default_value = match &constraints.default {
            Some(default) => {
                if !default.matches(sql_type) {
                    return Err(Error::type_error(format!(
                        "default value type '{}' of column '{}' is not the same as column type",
                        default.type_name(),
                        name
                    )));
                }

                default.to_sql_literal()
            }
            None => String::new(),
        };

        let sql_type = if sql_type == SqlType::Text && constraints.max_len.is_some() {
            SqlType::VarChar
        } else {
            sql_type
        };

        Ok(Self { sql_type, name: name.to_string(), default_value, constraints })
    }

    /// Builds a column state from a Rust field type.
    pub fn of<T: ColumnType>(name: &str, constraints: Constraints) -> Result<Self, Error> {
        Self::create(name, T::SQL_TYPE, constraints)
    }
}

/// A foreign-key constraint: the referenced table and column plus the
/// referential actions.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ForeignKey {
    /// Referenced table.
    pub to: String,

    /// Referenced column.
    pub key: String,

    /// Action on delete of the referenced row.
    pub on_delete: OnAction,

    /// Action on update of the referenced key.
    pub on_update: OnAction,
}

/// The state of one table: columns and foreign keys by column name.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TableState {
    /// Table name.
    pub name: String,

    /// Columns by name.
    pub columns: BTreeMap<String, ColumnState>,

    /// Foreign keys by constrained column name. Every key here must also
    /// be present in `columns`.
    pub foreign_keys: BTreeMap<String, ForeignKey>,
}

impl TableState {
    /// Looks a column up by name.
    pub fn get_column(&self, column_name: &str) -> Result<&ColumnState, Error> {
        self.columns.get(column_name).ok_or_else(|| {
            Error::value(format!(
                "column with name '{}' does not exist in '{}' table",
                column_name, self.name
            ))
        })
    }
}

/// The project-wide schema snapshot: an ordered mapping of table states.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProjectState {
    /// Tables by name.
    pub tables: BTreeMap<String, TableState>,
}

impl ProjectState {
    /// Looks a table up by name.
    pub fn get_table(&self, name: &str) -> Result<&TableState, Error> {
        self.tables
            .get(name)
            .ok_or_else(|| Error::value(format!("table with name '{name}' does not exist")))
    }

    /// Looks a table up by name, mutably.
    pub fn get_table_mut(&mut self, name: &str) -> Result<&mut TableState, Error> {
        self.tables
            .get_mut(name)
            .ok_or_else(|| Error::value(format!("table with name '{name}' does not exist")))
    }
}

// ============================================================================
// Tests
// ============================================================================
