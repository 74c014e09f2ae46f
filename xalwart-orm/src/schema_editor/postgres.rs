//! # PostgreSQL Schema Editor
//!
//! Overrides on top of the generic editor: autoincrement integer columns
//! render through the serial family, and the autoincrement rule requires a
//! serial type.

// ============================================================================
// External Crate Imports
// ============================================================================

use async_trait::async_trait;

// ============================================================================
// Internal Crate Imports
// ============================================================================

use crate::errors::Error;
use crate::schema_editor::{SchemaEditor, render_sql_column};
use crate::state::{ColumnState, SqlType};

// ============================================================================
// Editor
// ============================================================================

/// The PostgreSQL dialect editor.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresSchemaEditor;

#[async_trait]
impl SchemaEditor for PostgresSchemaEditor {
    fn sql_column(&self, column: &ColumnState) -> Result<String, Error> {
        let mut column = column.clone();
        if column.constraints.autoincrement {
            column.sql_type = match column.sql_type {
                SqlType::SmallInt => SqlType::SmallSerial,
                SqlType::Int => SqlType::Serial,
                SqlType::BigInt => SqlType::BigSerial,
                other => other,
            };
        }

        render_sql_column(self, &column)
    }

    fn sql_column_autoincrement_check(
        &self,
        sql_type: SqlType,
        autoincrement: bool,
        _primary_key: bool,
    ) -> Result<(), Error> {
        if autoincrement
            && !matches!(
                sql_type,
                SqlType::SmallSerial | SqlType::Serial | SqlType::BigSerial
            )
        {
            return Err(Error::value(
                "'autoincrement' is only allowed on a column with serial type",
            ));
        }

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Constraints;

    fn editor() -> PostgresSchemaEditor {
        PostgresSchemaEditor
    }

    #[test]
    fn test_autoincrement_promotes_integers_to_serial() {
        let constraints =
            Constraints { primary_key: true, autoincrement: true, ..Default::default() };
        let column = ColumnState::create("id", SqlType::Int, constraints).unwrap();
        assert_eq!(editor().sql_column(&column).unwrap(), "id SERIAL PRIMARY KEY");

        let constraints =
            Constraints { primary_key: true, autoincrement: true, ..Default::default() };
        let column = ColumnState::create("id", SqlType::BigInt, constraints).unwrap();
        assert_eq!(editor().sql_column(&column).unwrap(), "id BIGSERIAL PRIMARY KEY");
    }

    #[test]
    fn test_autoincrement_on_text_is_rejected() {
        let constraints =
            Constraints { primary_key: true, autoincrement: true, ..Default::default() };
        let column = ColumnState::create("id", SqlType::Text, constraints).unwrap();
        assert!(editor().sql_column(&column).is_err());
    }

    #[test]
    fn test_drop_table_emits_cascade() {
        assert_eq!(editor().sql_drop_table("t"), "DROP TABLE \"t\" CASCADE");
    }
}
