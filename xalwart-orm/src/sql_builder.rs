//! # SQL Builder Module
//!
//! Renders `INSERT`, `SELECT`, `UPDATE` and `DELETE` strings from validated
//! parts. The builder is dialect-independent and stateless; every rendered
//! statement ends with a single `;`.
//!
//! Structural rules enforced here (violations return [`Error::Query`]):
//!
//! - table name and column list must be non-empty
//! - `OFFSET` requires `LIMIT`
//! - `HAVING` requires `GROUP BY`

// ============================================================================
// Internal Crate Imports
// ============================================================================

use crate::conditions::{Condition, Join, Ordering};
use crate::errors::Error;
use crate::util::quote_ident;

// ============================================================================
// Select Parts
// ============================================================================

/// The validated clause set of a `SELECT` statement.
#[derive(Debug, Clone, Default)]
pub struct SelectParts {
    /// Emit `DISTINCT` after `SELECT`.
    pub distinct: bool,

    /// Join clauses, in caller order.
    pub joins: Vec<Join>,

    /// The `WHERE` condition, if any.
    pub where_cond: Option<Condition>,

    /// `ORDER BY` items, in caller order.
    pub order_by: Vec<Ordering>,

    /// `LIMIT` value.
    pub limit: Option<u64>,

    /// `OFFSET` value. Only emitted when positive, and only legal together
    /// with a limit.
    pub offset: Option<u64>,

    /// `GROUP BY` items. Items containing `'.'` are used verbatim,
    /// others are prefixed with the quoted table name.
    pub group_by: Vec<String>,

    /// The `HAVING` condition, if any.
    pub having: Option<Condition>,
}

// ============================================================================
// SQL Builder
// ============================================================================

/// The stateless statement renderer shared by all statement builders.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlBuilder;

impl SqlBuilder {
    fn require_non_empty(&self, value: &str, arg: &str) -> Result<(), Error> {
        if value.is_empty() {
            return Err(Error::query(format!("SqlBuilder: '{arg}' is required")));
        }

        Ok(())
    }

    /// Renders an `INSERT` statement.
    ///
    /// `columns` is the already-joined column list; `rows` holds one
    /// rendered value tuple per model, at least one required.
    pub fn sql_insert(&self, table: &str, columns: &str, rows: &[String]) -> Result<String, Error> {
        self.require_non_empty(table, "table_name")?;
        self.require_non_empty(columns, "columns")?;
        if rows.is_empty() || rows.iter().any(String::is_empty) {
            return Err(Error::query("SqlBuilder: 'rows' is required"));
        }

        Ok(format!(
            "INSERT INTO {} ({}) VALUES ({});",
            quote_ident(table),
            columns,
            rows.join("), (")
        ))
    }

    /// Renders a `SELECT` statement, preparing the column list as
    /// `"T"."c" AS "c"` for each requested column in caller order.
    pub fn sql_select(
        &self,
        table: &str,
        columns: &[&str],
        parts: &SelectParts,
    ) -> Result<String, Error> {
        if columns.is_empty() {
            return Err(Error::query("SqlBuilder: 'columns' is required"));
        }

        let prefix = quote_ident(table);
        let columns_str = columns
            .iter()
            .map(|column| format!("{}.{} AS {}", prefix, quote_ident(column), quote_ident(column)))
            .collect::<Vec<_>>()
            .join(", ");
        self.sql_select_raw(table, &columns_str, parts)
    }

    /// Renders a `SELECT` statement from an already-prepared column list.
    pub fn sql_select_raw(
        &self,
        table: &str,
        columns: &str,
        parts: &SelectParts,
    ) -> Result<String, Error> {
        self.require_non_empty(table, "table_name")?;
        self.require_non_empty(columns, "columns")?;

        let mut query = format!(
            "SELECT{} {} FROM {}",
            if parts.distinct { " DISTINCT" } else { "" },
            columns,
            quote_ident(table)
        );

        for join in &parts.joins {
            query.push_str(&format!(" {join}"));
        }

        if let Some(where_cond) = &parts.where_cond {
            query.push_str(&format!(" WHERE {where_cond}"));
        }

        if !parts.group_by.is_empty() {
            let prefix = quote_ident(table);
            let grouped = parts
                .group_by
                .iter()
                .map(|item| {
                    if item.contains('.') {
                        item.clone()
                    } else {
                        format!("{}.{}", prefix, quote_ident(item))
                    }
                })
                .collect::<Vec<_>>()
                .join(", ");
            query.push_str(&format!(" GROUP BY {grouped}"));
        }

        if let Some(having) = &parts.having {
            if parts.group_by.is_empty() {
                return Err(Error::query("SqlBuilder: 'having' is used without 'group by'"));
            }

            query.push_str(&format!(" HAVING {having}"));
        }

        if !parts.order_by.is_empty() {
            let ordered = parts
                .order_by
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            query.push_str(&format!(" ORDER BY {ordered}"));
        }

        if let Some(limit) = parts.limit {
            query.push_str(&format!(" LIMIT {limit}"));
        }

        if let Some(offset) = parts.offset
            && offset > 0
        {
            if parts.limit.is_none() {
                return Err(Error::query("SqlBuilder: 'offset' is used without 'limit'"));
            }

            query.push_str(&format!(" OFFSET {offset}"));
        }

        query.push(';');
        Ok(query)
    }

    /// Renders an `UPDATE` statement.
    ///
    /// `columns_data` is the rendered SET list, e.g. `name = 'Steve', age = 21`.
    pub fn sql_update(
        &self,
        table: &str,
        columns_data: &str,
        condition: Option<&Condition>,
    ) -> Result<String, Error> {
        self.require_non_empty(table, "table_name")?;
        self.require_non_empty(columns_data, "columns_data")?;

        let mut query = format!("UPDATE {} SET {}", quote_ident(table), columns_data);
        if let Some(condition) = condition {
            query.push_str(&format!(" WHERE {condition}"));
        }

        query.push(';');
        Ok(query)
    }

    /// Renders a `DELETE` statement.
    pub fn sql_delete(&self, table: &str, condition: Option<&Condition>) -> Result<String, Error> {
        self.require_non_empty(table, "table_name")?;

        let mut query = format!("DELETE FROM {}", quote_ident(table));
        if let Some(condition) = condition {
            query.push_str(&format!(" WHERE {condition}"));
        }

        query.push(';');
        Ok(query)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> SqlBuilder {
        SqlBuilder
    }

    #[test]
    fn test_insert_single_and_bulk_rows() {
        let sql = builder()
            .sql_insert("test", "name, age", &["'John', 21".to_string()])
            .unwrap();
        assert_eq!(sql, "INSERT INTO \"test\" (name, age) VALUES ('John', 21);");

        let sql = builder()
            .sql_insert("test", "name", &["'John'".to_string(), "'Steve'".to_string()])
            .unwrap();
        assert_eq!(sql, "INSERT INTO \"test\" (name) VALUES ('John'), ('Steve');");
    }

    #[test]
    fn test_insert_requires_parts() {
        assert!(builder().sql_insert("", "name", &["'x'".to_string()]).is_err());
        assert!(builder().sql_insert("test", "", &["'x'".to_string()]).is_err());
        assert!(builder().sql_insert("test", "name", &[]).is_err());
    }

    #[test]
    fn test_select_prepares_column_list() {
        let sql = builder()
            .sql_select("test", &["id", "name"], &SelectParts::default())
            .unwrap();
        assert_eq!(
            sql,
            "SELECT \"test\".\"id\" AS \"id\", \"test\".\"name\" AS \"name\" FROM \"test\";"
        );
    }

    #[test]
    fn test_select_distinct_limit_offset() {
        let parts = SelectParts {
            distinct: true,
            limit: Some(1),
            offset: Some(1),
            ..SelectParts::default()
        };
        let sql = builder().sql_select("test", &["id"], &parts).unwrap();
        assert_eq!(sql, "SELECT DISTINCT \"test\".\"id\" AS \"id\" FROM \"test\" LIMIT 1 OFFSET 1;");
    }

    #[test]
    fn test_offset_without_limit_fails() {
        let parts = SelectParts { offset: Some(1), ..SelectParts::default() };
        assert!(matches!(
            builder().sql_select("test", &["id"], &parts),
            Err(Error::Query(_))
        ));
    }

    #[test]
    fn test_zero_offset_is_not_emitted() {
        let parts = SelectParts { limit: Some(5), offset: Some(0), ..SelectParts::default() };
        let sql = builder().sql_select("test", &["id"], &parts).unwrap();
        assert_eq!(sql, "SELECT \"test\".\"id\" AS \"id\" FROM \"test\" LIMIT 5;");
    }

    #[test]
    fn test_group_by_prefixing_and_having() {
        let parts = SelectParts {
            group_by: vec!["id".to_string(), "other.name".to_string()],
            having: Some(Condition::raw("\"test\".\"id\" = 1")),
            ..SelectParts::default()
        };
        let sql = builder().sql_select("test", &["id"], &parts).unwrap();
        assert_eq!(
            sql,
            "SELECT \"test\".\"id\" AS \"id\" FROM \"test\" \
             GROUP BY \"test\".\"id\", other.name HAVING \"test\".\"id\" = 1;"
        );
    }

    #[test]
    fn test_having_without_group_by_fails() {
        let parts = SelectParts {
            having: Some(Condition::raw("\"test\".\"id\" = 1")),
            ..SelectParts::default()
        };
        assert!(matches!(
            builder().sql_select("test", &["id"], &parts),
            Err(Error::Query(_))
        ));
    }

    #[test]
    fn test_update_with_condition() {
        let sql = builder()
            .sql_update("test", "name = 'John'", Some(&Condition::raw("\"test\".\"id\" = 1")))
            .unwrap();
        assert_eq!(sql, "UPDATE \"test\" SET name = 'John' WHERE \"test\".\"id\" = 1;");
    }

    #[test]
    fn test_delete_with_and_without_condition() {
        let sql = builder()
            .sql_delete("test", Some(&Condition::raw("\"test\".\"id\" IN (1)")))
            .unwrap();
        assert_eq!(sql, "DELETE FROM \"test\" WHERE \"test\".\"id\" IN (1);");
        assert_eq!(builder().sql_delete("test", None).unwrap(), "DELETE FROM \"test\";");
    }

    #[test]
    fn test_every_statement_ends_with_single_semicolon() {
        let selects = builder()
            .sql_select("test", &["id"], &SelectParts::default())
            .unwrap();
        for sql in [
            selects,
            builder().sql_delete("test", None).unwrap(),
            builder().sql_update("test", "a = 1", None).unwrap(),
        ] {
            assert!(sql.ends_with(';'));
            assert!(!sql.ends_with(";;"));
        }
    }
}
