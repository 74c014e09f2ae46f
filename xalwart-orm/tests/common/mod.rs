//! Shared test fixtures: a mock driver that records every executed
//! statement and feeds canned rows back to queries.

use async_trait::async_trait;

use xalwart_orm::driver::{Dialect, RowHandler, SqlDriver};
use xalwart_orm::{Error, MIGRATIONS_TABLE, SqlRow};

/// A driver double recording executed SQL.
///
/// Knows just enough about the bookkeeping table to let the migration
/// executor run: table-existence probes answer from a flag, and selects on
/// the bookkeeping table feed back the preset applied records.
pub struct MockConnection {
    pub dialect: Dialect,
    pub executed: Vec<String>,
    pub applied: Vec<(i64, String)>,
    pub has_migrations_table: bool,
    pub last_insert_id: String,
    in_transaction: bool,
}

impl MockConnection {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            executed: Vec::new(),
            applied: Vec::new(),
            has_migrations_table: false,
            last_insert_id: "1".to_string(),
            in_transaction: false,
        }
    }

    pub fn with_applied(dialect: Dialect, names: &[&str]) -> Self {
        let mut mock = Self::new(dialect);
        mock.has_migrations_table = true;
        mock.applied = names
            .iter()
            .enumerate()
            .map(|(index, name)| (index as i64 + 1, name.to_string()))
            .collect();
        mock
    }

    fn is_table_probe(sql: &str) -> bool {
        sql.contains("sqlite_master") || sql.contains("information_schema.tables")
    }
}

#[async_trait]
impl SqlDriver for MockConnection {
    fn dbms_name(&self) -> &'static str {
        self.dialect.dbms_name()
    }

    fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    async fn run_query(&mut self, sql: &str) -> Result<(), Error> {
        if sql.contains("CREATE TABLE") && sql.contains(MIGRATIONS_TABLE) {
            self.has_migrations_table = true;
        }

        self.executed.push(sql.to_string());
        Ok(())
    }

    async fn run_query_with(&mut self, sql: &str, handler: RowHandler<'_>) -> Result<(), Error> {
        self.executed.push(sql.to_string());
        if Self::is_table_probe(sql) {
            if self.has_migrations_table {
                handler(&SqlRow::new(vec![(
                    "name".to_string(),
                    Some(MIGRATIONS_TABLE.to_string()),
                )]));
            }

            return Ok(());
        }

        if sql.contains(MIGRATIONS_TABLE) {
            for (id, name) in &self.applied {
                handler(&SqlRow::new(vec![
                    ("id".to_string(), Some(id.to_string())),
                    ("name".to_string(), Some(name.clone())),
                    ("applied".to_string(), Some("2021-01-01 00:00:00".to_string())),
                ]));
            }
        }

        Ok(())
    }

    async fn run_insert(&mut self, sql: &str) -> Result<String, Error> {
        self.executed.push(sql.to_string());
        Ok(self.last_insert_id.clone())
    }

    async fn begin_transaction(&mut self) -> Result<(), Error> {
        if !self.in_transaction {
            self.in_transaction = true;
            self.executed.push("BEGIN TRANSACTION;".to_string());
        }

        Ok(())
    }

    async fn end_transaction(&mut self) -> Result<(), Error> {
        if self.in_transaction {
            self.in_transaction = false;
            self.executed.push("COMMIT TRANSACTION;".to_string());
        }

        Ok(())
    }

    async fn rollback_transaction(&mut self) -> Result<(), Error> {
        if self.in_transaction {
            self.in_transaction = false;
            self.executed.push("ROLLBACK TRANSACTION;".to_string());
        }

        Ok(())
    }
}
