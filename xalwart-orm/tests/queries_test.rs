//! Rendering tests for the four statement builders against a mock driver.

mod common;

use common::MockConnection;
use xalwart_orm::{Delete, Dialect, Error, Insert, Model, Select, Update};

#[derive(Model, Debug, Clone, Default, PartialEq)]
#[orm(table = "test")]
struct TestModel {
    #[orm(primary_key)]
    id: i32,
    name: String,
}

use test_model_cols as cols;

fn mock() -> MockConnection {
    MockConnection::new(Dialect::Sqlite)
}

#[test]
fn test_select_with_where_renders_exactly() {
    let mut conn = mock();
    let sql = Select::<_, TestModel>::new(&mut conn)
        .where_cond(cols::ID.eq(1))
        .unwrap()
        .to_sql()
        .unwrap();
    assert_eq!(
        sql,
        "SELECT \"test\".\"id\" AS \"id\", \"test\".\"name\" AS \"name\" FROM \"test\" \
         WHERE \"test\".\"id\" = 1;"
    );
}

#[test]
fn test_select_distinct_limit_offset() {
    let mut conn = mock();
    let sql = Select::<_, TestModel>::new(&mut conn)
        .distinct()
        .unwrap()
        .limit(1)
        .unwrap()
        .offset(1)
        .unwrap()
        .to_sql()
        .unwrap();
    assert_eq!(
        sql,
        "SELECT DISTINCT \"test\".\"id\" AS \"id\", \"test\".\"name\" AS \"name\" \
         FROM \"test\" LIMIT 1 OFFSET 1;"
    );
}

#[test]
fn test_select_group_by_having() {
    let mut conn = mock();
    let sql = Select::<_, TestModel>::new(&mut conn)
        .group_by(vec!["id".to_string()])
        .unwrap()
        .having(cols::ID.eq(1))
        .unwrap()
        .to_sql()
        .unwrap();
    assert_eq!(
        sql,
        "SELECT \"test\".\"id\" AS \"id\", \"test\".\"name\" AS \"name\" FROM \"test\" \
         GROUP BY \"test\".\"id\" HAVING \"test\".\"id\" = 1;"
    );
}

#[test]
fn test_select_offset_without_limit_is_query_error() {
    let mut conn = mock();
    let result = Select::<_, TestModel>::new(&mut conn)
        .offset(1)
        .unwrap()
        .to_sql();
    assert!(matches!(result, Err(Error::Query(_))));
}

#[test]
fn test_select_options_are_once_only() {
    let mut conn = mock();
    let result = Select::<_, TestModel>::new(&mut conn)
        .distinct()
        .unwrap()
        .distinct();
    assert!(matches!(result, Err(Error::Query(_))));

    let mut conn = mock();
    let result = Select::<_, TestModel>::new(&mut conn)
        .limit(1)
        .unwrap()
        .limit(2);
    assert!(matches!(result, Err(Error::Query(_))));

    // Empty lists are tolerated and ignored.
    let mut conn = mock();
    let select = Select::<_, TestModel>::new(&mut conn)
        .order_by(Vec::new())
        .unwrap()
        .order_by(Vec::new())
        .unwrap();
    assert!(select.to_sql().unwrap().ends_with("FROM \"test\";"));
}

#[test]
fn test_select_order_by_renders_direction() {
    let mut conn = mock();
    let sql = Select::<_, TestModel>::new(&mut conn)
        .order_by(vec![cols::NAME.asc(), cols::ID.desc()])
        .unwrap()
        .to_sql()
        .unwrap();
    assert!(sql.ends_with("ORDER BY \"test\".\"name\" ASC, \"test\".\"id\" DESC;"));
}

#[test]
fn test_insert_omits_primary_key_by_default() {
    let mut conn = mock();
    let model = TestModel { id: 1, name: "John".to_string() };
    let sql = Insert::new(&mut conn).model(&model).to_sql().unwrap();
    assert_eq!(sql, "INSERT INTO \"test\" (name) VALUES ('John');");
}

#[test]
fn test_insert_bulk_accumulates_rows() {
    let mut conn = mock();
    let first = TestModel { id: 1, name: "John".to_string() };
    let second = TestModel { id: 2, name: "Steve".to_string() };
    let sql = Insert::new(&mut conn).model(&first).model(&second).to_sql().unwrap();
    assert_eq!(sql, "INSERT INTO \"test\" (name) VALUES ('John'), ('Steve');");
}

#[tokio::test]
async fn test_insert_one_requires_single_model() {
    let mut conn = mock();
    let first = TestModel { id: 1, name: "John".to_string() };
    let second = TestModel { id: 2, name: "Steve".to_string() };
    let result = Insert::new(&mut conn).model(&first).model(&second).one().await;
    assert!(matches!(result, Err(Error::Query(_))));
}

#[tokio::test]
async fn test_insert_one_returns_last_key() {
    let mut conn = mock();
    conn.last_insert_id = "42".to_string();
    let model = TestModel { id: 0, name: "John".to_string() };
    let key = Insert::new(&mut conn).model(&model).one().await.unwrap();
    assert_eq!(key, "42");
    assert!(key.parse::<i32>().is_ok());
}

#[test]
fn test_update_sets_columns_and_anchors_on_pk() {
    let mut conn = mock();
    let model = TestModel { id: 1, name: "John".to_string() };
    let sql = Update::new(&mut conn).model(&model).unwrap().to_sql().unwrap();
    assert_eq!(sql, "UPDATE \"test\" SET name = 'John' WHERE \"test\".\"id\" = 1;");
}

#[tokio::test]
async fn test_update_commit_one_rejects_batches() {
    let mut conn = mock();
    let first = TestModel { id: 1, name: "John".to_string() };
    let second = TestModel { id: 2, name: "Steve".to_string() };
    let result = Update::new(&mut conn)
        .model(&first)
        .unwrap()
        .model(&second)
        .unwrap()
        .commit_one()
        .await;
    assert!(matches!(result, Err(Error::Query(_))));
}

#[tokio::test]
async fn test_update_commit_batch_wraps_in_transaction() {
    let mut conn = mock();
    let first = TestModel { id: 1, name: "John".to_string() };
    let second = TestModel { id: 2, name: "Steve".to_string() };
    Update::new(&mut conn)
        .model(&first)
        .unwrap()
        .model(&second)
        .unwrap()
        .commit_batch()
        .await
        .unwrap();

    assert_eq!(conn.executed.first().unwrap(), "BEGIN TRANSACTION;");
    assert_eq!(conn.executed.last().unwrap(), "COMMIT TRANSACTION;");
    assert!(conn.executed[1].contains("UPDATE \"test\" SET name = 'John'"));
    assert!(conn.executed[1].contains("UPDATE \"test\" SET name = 'Steve'"));
}

#[test]
fn test_delete_builds_pk_in_list() {
    let mut conn = mock();
    let model = TestModel { id: 1, name: "John".to_string() };
    let sql = Delete::new(&mut conn).model(&model).unwrap().to_sql().unwrap();
    assert_eq!(sql, "DELETE FROM \"test\" WHERE \"test\".\"id\" IN (1);");
}

#[test]
fn test_delete_where_overrides_pk_list() {
    let mut conn = mock();
    let model = TestModel { id: 1, name: "John".to_string() };
    let sql = Delete::new(&mut conn)
        .model(&model)
        .unwrap()
        .where_cond(cols::NAME.eq("Steve".to_string()))
        .to_sql()
        .unwrap();
    assert_eq!(sql, "DELETE FROM \"test\" WHERE \"test\".\"name\" = 'Steve';");
}

#[test]
fn test_delete_without_models_or_condition_fails() {
    let mut conn = mock();
    let result = Delete::<_, TestModel>::new(&mut conn).to_sql();
    assert!(matches!(result, Err(Error::Query(_))));
}

// Default table naming: snake_case of the struct name.
#[derive(Model, Debug, Clone, Default)]
struct PlainRecord {
    #[orm(primary_key)]
    id: i32,
    name: String,
}

#[test]
fn test_default_table_name_and_between() {
    assert_eq!(PlainRecord::TABLE_NAME, "plain_record");
    assert_eq!(
        plain_record_cols::NAME.between("John".to_string(), "Steve".to_string()).to_string(),
        "\"plain_record\".\"name\" BETWEEN 'John' AND 'Steve'"
    );
}
