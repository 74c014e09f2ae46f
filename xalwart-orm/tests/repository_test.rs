//! End-to-end repository tests on in-memory SQLite: CRUD through the
//! statement builders, aggregates, relation hooks and transaction scoping.

use std::sync::Arc;

use xalwart_orm::{
    ConnectionPool, Constraints, DatabaseConnection, Migration, MigrationExecutor, Model,
    Repository, count,
};

#[derive(Model, Debug, Clone, Default, PartialEq)]
#[orm(table = "persons")]
struct Person {
    #[orm(primary_key)]
    id: i64,
    name: String,
    age: Option<i32>,
    #[orm(skip)]
    cars: Vec<Car>,
}

#[derive(Model, Debug, Clone, Default, PartialEq)]
#[orm(table = "cars")]
struct Car {
    #[orm(primary_key)]
    id: i64,
    person_id: i64,
    brand: String,
}

use person_cols as cols;

async fn prepared_repository() -> Repository {
    let pool: Arc<ConnectionPool> = ConnectionPool::open(
        1,
        Box::new(|| Box::pin(async { DatabaseConnection::connect("sqlite::memory:").await })),
    )
    .await
    .unwrap();

    let executor = MigrationExecutor::new(vec![
        Migration::new("0001_persons")
            .create_table("persons", |table| {
                table
                    .column::<i64>(
                        "id",
                        Constraints {
                            primary_key: true,
                            autoincrement: true,
                            ..Default::default()
                        },
                    )?
                    .column::<String>(
                        "name",
                        Constraints { max_len: Some(100), null: Some(false), ..Default::default() },
                    )?
                    .column::<i32>("age", Constraints { null: Some(true), ..Default::default() })?;
                Ok(())
            })
            .unwrap(),
        Migration::new("0002_cars")
            .create_table("cars", |table| {
                table
                    .column::<i64>(
                        "id",
                        Constraints {
                            primary_key: true,
                            autoincrement: true,
                            ..Default::default()
                        },
                    )?
                    .column::<i64>("person_id", Constraints { null: Some(false), ..Default::default() })?
                    .column::<String>("brand", Constraints { null: Some(false), ..Default::default() })?;
                Ok(())
            })
            .unwrap(),
    ]);

    {
        let mut conn = pool.acquire().await.unwrap();
        executor.apply(&mut *conn, "").await.unwrap();
    }

    Repository::new(pool)
}

fn person(name: &str, age: Option<i32>) -> Person {
    Person { id: 0, name: name.to_string(), age, cars: Vec::new() }
}

#[tokio::test]
async fn test_insert_one_returns_parseable_key() {
    let repo = prepared_repository().await;

    let key = repo
        .insert::<Person>()
        .await
        .unwrap()
        .model(&person("John", Some(21)))
        .one()
        .await
        .unwrap();
    assert_eq!(key.parse::<i64>().unwrap(), 1);

    let key = repo
        .insert::<Person>()
        .await
        .unwrap()
        .model(&person("Steve", None))
        .one()
        .await
        .unwrap();
    assert_eq!(key.parse::<i64>().unwrap(), 2);
}

#[tokio::test]
async fn test_select_materialises_rows_and_null_cells() {
    let repo = prepared_repository().await;
    repo.insert::<Person>()
        .await
        .unwrap()
        .model(&person("John", Some(21)))
        .model(&person("Steve", None))
        .bulk()
        .await
        .unwrap();

    let people = repo.select::<Person>().await.unwrap().to_vector().await.unwrap();
    assert_eq!(people.len(), 2);
    assert_eq!(people[0].name, "John");
    assert_eq!(people[0].age, Some(21));
    // A NULL cell leaves the default-constructed value untouched.
    assert_eq!(people[1].age, None);
}

#[tokio::test]
async fn test_first_returns_none_when_nothing_matches() {
    let repo = prepared_repository().await;
    repo.insert::<Person>()
        .await
        .unwrap()
        .model(&person("John", Some(21)))
        .bulk()
        .await
        .unwrap();

    let found = repo
        .select::<Person>()
        .await
        .unwrap()
        .where_cond(cols::NAME.eq("Steve".to_string()))
        .unwrap()
        .first()
        .await
        .unwrap();
    assert!(found.is_none());

    let found = repo
        .select::<Person>()
        .await
        .unwrap()
        .where_cond(cols::NAME.eq("John".to_string()))
        .unwrap()
        .first()
        .await
        .unwrap()
        .expect("John was inserted");
    assert_eq!(found.age, Some(21));
}

#[tokio::test]
async fn test_update_and_delete_round_trip() {
    let repo = prepared_repository().await;
    let key = repo
        .insert::<Person>()
        .await
        .unwrap()
        .model(&person("John", Some(21)))
        .one()
        .await
        .unwrap();

    let mut stored = repo
        .select::<Person>()
        .await
        .unwrap()
        .where_cond(cols::ID.eq(key.parse().unwrap()))
        .unwrap()
        .first()
        .await
        .unwrap()
        .expect("inserted row");
    stored.age = Some(22);
    repo.update::<Person>().await.unwrap().model(&stored).unwrap().commit_one().await.unwrap();

    let reloaded = repo
        .select::<Person>()
        .await
        .unwrap()
        .first()
        .await
        .unwrap()
        .expect("updated row");
    assert_eq!(reloaded.age, Some(22));

    repo.delete::<Person>().await.unwrap().model(&reloaded).unwrap().commit().await.unwrap();
    let remaining = repo.select::<Person>().await.unwrap().to_vector().await.unwrap();
    assert!(remaining.is_empty());
}

#[tokio::test]
async fn test_aggregate_count() {
    let repo = prepared_repository().await;
    repo.insert::<Person>()
        .await
        .unwrap()
        .model(&person("John", Some(21)))
        .model(&person("Steve", Some(30)))
        .bulk()
        .await
        .unwrap();

    let total = repo
        .select::<Person>()
        .await
        .unwrap()
        .aggregate(count())
        .await
        .unwrap();
    assert_eq!(total, 2u64);
}

#[tokio::test]
async fn test_one_to_many_hook_fills_relations() {
    let repo = prepared_repository().await;
    let john_id: i64 = repo
        .insert::<Person>()
        .await
        .unwrap()
        .model(&person("John", Some(21)))
        .one()
        .await
        .unwrap()
        .parse()
        .unwrap();

    repo.insert::<Car>()
        .await
        .unwrap()
        .model(&Car { id: 0, person_id: john_id, brand: "Audi".to_string() })
        .model(&Car { id: 0, person_id: john_id, brand: "Volvo".to_string() })
        .bulk()
        .await
        .unwrap();

    let people = repo
        .select::<Person>()
        .await
        .unwrap()
        .one_to_many::<Car, _>(|person, cars| person.cars = cars, "")
        .to_vector()
        .await
        .unwrap();
    assert_eq!(people.len(), 1);
    assert_eq!(people[0].cars.len(), 2);
    assert!(people[0].cars.iter().any(|c| c.brand == "Audi"));

    // The derived foreign key matches an explicit one.
    let explicit = repo
        .select::<Person>()
        .await
        .unwrap()
        .one_to_many::<Car, _>(|person, cars| person.cars = cars, "person_id")
        .to_vector()
        .await
        .unwrap();
    assert_eq!(explicit[0].cars.len(), 2);
}

#[tokio::test]
async fn test_transaction_commit_and_rollback() {
    let repo = prepared_repository().await;

    // Rolled-back work leaves no trace.
    let mut tx = repo.transaction().await.unwrap();
    tx.insert::<Person>().model(&person("John", Some(21))).bulk().await.unwrap();
    tx.rollback().await.unwrap();

    let rows = repo.select::<Person>().await.unwrap().to_vector().await.unwrap();
    assert!(rows.is_empty());

    // Committed work is visible.
    let mut tx = repo.transaction().await.unwrap();
    tx.insert::<Person>().model(&person("John", Some(21))).bulk().await.unwrap();
    tx.insert::<Person>().model(&person("Steve", None)).bulk().await.unwrap();
    tx.commit().await.unwrap();

    let rows = repo.select::<Person>().await.unwrap().to_vector().await.unwrap();
    assert_eq!(rows.len(), 2);
}
