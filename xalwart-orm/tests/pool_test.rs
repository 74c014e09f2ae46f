//! Connection pool and transaction scope tests against in-memory SQLite.

use std::sync::Arc;
use std::time::Duration;

use xalwart_orm::{ConnectionPool, DatabaseConnection, SqlDriver};

async fn memory_pool(capacity: usize) -> Arc<ConnectionPool> {
    ConnectionPool::open(
        capacity,
        Box::new(|| Box::pin(async { DatabaseConnection::connect("sqlite::memory:").await })),
    )
    .await
    .unwrap()
}

#[tokio::test]
async fn test_pool_rejects_zero_capacity() {
    let result = ConnectionPool::open(
        0,
        Box::new(|| Box::pin(async { DatabaseConnection::connect("sqlite::memory:").await })),
    )
    .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_pool_fills_up_front() {
    let pool = memory_pool(3).await;
    assert_eq!(pool.capacity(), 3);
    assert_eq!(pool.available(), 3);
}

#[tokio::test]
async fn test_acquire_release_balance() {
    let pool = memory_pool(3).await;

    let mut tasks = Vec::new();
    for _ in 0..12 {
        let pool = Arc::clone(&pool);
        tasks.push(tokio::spawn(async move {
            let mut conn = pool.acquire().await.unwrap();
            conn.run_query("SELECT 1;").await.unwrap();
            tokio::time::sleep(Duration::from_millis(2)).await;
        }));
    }

    for task in tasks {
        task.await.unwrap();
    }

    assert_eq!(pool.available(), pool.capacity());
}

#[tokio::test]
async fn test_acquire_waits_while_exhausted() {
    let pool = memory_pool(1).await;
    let held = pool.acquire().await.unwrap();

    let waiting = tokio::time::timeout(Duration::from_millis(50), pool.acquire()).await;
    assert!(waiting.is_err(), "acquire should block while the pool is empty");

    drop(held);
    let conn = tokio::time::timeout(Duration::from_millis(500), pool.acquire())
        .await
        .expect("release should wake the waiter")
        .unwrap();
    drop(conn);
    assert_eq!(pool.available(), 1);
}

#[tokio::test]
async fn test_connection_reports_dbms_name() {
    let pool = memory_pool(1).await;
    let conn = pool.acquire().await.unwrap();
    assert_eq!(conn.dbms_name(), "sqlite");
}

#[tokio::test]
async fn test_dropped_transaction_rolls_back_on_reacquire() {
    let pool = memory_pool(1).await;

    {
        let mut conn = pool.acquire().await.unwrap();
        conn.run_query("CREATE TABLE items (id INTEGER PRIMARY KEY, label TEXT);")
            .await
            .unwrap();
        conn.begin_transaction().await.unwrap();
        conn.run_query("INSERT INTO items (label) VALUES ('pending');").await.unwrap();
        // Dropped with the transaction still open.
    }

    let mut conn = pool.acquire().await.unwrap();
    assert!(!conn.in_transaction());

    let mut count = 0;
    conn.run_query_with("SELECT count(*) FROM items;", &mut |row| {
        count = row.get_at(0).flatten().unwrap().parse::<i64>().unwrap();
    })
    .await
    .unwrap();
    assert_eq!(count, 0, "uncommitted work must be rolled back");
}
