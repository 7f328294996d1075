use std::time::Duration;

use tokio::time::timeout;

use marlin_mysql::{Error, MySqlValue, PoolOptions};

mod support;

use support::MockServer;

#[tokio::test]
async fn acquires_and_reuses_a_connection() -> anyhow::Result<()> {
    let server = MockServer::spawn().await?;

    let pool = PoolOptions::new().max_size(2).connect(server.options()).await?;

    {
        let mut conn = pool.acquire().await?;
        let row = conn.fetch_one("SELECT 1").await?;
        assert_eq!(row.get(0)?, MySqlValue::Int(1));
    }

    assert_eq!(pool.size(), 1);
    assert_eq!(pool.num_idle(), 1);

    // the same record is handed out again after its reset
    let mut conn = pool.acquire().await?;
    conn.ping().await?;

    assert_eq!(pool.size(), 1);
    assert_eq!(pool.num_idle(), 0);

    Ok(())
}

#[tokio::test]
async fn respects_the_size_bound() -> anyhow::Result<()> {
    let server = MockServer::spawn().await?;

    let pool = PoolOptions::new()
        .max_size(2)
        .acquire_timeout(Duration::from_secs(5))
        .connect(server.options())
        .await?;

    let first = pool.acquire().await?;
    let second = pool.acquire().await?;

    assert_eq!(pool.size(), 2);

    // a third acquire parks until a handle returns
    let third = pool.acquire();
    tokio::pin!(third);

    assert!(
        timeout(Duration::from_millis(100), third.as_mut()).await.is_err(),
        "third acquire should wait while the pool is exhausted"
    );

    drop(first);

    let mut third = timeout(Duration::from_secs(5), third).await??;
    third.ping().await?;

    assert_eq!(pool.size(), 2);

    drop(second);
    drop(third);

    assert_eq!(pool.num_idle(), 2);

    Ok(())
}

#[tokio::test]
async fn acquire_times_out_when_exhausted() -> anyhow::Result<()> {
    let server = MockServer::spawn().await?;

    let pool = PoolOptions::new()
        .max_size(1)
        .acquire_timeout(Duration::from_millis(200))
        .connect(server.options())
        .await?;

    let held = pool.acquire().await?;

    let error = pool.acquire().await.unwrap_err();
    assert!(matches!(error, Error::PoolTimedOut));

    drop(held);

    // and succeeds again once the record is back
    pool.acquire().await?;

    Ok(())
}

#[tokio::test]
async fn connects_eagerly_when_asked() -> anyhow::Result<()> {
    let server = MockServer::spawn().await?;

    let pool = PoolOptions::new()
        .initial_size(2)
        .max_size(2)
        .connect(server.options())
        .await?;

    assert_eq!(pool.size(), 2);
    assert_eq!(pool.num_idle(), 2);

    // eager records are clean and available without waiting
    let conn = pool.try_acquire().expect("an idle connection");
    drop(conn);

    Ok(())
}

#[tokio::test]
async fn try_acquire_never_waits() -> anyhow::Result<()> {
    let server = MockServer::spawn().await?;

    let pool = PoolOptions::new().max_size(1).connect(server.options()).await?;

    // nothing is connected yet and try_acquire opens nothing
    assert!(pool.try_acquire().is_none());
    assert_eq!(pool.size(), 0);

    Ok(())
}

#[tokio::test]
async fn returns_dirty_connections_through_a_drain() -> anyhow::Result<()> {
    let server = MockServer::spawn().await?;

    let pool = PoolOptions::new().max_size(1).connect(server.options()).await?;

    {
        let mut conn = pool.acquire().await?;

        // abandon a result stream mid-way
        let mut results = conn.query("SELECT id, name FROM users").await?;
        let _ = results.next_row().await?;
    }

    // the record drains off-task and comes back usable
    let mut conn = timeout(Duration::from_secs(5), pool.acquire()).await??;
    conn.ping().await?;

    Ok(())
}

#[tokio::test]
async fn marked_clean_connections_skip_the_reset() -> anyhow::Result<()> {
    let server = MockServer::spawn().await?;

    let pool = PoolOptions::new().max_size(1).connect(server.options()).await?;

    {
        let mut conn = pool.acquire().await?;
        conn.ping().await?;
        conn.mark_clean();
    }

    assert_eq!(pool.num_idle(), 1);

    // a clean record is available to try_acquire (no reset queue detour)
    let conn = pool.try_acquire().expect("a clean idle connection");
    drop(conn);

    Ok(())
}

#[tokio::test]
async fn detach_releases_capacity() -> anyhow::Result<()> {
    let server = MockServer::spawn().await?;

    let pool = PoolOptions::new().max_size(1).connect(server.options()).await?;

    let conn = pool.acquire().await?.detach();

    assert_eq!(pool.size(), 0);

    // the detached connection works on its own and the pool can refill
    let mut detached = conn;
    detached.ping().await?;

    let mut pooled = pool.acquire().await?;
    pooled.ping().await?;

    Ok(())
}

#[tokio::test]
async fn close_stops_new_acquires() -> anyhow::Result<()> {
    let server = MockServer::spawn().await?;

    let pool = PoolOptions::new().max_size(2).connect(server.options()).await?;

    let conn = pool.acquire().await?;
    drop(conn);

    pool.close().await;

    assert!(pool.is_closed());
    assert!(matches!(pool.acquire().await.unwrap_err(), Error::PoolClosed));

    Ok(())
}

#[tokio::test]
async fn every_waiter_eventually_acquires() -> anyhow::Result<()> {
    let server = MockServer::spawn().await?;

    let pool = PoolOptions::new()
        .max_size(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(server.options())
        .await?;

    let mut tasks = Vec::new();

    for _ in 0..8 {
        let pool = pool.clone();

        tasks.push(tokio::spawn(async move {
            let mut conn = pool.acquire().await?;
            conn.ping().await?;
            Ok::<_, Error>(())
        }));
    }

    for task in tasks {
        task.await??;
    }

    assert!(pool.size() <= 2);

    Ok(())
}
