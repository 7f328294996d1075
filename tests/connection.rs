use marlin_mysql::{Error, MySqlConnection, MySqlValue};

mod support;

use support::{native_scramble, MockServer, PASSWORD, SCRAMBLE_1, SCRAMBLE_2};

#[tokio::test]
async fn connects_and_pings() -> anyhow::Result<()> {
    let server = MockServer::spawn().await?;

    let mut conn = MySqlConnection::connect(&server.options()).await?;

    assert_eq!(conn.server_version(), (8, 0, 36));

    conn.ping().await?;
    conn.reset().await?;
    conn.close().await?;

    Ok(())
}

#[tokio::test]
async fn selects_a_constant() -> anyhow::Result<()> {
    let server = MockServer::spawn().await?;
    let mut conn = MySqlConnection::connect(&server.options()).await?;

    let row = conn.fetch_one("SELECT 1").await?;
    let value: i64 = row.try_get(0)?;

    assert_eq!(value, 1);

    Ok(())
}

#[tokio::test]
async fn fetches_rows_with_nulls() -> anyhow::Result<()> {
    let server = MockServer::spawn().await?;
    let mut conn = MySqlConnection::connect(&server.options()).await?;

    let rows = conn.fetch_all("SELECT id, name FROM users").await?;

    assert_eq!(rows.len(), 2);

    assert_eq!(rows[0].columns().len(), 2);
    assert_eq!(rows[0].columns()[1].name(), "name");

    assert_eq!(rows[0].get(0)?, MySqlValue::Int(1));
    assert_eq!(rows[0].get_by_name("name")?, MySqlValue::Text("alice"));

    assert_eq!(rows[1].get(0)?, MySqlValue::Int(2));
    assert!(rows[1].get(1)?.is_null());

    Ok(())
}

#[tokio::test]
async fn executes_an_update() -> anyhow::Result<()> {
    let server = MockServer::spawn().await?;
    let mut conn = MySqlConnection::connect(&server.options()).await?;

    let result = conn.execute("UPDATE users SET name = 'bob'").await?;

    assert_eq!(result.rows_affected(), 4);
    assert_eq!(result.info(), "Rows matched: 5  Changed: 4  Warnings: 0");

    Ok(())
}

#[tokio::test]
async fn surfaces_server_errors() -> anyhow::Result<()> {
    let server = MockServer::spawn().await?;
    let mut conn = MySqlConnection::connect(&server.options()).await?;

    let error = conn.execute("SELECT missing FROM nowhere").await.unwrap_err();

    let database = error.as_database_error().expect("a database error");
    assert_eq!(database.code(), 1049);
    assert_eq!(database.sql_state(), Some("42000"));
    assert_eq!(database.message(), "Unknown database 'a'");

    // the connection survives a server error
    conn.ping().await?;

    Ok(())
}

#[tokio::test]
async fn traverses_multiple_result_sets() -> anyhow::Result<()> {
    let server = MockServer::spawn().await?;
    let mut conn = MySqlConnection::connect(&server.options()).await?;

    let mut results = conn.query("CALL multi()").await?;

    let mut first = Vec::new();
    while let Some(row) = results.next_row().await? {
        first.push(i64::try_from(row.get(0)?)?);
    }
    assert_eq!(first, [1]);
    assert!(results.has_more_results());

    assert!(results.next_result_set().await?);

    let mut second = Vec::new();
    while let Some(row) = results.next_row().await? {
        second.push(i64::try_from(row.get(0)?)?);
    }
    assert_eq!(second, [2, 3]);
    assert!(!results.has_more_results());
    assert!(!results.next_result_set().await?);

    Ok(())
}

#[tokio::test]
async fn reassembles_rows_spanning_frames() -> anyhow::Result<()> {
    let server = MockServer::spawn().await?;
    let mut conn = MySqlConnection::connect(&server.options()).await?;

    let row = conn.fetch_one("SELECT big").await?;
    let value: &[u8] = row.try_get(0)?;

    assert_eq!(value.len(), 0xff_ff_ff + 100);
    assert!(value.iter().all(|&b| b == b'x'));

    Ok(())
}

#[tokio::test]
async fn prepares_and_executes_statements() -> anyhow::Result<()> {
    let server = MockServer::spawn().await?;
    let mut conn = MySqlConnection::connect(&server.options()).await?;

    let statement = conn.prepare("SELECT id, name FROM users WHERE id = ?").await?;

    assert_eq!(statement.id(), 7);
    assert_eq!(statement.parameters().len(), 1);
    assert_eq!(statement.columns().len(), 2);

    let rows = conn
        .fetch_all_statement(&statement, &[MySqlValue::Int(1)])
        .await?;

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].get(0)?, MySqlValue::Int(1));
    assert_eq!(rows[0].get(1)?, MySqlValue::Text("alice"));
    assert!(rows[1].get(1)?.is_null());

    conn.close_statement(&statement).await?;
    conn.ping().await?;

    Ok(())
}

#[tokio::test]
async fn rejects_wrong_parameter_counts() -> anyhow::Result<()> {
    let server = MockServer::spawn().await?;
    let mut conn = MySqlConnection::connect(&server.options()).await?;

    let statement = conn.prepare("SELECT id, name FROM users WHERE id = ?").await?;

    let error = conn.execute_statement(&statement, &[]).await.unwrap_err();

    assert!(matches!(
        error,
        Error::WrongNumParams { expected: 1, given: 0 }
    ));

    Ok(())
}

#[tokio::test]
async fn drains_an_abandoned_result_stream() -> anyhow::Result<()> {
    let server = MockServer::spawn().await?;
    let mut conn = MySqlConnection::connect(&server.options()).await?;

    let mut results = conn.query("SELECT id, name FROM users").await?;
    let first = results.next_row().await?.expect("one row");
    assert_eq!(first.get(0)?, MySqlValue::Int(1));
    drop(results);

    // the pending rows are consumed before the next command goes out
    conn.ping().await?;

    Ok(())
}

#[tokio::test]
async fn answers_an_auth_switch() -> anyhow::Result<()> {
    let server = MockServer::spawn_with(|mut conn| {
        Box::pin(async move {
            conn.handshake("caching_sha2_password").await?;

            // demand a re-hash with the native plugin and a fresh challenge
            let mut switch = vec![0xfe];
            switch.extend_from_slice(b"mysql_native_password\0");
            switch.extend_from_slice(b"01234567890123456789\0");
            conn.send_packet(&switch).await?;

            let response = conn.recv_packet().await?;
            assert_eq!(response, native_scramble(PASSWORD, &[b"01234567890123456789"]));

            conn.send_ok(0, 0, 2, 0, "").await?;
            conn.serve_commands().await
        })
    })
    .await?;

    let mut conn = MySqlConnection::connect(&server.options()).await?;
    conn.ping().await?;

    Ok(())
}

#[tokio::test]
async fn accepts_fast_auth_success() -> anyhow::Result<()> {
    let server = MockServer::spawn_with(|mut conn| {
        Box::pin(async move {
            let response = conn.handshake("caching_sha2_password").await?;
            assert_eq!(response.len(), 32);

            // fast-auth success marker, then the OK
            conn.send_packet(&[0x01, 0x03]).await?;
            conn.send_ok(0, 0, 2, 0, "").await?;
            conn.serve_commands().await
        })
    })
    .await?;

    let mut conn = MySqlConnection::connect(&server.options()).await?;
    conn.ping().await?;

    Ok(())
}

#[tokio::test]
async fn refuses_cleartext_over_insecure_channels() -> anyhow::Result<()> {
    let server = MockServer::spawn_with(|mut conn| {
        Box::pin(async move {
            conn.handshake("caching_sha2_password").await?;

            // demand full authentication (cleartext password)
            conn.send_packet(&[0x01, 0x04]).await?;

            // the client hangs up instead of answering
            let _ = conn.recv_packet().await;
            Ok(())
        })
    })
    .await?;

    let error = MySqlConnection::connect(&server.options()).await.unwrap_err();

    assert!(matches!(error, Error::AuthPluginRequiresSecureConnection));

    Ok(())
}

#[tokio::test]
async fn scramble_uses_both_challenge_parts() {
    // pin the nonce layout: 8 bytes in the greeting, 12 more after the
    // reserved block
    let expected = native_scramble(PASSWORD, &[SCRAMBLE_1, SCRAMBLE_2]);
    assert_eq!(expected.len(), 20);
}
