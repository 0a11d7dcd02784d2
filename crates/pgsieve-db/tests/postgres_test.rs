use pgsieve_core::ColumnDescriptor;
use pgsieve_db::{PgBackend, ScanBackend};
use sqlx::postgres::PgConnectOptions;
use sqlx::{Connection, PgConnection};
use std::str::FromStr;
use std::time::Duration;

fn test_options() -> PgConnectOptions {
    let url = std::env::var("PGSIEVE_TEST_DATABASE_URL")
        .expect("PGSIEVE_TEST_DATABASE_URL must be set for live database tests");
    PgConnectOptions::from_str(&url).expect("valid database URL")
}

/// Create a small fixture schema covering serial, identity and plain columns.
async fn create_fixture(options: &PgConnectOptions, schema: &str) {
    let mut conn = PgConnection::connect_with(options)
        .await
        .expect("connect to test database");

    let script = format!(
        r"
        DROP SCHEMA IF EXISTS {schema} CASCADE;
        CREATE SCHEMA {schema};
        CREATE TABLE {schema}.users (
            id serial PRIMARY KEY,
            ssn text,
            note text
        );
        CREATE TABLE {schema}.payments (
            id bigint GENERATED ALWAYS AS IDENTITY,
            amount numeric(10,2),
            paid_at timestamp without time zone
        );
        INSERT INTO {schema}.users (ssn, note) VALUES
            ('123-45-6789', 'nothing here'),
            ('987-65-4321', 'top secret plan'),
            (NULL, NULL);
        "
    );

    sqlx::raw_sql(&script)
        .execute(&mut conn)
        .await
        .expect("create fixture schema");
    conn.close().await.expect("close fixture connection");
}

fn fixture_columns(columns: &[ColumnDescriptor], schema: &str) -> Vec<String> {
    columns
        .iter()
        .filter(|c| c.schema == schema)
        .map(|c| format!("{}.{}", c.table, c.column))
        .collect()
}

#[tokio::test]
#[ignore = "Requires a PostgreSQL instance (set PGSIEVE_TEST_DATABASE_URL)"]
async fn test_eligible_columns_skip_keys_and_sequences() {
    let options = test_options();
    let schema = "pgsieve_eligible_test";
    create_fixture(&options, schema).await;

    let backend = PgBackend::new(options, Duration::from_secs(10));
    let columns = backend
        .eligible_columns()
        .await
        .expect("enumerate columns");

    assert_eq!(
        fixture_columns(&columns, schema),
        vec![
            "payments.amount",
            "payments.paid_at",
            "users.ssn",
            "users.note",
        ]
    );

    let amount = columns
        .iter()
        .find(|c| c.schema == schema && c.column == "amount")
        .expect("amount column present");
    assert_eq!(amount.declared_type, "numeric(10,2)");
}

#[tokio::test]
#[ignore = "Requires a PostgreSQL instance (set PGSIEVE_TEST_DATABASE_URL)"]
async fn test_sequence_borders_report_max_value() {
    let options = test_options();
    let schema = "pgsieve_borders_test";
    create_fixture(&options, schema).await;

    let backend = PgBackend::new(options, Duration::from_secs(10));
    let borders = backend
        .sequence_borders()
        .await
        .expect("enumerate sequence borders");

    let users = borders
        .iter()
        .find(|b| b.column.schema == schema && b.column.table == "users")
        .expect("users.id border present");
    assert_eq!(users.column.column, "id");
    assert_eq!(users.max_value, Some(3));

    let payments = borders
        .iter()
        .find(|b| b.column.schema == schema && b.column.table == "payments")
        .expect("payments.id border present");
    assert_eq!(payments.max_value, None);
}

#[tokio::test]
#[ignore = "Requires a PostgreSQL instance (set PGSIEVE_TEST_DATABASE_URL)"]
async fn test_sampler_returns_distinct_text_values() {
    let options = test_options();
    let schema = "pgsieve_sampler_test";
    create_fixture(&options, schema).await;

    let backend = PgBackend::new(options, Duration::from_secs(10));
    let sampler = backend.open_sampler(2).await.expect("open sampler");

    let note = ColumnDescriptor::new(schema, "users", "note", "text");
    let mut values = sampler.sample(&note, 10_000).await.expect("sample note");
    values.sort();

    assert_eq!(
        values,
        vec![
            None,
            Some("nothing here".to_string()),
            Some("top secret plan".to_string()),
        ]
    );

    let limited = sampler.sample(&note, 1).await.expect("sample with limit");
    assert_eq!(limited.len(), 1);

    sampler.close().await;
}
