//! First-column rendering of PostgreSQL types, against a real server started
//! with testcontainers.
//!
//! Health-check queries commonly return `name`, `numeric`, `bpchar` or
//! timestamp columns; each must print as text rather than fail the query.

#![cfg(feature = "postgresql")]
#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]

use dbprobe_core::{DriverRegistry, ProbeConfig, ProbeOutcome, Prober, Properties, Value};
use std::time::Duration;
use testcontainers_modules::{postgres::Postgres, testcontainers::runners::AsyncRunner};

async fn probe(port: u16, query: &str) -> ProbeOutcome {
    let properties = Properties::parse(&format!(
        "url=jdbc:postgresql://127.0.0.1:{port}/postgres\nuser=postgres\npassword=postgres\nquery={query}\n"
    ))
    .expect("valid properties");
    let config = ProbeConfig::from_properties(&properties).expect("valid config");
    let registry = DriverRegistry::with_default_drivers();

    Prober::new(&registry)
        .run(&config, &mut Vec::new())
        .await
        .expect("postgresql driver is compiled in")
}

/// Helper function to wait for PostgreSQL to accept connections
async fn wait_for_postgres_ready(port: u16, max_attempts: u32) -> bool {
    for attempt in 1..=max_attempts {
        if probe(port, "SELECT 1").await.is_ok() {
            return true;
        }
        if attempt < max_attempts {
            tokio::time::sleep(Duration::from_millis(500)).await;
        }
    }
    false
}

async fn first_column(port: u16, query: &str) -> Option<Value> {
    probe(port, query)
        .await
        .map_err(|failure| error_chain(&failure))
        .expect(query)
        .first_column
}

fn error_chain(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

fn text(value: &str) -> Option<Value> {
    Some(Value::Text(value.to_string()))
}

#[tokio::test]
async fn test_postgres_first_column_types() {
    let Ok(container) = Postgres::default().start().await else {
        eprintln!("Skipping PostgreSQL type tests: container runtime unavailable");
        return;
    };
    let port = container.get_host_port_ipv4(5432).await.unwrap();
    assert!(
        wait_for_postgres_ready(port, 30).await,
        "PostgreSQL failed to become ready"
    );

    assert_eq!(first_column(port, "SELECT 1").await, Some(Value::Integer(1)));
    assert_eq!(first_column(port, "SELECT 1::bigint").await, Some(Value::Integer(1)));
    assert_eq!(first_column(port, "SELECT current_user").await, text("postgres"));
    assert_eq!(first_column(port, "SELECT 1.50").await, text("1.50"));
    assert_eq!(first_column(port, "SELECT 'x'::char(1)").await, text("x"));
    assert_eq!(
        first_column(port, "SELECT TIMESTAMPTZ '2024-01-02 03:04:05+00'").await,
        text("2024-01-02 03:04:05 UTC")
    );
    assert_eq!(
        first_column(port, "SELECT TIMESTAMP '2024-01-02 03:04:05'").await,
        text("2024-01-02 03:04:05")
    );
    assert_eq!(first_column(port, "SELECT DATE '2024-01-02'").await, text("2024-01-02"));
    assert_eq!(
        first_column(port, "SELECT 'a0eebc99-9c0b-4ef8-bb6d-6bb9bd380a11'::uuid").await,
        text("a0eebc99-9c0b-4ef8-bb6d-6bb9bd380a11")
    );
    assert_eq!(first_column(port, "SELECT true").await, Some(Value::Boolean(true)));
    assert_eq!(first_column(port, "SELECT NULL::text").await, Some(Value::Null));
    assert_eq!(
        first_column(port, "SELECT '{\"a\":1}'::json").await,
        text("{\"a\":1}")
    );

    let now = first_column(port, "SELECT now()").await;
    assert!(
        matches!(&now, Some(Value::Text(text)) if text.ends_with(" UTC")),
        "{now:?}"
    );
}

#[tokio::test]
async fn test_postgres_bad_credentials_fail_at_connect() {
    let Ok(container) = Postgres::default().start().await else {
        eprintln!("Skipping PostgreSQL credential test: container runtime unavailable");
        return;
    };
    let port = container.get_host_port_ipv4(5432).await.unwrap();
    assert!(
        wait_for_postgres_ready(port, 30).await,
        "PostgreSQL failed to become ready"
    );

    let properties = Properties::parse(&format!(
        "url=jdbc:postgresql://127.0.0.1:{port}/postgres\nuser=postgres\npassword=wrong\nquery=SELECT 1\n"
    ))
    .expect("valid properties");
    let config = ProbeConfig::from_properties(&properties).expect("valid config");
    let registry = DriverRegistry::with_default_drivers();
    let mut out = Vec::new();

    let failure = Prober::new(&registry)
        .run(&config, &mut out)
        .await
        .expect("postgresql driver is compiled in")
        .expect_err("wrong password");
    assert_eq!(failure.stage, dbprobe_core::ProbeStage::Connect);
    assert!(out.is_empty());
    assert!(!error_chain(&failure).contains("wrong"));
}
