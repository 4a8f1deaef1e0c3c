//! The connectivity probe: connect, run one query, report, release.
//!
//! Fatal problems (bad URL, no driver, a broken standard output) come back as
//! [`ProbeError`]. Anything that goes wrong while talking to the database is
//! returned as a [`ProbeFailure`] inside the [`ProbeOutcome`], leaving the
//! exit policy to the caller.

use crate::config::ProbeConfig;
use crate::drivers::{
    Connection, DatabaseUrl, DriverError, DriverOptions, DriverRegistry, Statement, Value,
};
use crate::elapsed::Elapsed;
use crate::error::{ProbeError, Result};
use std::fmt;
use std::io::Write;

/// Step of the probe at which a driver failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeStage {
    /// Opening the connection
    Connect,
    /// Creating the statement handle
    CreateStatement,
    /// Executing the query and fetching the first row
    Execute,
}

impl fmt::Display for ProbeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Connect => "Connect step",
            Self::CreateStatement => "Create statement step",
            Self::Execute => "Execute step",
        })
    }
}

/// What a successful probe measured.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeSummary {
    /// Time to open the connection
    pub connect_time: Elapsed,
    /// Time to execute the query and fetch the first row
    pub query_time: Elapsed,
    /// First column of the first row; `None` for an empty result
    pub first_column: Option<Value>,
}

/// A driver failure during the probe.
#[derive(Debug, thiserror::Error)]
#[error("{stage} failed")]
pub struct ProbeFailure {
    /// Step that failed
    pub stage: ProbeStage,
    /// Underlying driver error
    #[source]
    pub error: DriverError,
    /// Set when the connection was established before the failure
    pub connect_time: Option<Elapsed>,
}

/// Result of a probe that got as far as a connection attempt.
pub type ProbeOutcome = std::result::Result<ProbeSummary, ProbeFailure>;

/// Runs probes against the drivers of a registry.
#[derive(Debug, Clone, Copy)]
pub struct Prober<'r> {
    registry: &'r DriverRegistry,
}

impl<'r> Prober<'r> {
    /// Creates a prober resolving drivers from `registry`.
    pub fn new(registry: &'r DriverRegistry) -> Self {
        Self { registry }
    }

    /// Probes the database described by `config`, writing the report to `out`.
    ///
    /// The report is the connection timing line, the query timing line and the
    /// first column of the first row, each on its own line, as far as the probe
    /// gets. Statement and connection are closed on every path once opened,
    /// statement first; errors while closing are discarded.
    ///
    /// # Errors
    /// Returns `ProbeError::Configuration` for a URL without scheme,
    /// `ProbeError::DriverUnavailable` when no driver can serve the URL, and
    /// `ProbeError::Io` when the report cannot be written.
    pub async fn run<W>(&self, config: &ProbeConfig, out: &mut W) -> Result<ProbeOutcome>
    where
        W: Write + ?Sized,
    {
        let url = DatabaseUrl::parse(&config.url)?;
        let options = DriverOptions::from(config);

        let driver = self.registry.resolve(&url)?;
        driver
            .load(&options)
            .await
            .map_err(|e| ProbeError::driver_unavailable(url.scheme(), error_chain(&e)))?;

        tracing::debug!("Connecting to {} with the {} driver", url, driver.name());
        let (connected, connect_time) =
            Elapsed::measure(driver.connect(&url, &config.credentials, &options)).await;

        let mut connection = match connected {
            Ok(connection) => connection,
            Err(error) => {
                return Ok(Err(ProbeFailure {
                    stage: ProbeStage::Connect,
                    error,
                    connect_time: None,
                }));
            }
        };

        let outcome = exercise(connection.as_mut(), config.query.as_deref(), connect_time, out).await;
        let _ = connection.close().await;
        outcome
    }
}

async fn exercise<W>(
    connection: &mut dyn Connection,
    query: Option<&str>,
    connect_time: Elapsed,
    out: &mut W,
) -> Result<ProbeOutcome>
where
    W: Write + ?Sized,
{
    report(out, format_args!("Connection established took : {connect_time}"))?;

    let mut statement = match connection.create_statement().await {
        Ok(statement) => statement,
        Err(error) => {
            return Ok(Err(ProbeFailure {
                stage: ProbeStage::CreateStatement,
                error,
                connect_time: Some(connect_time),
            }));
        }
    };

    let outcome = execute(statement.as_mut(), query, connect_time, out).await;
    let _ = statement.close().await;
    outcome
}

async fn execute<W>(
    statement: &mut dyn Statement,
    query: Option<&str>,
    connect_time: Elapsed,
    out: &mut W,
) -> Result<ProbeOutcome>
where
    W: Write + ?Sized,
{
    let failed = |error: DriverError| -> Result<ProbeOutcome> {
        Ok(Err(ProbeFailure {
            stage: ProbeStage::Execute,
            error,
            connect_time: Some(connect_time),
        }))
    };

    let Some(query) = query else {
        return failed(DriverError::MissingQuery);
    };

    let (executed, query_time) = Elapsed::measure(async {
        let mut cursor = statement.execute_query(query).await?;
        Ok::<_, DriverError>(cursor.next_first_column())
    })
    .await;

    let first_column = match executed {
        Ok(first_column) => first_column,
        Err(error) => return failed(error),
    };

    report(out, format_args!("Executed statement took : {query_time}"))?;
    if let Some(value) = &first_column {
        report(out, value)?;
    }

    Ok(Ok(ProbeSummary {
        connect_time,
        query_time,
        first_column,
    }))
}

fn report<W>(out: &mut W, line: impl fmt::Display) -> Result<()>
where
    W: Write + ?Sized,
{
    writeln!(out, "{line}")
        .and_then(|()| out.flush())
        .map_err(|e| ProbeError::io("Failed to write to standard output", e))
}

/// Joins an error and its sources into one line.
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
