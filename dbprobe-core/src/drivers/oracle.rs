//! Oracle driver on top of the `oracle` crate (ODPI-C).
//!
//! # Note
//!
//! The `oracle` crate loads the Oracle client libraries (Instant Client) at
//! runtime. When they cannot be found, [`Driver::load`] fails and the run stops
//! with a driver-unavailable error before any connection attempt.
//!
//! The crate is synchronous. Calls run inline on the current thread, which is
//! the only thread the probe uses.
//!
//! Client-side tracing is controlled by ODPI-C itself through the
//! `DPI_DEBUG_LEVEL` environment variable, read once when the library loads.
//! The probe cannot set it for its own process, so with diagnostics on it
//! warns when the variable is missing.

use super::{
    Connection, DatabaseUrl, Driver, DriverError, DriverOptions, DriverResult, OracleTarget,
    ResultCursor, Statement, Value,
};
use crate::credentials::Credentials;
use async_trait::async_trait;
use std::ffi::OsStr;

/// Environment variable ODPI-C reads its trace level from.
const CLIENT_TRACE_VARIABLE: &str = "DPI_DEBUG_LEVEL";

/// Function calls (2), errors (4), SQL (8) and library loading (32).
const SUGGESTED_CLIENT_TRACE_LEVEL: u32 = 46;

/// Oracle Database through Oracle client libraries.
#[derive(Debug, Clone, Copy, Default)]
pub struct OracleDriver;

#[async_trait]
impl Driver for OracleDriver {
    fn name(&self) -> &'static str {
        "Oracle"
    }

    fn schemes(&self) -> &[&'static str] {
        &["oracle"]
    }

    /// Initialises the client library once for the process, installing the
    /// network configuration directory (`tnsnames.ora`, `sqlnet.ora`) if one
    /// was configured.
    async fn load(&self, options: &DriverOptions) -> DriverResult<()> {
        let client_trace_level = std::env::var_os(CLIENT_TRACE_VARIABLE);
        match client_trace_hint(options.trace_statements, client_trace_level.as_deref()) {
            Some(hint) => tracing::warn!("{hint}"),
            None if options.trace_statements => tracing::debug!(
                "Oracle client tracing at {}={}",
                CLIENT_TRACE_VARIABLE,
                client_trace_level.unwrap_or_default().to_string_lossy()
            ),
            None => {}
        }

        let mut params = oracle::InitParams::new();
        if let Some(dir) = &options.network_admin_dir {
            tracing::debug!("Using Oracle network configuration in {}", dir.display());
            params
                .oracle_client_config_dir(dir.clone())
                .map_err(|e| DriverError::load("Invalid network configuration directory", e))?;
        }

        let initialized = params
            .init()
            .map_err(|e| DriverError::load("Oracle client library could not be initialized", e))?;
        if !initialized {
            tracing::trace!("Oracle client library was already initialized");
        }

        Ok(())
    }

    async fn connect(
        &self,
        url: &DatabaseUrl,
        credentials: &Credentials,
        options: &DriverOptions,
    ) -> DriverResult<Box<dyn Connection>> {
        let target = OracleTarget::parse(url)?;
        let credentials = credentials.or(&target.credentials);

        let mut connector = oracle::Connector::new(
            credentials.user().unwrap_or_default(),
            credentials.password().unwrap_or_default(),
            target.connect_string.as_str(),
        );
        if credentials.user().is_none() {
            // No user: rely on OS authentication or a wallet.
            connector.external_auth(true);
        }

        if options.trace_statements {
            tracing::trace!("Connecting to {}", target.connect_string);
        }
        let connection = connector.connect().map_err(|e| {
            DriverError::connection(format!("Oracle connection to {url} failed"), e)
        })?;

        Ok(Box::new(OracleConnection {
            inner: Some(connection),
            trace_statements: options.trace_statements,
        }))
    }
}

/// Warning for a diagnostics run whose client library will not trace.
fn client_trace_hint(trace_statements: bool, level: Option<&OsStr>) -> Option<String> {
    if !trace_statements || level.is_some_and(|level| !level.is_empty()) {
        return None;
    }
    Some(format!(
        "Oracle client tracing is off. Set {CLIENT_TRACE_VARIABLE}={SUGGESTED_CLIENT_TRACE_LEVEL} \
         in the environment before starting dbprobe to trace the client library"
    ))
}

/// One Oracle session; `None` once closed.
pub struct OracleConnection {
    inner: Option<oracle::Connection>,
    trace_statements: bool,
}

#[async_trait]
impl Connection for OracleConnection {
    async fn create_statement<'c>(&'c mut self) -> DriverResult<Box<dyn Statement + 'c>> {
        let connection = self.inner.as_ref().ok_or(DriverError::Closed)?;
        Ok(Box::new(OracleStatement {
            connection: Some(connection),
            statement: None,
            trace_statements: self.trace_statements,
        }))
    }

    async fn close(&mut self) -> DriverResult<()> {
        let connection = self.inner.take().ok_or(DriverError::Closed)?;
        connection
            .close()
            .map_err(|e| DriverError::connection("Failed to close connection", e))
    }
}

/// Statement handle. The server-side cursor is prepared on execution, since
/// the SQL text is only known then.
pub struct OracleStatement<'c> {
    connection: Option<&'c oracle::Connection>,
    statement: Option<oracle::Statement>,
    trace_statements: bool,
}

#[async_trait]
impl Statement for OracleStatement<'_> {
    async fn execute_query(&mut self, sql: &str) -> DriverResult<ResultCursor> {
        let connection = self.connection.ok_or(DriverError::Closed)?;
        if self.trace_statements {
            tracing::trace!("Executing: {sql}");
        }

        let mut statement = connection
            .statement(sql)
            .build()
            .map_err(|e| DriverError::statement("Failed to prepare statement", e))?;

        let first = {
            let mut rows = statement
                .query(&[])
                .map_err(|e| DriverError::query("Oracle returned an error", e))?;
            match rows.next() {
                Some(row) => {
                    let row = row.map_err(|e| DriverError::query("Failed to fetch first row", e))?;
                    let value = row
                        .get::<usize, Option<String>>(0)
                        .map_err(|e| DriverError::query("Failed to read the first column", e))?;
                    Some(value.map_or(Value::Null, Value::Text))
                }
                None => None,
            }
        };

        self.statement = Some(statement);
        Ok(first.map_or_else(ResultCursor::empty, ResultCursor::with_first_column))
    }

    async fn close(&mut self) -> DriverResult<()> {
        self.connection.take().ok_or(DriverError::Closed)?;
        match self.statement.take() {
            Some(mut statement) => statement
                .close()
                .map_err(|e| DriverError::statement("Failed to close statement", e)),
            None => Ok(()),
        }
    }
}
