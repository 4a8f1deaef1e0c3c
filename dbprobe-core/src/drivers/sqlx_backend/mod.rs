//! PostgreSQL, MySQL and SQLite drivers on top of `sqlx`.
//!
//! Each backend is compiled in through its own cargo feature and uses its
//! native `sqlx` connection type, so every column type the backend can decode
//! is available when the first column is rendered.
//!
//! A single unpooled connection is opened per run.
//!
//! # Module Structure
//! - `postgres`: connect options and column rendering for PostgreSQL
//! - `mysql`: connect options and column rendering for MySQL and MariaDB
//! - `sqlite`: connect options and column rendering for SQLite

use super::{
    Connection, DatabaseUrl, Driver, DriverError, DriverOptions, DriverResult, ResultCursor,
    Statement, Value,
};
use crate::credentials::Credentials;
use async_trait::async_trait;
use sqlx::ConnectOptions;

/// Decodes column 0 as the first listed type that fits, wrapped into a [`Value`].
macro_rules! first_decodable {
    ($row:expr, $($ty:ty => $wrap:expr),+ $(,)?) => {
        None$(.or_else(|| sqlx::Row::try_get::<$ty, _>($row, 0).ok().map($wrap)))+
    };
}

#[cfg(feature = "mysql")]
mod mysql;
#[cfg(feature = "postgresql")]
mod postgres;
#[cfg(feature = "sqlite")]
mod sqlite;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Backend {
    #[cfg(feature = "postgresql")]
    Postgres,
    #[cfg(feature = "mysql")]
    MySql,
    #[cfg(feature = "sqlite")]
    Sqlite,
}

impl Backend {
    const fn name(self) -> &'static str {
        match self {
            #[cfg(feature = "postgresql")]
            Self::Postgres => "PostgreSQL",
            #[cfg(feature = "mysql")]
            Self::MySql => "MySQL",
            #[cfg(feature = "sqlite")]
            Self::Sqlite => "SQLite",
        }
    }
}

/// A `sqlx` backend exposed as a probe driver.
#[derive(Debug, Clone, Copy)]
pub struct SqlxDriver {
    backend: Backend,
}

impl SqlxDriver {
    /// PostgreSQL (`postgres://`, `postgresql://`).
    #[cfg(feature = "postgresql")]
    pub const fn postgres() -> Self {
        Self {
            backend: Backend::Postgres,
        }
    }

    /// MySQL and MariaDB (`mysql://`, `mariadb://`).
    #[cfg(feature = "mysql")]
    pub const fn mysql() -> Self {
        Self {
            backend: Backend::MySql,
        }
    }

    /// SQLite (`sqlite:<path>`, `sqlite::memory:`). User and password are ignored.
    #[cfg(feature = "sqlite")]
    pub const fn sqlite() -> Self {
        Self {
            backend: Backend::Sqlite,
        }
    }
}

#[async_trait]
impl Driver for SqlxDriver {
    fn name(&self) -> &'static str {
        self.backend.name()
    }

    fn schemes(&self) -> &[&'static str] {
        match self.backend {
            #[cfg(feature = "postgresql")]
            Backend::Postgres => &["postgres"],
            #[cfg(feature = "mysql")]
            Backend::MySql => &["mysql"],
            #[cfg(feature = "sqlite")]
            Backend::Sqlite => &["sqlite"],
        }
    }

    async fn load(&self, options: &DriverOptions) -> DriverResult<()> {
        if let Some(dir) = &options.network_admin_dir {
            tracing::debug!(
                "{} driver ignores network configuration directory {}",
                self.name(),
                dir.display()
            );
        }
        Ok(())
    }

    async fn connect(
        &self,
        url: &DatabaseUrl,
        credentials: &Credentials,
        options: &DriverOptions,
    ) -> DriverResult<Box<dyn Connection>> {
        tracing::debug!("Opening {} connection to {}", self.name(), url);
        let connection_failed = |e: sqlx::Error| {
            DriverError::connection(format!("{} connection to {url} failed", self.name()), e)
        };

        let inner = match self.backend {
            #[cfg(feature = "postgresql")]
            Backend::Postgres => BackendConnection::Postgres(
                postgres::connect_options(url, credentials, options)?
                    .connect()
                    .await
                    .map_err(connection_failed)?,
            ),
            #[cfg(feature = "mysql")]
            Backend::MySql => BackendConnection::MySql(
                mysql::connect_options(url, credentials, options)?
                    .connect()
                    .await
                    .map_err(connection_failed)?,
            ),
            #[cfg(feature = "sqlite")]
            Backend::Sqlite => BackendConnection::Sqlite(
                sqlite::connect_options(url, credentials, options)?
                    .connect()
                    .await
                    .map_err(connection_failed)?,
            ),
        };

        Ok(Box::new(SqlxConnection { inner: Some(inner) }))
    }
}

/// Applies the statement logging switch to any backend's connect options.
fn with_statement_logging<O: ConnectOptions>(options: O, trace_statements: bool) -> O {
    if trace_statements {
        options.log_statements(log::LevelFilter::Trace)
    } else {
        options.disable_statement_logging()
    }
}

fn invalid_url(url: &DatabaseUrl, error: &sqlx::Error) -> DriverError {
    DriverError::InvalidUrl(format!("{url}: {error}"))
}

/// Fallback for column types without a typed decoder: the raw value, as long
/// as it is printable UTF-8.
fn printable(text: String) -> Option<Value> {
    (!text.chars().any(|c| c.is_control() && !c.is_whitespace())).then_some(Value::Text(text))
}

enum BackendConnection {
    #[cfg(feature = "postgresql")]
    Postgres(sqlx::PgConnection),
    #[cfg(feature = "mysql")]
    MySql(sqlx::MySqlConnection),
    #[cfg(feature = "sqlite")]
    Sqlite(sqlx::SqliteConnection),
}

impl BackendConnection {
    const fn backend(&self) -> Backend {
        match self {
            #[cfg(feature = "postgresql")]
            Self::Postgres(_) => Backend::Postgres,
            #[cfg(feature = "mysql")]
            Self::MySql(_) => Backend::MySql,
            #[cfg(feature = "sqlite")]
            Self::Sqlite(_) => Backend::Sqlite,
        }
    }

    async fn close(self) -> Result<(), sqlx::Error> {
        match self {
            #[cfg(feature = "postgresql")]
            Self::Postgres(connection) => sqlx::Connection::close(connection).await,
            #[cfg(feature = "mysql")]
            Self::MySql(connection) => sqlx::Connection::close(connection).await,
            #[cfg(feature = "sqlite")]
            Self::Sqlite(connection) => sqlx::Connection::close(connection).await,
        }
    }
}

/// One `sqlx` connection; `None` once closed.
pub struct SqlxConnection {
    inner: Option<BackendConnection>,
}

#[async_trait]
impl Connection for SqlxConnection {
    async fn create_statement<'c>(&'c mut self) -> DriverResult<Box<dyn Statement + 'c>> {
        let connection = self.inner.as_mut().ok_or(DriverError::Closed)?;
        Ok(Box::new(SqlxStatement {
            connection: Some(connection),
        }))
    }

    async fn close(&mut self) -> DriverResult<()> {
        let connection = self.inner.take().ok_or(DriverError::Closed)?;
        connection
            .close()
            .await
            .map_err(|e| DriverError::connection("Failed to close connection", e))
    }
}

/// Statement handle over a borrowed connection.
///
/// `sqlx` has no client-side statement object to release, so closing only
/// gives the borrow back.
pub struct SqlxStatement<'c> {
    connection: Option<&'c mut BackendConnection>,
}

#[async_trait]
impl Statement for SqlxStatement<'_> {
    async fn execute_query(&mut self, sql: &str) -> DriverResult<ResultCursor> {
        let connection = self.connection.as_deref_mut().ok_or(DriverError::Closed)?;
        let backend = connection.backend();
        let query_failed = |e: sqlx::Error| {
            DriverError::query(format!("{} returned an error", backend.name()), e)
        };

        let first = match connection {
            #[cfg(feature = "postgresql")]
            BackendConnection::Postgres(connection) => sqlx::query(sql)
                .fetch_optional(connection)
                .await
                .map_err(query_failed)?
                .as_ref()
                .map(postgres::first_column)
                .transpose()?,
            #[cfg(feature = "mysql")]
            BackendConnection::MySql(connection) => sqlx::query(sql)
                .fetch_optional(connection)
                .await
                .map_err(query_failed)?
                .as_ref()
                .map(mysql::first_column)
                .transpose()?,
            #[cfg(feature = "sqlite")]
            BackendConnection::Sqlite(connection) => sqlx::query(sql)
                .fetch_optional(connection)
                .await
                .map_err(query_failed)?
                .as_ref()
                .map(sqlite::first_column)
                .transpose()?,
        };

        Ok(first.map_or_else(ResultCursor::empty, ResultCursor::with_first_column))
    }

    async fn close(&mut self) -> DriverResult<()> {
        self.connection.take().map(|_| ()).ok_or(DriverError::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_printable_accepts_text() {
        assert_eq!(
            printable("{\"ok\": true}\n".to_string()),
            Some(Value::Text("{\"ok\": true}\n".to_string()))
        );
    }

    #[test]
    fn test_printable_rejects_binary() {
        assert_eq!(printable("\u{1}{\"ok\": true}".to_string()), None);
        assert_eq!(printable("\u{0}\u{0}\u{0}\u{7}".to_string()), None);
    }

    #[cfg(feature = "sqlite")]
    #[test]
    fn test_sqlite_driver_identity() {
        let driver = SqlxDriver::sqlite();
        assert_eq!(driver.name(), "SQLite");
        assert_eq!(driver.schemes(), &["sqlite"]);
    }
}
