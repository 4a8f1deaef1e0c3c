//! Driver seam: the traits a database driver implements, and the registry that
//! picks one for a connection URL.
//!
//! A probe run needs exactly three handles, each released explicitly:
//! a [`Connection`] from the [`Driver`], one [`Statement`] borrowed from that
//! connection, and the [`ResultCursor`] the statement produces.
//!
//! # Module Structure
//! - `url`: connection URL normalisation (`jdbc:` prefixes, scheme aliases)
//! - `sqlx_backend`: PostgreSQL, MySQL and SQLite through `sqlx` (feature-gated)
//! - `oracle`: Oracle through the `oracle` crate (feature-gated)

use crate::config::ProbeConfig;
use crate::credentials::Credentials;
use crate::error::{ProbeError, Result};
use async_trait::async_trait;
use base64::Engine as _;
use std::fmt;
use std::path::PathBuf;

pub mod url;

#[cfg(any(feature = "postgresql", feature = "mysql", feature = "sqlite"))]
pub mod sqlx_backend;

#[cfg(feature = "oracle")]
pub mod oracle;

pub use self::url::{DatabaseUrl, OracleTarget};

/// Boxed error source carried by driver errors.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result type for driver operations
pub type DriverResult<T> = std::result::Result<T, DriverError>;

/// Errors raised while talking to the database.
///
/// Context strings never contain passwords; URLs are redacted before use.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    /// The URL could not be turned into driver connect options
    #[error("Invalid connection URL: {0}")]
    InvalidUrl(String),

    /// The driver library could not be initialised
    #[error("Driver could not be loaded: {context}")]
    Load {
        context: String,
        #[source]
        source: BoxError,
    },

    /// Connection establishment failed
    #[error("Database connection failed: {context}")]
    Connection {
        context: String,
        #[source]
        source: BoxError,
    },

    /// The statement handle could not be created
    #[error("Statement creation failed: {context}")]
    Statement {
        context: String,
        #[source]
        source: BoxError,
    },

    /// Query execution or the first fetch failed
    #[error("Query execution failed: {context}")]
    Query {
        context: String,
        #[source]
        source: BoxError,
    },

    /// No `query` property was configured
    #[error("No query to execute: the `query` property is not set")]
    MissingQuery,

    /// The first column has a type that cannot be rendered as text
    #[error("Column type not supported: {0}")]
    UnsupportedValue(String),

    /// The handle was used after it was closed
    #[error("Handle already closed")]
    Closed,
}

impl DriverError {
    /// Creates a load error with context
    pub fn load<E>(context: impl Into<String>, error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Load {
            context: context.into(),
            source: Box::new(error),
        }
    }

    /// Creates a connection error with context
    pub fn connection<E>(context: impl Into<String>, error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Connection {
            context: context.into(),
            source: Box::new(error),
        }
    }

    /// Creates a statement error with context
    pub fn statement<E>(context: impl Into<String>, error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Statement {
            context: context.into(),
            source: Box::new(error),
        }
    }

    /// Creates a query error with context
    pub fn query<E>(context: impl Into<String>, error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Query {
            context: context.into(),
            source: Box::new(error),
        }
    }
}

/// Per-run options handed to the driver.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DriverOptions {
    /// Log every statement the driver sends at TRACE level
    pub trace_statements: bool,
    /// Network configuration directory (Oracle `TNS_ADMIN`)
    pub network_admin_dir: Option<PathBuf>,
}

impl From<&ProbeConfig> for DriverOptions {
    fn from(config: &ProbeConfig) -> Self {
        Self {
            trace_statements: config.diagnostics.enabled,
            network_admin_dir: config.network_admin_dir.clone(),
        }
    }
}

/// A single column value rendered for the report.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// SQL NULL
    Null,
    /// Character data
    Text(String),
    /// Any integer type
    Integer(i64),
    /// Any floating point type
    Real(f64),
    /// Boolean
    Boolean(bool),
    /// Binary data, shown base64-encoded
    Binary(Vec<u8>),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Text(text) => f.write_str(text),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Real(r) => write!(f, "{r}"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Binary(bytes) => {
                f.write_str(&base64::engine::general_purpose::STANDARD.encode(bytes))
            }
        }
    }
}

/// Rows produced by a query, as far as the probe reads them: the first
/// column of the first row, if there is a row at all.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultCursor {
    first_row: Option<Value>,
}

impl ResultCursor {
    /// A cursor over zero rows.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A cursor whose first row starts with `value`.
    pub fn with_first_column(value: Value) -> Self {
        Self {
            first_row: Some(value),
        }
    }

    /// Advances to the first row and returns its first column.
    ///
    /// Returns `None` for an empty result and on every later call.
    pub fn next_first_column(&mut self) -> Option<Value> {
        self.first_row.take()
    }
}

/// A database driver able to open connections for some URL schemes.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Display name used in logs
    fn name(&self) -> &'static str;

    /// Normalised URL schemes this driver accepts
    fn schemes(&self) -> &[&'static str];

    /// Initialises the driver library before the first connection.
    ///
    /// # Errors
    /// A failure here means the driver is unavailable for this run.
    async fn load(&self, _options: &DriverOptions) -> DriverResult<()> {
        Ok(())
    }

    /// Opens one connection.
    ///
    /// # Errors
    /// Returns `DriverError::Connection` if the database cannot be reached or
    /// rejects the credentials.
    async fn connect(
        &self,
        url: &DatabaseUrl,
        credentials: &Credentials,
        options: &DriverOptions,
    ) -> DriverResult<Box<dyn Connection>>;
}

/// A live database session.
#[async_trait]
pub trait Connection: Send {
    /// Creates a statement borrowing this connection.
    async fn create_statement<'c>(&'c mut self) -> DriverResult<Box<dyn Statement + 'c>>;

    /// Releases the session. Later calls return `DriverError::Closed`.
    async fn close(&mut self) -> DriverResult<()>;
}

/// A statement handle for one query execution.
#[async_trait]
pub trait Statement: Send {
    /// Executes `sql` and fetches the first row, if any.
    async fn execute_query(&mut self, sql: &str) -> DriverResult<ResultCursor>;

    /// Releases the statement. Later calls return `DriverError::Closed`.
    async fn close(&mut self) -> DriverResult<()>;
}

/// Drivers available to this process, looked up by URL scheme.
pub struct DriverRegistry {
    drivers: Vec<Box<dyn Driver>>,
}

impl fmt::Debug for DriverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriverRegistry")
            .field("schemes", &self.schemes())
            .finish()
    }
}

impl Default for DriverRegistry {
    fn default() -> Self {
        Self::with_default_drivers()
    }
}

impl DriverRegistry {
    /// Creates a registry with no drivers.
    pub fn empty() -> Self {
        Self {
            drivers: Vec::new(),
        }
    }

    /// Creates a registry with every driver compiled into this build.
    pub fn with_default_drivers() -> Self {
        let mut registry = Self::empty();

        #[cfg(feature = "postgresql")]
        registry.register(sqlx_backend::SqlxDriver::postgres());

        #[cfg(feature = "mysql")]
        registry.register(sqlx_backend::SqlxDriver::mysql());

        #[cfg(feature = "sqlite")]
        registry.register(sqlx_backend::SqlxDriver::sqlite());

        #[cfg(feature = "oracle")]
        registry.register(oracle::OracleDriver);

        registry
    }

    /// Adds a driver. Drivers registered later win for shared schemes.
    pub fn register(&mut self, driver: impl Driver + 'static) -> &mut Self {
        self.drivers.push(Box::new(driver));
        self
    }

    /// All schemes with a registered driver.
    pub fn schemes(&self) -> Vec<&'static str> {
        self.drivers
            .iter()
            .flat_map(|d| d.schemes().iter().copied())
            .collect()
    }

    /// Finds the driver for a URL.
    ///
    /// # Errors
    /// Returns `ProbeError::DriverUnavailable` when no registered driver
    /// accepts the scheme.
    pub fn resolve(&self, url: &DatabaseUrl) -> Result<&dyn Driver> {
        self.drivers
            .iter()
            .rev()
            .find(|d| d.schemes().contains(&url.scheme()))
            .map(|driver| &**driver)
            .ok_or_else(|| {
                ProbeError::driver_unavailable(url.scheme(), self.unavailable_reason(url.scheme()))
            })
    }

    fn unavailable_reason(&self, scheme: &str) -> String {
        let feature = match scheme {
            "postgres" | "postgresql" => Some("postgresql"),
            "mysql" => Some("mysql"),
            "sqlite" => Some("sqlite"),
            "oracle" => Some("oracle"),
            _ => None,
        };

        match feature {
            Some(feature) => format!(
                "driver not compiled in. Compile with --features {feature} to enable it"
            ),
            None => format!(
                "no registered driver accepts this scheme (available: {})",
                self.schemes().join(", ")
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NamedDriver(&'static str, &'static [&'static str]);

    #[async_trait]
    impl Driver for NamedDriver {
        fn name(&self) -> &'static str {
            self.0
        }

        fn schemes(&self) -> &[&'static str] {
            self.1
        }

        async fn connect(
            &self,
            _url: &DatabaseUrl,
            _credentials: &Credentials,
            _options: &DriverOptions,
        ) -> DriverResult<Box<dyn Connection>> {
            Err(DriverError::Closed)
        }
    }

    fn url(raw: &str) -> DatabaseUrl {
        DatabaseUrl::parse(raw).expect("valid url")
    }

    #[test]
    fn test_resolve_by_scheme() {
        let mut registry = DriverRegistry::empty();
        registry.register(NamedDriver("first", &["test"]));
        registry.register(NamedDriver("other", &["other"]));

        let driver = registry.resolve(&url("jdbc:test://host/db")).expect("driver");
        assert_eq!(driver.name(), "first");
    }

    #[test]
    fn test_later_registration_wins() {
        let mut registry = DriverRegistry::empty();
        registry.register(NamedDriver("first", &["test"]));
        registry.register(NamedDriver("second", &["test"]));

        let driver = registry.resolve(&url("test://host")).expect("driver");
        assert_eq!(driver.name(), "second");
    }

    #[test]
    fn test_unknown_scheme_is_driver_unavailable() {
        let mut registry = DriverRegistry::empty();
        registry.register(NamedDriver("first", &["test"]));

        let err = registry
            .resolve(&url("jdbc:db2://host:50000/sample"))
            .err()
            .expect("no db2 driver");
        assert!(matches!(err, ProbeError::DriverUnavailable { ref scheme, .. } if scheme == "db2"));
        assert!(err.to_string().contains("available: test"));
    }

    #[test]
    fn test_known_scheme_not_compiled_in_names_feature() {
        let registry = DriverRegistry::empty();
        let err = registry
            .resolve(&url("jdbc:oracle:thin:@//db:1521/ORCL"))
            .err()
            .expect("empty registry");
        assert!(err.to_string().contains("--features oracle"));
    }

    #[test]
    fn test_value_display() {
        assert_eq!(Value::Null.to_string(), "null");
        assert_eq!(Value::Text("X".to_string()).to_string(), "X");
        assert_eq!(Value::Integer(1).to_string(), "1");
        assert_eq!(Value::Real(2.5).to_string(), "2.5");
        assert_eq!(Value::Boolean(true).to_string(), "true");
        assert_eq!(Value::Binary(b"hi".to_vec()).to_string(), "aGk=");
    }

    #[test]
    fn test_cursor_yields_first_column_once() {
        let mut cursor = ResultCursor::with_first_column(Value::Integer(1));
        assert_eq!(cursor.next_first_column(), Some(Value::Integer(1)));
        assert_eq!(cursor.next_first_column(), None);
        assert_eq!(ResultCursor::empty().next_first_column(), None);
    }

    #[test]
    fn test_driver_options_from_config() {
        let properties = crate::properties::Properties::parse(
            "url=sqlite::memory:\ndiagnosability=true\noracle.net.tns_admin=/opt/tns\n",
        )
        .expect("valid properties");
        let config = ProbeConfig::from_properties(&properties).expect("valid config");

        let options = DriverOptions::from(&config);
        assert!(options.trace_statements);
        assert_eq!(options.network_admin_dir, Some(PathBuf::from("/opt/tns")));
    }
}
