//! Core library for dbprobe, a single-shot database connectivity check.
//!
//! A run reads a Java-style properties file, opens one connection through the
//! driver matching the `url` property, executes the `query` property once and
//! reports how long connecting and executing took.
//!
//! # Security Guarantees
//! - Credentials are zeroized on drop and masked in `Debug` output
//! - Connection URLs are redacted before they reach logs or error messages
//! - The only statement sent to the database is the configured query
//!
//! # Architecture
//! - `properties` and `config` turn the file into a typed [`ProbeConfig`]
//! - `drivers` holds the object-safe driver traits and the scheme registry
//! - `probe` runs the connect/execute/release sequence and returns an explicit outcome

pub mod config;
pub mod credentials;
pub mod drivers;
pub mod elapsed;
pub mod error;
pub mod logging;
pub mod probe;
pub mod properties;

// Re-export commonly used types
pub use config::{DiagnosticsConfig, ProbeConfig};
pub use credentials::Credentials;
pub use drivers::{DatabaseUrl, DriverError, DriverRegistry, Value};
pub use elapsed::Elapsed;
pub use error::{ProbeError, Result};
pub use logging::{LoggingConfig, init_logging};
pub use probe::{ProbeFailure, ProbeOutcome, ProbeStage, ProbeSummary, Prober};
pub use properties::{EchoMode, Properties, echo_properties};
