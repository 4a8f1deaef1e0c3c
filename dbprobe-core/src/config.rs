//! Typed probe configuration built from loaded properties.

use crate::credentials::Credentials;
use crate::error::{ProbeError, Result};
use crate::properties::Properties;
use std::path::PathBuf;

/// Property holding the connection URL (required).
pub const URL_KEY: &str = "url";
/// Property holding the login user.
pub const USER_KEY: &str = "user";
/// Property holding the login password.
pub const PASSWORD_KEY: &str = "password";
/// Property holding the query to execute.
pub const QUERY_KEY: &str = "query";
/// Property switching driver diagnostics on when set to exactly `true`.
pub const DIAGNOSABILITY_KEY: &str = "diagnosability";
/// Property naming the network configuration directory (`tnsnames.ora` and friends).
pub const TNS_ADMIN_KEY: &str = "oracle.net.tns_admin";

/// Driver tracing switch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiagnosticsConfig {
    /// Trace driver activity at maximum verbosity
    pub enabled: bool,
}

impl DiagnosticsConfig {
    /// Reads the `diagnosability` property. Anything but the literal `true` is off.
    pub fn from_properties(properties: &Properties) -> Self {
        Self {
            enabled: properties.get(DIAGNOSABILITY_KEY) == Some("true"),
        }
    }
}

/// Everything a single probe run needs.
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// Connection URL as written in the properties file
    pub url: String,
    /// Login credentials (either part may be absent)
    pub credentials: Credentials,
    /// Query to execute; `None` fails at execution time
    pub query: Option<String>,
    /// Driver tracing switch
    pub diagnostics: DiagnosticsConfig,
    /// Network configuration directory override
    pub network_admin_dir: Option<PathBuf>,
}

impl ProbeConfig {
    /// Builds the probe configuration.
    ///
    /// # Errors
    /// Returns `ProbeError::Configuration` if the `url` property is missing.
    pub fn from_properties(properties: &Properties) -> Result<Self> {
        let url = properties
            .get(URL_KEY)
            .ok_or_else(|| ProbeError::configuration("missing url property"))?
            .to_string();

        Ok(Self {
            url,
            credentials: Credentials::new(
                properties.get(USER_KEY).map(str::to_string),
                properties.get(PASSWORD_KEY).map(str::to_string),
            ),
            query: properties.get(QUERY_KEY).map(str::to_string),
            diagnostics: DiagnosticsConfig::from_properties(properties),
            network_admin_dir: properties.get(TNS_ADMIN_KEY).map(PathBuf::from),
        })
    }
}
