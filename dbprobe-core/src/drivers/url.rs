//! Connection URL normalisation.
//!
//! Properties files written for JDBC tools carry URLs such as
//! `jdbc:postgresql://host/db` or `jdbc:oracle:thin:@//host:1521/SVC`. The
//! `jdbc:` prefix is dropped and scheme aliases are folded so the registry can
//! match on a single scheme name.

use super::{DriverError, DriverResult};
use crate::credentials::Credentials;
use crate::error::{ProbeError, Result, redact_database_url};
use std::fmt;

const JDBC_PREFIX: &str = "jdbc:";

/// A connection URL with its scheme resolved.
#[derive(Clone, PartialEq, Eq)]
pub struct DatabaseUrl {
    normalized: String,
    scheme: String,
}

impl DatabaseUrl {
    /// Normalises a raw URL from the properties file.
    ///
    /// # Errors
    /// Returns `ProbeError::Configuration` if the URL has no scheme.
    ///
    /// # Example
    /// ```rust
    /// use dbprobe_core::drivers::DatabaseUrl;
    ///
    /// let url = DatabaseUrl::parse("jdbc:mariadb://db:3306/app").unwrap();
    /// assert_eq!(url.scheme(), "mysql");
    /// assert_eq!(url.as_str(), "mysql://db:3306/app");
    /// ```
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        let without_prefix = match trimmed.get(..JDBC_PREFIX.len()) {
            Some(prefix) if prefix.eq_ignore_ascii_case(JDBC_PREFIX) => &trimmed[JDBC_PREFIX.len()..],
            _ => trimmed,
        };

        let (scheme, rest) = without_prefix
            .split_once(':')
            .filter(|(scheme, _)| is_valid_scheme(scheme))
            .ok_or_else(|| {
                ProbeError::configuration(format!(
                    "url '{}' does not start with a database scheme",
                    redact_database_url(trimmed)
                ))
            })?;

        let scheme = match scheme.to_ascii_lowercase().as_str() {
            "postgresql" => "postgres".to_string(),
            "mariadb" => "mysql".to_string(),
            other => other.to_string(),
        };

        // sqlx accepts `postgresql://` as is; only mariadb needs rewriting.
        let normalized = if without_prefix.get(..8).is_some_and(|s| s.eq_ignore_ascii_case("mariadb:")) {
            format!("mysql:{rest}")
        } else {
            without_prefix.to_string()
        };

        Ok(Self { normalized, scheme })
    }

    /// The scheme used for driver lookup (`postgres`, `mysql`, `sqlite`, `oracle`, ...).
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// The normalised URL, without any `jdbc:` prefix.
    pub fn as_str(&self) -> &str {
        &self.normalized
    }

    /// The URL with any embedded password masked.
    pub fn redacted(&self) -> String {
        redact_database_url(&self.normalized)
    }
}

impl fmt::Debug for DatabaseUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseUrl")
            .field("url", &self.redacted())
            .field("scheme", &self.scheme)
            .finish()
    }
}

impl fmt::Display for DatabaseUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.redacted())
    }
}

fn is_valid_scheme(scheme: &str) -> bool {
    let mut chars = scheme.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Where an Oracle URL points, in the form Oracle client libraries accept.
#[derive(Debug, Clone)]
pub struct OracleTarget {
    /// EZConnect string, TNS alias or full descriptor
    pub connect_string: String,
    /// Credentials embedded in the URL, if any
    pub credentials: Credentials,
}

impl OracleTarget {
    /// Extracts the connect string from an `oracle` URL.
    ///
    /// Accepted forms:
    /// - `oracle:thin:@<connect>` and `oracle:oci:@<connect>`
    /// - `oracle:thin:<user>/<password>@<connect>`
    /// - `oracle:thin:@<host>:<port>:<SID>`, rewritten to a connect descriptor
    /// - `oracle://<user>:<password>@<host>:<port>/<service>`
    ///
    /// # Errors
    /// Returns `DriverError::InvalidUrl` for any other shape.
    pub fn parse(url: &DatabaseUrl) -> DriverResult<Self> {
        let invalid = || DriverError::InvalidUrl(format!("unsupported Oracle URL '{url}'"));

        if url.scheme() != "oracle" {
            return Err(invalid());
        }

        let raw = url.as_str();
        if raw.get(..9).is_some_and(|s| s.eq_ignore_ascii_case("oracle://")) {
            let parsed = ::url::Url::parse(raw).map_err(|_| invalid())?;
            let host = parsed.host_str().ok_or_else(invalid)?;
            let mut connect_string = format!("//{host}");
            if let Some(port) = parsed.port() {
                connect_string.push_str(&format!(":{port}"));
            }
            connect_string.push_str(parsed.path());

            let user = Some(parsed.username())
                .filter(|u| !u.is_empty())
                .map(str::to_string);
            let password = parsed.password().map(str::to_string);

            return Ok(Self {
                connect_string,
                credentials: Credentials::new(user, password),
            });
        }

        // oracle:<subprotocol>:[user/password]@<connect>
        let (_, after_scheme) = raw.split_once(':').ok_or_else(invalid)?;
        let (subprotocol, location) = after_scheme.split_once(':').ok_or_else(invalid)?;
        if !matches!(subprotocol.to_ascii_lowercase().as_str(), "thin" | "oci" | "oci8") {
            return Err(invalid());
        }

        let (login, connect_string) = location.split_once('@').ok_or_else(invalid)?;
        if connect_string.is_empty() {
            return Err(invalid());
        }

        let credentials = match login.split_once('/') {
            Some((user, password)) => {
                Credentials::new(Some(user.to_string()), Some(password.to_string()))
            }
            None if login.is_empty() => Credentials::default(),
            None => Credentials::new(Some(login.to_string()), None),
        };

        Ok(Self {
            connect_string: sid_descriptor(connect_string)
                .unwrap_or_else(|| connect_string.to_string()),
            credentials,
        })
    }
}

/// Rewrites the legacy `host:port:SID` form, which EZConnect does not accept.
fn sid_descriptor(connect_string: &str) -> Option<String> {
    if connect_string.starts_with("//") || connect_string.starts_with('(') {
        return None;
    }
    let mut parts = connect_string.split(':');
    let (host, port, sid) = (parts.next()?, parts.next()?, parts.next()?);
    let well_formed = parts.next().is_none()
        && !host.is_empty()
        && !sid.is_empty()
        && !port.is_empty()
        && port.bytes().all(|b| b.is_ascii_digit());
    well_formed.then(|| {
        format!(
            "(DESCRIPTION=(ADDRESS=(PROTOCOL=TCP)(HOST={host})(PORT={port}))(CONNECT_DATA=(SID={sid})))"
        )
    })
}
