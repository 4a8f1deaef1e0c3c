//! SQLite connect options and first-column rendering.
//!
//! SQLite has no login; configured credentials are ignored.

use super::{invalid_url, printable, with_statement_logging};
use crate::credentials::Credentials;
use crate::drivers::{DatabaseUrl, DriverError, DriverOptions, DriverResult, Value};
use sqlx::sqlite::{SqliteConnectOptions, SqliteRow};
use sqlx::{Row, TypeInfo, ValueRef};
use std::str::FromStr;

pub(super) fn connect_options(
    url: &DatabaseUrl,
    credentials: &Credentials,
    options: &DriverOptions,
) -> DriverResult<SqliteConnectOptions> {
    if credentials.user().is_some() || credentials.has_password() {
        tracing::debug!("SQLite ignores the configured user and password");
    }
    let connect =
        SqliteConnectOptions::from_str(url.as_str()).map_err(|e| invalid_url(url, &e))?;
    Ok(with_statement_logging(connect, options.trace_statements))
}

/// Renders column 0 of a SQLite row.
pub(super) fn first_column(row: &SqliteRow) -> DriverResult<Value> {
    let raw = row
        .try_get_raw(0)
        .map_err(|e| DriverError::query("SQLite returned no columns", e))?;
    if raw.is_null() {
        return Ok(Value::Null);
    }
    let type_name = raw.type_info().name().to_string();

    first_decodable!(row,
        String => Value::Text,
        i64 => Value::Integer,
        f64 => Value::Real,
        Vec<u8> => Value::Binary,
        bool => Value::Boolean,
    )
    .or_else(|| row.try_get_unchecked::<String, _>(0).ok().and_then(printable))
    .ok_or(DriverError::UnsupportedValue(type_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_url_with_credentials() {
        let url = DatabaseUrl::parse("jdbc:sqlite::memory:").expect("valid url");
        let options = connect_options(
            &url,
            &Credentials::new(Some("scott".to_string()), Some("tiger".to_string())),
            &DriverOptions {
                trace_statements: true,
                network_admin_dir: None,
            },
        )
        .expect("valid options");
        assert!(options.get_filename().to_string_lossy().contains("memory"));
    }
}
