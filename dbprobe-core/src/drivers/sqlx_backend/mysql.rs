//! MySQL and MariaDB connect options and first-column rendering.

use super::{invalid_url, printable, with_statement_logging};
use crate::credentials::Credentials;
use crate::drivers::{DatabaseUrl, DriverError, DriverOptions, DriverResult, Value};
use sqlx::mysql::{MySqlConnectOptions, MySqlRow};
use sqlx::types::Decimal;
use sqlx::types::chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sqlx::{Row, TypeInfo, ValueRef};
use std::str::FromStr;

pub(super) fn connect_options(
    url: &DatabaseUrl,
    credentials: &Credentials,
    options: &DriverOptions,
) -> DriverResult<MySqlConnectOptions> {
    let mut connect =
        MySqlConnectOptions::from_str(url.as_str()).map_err(|e| invalid_url(url, &e))?;
    if let Some(user) = credentials.user() {
        connect = connect.username(user);
    }
    if let Some(password) = credentials.password() {
        connect = connect.password(password);
    }
    Ok(with_statement_logging(connect, options.trace_statements))
}

/// Renders column 0 of a MySQL row.
pub(super) fn first_column(row: &MySqlRow) -> DriverResult<Value> {
    let raw = row
        .try_get_raw(0)
        .map_err(|e| DriverError::query("MySQL returned no columns", e))?;
    if raw.is_null() {
        return Ok(Value::Null);
    }
    let type_name = raw.type_info().name().to_string();

    first_decodable!(row,
        String => Value::Text,
        i64 => Value::Integer,
        u64 => |v: u64| i64::try_from(v).map_or_else(|_| Value::Text(v.to_string()), Value::Integer),
        f64 => Value::Real,
        f32 => |v: f32| Value::Real(f64::from(v)),
        bool => Value::Boolean,
        Decimal => |v: Decimal| Value::Text(v.to_string()),
        NaiveDateTime => |v: NaiveDateTime| Value::Text(v.to_string()),
        DateTime<Utc> => |v: DateTime<Utc>| Value::Text(v.to_string()),
        NaiveDate => |v: NaiveDate| Value::Text(v.to_string()),
        NaiveTime => |v: NaiveTime| Value::Text(v.to_string()),
        Vec<u8> => Value::Binary,
    )
    .or_else(|| row.try_get_unchecked::<String, _>(0).ok().and_then(printable))
    .ok_or(DriverError::UnsupportedValue(type_name))
}
