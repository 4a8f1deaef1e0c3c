//! PostgreSQL connect options and first-column rendering.

use super::{invalid_url, printable, with_statement_logging};
use crate::credentials::Credentials;
use crate::drivers::{DatabaseUrl, DriverError, DriverOptions, DriverResult, Value};
use sqlx::postgres::{PgConnectOptions, PgRow};
use sqlx::types::chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sqlx::types::{Decimal, Uuid};
use sqlx::{Row, TypeInfo, ValueRef};
use std::str::FromStr;

/// Builds connect options from the URL, with configured credentials taking
/// precedence over any embedded in it.
pub(super) fn connect_options(
    url: &DatabaseUrl,
    credentials: &Credentials,
    options: &DriverOptions,
) -> DriverResult<PgConnectOptions> {
    let mut connect =
        PgConnectOptions::from_str(url.as_str()).map_err(|e| invalid_url(url, &e))?;
    if let Some(user) = credentials.user() {
        connect = connect.username(user);
    }
    if let Some(password) = credentials.password() {
        connect = connect.password(password);
    }
    Ok(with_statement_logging(connect, options.trace_statements))
}

/// Renders column 0 of a PostgreSQL row.
pub(super) fn first_column(row: &PgRow) -> DriverResult<Value> {
    let raw = row
        .try_get_raw(0)
        .map_err(|e| DriverError::query("PostgreSQL returned no columns", e))?;
    if raw.is_null() {
        return Ok(Value::Null);
    }
    let type_name = raw.type_info().name().to_string();

    first_decodable!(row,
        String => Value::Text,
        i64 => Value::Integer,
        i32 => |v: i32| Value::Integer(i64::from(v)),
        i16 => |v: i16| Value::Integer(i64::from(v)),
        // "char"
        i8 => |v: i8| Value::Text(char::from(u8::from_ne_bytes(v.to_ne_bytes())).to_string()),
        f64 => Value::Real,
        f32 => |v: f32| Value::Real(f64::from(v)),
        bool => Value::Boolean,
        Decimal => |v: Decimal| Value::Text(v.to_string()),
        DateTime<Utc> => |v: DateTime<Utc>| Value::Text(v.to_string()),
        NaiveDateTime => |v: NaiveDateTime| Value::Text(v.to_string()),
        NaiveDate => |v: NaiveDate| Value::Text(v.to_string()),
        NaiveTime => |v: NaiveTime| Value::Text(v.to_string()),
        Uuid => |v: Uuid| Value::Text(v.to_string()),
        Vec<u8> => Value::Binary,
    )
    .or_else(|| row.try_get_unchecked::<String, _>(0).ok().and_then(printable))
    .ok_or(DriverError::UnsupportedValue(type_name))
}
