//! Typed parsing of single query parameters.
//!
//! Every failure is a `BadRequest` with the message
//! `invalid search param [<name>]: <reason>`.

use crate::context::{Query, QueryValue};
use crate::error::RespError;

fn search_param_error(name: &str, reason: impl std::fmt::Display) -> RespError {
    RespError::bad_request(format!("invalid search param [{}]: {}", name, reason))
}

/// The parameter's single value, `None` when absent.
fn single<'q>(query: &'q Query, name: &str) -> Result<Option<&'q str>, RespError> {
    match query.get(name) {
        None => Ok(None),
        Some(QueryValue::Single(value)) => Ok(Some(value)),
        Some(QueryValue::Multiple(_)) => Err(search_param_error(name, "expected a single value")),
    }
}

/// Absent is `false`; a bare flag (`?name`) is `true`.
pub fn parse_bool_query_value(query: &Query, name: &str) -> Result<bool, RespError> {
    match single(query, name)? {
        None => Ok(false),
        Some("" | "true" | "1") => Ok(true),
        Some("false" | "0") => Ok(false),
        Some(_) => Err(search_param_error(name, "expected true, 1, false, or 0")),
    }
}

/// A non-negative integer made only of ASCII digits.
pub fn parse_int_query_value(
    query: &Query,
    name: &str,
    default: Option<u64>,
) -> Result<Option<u64>, RespError> {
    let Some(raw) = single(query, name)? else {
        return Ok(default);
    };
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(search_param_error(name, "expected an integer"));
    }
    raw.parse()
        .map(Some)
        .map_err(|_| search_param_error(name, "expected an integer"))
}

/// One of a fixed set of string options.
pub fn parse_enum_query_value<'a>(
    query: &Query,
    name: &str,
    options: &[&'a str],
    default: Option<&'a str>,
) -> Result<Option<&'a str>, RespError> {
    let Some(raw) = single(query, name)? else {
        return Ok(default);
    };
    match options.iter().find(|option| **option == raw) {
        Some(option) => Ok(Some(*option)),
        None => Err(search_param_error(
            name,
            format!("invalid option [{}], expected one of \"{}\"", raw, options.join("\",\"")),
        )),
    }
}
