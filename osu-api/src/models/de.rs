//! Field deserializers for API payloads
//!
//! The API encodes nearly every number as a JSON string (`"count300": "1234"`)
//! and sends `null` for stats a user does not have yet. These helpers accept
//! either a string or a bare JSON value.

use serde::de::Error;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::fmt::Display;
use std::str::FromStr;

fn parse_value<T, E>(value: Value) -> Result<Option<T>, E>
where
    T: FromStr,
    T::Err: Display,
    E: Error,
{
    let text = match value {
        Value::Null => return Ok(None),
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => u8::from(b).to_string(),
        other => return Err(E::custom(format!("expected a scalar, found {other}"))),
    };
    text.trim()
        .parse()
        .map(Some)
        .map_err(|e| E::custom(format!("cannot parse {text:?}: {e}")))
}

/// A required value parsed from a string or number
pub fn parsed<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: Display,
{
    parse_value::<T, D::Error>(Value::deserialize(deserializer)?)?
        .ok_or_else(|| D::Error::custom("unexpected null"))
}

/// A nullable value parsed from a string or number
pub fn optional<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: Display,
{
    parse_value(Value::deserialize(deserializer)?)
}

/// `"1"`/`"0"` flags
pub fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let n: u8 = parsed(deserializer)?;
    Ok(n != 0)
}

/// Nullable `"1"`/`"0"` flags
pub fn optional_flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let n: Option<u8> = optional(deserializer)?;
    Ok(n.map(|n| n != 0))
}

/// Space separated tag list
pub fn tags<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
    Ok(raw.split_whitespace().map(str::to_string).collect())
}
