//! Tolerant deserializers for loosely-typed backend fields.
//!
//! Decimal columns come back as `1200.00`, `"1200.00"`, `null` or missing
//! depending on the endpoint. Anything that is not a finite number becomes 0.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Coerce a JSON value to `f64`, defaulting to 0.
pub fn to_number(value: &Value) -> f64 {
    let n = match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    if n.is_finite() { n } else { 0.0 }
}

/// Coerce a JSON value to an identifier string. Numbers are rendered
/// without a fractional part; null becomes `None`.
pub fn to_identifier(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_owned()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub fn number<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(to_number(&value))
}

/// Like [`number`], but null or missing stays `None`.
pub fn optional_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Null => None,
        other => Some(to_number(&other)),
    })
}

pub fn identifier<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(to_identifier(&value).unwrap_or_default())
}

pub fn optional_identifier<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(to_identifier(&value))
}

/// Free text that may arrive as a number (e.g. a baseline of `12`) or null.
pub fn text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    })
}
