//! Lenient conversions from loosely-typed JSON values.
//!
//! Tool output and tool settings are not trusted to have the right shape.
//! Every conversion here degrades to `None`/empty instead of failing.

use serde_json::Value;

const TRUE_LITERALS: [&str; 4] = ["1", "true", "yes", "on"];
const FALSE_LITERALS: [&str; 4] = ["0", "false", "no", "off"];

/// Converts a value to an integer.
///
/// * `true`/`false` become `1`/`0`
/// * integral numbers (including whole floats) are returned as-is
/// * strings are trimmed and parsed as base-10 integers
///
/// Anything else, including unparsable strings, yields `None`.
#[must_use]
pub fn to_int(value: &Value) -> Option<i64> {
    match value {
        Value::Bool(flag) => Some(i64::from(*flag)),
        Value::Number(number) => number.as_i64().or_else(|| {
            number
                .as_f64()
                .filter(|float| float.fract() == 0.0 && float.is_finite())
                .and_then(float_to_int)
        }),
        Value::String(text) => text.trim().parse().ok(),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Renders a value as a single command-line token.
///
/// Strings are used verbatim; every other value uses its JSON text.
#[must_use]
pub fn to_display_string(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Renders a value as a string unless it is `null`.
#[must_use]
pub fn to_optional_string(value: &Value) -> Option<String> {
    if value.is_null() {
        None
    } else {
        Some(to_display_string(value))
    }
}

/// Coerces a setting value into a list of strings.
///
/// `null` is empty, a string is a one-element list, arrays render each
/// non-null element and any other scalar is rendered as one element.
#[must_use]
pub fn to_string_list(value: &Value) -> Vec<String> {
    match value {
        Value::Null => vec![],
        Value::Array(items) => items.iter().filter_map(to_optional_string).collect(),
        other => vec![to_display_string(other)],
    }
}

/// Python-style truthiness: `null`, `false`, zero, and empty strings/arrays/maps
/// are falsy.
#[must_use]
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|float| float != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Parses an explicit boolean literal (`1/true/yes/on`, `0/false/no/off`),
/// ignoring surrounding whitespace and case.
#[must_use]
pub fn parse_bool_literal(text: &str) -> Option<bool> {
    let normalized = text.trim().to_ascii_lowercase();
    if TRUE_LITERALS.contains(&normalized.as_str()) {
        Some(true)
    } else if FALSE_LITERALS.contains(&normalized.as_str()) {
        Some(false)
    } else {
        None
    }
}

/// Interprets a value as a boolean.
///
/// `null` stays `None`. Strings use [`parse_bool_literal`] and fall back to
/// non-emptiness; other values use [`is_truthy`].
#[must_use]
pub fn interpret_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Null => None,
        Value::Bool(flag) => Some(*flag),
        Value::String(text) => Some(parse_bool_literal(text).unwrap_or(!text.is_empty())),
        other => Some(is_truthy(other)),
    }
}

/// Coerces a value into a non-negative repeat count.
///
/// `true` is 1 and `false` is 0. Numbers truncate toward zero and are floored
/// at 0. Strings must hold an integer. Everything else is 0.
#[must_use]
pub fn repeat_count(value: &Value) -> u64 {
    let count = match value {
        Value::Bool(flag) => i64::from(*flag),
        Value::Number(number) => number.as_i64().unwrap_or_else(|| {
            number
                .as_u64()
                .map(|unsigned| i64::try_from(unsigned).unwrap_or(i64::MAX))
                .or_else(|| number.as_f64().map(f64::trunc).and_then(float_to_int))
                .unwrap_or(0)
        }),
        Value::String(text) => text.trim().parse().unwrap_or(0),
        Value::Null | Value::Array(_) | Value::Object(_) => 0,
    };

    u64::try_from(count.max(0)).unwrap_or(0)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn float_to_int(float: f64) -> Option<i64> {
    if float.is_finite() && float >= i64::MIN as f64 && float <= i64::MAX as f64 {
        Some(float as i64)
    } else {
        None
    }
}
