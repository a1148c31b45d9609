//! Shape checks for loosely-typed catalog entries.
//!
//! Every helper takes the dotted context of the entry being compiled and
//! reports problems as [`CatalogIntegrityError`]s carrying that context.

use lintcat_json_path::coerce;
use serde_json::{Map, Value};

use crate::error::CatalogIntegrityError;

pub type Entry = Map<String, Value>;

/// Requires `value` to be a JSON object.
///
/// # Errors
///
/// * If `value` is not an object
pub fn require_object<'a>(
    value: &'a Value,
    context: &str,
    reason: &str,
) -> Result<&'a Entry, CatalogIntegrityError> {
    value
        .as_object()
        .ok_or_else(|| CatalogIntegrityError::new(context, reason))
}

/// Reads `key` as an optional string, verbatim.
///
/// # Errors
///
/// * If the value is present, not `null` and not a string
pub fn optional_string(
    entry: &Entry,
    key: &str,
    context: &str,
) -> Result<Option<String>, CatalogIntegrityError> {
    match entry.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) => Ok(Some(text.clone())),
        Some(_) => Err(CatalogIntegrityError::new(
            context,
            format!("'{key}' must be a string when provided"),
        )),
    }
}

/// Reads `key` as an optional string, trimmed. Blank strings become `None`.
///
/// # Errors
///
/// * If the value is present, not `null` and not a string
pub fn optional_trimmed_string(
    entry: &Entry,
    key: &str,
    context: &str,
) -> Result<Option<String>, CatalogIntegrityError> {
    Ok(optional_string(entry, key, context)?
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty()))
}

/// Reads `key` as an optional non-blank string, verbatim.
///
/// # Errors
///
/// * If the value is present and not a non-blank string
pub fn optional_non_empty_string(
    entry: &Entry,
    key: &str,
    context: &str,
) -> Result<Option<String>, CatalogIntegrityError> {
    match entry.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) if !text.trim().is_empty() => Ok(Some(text.clone())),
        Some(_) => Err(CatalogIntegrityError::new(
            context,
            format!("'{key}' must be a non-empty string when provided"),
        )),
    }
}

/// Accepts a string or an array. Array elements are rendered as strings and
/// `null` elements are skipped. An absent value is empty.
///
/// # Errors
///
/// * If the value is neither a string nor an array; `reason` is reported
pub fn string_or_list(
    value: Option<&Value>,
    context: &str,
    reason: &str,
) -> Result<Vec<String>, CatalogIntegrityError> {
    match value {
        None => Ok(vec![]),
        Some(Value::String(text)) => Ok(vec![text.clone()]),
        Some(Value::Array(items)) => Ok(items.iter().filter_map(coerce::to_optional_string).collect()),
        Some(_) => Err(CatalogIntegrityError::new(context, reason)),
    }
}

/// Accepts a string or an array whose elements must all be strings. `null`
/// and `[]` are empty.
///
/// # Errors
///
/// * If an array element is not a string
/// * If the value is neither a string nor an array
pub fn strict_string_list(
    value: Option<&Value>,
    field_name: &str,
    context: &str,
) -> Result<Vec<String>, CatalogIntegrityError> {
    match value {
        None | Some(Value::Null) => Ok(vec![]),
        Some(Value::String(text)) => Ok(vec![text.clone()]),
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                item.as_str().map(str::to_string).ok_or_else(|| {
                    CatalogIntegrityError::new(
                        context,
                        format!("expected '{field_name}[{index}]' to be a string"),
                    )
                })
            })
            .collect(),
        Some(_) => Err(CatalogIntegrityError::new(
            context,
            format!("'{field_name}' must be a string or array of strings"),
        )),
    }
}

/// Requires `key` to be a non-empty array of arguments.
///
/// # Errors
///
/// * If the value is missing or not an array
/// * If the array is empty
pub fn require_arguments(
    entry: &Entry,
    key: &str,
    context: &str,
) -> Result<Vec<String>, CatalogIntegrityError> {
    let Some(Value::Array(items)) = entry.get(key) else {
        return Err(CatalogIntegrityError::new(
            context,
            format!("expected '{key}' to be an array of arguments"),
        ));
    };

    let arguments = items.iter().map(coerce::to_display_string).collect::<Vec<_>>();
    if arguments.is_empty() {
        return Err(CatalogIntegrityError::new(
            context,
            format!("'{key}' must contain at least one argument"),
        ));
    }

    Ok(arguments)
}

/// Reads `key` with truthiness semantics, `default` when absent.
#[must_use]
pub fn truthy_flag(entry: &Entry, key: &str, default: bool) -> bool {
    entry.get(key).map_or(default, coerce::is_truthy)
}

/// Requires `key` to be a boolean when present.
///
/// # Errors
///
/// * If the value is present and not a boolean
pub fn strict_bool(
    entry: &Entry,
    key: &str,
    default: bool,
    context: &str,
) -> Result<bool, CatalogIntegrityError> {
    match entry.get(key) {
        None => Ok(default),
        Some(Value::Bool(flag)) => Ok(*flag),
        Some(_) => Err(CatalogIntegrityError::new(
            context,
            format!("'{key}' must be a boolean"),
        )),
    }
}
