//! Parser strategies: compiled catalog entries that turn captured tool output
//! into [`RawDiagnostic`]s.
//!
//! Besides the declarative `parser_json_diagnostics` extractor, a tool may
//! name one of the built-in transforms:
//!
//! ```json
//! { "strategy": "json_parser", "config": { "transform": "ruff" } }
//! { "strategy": "text_parser", "config": { "transform": "tsc" } }
//! ```
//!
//! Transform names are resolved while the catalog is compiled, so a typo is
//! a [`CatalogIntegrityError`] rather than a tool that silently reports
//! nothing.

use std::{path::Path, str::FromStr};

use lintcat_json_path::coerce;
use serde_json::Value;
use strum_macros::{AsRefStr, Display, EnumString};

use crate::{
    context::ToolContext,
    diagnostics::{DiagnosticExtractor, InputFormat, RawDiagnostic, load_payload},
    entry::require_object,
    error::CatalogIntegrityError,
};

pub mod json;
pub mod text;

pub use json::JsonTransform;
pub use text::TextTransform;

/// Normalized severity labels emitted by the built-in transforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, AsRefStr, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Notice,
    Note,
}

impl Severity {
    /// Infers a severity from a rule code's leading letter: `E`/`F` are
    /// errors, `W` warnings, anything else `default`.
    #[must_use]
    pub fn from_code(code: Option<&str>, default: Self) -> Self {
        match code
            .and_then(|code| code.chars().next())
            .map(|first| first.to_ascii_uppercase())
        {
            Some('E' | 'F') => Self::Error,
            Some('W') => Self::Warning,
            _ => default,
        }
    }
}

impl From<Severity> for String {
    fn from(value: Severity) -> Self {
        value.as_ref().to_string()
    }
}

/// One of the compiled parser strategies.
#[derive(Debug, Clone, PartialEq)]
pub enum ParserStrategy {
    /// `parser_json_diagnostics`
    Diagnostics(DiagnosticExtractor),
    /// `json_parser`
    Json(JsonTransform),
    /// `text_parser`
    Text(TextTransform),
}

impl ParserStrategy {
    /// Parses captured output. Items without a message are dropped.
    #[must_use]
    pub fn parse(&self, stdout: &str, ctx: &ToolContext) -> Vec<RawDiagnostic> {
        let diagnostics = match self {
            Self::Diagnostics(extractor) => return extractor.parse_output(stdout),
            Self::Json(transform) => transform.apply(&load_payload(stdout, InputFormat::Json), ctx),
            Self::Text(transform) => transform.apply(stdout, ctx),
        };

        diagnostics
            .into_iter()
            .filter(|diagnostic| !diagnostic.message.is_empty())
            .collect()
    }

    #[must_use]
    pub const fn as_extractor(&self) -> Option<&DiagnosticExtractor> {
        match self {
            Self::Diagnostics(extractor) => Some(extractor),
            Self::Json(_) | Self::Text(_) => None,
        }
    }
}

impl From<DiagnosticExtractor> for ParserStrategy {
    fn from(value: DiagnosticExtractor) -> Self {
        Self::Diagnostics(value)
    }
}

impl From<JsonTransform> for ParserStrategy {
    fn from(value: JsonTransform) -> Self {
        Self::Json(value)
    }
}

impl From<TextTransform> for ParserStrategy {
    fn from(value: TextTransform) -> Self {
        Self::Text(value)
    }
}

/// Compiles a `json_parser` entry: `{ transform }`.
///
/// # Errors
///
/// * If `config` is not an object or `transform` is not a string
/// * If `transform` names no built-in JSON transform
pub fn compile_json_parser(config: &Value) -> Result<JsonTransform, CatalogIntegrityError> {
    compile_transform(config, "json_parser")
}

/// Compiles a `text_parser` entry: `{ transform }`.
///
/// # Errors
///
/// * If `config` is not an object or `transform` is not a string
/// * If `transform` names no built-in text transform
pub fn compile_text_parser(config: &Value) -> Result<TextTransform, CatalogIntegrityError> {
    compile_transform(config, "text_parser")
}

fn compile_transform<T: FromStr>(config: &Value, context: &str) -> Result<T, CatalogIntegrityError> {
    let config = require_object(config, context, "configuration must be an object")?;

    let name = config
        .get("transform")
        .and_then(Value::as_str)
        .ok_or_else(|| CatalogIntegrityError::new(context, "expected 'transform' to be a string"))?
        .trim();

    log::debug!("compile_transform: {context} transform={name}");

    T::from_str(name).map_err(|_| {
        CatalogIntegrityError::new(
            format!("{context}.transform"),
            format!("unknown transform '{name}'"),
        )
    })
}

/// Reads the first of `keys` that holds a non-empty string.
fn first_str<'a>(item: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|key| item.get(key).and_then(Value::as_str))
        .find(|text| !text.is_empty())
}

/// Reads the first of `keys` that coerces to an integer.
fn first_int(item: &Value, keys: &[&str]) -> Option<i64> {
    keys.iter()
        .filter_map(|key| item.get(key))
        .find_map(coerce::to_int)
}

/// Reads the first of `keys` that holds a non-empty string, trimmed.
fn first_message(item: &Value, keys: &[&str]) -> String {
    first_str(item, keys).map_or_else(String::new, |text| text.trim().to_string())
}

/// Array elements, or nothing when `value` is not an array.
fn array(value: Option<&Value>) -> &[Value] {
    value.and_then(Value::as_array).map_or(&[], Vec::as_slice)
}

/// Rewrites an absolute reported path under `root` as root-relative. Other
/// paths are kept as reported.
fn normalize_reported_path(path: Option<&str>, root: &Path) -> Option<String> {
    let path = path.filter(|path| !path.is_empty())?;

    Some(
        Path::new(path)
            .strip_prefix(root)
            .map_or_else(|_| path.to_string(), |relative| relative.display().to_string()),
    )
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test_log::test]
    fn test_severity_from_code() {
        assert_eq!(Severity::from_code(Some("E501"), Severity::Warning), Severity::Error);
        assert_eq!(Severity::from_code(Some("f401"), Severity::Warning), Severity::Error);
        assert_eq!(Severity::from_code(Some("W291"), Severity::Notice), Severity::Warning);
        assert_eq!(Severity::from_code(Some("C901"), Severity::Notice), Severity::Notice);
        assert_eq!(Severity::from_code(None, Severity::Warning), Severity::Warning);
        assert_eq!(String::from(Severity::Notice), "notice");
    }

    #[test_log::test]
    fn test_compile_known_transforms() {
        assert_eq!(
            compile_json_parser(&json!({"transform": "ruff"})).unwrap(),
            JsonTransform::Ruff
        );
        assert_eq!(
            compile_json_parser(&json!({"transform": " golangci_lint "})).unwrap(),
            JsonTransform::GolangciLint
        );
        assert_eq!(
            compile_text_parser(&json!({"transform": "dotenv_linter"})).unwrap(),
            TextTransform::DotenvLinter
        );
    }

    #[test_log::test]
    fn test_compile_transform_errors() {
        let error = compile_json_parser(&json!({"transform": "nope"})).unwrap_err();
        assert_eq!(error.context, "json_parser.transform");
        assert_eq!(error.reason, "unknown transform 'nope'");

        let error = compile_text_parser(&json!({"transform": "ruff"})).unwrap_err();
        assert_eq!(error.to_string(), "text_parser.transform: unknown transform 'ruff'");

        let error = compile_json_parser(&json!({"transform": 1})).unwrap_err();
        assert_eq!(error.to_string(), "json_parser: expected 'transform' to be a string");

        let error = compile_text_parser(&json!([])).unwrap_err();
        assert_eq!(error.to_string(), "text_parser: configuration must be an object");
    }

    #[test_log::test]
    fn test_normalize_reported_path() {
        let root = Path::new("/repo");
        assert_eq!(
            normalize_reported_path(Some("/repo/src/a.py"), root).as_deref(),
            Some("src/a.py")
        );
        assert_eq!(
            normalize_reported_path(Some("/elsewhere/a.py"), root).as_deref(),
            Some("/elsewhere/a.py")
        );
        assert_eq!(normalize_reported_path(Some("a.py"), root).as_deref(), Some("a.py"));
        assert_eq!(normalize_reported_path(Some(""), root), None);
    }

    #[test_log::test]
    fn test_parse_drops_empty_messages() {
        let ctx = ToolContext::builder("/repo").build();
        let parser = ParserStrategy::from(JsonTransform::Hadolint);

        let diagnostics = parser.parse(
            r#"[{"file": "Dockerfile", "line": 1, "message": ""}, {"file": "Dockerfile", "line": 2, "message": "use COPY", "level": "error", "code": "DL3020"}]"#,
            &ctx,
        );

        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].line, Some(2));
        assert_eq!(diagnostics[0].severity.as_deref(), Some("error"));
    }
}
