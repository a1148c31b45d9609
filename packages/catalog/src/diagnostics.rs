//! Declarative extraction of diagnostics from JSON tool output.
//!
//! A `parser_json_diagnostics` entry names an item path (where the
//! diagnostics live in the payload) and one [`FieldSpec`] per
//! [`RawDiagnostic`] attribute. Extraction never fails: items that do not
//! fit are skipped.

use std::{collections::BTreeMap, str::FromStr as _};

use lintcat_json_path::{PathExpression, coerce};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum_macros::{AsRefStr, EnumIter, EnumString};

use crate::{
    entry::{Entry, require_object},
    error::CatalogIntegrityError,
};

const CONTEXT: &str = "parser_json_diagnostics";

/// Canonical, tool-agnostic diagnostic record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDiagnostic {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    /// 1-based.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<i64>,
    /// 1-based.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function: Option<String>,
}

impl RawDiagnostic {
    /// A diagnostic carrying only a message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            file: None,
            line: None,
            column: None,
            severity: None,
            message: message.into(),
            code: None,
            tool: None,
            group: None,
            function: None,
        }
    }
}

/// The attributes a [`FieldSpec`] may populate.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, EnumString, AsRefStr, EnumIter,
)]
#[strum(serialize_all = "lowercase")]
pub enum DiagnosticField {
    File,
    Line,
    Column,
    Code,
    Message,
    Severity,
    Tool,
    Group,
    Function,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, EnumString, AsRefStr)]
pub enum InputFormat {
    /// One JSON document, or one document per line when the whole output does
    /// not parse.
    #[default]
    #[strum(serialize = "json")]
    Json,
    /// One JSON document per line.
    #[strum(to_string = "json-lines", serialize = "jsonlines", serialize = "ndjson")]
    JsonLines,
}

#[derive(Debug, Clone, PartialEq)]
enum FieldSource {
    /// Returned unconditionally.
    Constant(Value),
    /// `None` only ever yields the default.
    Path(Option<PathExpression>),
}

/// Resolution rule for one diagnostic attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    field: DiagnosticField,
    source: FieldSource,
    default: Option<Value>,
    remap: BTreeMap<String, Value>,
}

impl FieldSpec {
    /// Compiles the mapping for `field`: either a path string or an object
    /// with `path`, `value`, `default` and `map`.
    ///
    /// # Errors
    ///
    /// * If `raw` is neither a string nor an object
    /// * If `path` is not a string, or contains a wildcard or unmatched `[`
    /// * If `map` is not an object
    pub fn compile(field: DiagnosticField, raw: &Value) -> Result<Self, CatalogIntegrityError> {
        let name = field.as_ref();

        let spec = match raw {
            Value::String(path) => return Ok(Self::from_path(field, Some(parse_field_path(path)?))),
            Value::Object(spec) => spec,
            _ => {
                return Err(CatalogIntegrityError::new(
                    CONTEXT,
                    format!("mapping for field '{name}' must be a string or object"),
                ));
            }
        };

        let path = match spec.get("path") {
            None | Some(Value::Null) => None,
            Some(Value::String(path)) => Some(parse_field_path(path)?),
            Some(_) => {
                return Err(CatalogIntegrityError::new(
                    CONTEXT,
                    format!("field '{name}' has non-string 'path' configuration"),
                ));
            }
        };

        let remap = match spec.get("map") {
            None | Some(Value::Null) => BTreeMap::new(),
            Some(Value::Object(map)) => map
                .iter()
                .flat_map(|(key, value)| {
                    [(casefold(key), value.clone()), (key.clone(), value.clone())]
                })
                .collect(),
            Some(_) => {
                return Err(CatalogIntegrityError::new(
                    CONTEXT,
                    format!("field '{name}' has non-object 'map' configuration"),
                ));
            }
        };

        let source = spec
            .get("value")
            .map_or(FieldSource::Path(path), |value| {
                FieldSource::Constant(value.clone())
            });

        Ok(Self {
            field,
            source,
            default: spec.get("default").filter(|value| !value.is_null()).cloned(),
            remap,
        })
    }

    const fn from_path(field: DiagnosticField, path: Option<PathExpression>) -> Self {
        Self {
            field,
            source: FieldSource::Path(path),
            default: None,
            remap: BTreeMap::new(),
        }
    }

    #[must_use]
    pub const fn field(&self) -> DiagnosticField {
        self.field
    }

    /// Resolves the field against one item. `None` means absent; a `null`
    /// result is reported as absent too.
    ///
    /// A constant wins over everything. Otherwise the path is extracted and,
    /// when a remap table exists, translated; unknown or missing values fall
    /// back to the default.
    #[must_use]
    pub fn resolve(&self, item: &Value) -> Option<Value> {
        let path = match &self.source {
            FieldSource::Constant(value) => return Some(value.clone()).filter(|v| !v.is_null()),
            FieldSource::Path(path) => path.as_ref(),
        };

        let Some(value) = path
            .and_then(|path| path.extract(item))
            .filter(|value| !value.is_null())
        else {
            return self.default.clone();
        };

        if self.remap.is_empty() {
            return Some(value.clone());
        }

        self.remap_value(value)
            .cloned()
            .or_else(|| self.default.clone())
    }

    fn remap_value(&self, value: &Value) -> Option<&Value> {
        let mapped = match value {
            Value::String(text) => self
                .remap
                .get(&casefold(text))
                .or_else(|| self.remap.get(text)),
            other => self.remap.get(&casefold(&coerce::to_display_string(other))),
        };
        mapped.filter(|value| !value.is_null())
    }
}

/// Caseless key for remap lookups. Lowercases, then expands `ß` so that
/// `STRASSE` and `straße` meet.
fn casefold(text: &str) -> String {
    text.to_lowercase().replace('ß', "ss")
}

fn parse_field_path(path: &str) -> Result<PathExpression, CatalogIntegrityError> {
    PathExpression::parse(path, false)
        .map_err(|error| CatalogIntegrityError::from_path(CONTEXT, &error))
}

/// Turns JSON tool output into [`RawDiagnostic`]s.
#[derive(Debug, Clone, PartialEq)]
pub struct DiagnosticExtractor {
    item_path: Option<PathExpression>,
    input_format: InputFormat,
    fields: BTreeMap<DiagnosticField, FieldSpec>,
}

impl DiagnosticExtractor {
    /// Compiles a `parser_json_diagnostics` entry:
    /// `{ path?, inputFormat?, mappings }`.
    ///
    /// # Errors
    ///
    /// * If `config` is not an object
    /// * If `path` is not a string or does not tokenize
    /// * If `inputFormat` is not `json`/`json-lines`
    /// * If `mappings` is not an object, names an unknown field, has a
    ///   malformed field spec or lacks `message`
    pub fn from_config(config: &Value) -> Result<Self, CatalogIntegrityError> {
        let config = require_object(config, CONTEXT, "configuration must be an object")?;

        let item_path = match config.get("path") {
            None | Some(Value::Null) => None,
            Some(Value::String(path)) if path.trim().is_empty() => None,
            Some(Value::String(path)) => Some(
                PathExpression::parse(path, true)
                    .map_err(|error| CatalogIntegrityError::from_path(CONTEXT, &error))?,
            ),
            Some(_) => return Err(CatalogIntegrityError::new(CONTEXT, "'path' must be a string")),
        };

        let input_format = parse_input_format(config)?;

        let mappings = config
            .get("mappings")
            .and_then(Value::as_object)
            .ok_or_else(|| CatalogIntegrityError::new(CONTEXT, "'mappings' must be an object"))?;

        Self::new(item_path, input_format, mappings)
    }

    /// Builds an extractor from already-split parts.
    ///
    /// # Errors
    ///
    /// * If `mappings` names an unknown field or has a malformed field spec
    /// * If `mappings` has no entry for `message`
    pub fn new(
        item_path: Option<PathExpression>,
        input_format: InputFormat,
        mappings: &Entry,
    ) -> Result<Self, CatalogIntegrityError> {
        let mut fields = BTreeMap::new();

        for (name, raw) in mappings {
            let field = DiagnosticField::from_str(name).map_err(|_| {
                CatalogIntegrityError::new(
                    CONTEXT,
                    format!("unsupported field '{name}' in mappings"),
                )
            })?;
            fields.insert(field, FieldSpec::compile(field, raw)?);
        }

        if !fields.contains_key(&DiagnosticField::Message) {
            return Err(CatalogIntegrityError::new(
                CONTEXT,
                "missing required field mapping(s): message",
            ));
        }

        log::debug!(
            "DiagnosticExtractor: item_path={} input_format={} fields={:?}",
            item_path
                .as_ref()
                .map_or_else(|| "<payload>".to_string(), ToString::to_string),
            input_format.as_ref(),
            fields.keys().collect::<Vec<_>>(),
        );

        Ok(Self {
            item_path,
            input_format,
            fields,
        })
    }

    #[must_use]
    pub const fn input_format(&self) -> InputFormat {
        self.input_format
    }

    #[must_use]
    pub const fn item_path(&self) -> Option<&PathExpression> {
        self.item_path.as_ref()
    }

    /// Extracts every diagnostic from an already-parsed payload.
    #[must_use]
    pub fn transform(&self, payload: &Value) -> Vec<RawDiagnostic> {
        self.items(payload)
            .into_iter()
            .filter(|item| item.is_object())
            .filter_map(|item| self.build(item))
            .collect()
    }

    /// Parses raw process output according to the input format, then
    /// extracts diagnostics. Unparsable output yields no diagnostics.
    #[must_use]
    pub fn parse_output(&self, stdout: &str) -> Vec<RawDiagnostic> {
        self.transform(&load_payload(stdout, self.input_format))
    }

    fn items<'a>(&self, payload: &'a Value) -> Vec<&'a Value> {
        match (&self.item_path, payload) {
            (Some(path), payload) => path.evaluate(payload),
            (None, Value::Array(items)) => items.iter().collect(),
            (None, Value::Null) => vec![],
            (None, payload) => vec![payload],
        }
    }

    fn field(&self, field: DiagnosticField, item: &Value) -> Option<Value> {
        self.fields.get(&field).and_then(|spec| spec.resolve(item))
    }

    fn build(&self, item: &Value) -> Option<RawDiagnostic> {
        let Some(message) = self.field(DiagnosticField::Message, item) else {
            log::trace!("DiagnosticExtractor: dropping item without message");
            return None;
        };
        let message = coerce::to_display_string(&message);
        if message.is_empty() {
            log::trace!("DiagnosticExtractor: dropping item with empty message");
            return None;
        }

        let text = |field| {
            self.field(field, item)
                .as_ref()
                .and_then(coerce::to_optional_string)
        };
        let int = |field| self.field(field, item).as_ref().and_then(coerce::to_int);

        Some(RawDiagnostic {
            file: text(DiagnosticField::File),
            line: int(DiagnosticField::Line),
            column: int(DiagnosticField::Column),
            severity: text(DiagnosticField::Severity),
            message,
            code: text(DiagnosticField::Code),
            tool: text(DiagnosticField::Tool),
            group: text(DiagnosticField::Group),
            function: text(DiagnosticField::Function),
        })
    }
}

fn parse_input_format(config: &Entry) -> Result<InputFormat, CatalogIntegrityError> {
    match config.get("inputFormat") {
        None | Some(Value::Null) => Ok(InputFormat::Json),
        Some(Value::String(raw)) => InputFormat::from_str(&raw.trim().to_lowercase())
            .map_err(|_| {
                CatalogIntegrityError::new(
                    CONTEXT,
                    "'inputFormat' must be one of 'json' or 'json-lines'",
                )
            }),
        Some(_) => Err(CatalogIntegrityError::new(
            CONTEXT,
            "'inputFormat' must be a string when provided",
        )),
    }
}

/// Loads captured output into a single payload.
///
/// Empty output is an empty array. Multi-document output becomes an array of
/// the documents that parse.
#[must_use]
pub fn load_payload(stdout: &str, format: InputFormat) -> Value {
    let stdout = stdout.trim();
    if stdout.is_empty() {
        return Value::Array(vec![]);
    }

    if format == InputFormat::Json {
        match serde_json::from_str(stdout) {
            Ok(payload) => return payload,
            Err(e) => log::debug!("load_payload: falling back to line-by-line parsing: {e:?}"),
        }
    }

    Value::Array(
        stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn spec(field: DiagnosticField, raw: Value) -> FieldSpec {
        FieldSpec::compile(field, &raw).unwrap()
    }

    #[test_log::test]
    fn test_constant_wins_over_path() {
        let spec = spec(DiagnosticField::Tool, json!({"path": "tool", "value": "bandit"}));
        assert_eq!(spec.resolve(&json!({"tool": "other"})), Some(json!("bandit")));
    }

    #[test_log::test]
    fn test_default_only_when_path_missing() {
        let spec = spec(DiagnosticField::Code, json!({"path": "rule", "default": "E000"}));
        assert_eq!(spec.resolve(&json!({"rule": "E501"})), Some(json!("E501")));
        assert_eq!(spec.resolve(&json!({"other": 1})), Some(json!("E000")));
        assert_eq!(spec.resolve(&json!({"rule": null})), Some(json!("E000")));
    }

    #[test_log::test]
    fn test_remap_is_case_insensitive_and_defaults_unknowns() {
        let spec = spec(
            DiagnosticField::Severity,
            json!({"path": "level", "map": {"Low": "notice", "high": "error", "2": "warning"}, "default": "warning"}),
        );

        assert_eq!(spec.resolve(&json!({"level": "HIGH"})), Some(json!("error")));
        assert_eq!(spec.resolve(&json!({"level": "low"})), Some(json!("notice")));
        assert_eq!(spec.resolve(&json!({"level": "Low"})), Some(json!("notice")));
        assert_eq!(spec.resolve(&json!({"level": 2})), Some(json!("warning")));
        assert_eq!(spec.resolve(&json!({"level": "weird"})), Some(json!("warning")));
    }

    #[test_log::test]
    fn test_remap_folds_sharp_s() {
        let spec = spec(
            DiagnosticField::Group,
            json!({"path": "street", "map": {"straße": "road"}}),
        );

        assert_eq!(spec.resolve(&json!({"street": "STRASSE"})), Some(json!("road")));
        assert_eq!(spec.resolve(&json!({"street": "Straße"})), Some(json!("road")));
        assert_eq!(casefold("STRASSE"), casefold("straße"));
    }

    #[test_log::test]
    fn test_remap_without_default_is_absent_for_unknowns() {
        let spec = spec(DiagnosticField::Severity, json!({"path": "level", "map": {"e": "error"}}));
        assert_eq!(spec.resolve(&json!({"level": "x"})), None);
    }

    #[test_log::test]
    fn test_spec_without_path_uses_default() {
        let spec = spec(DiagnosticField::Group, json!({"default": "security"}));
        assert_eq!(spec.resolve(&json!({"group": "ignored"})), Some(json!("security")));
        assert_eq!(
            FieldSpec::compile(DiagnosticField::Group, &json!({})).unwrap().resolve(&json!({})),
            None
        );
    }

    #[test_log::test]
    fn test_field_spec_errors() {
        let error = |raw: Value| {
            FieldSpec::compile(DiagnosticField::Line, &raw)
                .unwrap_err()
                .to_string()
        };

        assert_eq!(
            error(json!(3)),
            "parser_json_diagnostics: mapping for field 'line' must be a string or object"
        );
        assert_eq!(
            error(json!({"path": 3})),
            "parser_json_diagnostics: field 'line' has non-string 'path' configuration"
        );
        assert_eq!(
            error(json!({"path": "x", "map": []})),
            "parser_json_diagnostics: field 'line' has non-object 'map' configuration"
        );
        assert_eq!(
            error(json!("items[*].line")),
            "parser_json_diagnostics: wildcards are not permitted in field paths ('items[*].line')"
        );
        assert_eq!(
            error(json!("items[0")),
            "parser_json_diagnostics: unmatched '[' in path 'items[0'"
        );
    }

    #[test_log::test]
    fn test_extractor_requires_message() {
        let error = DiagnosticExtractor::from_config(&json!({"mappings": {"file": "f"}})).unwrap_err();
        assert_eq!(
            error.to_string(),
            "parser_json_diagnostics: missing required field mapping(s): message"
        );
    }

    #[test_log::test]
    fn test_extractor_config_errors() {
        let error = |config: Value| {
            DiagnosticExtractor::from_config(&config)
                .unwrap_err()
                .reason
        };

        assert_eq!(error(json!([])), "configuration must be an object");
        assert_eq!(error(json!({"mappings": []})), "'mappings' must be an object");
        assert_eq!(error(json!({"path": 1, "mappings": {}})), "'path' must be a string");
        assert_eq!(
            error(json!({"inputFormat": "xml", "mappings": {"message": "m"}})),
            "'inputFormat' must be one of 'json' or 'json-lines'"
        );
        assert_eq!(
            error(json!({"inputFormat": true, "mappings": {"message": "m"}})),
            "'inputFormat' must be a string when provided"
        );
        assert_eq!(
            error(json!({"mappings": {"message": "m", "rule": "r"}})),
            "unsupported field 'rule' in mappings"
        );
    }

    #[test_log::test]
    fn test_input_format_aliases() {
        for raw in ["json-lines", " NDJSON ", "jsonlines"] {
            let extractor = DiagnosticExtractor::from_config(
                &json!({"inputFormat": raw, "mappings": {"message": "m"}}),
            )
            .unwrap();
            assert_eq!(extractor.input_format(), InputFormat::JsonLines);
        }
        assert_eq!(InputFormat::JsonLines.as_ref(), "json-lines");
    }

    #[test_log::test]
    fn test_items_without_path() {
        let extractor =
            DiagnosticExtractor::from_config(&json!({"mappings": {"message": "msg"}})).unwrap();

        assert_eq!(
            extractor.transform(&json!([{"msg": "a"}, "noise", {"other": 1}, {"msg": "b"}])),
            vec![RawDiagnostic::new("a"), RawDiagnostic::new("b")]
        );
        assert_eq!(extractor.transform(&json!({"msg": "single"})), vec![RawDiagnostic::new("single")]);
        assert!(extractor.transform(&Value::Null).is_empty());
    }

    #[test_log::test]
    fn test_numeric_fields_are_lenient() {
        let extractor = DiagnosticExtractor::from_config(
            &json!({"mappings": {"message": "m", "line": "l", "column": "c", "code": "code"}}),
        )
        .unwrap();

        let diagnostics = extractor.transform(&json!([
            {"m": "x", "l": "12", "c": true, "code": 501},
            {"m": "y", "l": "twelve", "c": 3.0},
        ]));

        assert_eq!(diagnostics[0].line, Some(12));
        assert_eq!(diagnostics[0].column, Some(1));
        assert_eq!(diagnostics[0].code.as_deref(), Some("501"));
        assert_eq!(diagnostics[1].line, None);
        assert_eq!(diagnostics[1].column, Some(3));
    }

    #[test_log::test]
    fn test_empty_message_is_dropped() {
        let extractor =
            DiagnosticExtractor::from_config(&json!({"mappings": {"message": "m"}})).unwrap();
        assert!(extractor.transform(&json!([{"m": ""}, {"m": null}])).is_empty());
    }

    #[test_log::test]
    fn test_load_payload() {
        assert_eq!(load_payload("  \n", InputFormat::Json), json!([]));
        assert_eq!(load_payload("{\"a\": 1}", InputFormat::Json), json!({"a": 1}));
        assert_eq!(
            load_payload("{\"a\": 1}\nnot json\n{\"a\": 2}\n", InputFormat::Json),
            json!([{"a": 1}, {"a": 2}])
        );
        assert_eq!(
            load_payload("[1, 2]", InputFormat::JsonLines),
            json!([[1, 2]])
        );
    }

    #[test_log::test]
    fn test_raw_diagnostic_serializes_without_absent_fields() {
        let mut diagnostic = RawDiagnostic::new("risk");
        diagnostic.line = Some(5);
        assert_eq!(
            serde_json::to_value(&diagnostic).unwrap(),
            json!({"line": 5, "message": "risk"})
        );
    }
}
