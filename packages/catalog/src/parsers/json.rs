//! Built-in transforms for tools that report diagnostics as JSON.

use itertools::Itertools as _;
use lintcat_json_path::coerce;
use serde_json::Value;
use strum_macros::{AsRefStr, EnumIter, EnumString};

use super::{Severity, array, first_int, first_message, first_str, normalize_reported_path};
use crate::{context::ToolContext, diagnostics::RawDiagnostic};

/// Named JSON payload transforms available to `json_parser`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, AsRefStr, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum JsonTransform {
    Ruff,
    Pylint,
    Pyright,
    Mypy,
    Selene,
    Eslint,
    Stylelint,
    Actionlint,
    Hadolint,
    Bandit,
    Sqlfluff,
    GolangciLint,
    CargoClippy,
    KubeLinter,
    Dockerfilelint,
}

impl JsonTransform {
    /// Converts an already-loaded payload. Shapes the tool does not produce
    /// yield no diagnostics.
    #[must_use]
    pub fn apply(self, payload: &Value, ctx: &ToolContext) -> Vec<RawDiagnostic> {
        match self {
            Self::Ruff => ruff(payload, ctx),
            Self::Pylint => pylint(payload, ctx),
            Self::Pyright => pyright(payload, ctx),
            Self::Mypy => mypy(payload, ctx),
            Self::Selene => selene(payload, ctx),
            Self::Eslint => eslint(payload),
            Self::Stylelint => stylelint(payload),
            Self::Actionlint => actionlint(payload),
            Self::Hadolint => hadolint(payload),
            Self::Bandit => bandit(payload),
            Self::Sqlfluff => sqlfluff(payload),
            Self::GolangciLint => golangci_lint(payload),
            Self::CargoClippy => cargo_clippy(payload),
            Self::KubeLinter => kube_linter(payload),
            Self::Dockerfilelint => dockerfilelint(payload),
        }
    }
}

/// Payload as a list of records: an array as-is, a lone object as one record.
fn records(payload: &Value) -> &[Value] {
    match payload {
        Value::Array(items) => items,
        Value::Object(_) => std::slice::from_ref(payload),
        _ => &[],
    }
}

/// Items under the first of `keys` when the payload is an object, else the
/// payload itself when it is an array.
fn keyed_items<'a>(payload: &'a Value, keys: &[&str]) -> &'a [Value] {
    match payload {
        Value::Array(items) => items,
        Value::Object(map) => array(keys.iter().find_map(|key| map.get(*key))),
        _ => &[],
    }
}

fn lookup<'a>(value: &'a Value, pointer: &str) -> Option<&'a Value> {
    value.pointer(pointer).filter(|value| !value.is_null())
}

fn label(value: Option<&str>) -> Option<String> {
    value.map(str::to_lowercase)
}

fn ruff(payload: &Value, ctx: &ToolContext) -> Vec<RawDiagnostic> {
    keyed_items(payload, &["diagnostics"])
        .iter()
        .filter(|item| item.is_object())
        .map(|item| {
            let code = first_str(item, &["code"]).map(ToString::to_string);
            RawDiagnostic {
                file: normalize_reported_path(first_str(item, &["filename", "file"]), ctx.root()),
                line: lookup(item, "/location/row").and_then(coerce::to_int),
                column: lookup(item, "/location/column").and_then(coerce::to_int),
                severity: Some(Severity::from_code(code.as_deref(), Severity::Warning).into()),
                code,
                tool: Some("ruff".to_string()),
                ..RawDiagnostic::new(first_message(item, &["message"]))
            }
        })
        .collect()
}

fn pylint_severity(kind: Option<&str>) -> Severity {
    match label(kind).as_deref() {
        Some("fatal" | "error") => Severity::Error,
        Some("convention" | "refactor") => Severity::Notice,
        Some("info") => Severity::Note,
        _ => Severity::Warning,
    }
}

/// Folds the clone listing of a `duplicate-code` report (lines starting
/// with `==`) into the header line.
fn pylint_duplicate_message(message: &str) -> String {
    let mut lines = message.lines().map(str::trim).filter(|line| !line.is_empty());
    let Some(header) = lines.next() else {
        return String::new();
    };

    let clones = lines
        .filter_map(|line| line.strip_prefix("=="))
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect_vec();

    if clones.is_empty() {
        header.to_string()
    } else {
        format!("{header} ({})", clones.join("; "))
    }
}

fn pylint(payload: &Value, ctx: &ToolContext) -> Vec<RawDiagnostic> {
    array(Some(payload))
        .iter()
        .filter(|item| item.is_object())
        .map(|item| {
            let code = first_str(item, &["symbol"])
                .map(|symbol| symbol.replace('_', "-"))
                .or_else(|| first_str(item, &["message-id"]).map(ToString::to_string));
            let message = first_message(item, &["message"]);
            let message = if code.as_deref() == Some("duplicate-code") {
                pylint_duplicate_message(&message)
            } else {
                message
            };

            RawDiagnostic {
                file: normalize_reported_path(first_str(item, &["path", "filename"]), ctx.root()),
                line: first_int(item, &["line"]),
                column: first_int(item, &["column"]),
                severity: Some(pylint_severity(first_str(item, &["type"])).into()),
                code,
                tool: Some("pylint".to_string()),
                ..RawDiagnostic::new(message)
            }
        })
        .collect()
}

fn pyright(payload: &Value, ctx: &ToolContext) -> Vec<RawDiagnostic> {
    let items = match payload {
        Value::Object(_) => keyed_items(payload, &["generalDiagnostics", "diagnostics"]),
        _ => &[],
    };

    items
        .iter()
        .filter(|item| item.is_object())
        .map(|item| {
            let severity = match label(first_str(item, &["severity"])).as_deref() {
                Some("error") => Severity::Error,
                Some("information") => Severity::Notice,
                Some("hint") => Severity::Note,
                _ => Severity::Warning,
            };

            RawDiagnostic {
                file: normalize_reported_path(first_str(item, &["file", "path"]), ctx.root()),
                line: lookup(item, "/range/start/line").and_then(coerce::to_int),
                column: lookup(item, "/range/start/character").and_then(coerce::to_int),
                severity: Some(severity.into()),
                code: first_str(item, &["rule"]).map(ToString::to_string),
                tool: Some("pyright".to_string()),
                ..RawDiagnostic::new(first_message(item, &["message"]))
            }
        })
        .collect()
}

fn mypy(payload: &Value, ctx: &ToolContext) -> Vec<RawDiagnostic> {
    array(Some(payload))
        .iter()
        .filter(|item| item.is_object())
        .map(|item| {
            let severity = match label(first_str(item, &["severity"])).as_deref() {
                Some("error") | None => Severity::Error,
                Some("note") => Severity::Note,
                Some(_) => Severity::Warning,
            };
            let function = first_str(item, &["function", "name", "target", "symbol"])
                .and_then(|name| name.rsplit('.').next())
                .filter(|name| !name.is_empty())
                .map(ToString::to_string);

            RawDiagnostic {
                file: normalize_reported_path(first_str(item, &["path", "file"]), ctx.root()),
                line: first_int(item, &["line"]),
                column: first_int(item, &["column"]),
                severity: Some(severity.into()),
                code: first_str(item, &["code", "error_code"]).map(ToString::to_string),
                tool: Some("mypy".to_string()),
                function,
                ..RawDiagnostic::new(first_message(item, &["message"]))
            }
        })
        .collect()
}

fn selene(payload: &Value, ctx: &ToolContext) -> Vec<RawDiagnostic> {
    records(payload)
        .iter()
        .filter(|record| first_str(record, &["type"]) == Some("diagnostic"))
        .map(|record| {
            let severity = match label(first_str(record, &["severity"])).as_deref() {
                Some("error") => Severity::Error,
                Some("note" | "help") => Severity::Note,
                Some("info") => Severity::Notice,
                _ => Severity::Warning,
            };

            let primary = record.get("primary_label");
            let span = primary.and_then(|primary| primary.get("span"));
            let one_based = |key: &str| {
                span.and_then(|span| span.get(key))
                    .and_then(Value::as_i64)
                    .map(|position| position + 1)
            };

            let extras = array(record.get("notes"))
                .iter()
                .filter_map(Value::as_str)
                .chain(
                    array(record.get("secondary_labels"))
                        .iter()
                        .filter_map(|secondary| secondary.get("message").and_then(Value::as_str)),
                )
                .map(str::trim)
                .filter(|text| !text.is_empty())
                .collect_vec();

            let message = first_message(record, &["message"]);
            let message = if extras.is_empty() || message.is_empty() {
                message
            } else {
                format!("{message} ({})", extras.join("; "))
            };

            RawDiagnostic {
                file: normalize_reported_path(
                    primary.and_then(|primary| first_str(primary, &["filename"])),
                    ctx.root(),
                ),
                line: one_based("start_line"),
                column: one_based("start_column"),
                severity: Some(severity.into()),
                code: first_str(record, &["code"]).map(ToString::to_string),
                tool: Some("selene".to_string()),
                ..RawDiagnostic::new(message)
            }
        })
        .collect()
}

fn eslint(payload: &Value) -> Vec<RawDiagnostic> {
    array(Some(payload))
        .iter()
        .flat_map(|file| {
            let path = first_str(file, &["filePath", "filename"]).map(ToString::to_string);
            array(file.get("messages")).iter().map(move |message| {
                let severity = match message.get("severity").and_then(coerce::to_int).unwrap_or(1) {
                    2 => Severity::Error,
                    1 => Severity::Warning,
                    _ => Severity::Notice,
                };

                RawDiagnostic {
                    file: path.clone(),
                    line: first_int(message, &["line"]),
                    column: first_int(message, &["column"]),
                    severity: Some(severity.into()),
                    code: first_str(message, &["ruleId"]).map(ToString::to_string),
                    tool: Some("eslint".to_string()),
                    ..RawDiagnostic::new(first_message(message, &["message"]))
                }
            })
        })
        .collect()
}

fn stylelint(payload: &Value) -> Vec<RawDiagnostic> {
    array(Some(payload))
        .iter()
        .flat_map(|file| {
            let path = first_str(file, &["source", "file"]).map(ToString::to_string);
            array(file.get("warnings")).iter().map(move |warning| {
                let severity = match label(first_str(warning, &["severity"])).as_deref() {
                    Some("error") => Severity::Error,
                    _ => Severity::Warning,
                };

                RawDiagnostic {
                    file: path.clone(),
                    line: first_int(warning, &["line"]),
                    column: first_int(warning, &["column"]),
                    severity: Some(severity.into()),
                    code: first_str(warning, &["rule"]).map(ToString::to_string),
                    tool: Some("stylelint".to_string()),
                    ..RawDiagnostic::new(first_message(warning, &["text"]))
                }
            })
        })
        .collect()
}

fn actionlint(payload: &Value) -> Vec<RawDiagnostic> {
    array(Some(payload))
        .iter()
        .map(|item| {
            let severity = match label(first_str(item, &["severity"])).as_deref() {
                Some("error") | None => Severity::Error,
                Some("note") => Severity::Note,
                Some(_) => Severity::Warning,
            };

            RawDiagnostic {
                file: first_str(item, &["path"]).map(ToString::to_string),
                line: first_int(item, &["line"]),
                column: first_int(item, &["column"]),
                severity: Some(severity.into()),
                code: first_str(item, &["kind"]).map(ToString::to_string),
                tool: Some("actionlint".to_string()),
                ..RawDiagnostic::new(first_message(item, &["message"]))
            }
        })
        .collect()
}

fn hadolint(payload: &Value) -> Vec<RawDiagnostic> {
    array(Some(payload))
        .iter()
        .map(|item| {
            let severity = match label(first_str(item, &["level"])).as_deref() {
                Some("error") => Severity::Error,
                Some("info") => Severity::Notice,
                Some("style") => Severity::Note,
                _ => Severity::Warning,
            };

            RawDiagnostic {
                file: first_str(item, &["file"]).map(ToString::to_string),
                line: first_int(item, &["line"]),
                column: first_int(item, &["column"]),
                severity: Some(severity.into()),
                code: first_str(item, &["code"]).map(ToString::to_string),
                tool: Some("hadolint".to_string()),
                ..RawDiagnostic::new(first_message(item, &["message"]))
            }
        })
        .collect()
}

fn bandit(payload: &Value) -> Vec<RawDiagnostic> {
    keyed_items(payload, &["results"])
        .iter()
        .map(|item| {
            let severity = match first_str(item, &["issue_severity"])
                .map(str::to_uppercase)
                .as_deref()
            {
                Some("HIGH") => Severity::Error,
                Some("LOW") => Severity::Notice,
                _ => Severity::Warning,
            };

            RawDiagnostic {
                file: first_str(item, &["filename"]).map(ToString::to_string),
                line: first_int(item, &["line_number"]),
                severity: Some(severity.into()),
                code: first_str(item, &["test_id"]).map(ToString::to_string),
                tool: Some("bandit".to_string()),
                ..RawDiagnostic::new(first_message(item, &["issue_text"]))
            }
        })
        .collect()
}

fn sqlfluff(payload: &Value) -> Vec<RawDiagnostic> {
    array(Some(payload))
        .iter()
        .flat_map(|file| {
            let path = first_str(file, &["filepath"]).map(ToString::to_string);
            array(file.get("violations")).iter().map(move |violation| {
                let severity = match label(first_str(violation, &["severity"])).as_deref() {
                    Some("warn" | "warning") => Severity::Warning,
                    Some("info") => Severity::Notice,
                    _ => Severity::Error,
                };

                RawDiagnostic {
                    file: path.clone(),
                    line: first_int(violation, &["line_no"]),
                    column: first_int(violation, &["line_pos"]),
                    severity: Some(severity.into()),
                    code: first_str(violation, &["code"]).map(ToString::to_string),
                    tool: Some("sqlfluff".to_string()),
                    ..RawDiagnostic::new(first_message(violation, &["description"]))
                }
            })
        })
        .collect()
}

fn golangci_lint(payload: &Value) -> Vec<RawDiagnostic> {
    keyed_items(payload, &["Issues", "issues"])
        .iter()
        .filter(|issue| issue.is_object())
        .map(|issue| {
            let position = issue
                .get("Pos")
                .or_else(|| issue.get("position"))
                .filter(|position| position.is_object())
                .unwrap_or(issue);

            let severity = match label(first_str(issue, &["Severity", "severity"])).as_deref() {
                Some("error") => Severity::Error,
                Some("info") => Severity::Notice,
                _ => Severity::Warning,
            };

            RawDiagnostic {
                file: first_str(position, &["Filename", "filename"])
                    .or_else(|| first_str(issue, &["file"]))
                    .map(ToString::to_string),
                line: first_int(position, &["Line", "line"]),
                column: first_int(position, &["Column", "column"]),
                severity: Some(severity.into()),
                code: first_str(issue, &["Code", "code"]).map(ToString::to_string),
                tool: Some(
                    first_str(issue, &["FromLinter", "source"])
                        .unwrap_or("golangci-lint")
                        .to_string(),
                ),
                ..RawDiagnostic::new(first_message(issue, &["Text", "text"]))
            }
        })
        .collect()
}

fn cargo_clippy(payload: &Value) -> Vec<RawDiagnostic> {
    records(payload)
        .iter()
        .filter(|record| first_str(record, &["reason"]) == Some("compiler-message"))
        .filter_map(|record| record.get("message").filter(|message| message.is_object()))
        .map(|message| {
            let severity = match label(first_str(message, &["level"])).as_deref() {
                Some("error") => Severity::Error,
                Some("note" | "help") => Severity::Note,
                _ => Severity::Warning,
            };

            let spans = array(message.get("spans"));
            let span = spans
                .iter()
                .find(|span| span.get("is_primary").and_then(Value::as_bool) == Some(true))
                .or_else(|| spans.first());

            RawDiagnostic {
                file: span
                    .and_then(|span| first_str(span, &["file_name"]))
                    .map(ToString::to_string),
                line: span.and_then(|span| first_int(span, &["line_start"])),
                column: span.and_then(|span| first_int(span, &["column_start"])),
                severity: Some(severity.into()),
                code: lookup(message, "/code/code")
                    .and_then(Value::as_str)
                    .map(ToString::to_string),
                tool: Some("cargo-clippy".to_string()),
                ..RawDiagnostic::new(first_message(message, &["message"]))
            }
        })
        .collect()
}

fn kube_linter(payload: &Value) -> Vec<RawDiagnostic> {
    keyed_items(payload, &["Reports"])
        .iter()
        .map(|report| RawDiagnostic {
            file: lookup(report, "/Object/Metadata/FilePath")
                .or_else(|| lookup(report, "/Object/Metadata/filePath"))
                .and_then(Value::as_str)
                .map(ToString::to_string),
            severity: Some(Severity::Error.into()),
            code: first_str(report, &["Check"]).map(ToString::to_string),
            tool: Some("kube-linter".to_string()),
            ..RawDiagnostic::new(
                lookup(report, "/Diagnostic/Message")
                    .and_then(Value::as_str)
                    .map_or_else(String::new, |text| text.trim().to_string()),
            )
        })
        .collect()
}

fn dockerfilelint(payload: &Value) -> Vec<RawDiagnostic> {
    keyed_items(payload, &["files"])
        .iter()
        .flat_map(|file| {
            let path = first_str(file, &["file"]).map(ToString::to_string);
            array(file.get("issues")).iter().map(move |issue| {
                let title = first_message(issue, &["title"]);
                let description = first_message(issue, &["description"]);
                let message = match (title.is_empty(), description.is_empty()) {
                    (false, false) => format!("{title}: {description}"),
                    (false, true) => title,
                    (true, _) => description,
                };

                RawDiagnostic {
                    file: path.clone(),
                    line: first_int(issue, &["line"]).filter(|line| *line != 0),
                    severity: Some(Severity::Warning.into()),
                    code: first_str(issue, &["category"]).map(ToString::to_string),
                    tool: Some("dockerfilelint".to_string()),
                    ..RawDiagnostic::new(message)
                }
            })
        })
        .collect()
}
