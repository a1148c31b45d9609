//! Built-in transforms for tools that only report diagnostics as text.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use strum_macros::{AsRefStr, EnumIter, EnumString};

use super::Severity;
use crate::{context::ToolContext, diagnostics::RawDiagnostic};

static TSC_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<file>[^:(\n]+)\((?P<line>\d+),(?P<column>\d+)\):\s*(?P<severity>error|warning)\s*(?P<code>[A-Z]+\d+)?\s*:?\s*(?P<message>.+)$",
    )
    .expect("Invalid Regex")
});

static LUALINT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<file>[^:]+):(?P<line>\d+):\s*(?:\*\*\*\s*)?(?P<message>.+)$")
        .expect("Invalid Regex")
});

static LUACHECK_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<file>[^:]+):(?P<line>\d+):(?P<column>\d+):\s+\((?P<code>[A-Z]\d+)\)\s+(?P<message>.+)$",
    )
    .expect("Invalid Regex")
});

static YAMLLINT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<file>.*?):(?P<line>\d+):(?P<column>\d+):\s+\[(?P<level>[^\]]+)\]\s+(?P<message>.*?)(?:\s+\((?P<code>[^)]+)\))?$",
    )
    .expect("Invalid Regex")
});

static DOTENV_LINTER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<file>[^:]+):(?P<line>\d+)\s+(?P<code>[A-Za-z0-9_-]+):\s+(?P<message>.+)$")
        .expect("Invalid Regex")
});

static CPPLINT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<file>[^:]+):(?P<line>\d+):\s+(?P<message>.+?)\s+\[(?P<code>[^\]]+)\]\s+\[(?P<confidence>\d+)\]$",
    )
    .expect("Invalid Regex")
});

static ANSI_ESCAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x1b\[[0-9;]*m").expect("Invalid Regex"));

static TOMBI_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?P<level>error|warning|info|hint|note):\s*(?P<message>.+)$")
        .expect("Invalid Regex")
});

static TOMBI_LOCATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^at\s+(?P<file>.+?)(?::(?P<line>\d+))?(?::(?P<column>\d+))?$")
        .expect("Invalid Regex")
});

/// Named stdout transforms available to `text_parser`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, AsRefStr, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum TextTransform {
    Tsc,
    Lualint,
    Luacheck,
    Yamllint,
    DotenvLinter,
    Cpplint,
    Tombi,
}

impl TextTransform {
    /// Converts raw output line by line. Lines that do not match the tool's
    /// format are ignored.
    #[must_use]
    pub fn apply(self, stdout: &str, _ctx: &ToolContext) -> Vec<RawDiagnostic> {
        match self {
            Self::Tsc => line_diagnostics(
                stdout,
                &TSC_PATTERN,
                &[],
                |captures| match &captures["severity"] {
                    "error" => Severity::Error,
                    _ => Severity::Warning,
                },
                "tsc",
            ),
            Self::Lualint => line_diagnostics(
                stdout,
                &LUALINT_PATTERN,
                &["Usage"],
                |_| Severity::Warning,
                "lualint",
            ),
            Self::Luacheck => line_diagnostics(
                stdout,
                &LUACHECK_PATTERN,
                &["Total:"],
                |captures| {
                    if captures["code"].starts_with('E') {
                        Severity::Error
                    } else {
                        Severity::Warning
                    }
                },
                "luacheck",
            ),
            Self::Yamllint => line_diagnostics(
                stdout,
                &YAMLLINT_PATTERN,
                &[],
                |captures| match captures["level"].to_lowercase().as_str() {
                    "error" => Severity::Error,
                    _ => Severity::Warning,
                },
                "yamllint",
            ),
            Self::DotenvLinter => line_diagnostics(
                stdout,
                &DOTENV_LINTER_PATTERN,
                &["Checking", "Nothing to check", "No problems found"],
                |_| Severity::Warning,
                "dotenv-linter",
            ),
            Self::Cpplint => line_diagnostics(
                stdout,
                &CPPLINT_PATTERN,
                &["Done processing", "Total errors"],
                |_| Severity::Warning,
                "cpplint",
            ),
            Self::Tombi => tombi(stdout),
        }
    }
}

fn capture_int(captures: &Captures<'_>, name: &str) -> Option<i64> {
    captures.name(name).and_then(|value| value.as_str().parse().ok())
}

fn capture_str(captures: &Captures<'_>, name: &str) -> Option<String> {
    captures
        .name(name)
        .map(|value| value.as_str().trim().to_string())
        .filter(|value| !value.is_empty())
}

/// One diagnostic per line matching `pattern`. Lines starting with any of
/// `skip` are summary output.
fn line_diagnostics(
    stdout: &str,
    pattern: &Regex,
    skip: &[&str],
    severity: impl Fn(&Captures<'_>) -> Severity,
    tool: &str,
) -> Vec<RawDiagnostic> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| !skip.iter().any(|prefix| line.starts_with(prefix)))
        .filter_map(|line| pattern.captures(line))
        .map(|captures| RawDiagnostic {
            file: capture_str(&captures, "file"),
            line: capture_int(&captures, "line"),
            column: capture_int(&captures, "column"),
            severity: Some(severity(&captures).into()),
            code: capture_str(&captures, "code"),
            tool: Some(tool.to_string()),
            ..RawDiagnostic::new(capture_str(&captures, "message").unwrap_or_default())
        })
        .collect()
}

/// Tombi prints a `Level: message` header followed by an `at file:line:col`
/// line and optional detail lines.
fn tombi(stdout: &str) -> Vec<RawDiagnostic> {
    let stdout = ANSI_ESCAPE.replace_all(stdout, "");
    let mut diagnostics = vec![];
    let mut current: Option<RawDiagnostic> = None;

    for line in stdout.lines().map(str::trim).filter(|line| !line.is_empty()) {
        if let Some(captures) = TOMBI_HEADER.captures(line) {
            diagnostics.extend(current.take());

            let severity = match captures["level"].to_lowercase().as_str() {
                "error" => Severity::Error,
                "info" => Severity::Notice,
                "hint" | "note" => Severity::Note,
                _ => Severity::Warning,
            };
            current = Some(RawDiagnostic {
                severity: Some(severity.into()),
                tool: Some("tombi".to_string()),
                ..RawDiagnostic::new(captures["message"].trim())
            });
        } else if let Some(diagnostic) = current.as_mut() {
            if let Some(captures) = TOMBI_LOCATION.captures(line) {
                diagnostic.file = capture_str(&captures, "file");
                diagnostic.line = capture_int(&captures, "line");
                diagnostic.column = capture_int(&captures, "column");
            } else {
                diagnostic.message = format!("{} ({line})", diagnostic.message);
            }
        }
    }

    diagnostics.extend(current);
    diagnostics
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use strum::IntoEnumIterator as _;

    use super::*;

    fn apply(transform: TextTransform, stdout: &str) -> Vec<RawDiagnostic> {
        transform.apply(stdout, &ToolContext::builder("/repo").build())
    }

    #[test_log::test]
    fn test_every_transform_name_round_trips() {
        for transform in TextTransform::iter() {
            assert_eq!(transform.as_ref().parse::<TextTransform>().unwrap(), transform);
        }
        assert_eq!(TextTransform::DotenvLinter.as_ref(), "dotenv_linter");
    }

    #[test_log::test]
    fn test_tsc() {
        let diagnostics = apply(
            TextTransform::Tsc,
            "src/app.ts(4,12): error TS2322: Type 'string' is not assignable to type 'number'.\nFound 1 error.\n",
        );

        assert_eq!(
            diagnostics,
            vec![RawDiagnostic {
                file: Some("src/app.ts".to_string()),
                line: Some(4),
                column: Some(12),
                severity: Some("error".to_string()),
                code: Some("TS2322".to_string()),
                tool: Some("tsc".to_string()),
                ..RawDiagnostic::new("Type 'string' is not assignable to type 'number'.")
            }]
        );
    }

    #[test_log::test]
    fn test_luacheck_severity_follows_code() {
        let diagnostics = apply(
            TextTransform::Luacheck,
            "init.lua:3:7: (W211) unused variable 'x'\ninit.lua:9:1: (E011) expected expression\nTotal: 2 warnings / 1 error in 1 file\n",
        );

        assert_eq!(diagnostics.len(), 2);
        assert_eq!(diagnostics[0].severity.as_deref(), Some("warning"));
        assert_eq!(diagnostics[0].code.as_deref(), Some("W211"));
        assert_eq!(diagnostics[1].severity.as_deref(), Some("error"));
        assert_eq!(diagnostics[1].column, Some(1));
    }

    #[test_log::test]
    fn test_lualint_skips_usage() {
        let diagnostics = apply(
            TextTransform::Lualint,
            "Usage: lualint [-r|-s] filename.lua\nmod.lua:12: *** global SET of foo\n",
        );

        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].message, "global SET of foo");
        assert_eq!(diagnostics[0].line, Some(12));
    }

    #[test_log::test]
    fn test_yamllint_rule_is_optional() {
        let diagnostics = apply(
            TextTransform::Yamllint,
            "ci.yml:1:1: [warning] missing document start \"---\" (document-start)\nci.yml:4:81: [error] line too long\n",
        );

        assert_eq!(diagnostics[0].code.as_deref(), Some("document-start"));
        assert_eq!(diagnostics[0].message, "missing document start \"---\"");
        assert_eq!(diagnostics[0].severity.as_deref(), Some("warning"));
        assert_eq!(diagnostics[1].code, None);
        assert_eq!(diagnostics[1].severity.as_deref(), Some("error"));
    }

    #[test_log::test]
    fn test_dotenv_linter_and_cpplint() {
        let dotenv = apply(
            TextTransform::DotenvLinter,
            "Checking .env\n.env:2 UnorderedKey: The A key should go before the B key\n",
        );
        assert_eq!(dotenv.len(), 1);
        assert_eq!(dotenv[0].code.as_deref(), Some("UnorderedKey"));
        assert_eq!(dotenv[0].tool.as_deref(), Some("dotenv-linter"));

        let cpplint = apply(
            TextTransform::Cpplint,
            "main.cc:5:  Missing space after ,  [whitespace/comma] [3]\nDone processing main.cc\nTotal errors found: 1\n",
        );
        assert_eq!(cpplint.len(), 1);
        assert_eq!(cpplint[0].message, "Missing space after ,");
        assert_eq!(cpplint[0].code.as_deref(), Some("whitespace/comma"));
    }

    #[test_log::test]
    fn test_tombi_groups_location_and_details() {
        let diagnostics = apply(
            TextTransform::Tombi,
            "\u{1b}[31mError\u{1b}[0m: invalid key\n    at pyproject.toml:3:5\n    expected a table\nWarning: deprecated\n",
        );

        assert_eq!(
            diagnostics[0],
            RawDiagnostic {
                file: Some("pyproject.toml".to_string()),
                line: Some(3),
                column: Some(5),
                severity: Some("error".to_string()),
                tool: Some("tombi".to_string()),
                ..RawDiagnostic::new("invalid key (expected a table)")
            }
        );
        assert_eq!(diagnostics[1].severity.as_deref(), Some("warning"));
        assert_eq!(diagnostics[1].file, None);
    }
}
