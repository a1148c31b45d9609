//! Named value transforms applied to resolved option values.
//!
//! The registry is the [`Transform`] enum itself: catalog entries name a
//! transform by its snake_case token and unknown tokens are rejected when the
//! option is compiled.

use std::fmt;

use lintcat_json_path::coerce;
use serde_json::Value;
use strum_macros::{AsRefStr, EnumIter, EnumString};

use crate::{config::DEFAULT_PYTHON_VERSION, context::ToolContext};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, AsRefStr, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum Transform {
    /// `3.11` -> `py311`
    PythonVersionTag,
    /// `py311` -> `3.11`
    PythonVersionNumber,
    /// `3.11` -> `--py311-plus`
    PyupgradeFlag,
    StrictnessIsStrict,
    StrictnessIsLenient,
    /// Boolean-like -> `y`/`n`
    BoolToYn,
    /// Boolean-like -> `true`/`false`
    BoolToStr,
}

impl Transform {
    /// Applies the transform. Version transforms fall back to the context's
    /// target Python version when `value` is `null` or unparsable.
    #[must_use]
    pub fn apply(self, value: &Value, ctx: &ToolContext) -> Value {
        match self {
            Self::PythonVersionTag => Value::String(version_or_target(value, ctx).tag()),
            Self::PythonVersionNumber => Value::String(version_or_target(value, ctx).number()),
            Self::PyupgradeFlag => Value::String(version_or_target(value, ctx).pyupgrade_flag()),
            Self::StrictnessIsStrict => Value::Bool(match value {
                Value::String(text) => text.trim().eq_ignore_ascii_case("strict"),
                Value::Bool(flag) => *flag,
                other => coerce::is_truthy(other),
            }),
            Self::StrictnessIsLenient => Value::Bool(
                value
                    .as_str()
                    .is_some_and(|text| text.trim().eq_ignore_ascii_case("lenient")),
            ),
            Self::BoolToYn => Value::String(if as_bool(value) { "y" } else { "n" }.to_string()),
            Self::BoolToStr => Value::String(as_bool(value).to_string()),
        }
    }
}

impl fmt::Display for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

fn as_bool(value: &Value) -> bool {
    coerce::interpret_bool(value).unwrap_or_else(|| coerce::is_truthy(value))
}

/// A `major.minor` Python version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PythonVersion {
    pub major: u32,
    pub minor: u32,
}

impl PythonVersion {
    /// Parses `3.11`, `3.11.4`, `py311`, `311` or `3`.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        let text = text
            .strip_prefix("py")
            .or_else(|| text.strip_prefix("PY"))
            .unwrap_or(text);

        if let Some((major, rest)) = text.split_once('.') {
            let minor = rest.split('.').next().unwrap_or_default();
            return Some(Self {
                major: major.parse().ok()?,
                minor: minor.parse().ok()?,
            });
        }

        if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }

        let (major, minor) = text.split_at(1);
        Some(Self {
            major: major.parse().ok()?,
            minor: if minor.is_empty() { 0 } else { minor.parse().ok()? },
        })
    }

    #[must_use]
    pub fn tag(self) -> String {
        format!("py{}{}", self.major, self.minor)
    }

    #[must_use]
    pub fn number(self) -> String {
        format!("{}.{}", self.major, self.minor)
    }

    #[must_use]
    pub fn pyupgrade_flag(self) -> String {
        format!("--py{}{}-plus", self.major, self.minor)
    }
}

/// The effective target Python version: `execution.python_version` from the
/// runtime configuration, or the stock default.
#[must_use]
pub fn python_target_version(ctx: &ToolContext) -> PythonVersion {
    ctx.config()
        .execution
        .python_version
        .as_deref()
        .and_then(PythonVersion::parse)
        .or_else(|| PythonVersion::parse(DEFAULT_PYTHON_VERSION))
        .unwrap_or(PythonVersion {
            major: 3,
            minor: 12,
        })
}

fn version_or_target(value: &Value, ctx: &ToolContext) -> PythonVersion {
    coerce::to_optional_string(value)
        .as_deref()
        .and_then(PythonVersion::parse)
        .unwrap_or_else(|| python_target_version(ctx))
}
