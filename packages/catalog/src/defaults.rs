//! Default-reference tokens resolved against the runtime context.
//!
//! Options may name a `defaultFrom` token instead of a literal default. Tokens
//! are parsed once, when the option is compiled; unknown tokens are kept and
//! simply resolve to nothing.

use std::collections::BTreeSet;

use serde_json::Value;
use strum_macros::{AsRefStr, EnumIter, EnumString};

use crate::{context::ToolContext, transforms::python_target_version};

/// Values read straight from [`RuntimeConfig`](crate::config::RuntimeConfig).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, AsRefStr, EnumIter)]
pub enum StaticDefault {
    #[strum(serialize = "execution.line_length")]
    LineLength,
    #[strum(serialize = "execution.sql_dialect")]
    SqlDialect,
    #[strum(serialize = "complexity.max_complexity")]
    MaxComplexity,
    #[strum(serialize = "complexity.max_arguments")]
    MaxArguments,
    #[strum(serialize = "severity.bandit_level")]
    BanditLevel,
    #[strum(serialize = "severity.bandit_confidence")]
    BanditConfidence,
    #[strum(serialize = "severity.pylint_fail_under")]
    PylintFailUnder,
    #[strum(serialize = "severity.max_warnings")]
    MaxWarnings,
    #[strum(serialize = "strictness.type_checking")]
    TypeChecking,
    #[strum(serialize = "tool.root")]
    ToolRoot,
}

/// Values computed from the runtime context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, AsRefStr, EnumIter)]
pub enum DynamicDefault {
    #[strum(serialize = "python.target_version")]
    PythonTargetVersion,
    #[strum(serialize = "python.target_version_tag")]
    PythonTargetVersionTag,
    #[strum(serialize = "python.target_version_number")]
    PythonTargetVersionNumber,
    #[strum(serialize = "python.discover_pylint_plugins")]
    DiscoverPylintPlugins,
}

const TOOL_SETTING_PREFIX: &str = "tool_setting.";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DefaultReference {
    Static(StaticDefault),
    Dynamic(DynamicDefault),
    /// `tool_setting.<name>`: another setting of the same tool.
    ToolSetting(String),
    Unknown(String),
}

impl DefaultReference {
    #[must_use]
    pub fn parse(token: &str) -> Self {
        if let Ok(reference) = token.parse() {
            return Self::Static(reference);
        }
        if let Ok(reference) = token.parse() {
            return Self::Dynamic(reference);
        }
        if let Some(name) = token.strip_prefix(TOOL_SETTING_PREFIX) {
            return Self::ToolSetting(name.to_string());
        }
        log::debug!("DefaultReference: unknown token '{token}'");
        Self::Unknown(token.to_string())
    }

    /// Resolves the reference. `None` means there is no default.
    #[must_use]
    pub fn resolve(&self, ctx: &ToolContext) -> Option<Value> {
        match self {
            Self::Static(reference) => resolve_static(*reference, ctx),
            Self::Dynamic(reference) => resolve_dynamic(*reference, ctx),
            Self::ToolSetting(name) => ctx.setting([name.as_str()]).cloned(),
            Self::Unknown(_) => None,
        }
    }
}

fn resolve_static(reference: StaticDefault, ctx: &ToolContext) -> Option<Value> {
    let config = ctx.config();
    match reference {
        StaticDefault::LineLength => Some(config.execution.line_length.into()),
        StaticDefault::SqlDialect => Some(config.execution.sql_dialect.clone().into()),
        StaticDefault::MaxComplexity => config.complexity.max_complexity.map(Into::into),
        StaticDefault::MaxArguments => config.complexity.max_arguments.map(Into::into),
        StaticDefault::BanditLevel => Some(config.severity.bandit_level.as_ref().into()),
        StaticDefault::BanditConfidence => {
            Some(config.severity.bandit_confidence.as_ref().into())
        }
        StaticDefault::PylintFailUnder => config.severity.pylint_fail_under.map(Into::into),
        StaticDefault::MaxWarnings => config.severity.max_warnings.map(Into::into),
        StaticDefault::TypeChecking => Some(config.strictness.type_checking.as_ref().into()),
        StaticDefault::ToolRoot => Some(ctx.root().display().to_string().into()),
    }
}

fn resolve_dynamic(reference: DynamicDefault, ctx: &ToolContext) -> Option<Value> {
    match reference {
        DynamicDefault::PythonTargetVersion | DynamicDefault::PythonTargetVersionNumber => {
            Some(python_target_version(ctx).number().into())
        }
        DynamicDefault::PythonTargetVersionTag => Some(python_target_version(ctx).tag().into()),
        DynamicDefault::DiscoverPylintPlugins => pylint_plugins(ctx),
    }
}

/// Configured pylint plugins, trimmed, sorted and deduplicated. No plugins
/// means no default.
fn pylint_plugins(ctx: &ToolContext) -> Option<Value> {
    let plugins = ctx
        .config()
        .execution
        .pylint_plugins
        .iter()
        .map(|plugin| plugin.trim())
        .filter(|plugin| !plugin.is_empty())
        .collect::<BTreeSet<_>>();

    if plugins.is_empty() {
        return None;
    }

    Some(Value::Array(
        plugins.into_iter().map(|plugin| plugin.to_string().into()).collect(),
    ))
}
