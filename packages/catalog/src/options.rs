//! Option mappings: one configurable command-line option each.
//!
//! A mapping resolves its value from the tool settings (first alias present
//! wins), then the static default, then the default reference. The value is
//! optionally transformed and finally rendered by the mapping's
//! [`OptionKind`].

use std::{collections::BTreeSet, str::FromStr as _};

use lintcat_json_path::coerce;
use serde_json::Value;
use strum_macros::{AsRefStr, EnumString};

use crate::{
    context::ToolContext,
    defaults::DefaultReference,
    entry::{Entry, optional_trimmed_string},
    error::CatalogIntegrityError,
    transforms::Transform,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum OptionKind {
    /// A single scalar token.
    Value,
    /// One or more paths resolved against the execution root.
    Path,
    /// A list of tokens, optionally joined.
    Args,
    /// A boolean switch with an optional negation.
    Flag,
    /// A flag repeated `n` times.
    #[strum(serialize = "repeatflag")]
    RepeatFlag,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OptionMapping {
    settings: Vec<String>,
    kind: OptionKind,
    flag: Option<String>,
    join_with: Option<String>,
    negate_flag: Option<String>,
    literal_values: BTreeSet<String>,
    default: Option<Value>,
    default_from: Option<DefaultReference>,
    transform: Option<Transform>,
}

impl OptionMapping {
    /// Compiles one option entry.
    ///
    /// # Errors
    ///
    /// * If `value` is not an object
    /// * If `setting` is missing, empty or not a string/array
    /// * If `type` names an unknown option kind
    /// * If `flag`, `joinWith`, `negateFlag`, `defaultFrom` or `transform` are
    ///   not strings
    /// * If `transform` names an unknown transform
    /// * If a `repeatFlag` option has no `flag`
    pub fn compile(value: &Value, context: &str) -> Result<Self, CatalogIntegrityError> {
        let entry = value
            .as_object()
            .ok_or_else(|| CatalogIntegrityError::new(context, "option must be an object"))?;

        let settings = parse_setting_names(entry, context)?;
        let kind = parse_kind(entry, context)?;
        let flag = optional_trimmed_string(entry, "flag", context)?;
        let join_with = optional_trimmed_string(entry, "joinWith", context)?;
        let negate_flag = optional_trimmed_string(entry, "negateFlag", context)?;
        let literal_values = parse_literal_values(entry, context)?;
        let default = entry.get("default").filter(|value| !value.is_null()).cloned();
        let default_from = optional_trimmed_string(entry, "defaultFrom", context)?
            .map(|token| DefaultReference::parse(&token));
        let transform = parse_transform(entry, context)?;

        if kind == OptionKind::RepeatFlag && flag.is_none() {
            return Err(CatalogIntegrityError::new(
                context,
                "repeatFlag requires a 'flag' entry",
            ));
        }

        Ok(Self {
            settings,
            kind,
            flag,
            join_with,
            negate_flag,
            literal_values,
            default,
            default_from,
            transform,
        })
    }

    #[must_use]
    pub fn settings(&self) -> &[String] {
        &self.settings
    }

    #[must_use]
    pub const fn kind(&self) -> OptionKind {
        self.kind
    }

    #[must_use]
    pub fn flag(&self) -> Option<&str> {
        self.flag.as_deref()
    }

    #[must_use]
    pub const fn transform(&self) -> Option<Transform> {
        self.transform
    }

    /// Resolves the untransformed value: settings in alias order, then the
    /// static default, then the default reference.
    #[must_use]
    pub fn resolve_value(&self, ctx: &ToolContext) -> Option<Value> {
        ctx.setting(self.settings.iter().map(String::as_str))
            .cloned()
            .or_else(|| self.default.clone())
            .or_else(|| {
                self.default_from
                    .as_ref()
                    .and_then(|reference| reference.resolve(ctx))
            })
    }

    /// Appends this option's arguments to `command`. Emits nothing when no
    /// value resolves.
    pub fn apply(&self, ctx: &ToolContext, command: &mut Vec<String>) {
        let Some(value) = self.resolve_value(ctx) else {
            log::trace!("OptionMapping: no value for {:?}", self.settings);
            return;
        };

        let value = match self.transform {
            Some(transform) => transform.apply(&value, ctx),
            None => value,
        };

        match self.kind {
            OptionKind::Args => self.render_args(command, &value),
            OptionKind::Path => self.render_paths(ctx, command, &value),
            OptionKind::Value => {
                append_flagged(command, coerce::to_display_string(&value), self.flag());
            }
            OptionKind::Flag => self.render_flag(command, &value),
            OptionKind::RepeatFlag => self.render_repeat_flag(command, &value),
        }
    }

    fn render_args(&self, command: &mut Vec<String>, value: &Value) {
        let values = coerce::to_string_list(value);
        if values.is_empty() {
            return;
        }

        if let Some(separator) = &self.join_with {
            append_flagged(command, values.join(separator), self.flag());
            return;
        }

        for entry in values {
            append_flagged(command, entry, self.flag());
        }
    }

    fn render_paths(&self, ctx: &ToolContext, command: &mut Vec<String>, value: &Value) {
        let entries = match value {
            Value::Array(items) => items.iter().collect::<Vec<_>>(),
            other => vec![other],
        };

        for entry in entries {
            let rendered = match entry {
                Value::Null => continue,
                Value::String(text) if self.literal_values.contains(text) => text.clone(),
                other => ctx
                    .resolve_path(&coerce::to_display_string(other))
                    .display()
                    .to_string(),
            };
            append_flagged(command, rendered, self.flag());
        }
    }

    fn render_flag(&self, command: &mut Vec<String>, value: &Value) {
        let enabled = coerce::interpret_bool(value).unwrap_or_else(|| coerce::is_truthy(value));
        let emitted = if enabled {
            self.flag.as_ref()
        } else {
            self.negate_flag.as_ref()
        };
        if let Some(flag) = emitted {
            command.push(flag.clone());
        }
    }

    fn render_repeat_flag(&self, command: &mut Vec<String>, value: &Value) {
        let count = coerce::repeat_count(value);
        if count == 0 {
            if let Some(negate) = &self.negate_flag {
                command.push(negate.clone());
            }
            return;
        }

        if let Some(flag) = &self.flag {
            for _ in 0..count {
                command.push(flag.clone());
            }
        }
    }
}

/// Compiles an `options` array. A missing or `null` value is no options.
///
/// Each entry is compiled with the context `{context}[{index}]`.
///
/// # Errors
///
/// * If `value` is present and not an array
/// * If any entry fails [`OptionMapping::compile`]
pub fn compile_option_mappings(
    value: Option<&Value>,
    context: &str,
) -> Result<Vec<OptionMapping>, CatalogIntegrityError> {
    match value {
        None | Some(Value::Null) => Ok(vec![]),
        Some(Value::Array(entries)) => entries
            .iter()
            .enumerate()
            .map(|(index, entry)| OptionMapping::compile(entry, &format!("{context}[{index}]")))
            .collect(),
        Some(_) => Err(CatalogIntegrityError::new(
            context,
            "'options' must be an array of objects",
        )),
    }
}

/// Applies `mappings` to `command` in declared order.
pub fn apply_option_mappings(
    mappings: &[OptionMapping],
    ctx: &ToolContext,
    command: &mut Vec<String>,
) {
    for mapping in mappings {
        mapping.apply(ctx, command);
    }
}

/// Appends `value`, prefixed by `flag` when one is set. A flag ending in `=`
/// is fused with the value into a single token.
pub fn append_flagged(command: &mut Vec<String>, value: String, flag: Option<&str>) {
    match flag {
        None => command.push(value),
        Some(flag) if flag.ends_with('=') => command.push(format!("{flag}{value}")),
        Some(flag) => {
            command.push(flag.to_string());
            command.push(value);
        }
    }
}

fn parse_setting_names(entry: &Entry, context: &str) -> Result<Vec<String>, CatalogIntegrityError> {
    let names = match entry.get("setting") {
        Some(Value::String(name)) => vec![name.clone()],
        Some(Value::Array(names)) => names
            .iter()
            .filter_map(coerce::to_optional_string)
            .collect(),
        _ => {
            return Err(CatalogIntegrityError::new(
                context,
                "'setting' must be a string or array of strings",
            ));
        }
    };

    if names.is_empty() {
        return Err(CatalogIntegrityError::new(
            context,
            "'setting' must provide at least one entry",
        ));
    }

    Ok(names)
}

fn parse_kind(entry: &Entry, context: &str) -> Result<OptionKind, CatalogIntegrityError> {
    match entry.get("type") {
        None | Some(Value::Null) => Ok(OptionKind::Value),
        Some(Value::String(raw)) => OptionKind::from_str(&raw.trim().to_ascii_lowercase())
            .map_err(|_| {
                CatalogIntegrityError::new(context, format!("unsupported option type '{raw}'"))
            }),
        Some(_) => Err(CatalogIntegrityError::new(context, "'type' must be a string")),
    }
}

fn parse_literal_values(
    entry: &Entry,
    context: &str,
) -> Result<BTreeSet<String>, CatalogIntegrityError> {
    match entry.get("literalValues") {
        None | Some(Value::Null) => Ok(BTreeSet::new()),
        Some(Value::String(value)) => Ok(BTreeSet::from([value.clone()])),
        Some(Value::Array(values)) => Ok(values
            .iter()
            .filter_map(coerce::to_optional_string)
            .collect()),
        Some(_) => Err(CatalogIntegrityError::new(
            context,
            "'literalValues' must be a string or array of strings",
        )),
    }
}

fn parse_transform(entry: &Entry, context: &str) -> Result<Option<Transform>, CatalogIntegrityError> {
    match entry.get("transform") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(raw)) => Transform::from_str(raw.trim()).map(Some).map_err(|_| {
            CatalogIntegrityError::new(context, format!("unsupported transform '{raw}'"))
        }),
        Some(_) => Err(CatalogIntegrityError::new(
            context,
            "'transform' must be a string when provided",
        )),
    }
}
