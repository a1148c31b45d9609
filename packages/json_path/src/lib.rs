//! Dotted/bracketed JSON path expressions.
//!
//! A path such as `results[*].detail."weird.key"` is tokenized once into a
//! [`PathExpression`] and then evaluated any number of times against
//! [`serde_json::Value`] documents. Evaluation is fail-soft: steps that do not
//! apply to the current node drop that node instead of raising an error.
//!
//! # Syntax
//!
//! * `.` separates keys (`a.b.c`)
//! * `[n]` selects an array index, negative indices count from the end
//! * `[*]` or `[]` fans an array out into its elements (item paths only)
//! * `["key"]` or `[key]` selects a key that may contain `.`
//! * empty keys and the root marker `$` are ignored

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

use std::fmt;

use serde_json::Value;
use thiserror::Error;

pub mod coerce;

const PATH_SEPARATOR: char = '.';
const BRACKET_OPEN: char = '[';
const BRACKET_CLOSE: char = ']';
const WILDCARD: &str = "*";
const QUOTE: char = '"';
const ROOT_TOKENS: [&str; 2] = ["", "$"];

/// Errors raised while tokenizing a path expression.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PathError {
    /// A `[` had no closing `]`.
    #[error("unmatched '[' in path '{0}'")]
    UnmatchedBracket(String),
    /// A wildcard appeared in a path that must resolve to a single value.
    #[error("wildcards are not permitted in field paths ('{0}')")]
    WildcardNotPermitted(String),
}

/// Single navigation step within a path expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathComponent {
    /// Map lookup by key.
    Key(String),
    /// Array lookup by position. Negative values count from the end.
    Index(i64),
    /// Every element of an array.
    Wildcard,
}

impl fmt::Display for PathComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) if key.contains(['.', '[', ']']) => write!(f, "[\"{key}\"]"),
            Self::Key(key) => write!(f, ".{key}"),
            Self::Index(index) => write!(f, "[{index}]"),
            Self::Wildcard => f.write_str("[*]"),
        }
    }
}

/// Ordered sequence of [`PathComponent`]s.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct PathExpression {
    components: Vec<PathComponent>,
}

impl PathExpression {
    /// Tokenizes `path`. See [`tokenize`].
    ///
    /// # Errors
    ///
    /// * If a `[` is never closed
    /// * If a wildcard is used while `allow_wildcards` is `false`
    pub fn parse(path: &str, allow_wildcards: bool) -> Result<Self, PathError> {
        tokenize(path, allow_wildcards)
    }

    #[must_use]
    pub fn components(&self) -> &[PathComponent] {
        &self.components
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    #[must_use]
    pub fn has_wildcard(&self) -> bool {
        self.components
            .iter()
            .any(|component| matches!(component, PathComponent::Wildcard))
    }

    /// Returns every node addressed by this expression.
    ///
    /// An empty expression addresses `root` itself. Nodes that a step cannot
    /// descend into are dropped, so the result may be empty.
    #[must_use]
    pub fn evaluate<'a>(&self, root: &'a Value) -> Vec<&'a Value> {
        let mut nodes = vec![root];

        for component in &self.components {
            nodes = descend(&nodes, component);
            if nodes.is_empty() {
                break;
            }
        }

        nodes
    }

    /// Returns the single node addressed by this expression.
    ///
    /// Returns `None` as soon as any step fails to apply. Wildcards never match
    /// here since a field path addresses exactly one value.
    #[must_use]
    pub fn extract<'a>(&self, root: &'a Value) -> Option<&'a Value> {
        let mut current = root;

        for component in &self.components {
            current = match component {
                PathComponent::Key(key) => current.as_object()?.get(key)?,
                PathComponent::Index(index) => {
                    let items = current.as_array()?;
                    &items[resolve_index(items.len(), *index)?]
                }
                PathComponent::Wildcard => return None,
            };
        }

        Some(current)
    }
}

impl fmt::Display for PathExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("$")?;
        for component in &self.components {
            write!(f, "{component}")?;
        }
        Ok(())
    }
}

impl From<Vec<PathComponent>> for PathExpression {
    fn from(components: Vec<PathComponent>) -> Self {
        Self { components }
    }
}

/// Tokenizes a dotted/bracketed path string.
///
/// The input is trimmed first; a blank path yields an empty expression.
///
/// # Errors
///
/// * If a `[` is never closed
/// * If `[*]` or `[]` is used while `allow_wildcards` is `false`
pub fn tokenize(path: &str, allow_wildcards: bool) -> Result<PathExpression, PathError> {
    let trimmed = path.trim();
    if trimmed.is_empty() {
        return Ok(PathExpression::default());
    }

    let mut components = vec![];
    let mut buffer = String::new();
    let mut skip_until = None;

    for (index, ch) in trimmed.char_indices() {
        if skip_until.is_some_and(|end| index <= end) {
            continue;
        }

        match ch {
            PATH_SEPARATOR => flush_key(&mut buffer, &mut components),
            QUOTE => match trimmed[index + 1..].find(QUOTE) {
                Some(offset) => {
                    let closing = index + 1 + offset;
                    buffer.push_str(&trimmed[index + 1..closing]);
                    skip_until = Some(closing);
                }
                None => buffer.push(ch),
            },
            BRACKET_OPEN => {
                flush_key(&mut buffer, &mut components);
                let Some(offset) = trimmed[index..].find(BRACKET_CLOSE) else {
                    return Err(PathError::UnmatchedBracket(path.to_string()));
                };
                let closing = index + offset;
                let segment = trimmed[index + 1..closing].trim();
                components.push(bracket_component(segment, allow_wildcards, path)?);
                skip_until = Some(closing);
            }
            _ => buffer.push(ch),
        }
    }

    flush_key(&mut buffer, &mut components);

    components.retain(|component| {
        !matches!(component, PathComponent::Key(key) if ROOT_TOKENS.contains(&key.as_str()))
    });

    log::trace!("tokenize: '{path}' -> {components:?}");

    Ok(PathExpression { components })
}

/// Evaluates `path` against `root`. See [`PathExpression::evaluate`].
#[must_use]
pub fn evaluate<'a>(root: &'a Value, path: &PathExpression) -> Vec<&'a Value> {
    path.evaluate(root)
}

fn flush_key(buffer: &mut String, components: &mut Vec<PathComponent>) {
    if buffer.is_empty() {
        return;
    }

    let key = buffer.trim();
    if !key.is_empty() {
        components.push(PathComponent::Key(key.to_string()));
    }
    buffer.clear();
}

fn bracket_component(
    segment: &str,
    allow_wildcards: bool,
    path: &str,
) -> Result<PathComponent, PathError> {
    if segment.is_empty() || segment == WILDCARD {
        if !allow_wildcards {
            return Err(PathError::WildcardNotPermitted(path.to_string()));
        }
        return Ok(PathComponent::Wildcard);
    }

    let cleaned = if segment.len() >= 2 && segment.starts_with(QUOTE) && segment.ends_with(QUOTE)
    {
        &segment[1..segment.len() - 1]
    } else {
        segment
    };

    if let Some(index) = parse_index(cleaned) {
        return Ok(PathComponent::Index(index));
    }

    Ok(PathComponent::Key(cleaned.to_string()))
}

fn parse_index(value: &str) -> Option<i64> {
    let digits = value.trim_start_matches('-');
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    value.parse().ok()
}

fn resolve_index(len: usize, index: i64) -> Option<usize> {
    let len = i64::try_from(len).ok()?;
    let resolved = if index < 0 { len + index } else { index };
    if (0..len).contains(&resolved) {
        usize::try_from(resolved).ok()
    } else {
        None
    }
}

fn descend<'a>(nodes: &[&'a Value], component: &PathComponent) -> Vec<&'a Value> {
    match component {
        PathComponent::Key(key) => nodes
            .iter()
            .copied()
            .filter_map(|node| node.as_object().and_then(|map| map.get(key)))
            .collect(),
        PathComponent::Index(index) => nodes
            .iter()
            .copied()
            .filter_map(|node| {
                let items = node.as_array()?;
                resolve_index(items.len(), *index).map(|i| &items[i])
            })
            .collect(),
        PathComponent::Wildcard => nodes
            .iter()
            .copied()
            .filter_map(Value::as_array)
            .flatten()
            .collect(),
    }
}
