//! File and directory arguments for scanner-style commands.

use std::{
    collections::BTreeSet,
    path::{Path, PathBuf},
    sync::Arc,
};

use itertools::Itertools as _;
use serde_json::Value;
use strum_macros::{AsRefStr, EnumString};

use crate::{
    context::ToolContext,
    entry::{
        Entry, optional_non_empty_string, require_object, strict_bool, strict_string_list,
        string_or_list, truthy_flag,
    },
    error::CatalogIntegrityError,
    paths::{is_under_any, normalize_lexically, normalize_requirement},
};

/// Paths that targets must not fall under.
pub type Exclusions = BTreeSet<PathBuf>;

const CURRENT_DIRECTORY: &str = ".";

/// Rules for deriving the targets of a project scanner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetPlan {
    settings: Vec<String>,
    include_discovery_roots: bool,
    include_discovery_explicit: bool,
    fallback: Vec<String>,
    default_to_root: bool,
    filter_excluded: bool,
    prefix: Option<String>,
}

impl TargetPlan {
    /// Compiles a `targets` entry.
    ///
    /// # Errors
    ///
    /// * If `value` is not an object
    /// * If `settings` or `fallback` are not a string or array
    /// * If `prefix` is not a string
    pub fn compile(value: &Value, context: &str) -> Result<Self, CatalogIntegrityError> {
        let entry = require_object(value, context, "must be an object")?;

        let prefix = match entry.get("prefix") {
            None | Some(Value::Null) => None,
            Some(Value::String(prefix)) => Some(prefix.clone()),
            Some(_) => {
                return Err(CatalogIntegrityError::new(
                    context,
                    "prefix must be a string when provided",
                ));
            }
        };

        Ok(Self {
            settings: string_or_list(
                entry.get("settings"),
                context,
                "settings must be string or array of strings",
            )?,
            include_discovery_roots: truthy_flag(entry, "includeDiscoveryRoots", false),
            include_discovery_explicit: truthy_flag(entry, "includeDiscoveryExplicit", false),
            fallback: string_or_list(
                entry.get("fallback"),
                context,
                "fallback must be string or array of strings",
            )?,
            default_to_root: truthy_flag(entry, "defaultToRoot", false),
            filter_excluded: truthy_flag(entry, "filterExcluded", true),
            prefix,
        })
    }

    #[must_use]
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// Resolves the target arguments, in order of priority:
    ///
    /// 1. caller-selected files, verbatim and never prefixed
    /// 2. configured settings plus enabled discovery roots/explicit-file parents
    /// 3. the first fallback that exists (`.` always exists)
    /// 4. the root, when `defaultToRoot` is set
    ///
    /// Output is sorted and deduplicated so identical inputs always render
    /// identical commands.
    #[must_use]
    pub fn resolve(&self, ctx: &ToolContext, excluded: &Exclusions) -> Vec<String> {
        let caller_files = ctx
            .files()
            .iter()
            .filter(|file| !self.is_excluded(&ctx.anchor(file), excluded))
            .cloned()
            .collect::<BTreeSet<_>>();

        if !caller_files.is_empty() {
            log::debug!("TargetPlan: using {} caller file(s)", caller_files.len());
            return render_targets(&caller_files, None);
        }

        let mut targets = self.configured_targets(ctx, excluded);

        if targets.is_empty() {
            targets.extend(self.fallback_target(ctx, excluded));
        }

        if targets.is_empty() && self.default_to_root && !self.is_excluded(ctx.root(), excluded) {
            targets.insert(normalize_lexically(ctx.root()));
        }

        log::debug!("TargetPlan: targets={targets:?}");

        render_targets(&targets, self.prefix.as_deref())
    }

    fn configured_targets(&self, ctx: &ToolContext, excluded: &Exclusions) -> BTreeSet<PathBuf> {
        let mut targets = self
            .settings
            .iter()
            .flat_map(|name| ctx.setting_list(name))
            .map(|value| ctx.resolve_path(&value))
            .filter(|candidate| !self.is_excluded(candidate, excluded))
            .collect::<BTreeSet<_>>();

        let root = normalize_lexically(ctx.root());
        let discovery = ctx.discovery();

        if self.include_discovery_roots {
            targets.extend(
                discovery
                    .roots
                    .iter()
                    .map(|directory| normalize_lexically(&ctx.anchor(directory)))
                    .filter(|directory| *directory != root)
                    .filter(|directory| !self.is_excluded(directory, excluded)),
            );
        }

        if self.include_discovery_explicit {
            targets.extend(
                discovery
                    .explicit_files
                    .iter()
                    .filter_map(|file| {
                        normalize_lexically(&ctx.anchor(file))
                            .parent()
                            .map(Path::to_path_buf)
                    })
                    .filter(|parent| !self.is_excluded(parent, excluded)),
            );
        }

        targets
    }

    fn fallback_target(&self, ctx: &ToolContext, excluded: &Exclusions) -> Option<PathBuf> {
        self.fallback
            .iter()
            .map(|fallback| (fallback, ctx.resolve_path(fallback)))
            .filter(|(fallback, candidate)| *fallback == CURRENT_DIRECTORY || candidate.exists())
            .find(|(_, candidate)| !self.is_excluded(candidate, excluded))
            .map(|(_, candidate)| candidate)
    }

    fn is_excluded(&self, candidate: &Path, excluded: &Exclusions) -> bool {
        self.filter_excluded && is_under_any(candidate, excluded)
    }
}

/// Renders targets in path order, each preceded by `prefix` when given.
fn render_targets(targets: &BTreeSet<PathBuf>, prefix: Option<&str>) -> Vec<String> {
    let targets = targets.iter().map(|path| path.display().to_string());
    match prefix {
        Some(prefix) => targets
            .flat_map(|target| [prefix.to_string(), target])
            .collect(),
        None => targets.collect(),
    }
}

/// Kinds of [`TargetSelector`]. Only file patterns exist today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, AsRefStr)]
pub enum SelectorKind {
    #[strum(serialize = "filePattern")]
    FilePattern,
}

/// Picks targets for a downloaded binary from the caller's file selection.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetSelector {
    kind: SelectorKind,
    suffixes: Vec<String>,
    contains: Vec<String>,
    requirements: Vec<Arc<[String]>>,
    fallback_directory: Option<String>,
    default_to_root: bool,
}

impl TargetSelector {
    /// Compiles a `targets` entry of a download-binary command.
    ///
    /// # Errors
    ///
    /// * If `value` is not an object
    /// * If `type` is not a string or not `filePattern`
    /// * If `suffixes`, `contains` or `pathMustInclude` hold non-strings
    /// * If `fallbackDirectory` is blank or not a string
    /// * If `defaultToRoot` is not a boolean
    pub fn compile(value: &Value, context: &str) -> Result<Self, CatalogIntegrityError> {
        let entry = require_object(value, context, "target selector must be an object")?;

        let kind = parse_selector_kind(entry, context)?;
        let suffixes = strict_string_list(entry.get("suffixes"), "suffixes", context)?;
        let contains = strict_string_list(entry.get("contains"), "contains", context)?;
        let requirements =
            strict_string_list(entry.get("pathMustInclude"), "pathMustInclude", context)?
                .iter()
                .map(|raw| normalize_requirement(raw))
                .filter(|requirement| !requirement.is_empty())
                .map(Into::into)
                .collect();

        Ok(Self {
            kind,
            suffixes,
            contains,
            requirements,
            fallback_directory: optional_non_empty_string(entry, "fallbackDirectory", context)?,
            default_to_root: strict_bool(entry, "defaultToRoot", false, context)?,
        })
    }

    #[must_use]
    pub const fn kind(&self) -> SelectorKind {
        self.kind
    }

    /// Returns the caller files that match every filter, in caller order. With
    /// no match, falls back to `fallbackDirectory` (when it exists and is not
    /// excluded) and then to the root.
    #[must_use]
    pub fn select(&self, ctx: &ToolContext, excluded: &Exclusions) -> Vec<String> {
        let matched = ctx
            .files()
            .iter()
            .filter(|file| self.matches(ctx, file))
            .map(|file| file.display().to_string())
            .collect_vec();

        if !matched.is_empty() {
            return matched;
        }

        if let Some(fallback) = &self.fallback_directory {
            let fallback = ctx.resolve_path(fallback);
            if fallback.exists() && !is_under_any(&fallback, excluded) {
                return vec![fallback.display().to_string()];
            }
        }

        if self.default_to_root {
            return vec![ctx.root().display().to_string()];
        }

        vec![]
    }

    fn matches(&self, ctx: &ToolContext, file: &Path) -> bool {
        let text = file.display().to_string();

        (self.suffixes.is_empty() || self.suffixes.iter().any(|suffix| text.ends_with(suffix.as_str())))
            && (self.contains.is_empty()
                || self.contains.iter().any(|fragment| text.contains(fragment.as_str())))
            && ctx
                .paths()
                .matches_requirements(file, ctx.root(), &self.requirements)
    }
}

fn parse_selector_kind(entry: &Entry, context: &str) -> Result<SelectorKind, CatalogIntegrityError> {
    let raw = match entry.get("type") {
        None | Some(Value::Null) => return Ok(SelectorKind::FilePattern),
        Some(Value::String(raw)) => raw.trim(),
        Some(_) => return Err(CatalogIntegrityError::new(context, "'type' must be a string")),
    };

    raw.parse().map_err(|_| {
        CatalogIntegrityError::new(context, format!("unsupported target selector type '{raw}'"))
    })
}
