//! Per-invocation runtime context handed to compiled strategies.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    sync::Arc,
};

use lintcat_json_path::coerce;
use serde_json::Value;

use crate::{
    config::{FileDiscoveryConfig, RuntimeConfig},
    paths::PathResolver,
};

/// Settings for the tool currently being invoked, keyed by setting name.
pub type Settings = BTreeMap<String, Value>;

/// Read-only view of everything a strategy may consult while building a
/// command: the execution root, the tool's settings, the shared runtime
/// configuration (including discovery state) and the caller's file selection.
#[derive(Debug, Clone)]
pub struct ToolContext {
    root: PathBuf,
    settings: Settings,
    config: Arc<RuntimeConfig>,
    files: Vec<PathBuf>,
    paths: PathResolver,
}

impl ToolContext {
    #[must_use]
    pub fn builder(root: impl Into<PathBuf>) -> ToolContextBuilder {
        ToolContextBuilder {
            root: root.into(),
            settings: Settings::new(),
            config: None,
            files: vec![],
            paths: None,
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub const fn settings(&self) -> &Settings {
        &self.settings
    }

    #[must_use]
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    #[must_use]
    pub fn discovery(&self) -> &FileDiscoveryConfig {
        &self.config.file_discovery
    }

    #[must_use]
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    #[must_use]
    pub const fn paths(&self) -> &PathResolver {
        &self.paths
    }

    /// Looks up the first of `names` that is present in the settings.
    ///
    /// Each name is also tried with `-` replaced by `_`. A `null` value counts
    /// as not present; any other value, including `false`, `0` and `""`, is
    /// returned.
    #[must_use]
    pub fn setting<'a, I>(&self, names: I) -> Option<&Value>
    where
        I: IntoIterator<Item = &'a str>,
    {
        names.into_iter().find_map(|name| {
            self.settings
                .get(name)
                .filter(|value| !value.is_null())
                .or_else(|| {
                    let alternate = name.replace('-', "_");
                    self.settings.get(&alternate).filter(|value| !value.is_null())
                })
        })
    }

    /// [`setting`](Self::setting) coerced to a list of strings.
    #[must_use]
    pub fn setting_list(&self, name: &str) -> Vec<String> {
        self.setting([name])
            .map(coerce::to_string_list)
            .unwrap_or_default()
    }

    /// Resolves `value` against the execution root.
    #[must_use]
    pub fn resolve_path(&self, value: &str) -> PathBuf {
        self.paths.resolve(&self.root, value)
    }

    /// Resolves a discovery entry: absolute entries are kept, relative ones
    /// are joined to the root.
    #[must_use]
    pub fn anchor(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

#[derive(Debug)]
pub struct ToolContextBuilder {
    root: PathBuf,
    settings: Settings,
    config: Option<Arc<RuntimeConfig>>,
    files: Vec<PathBuf>,
    paths: Option<PathResolver>,
}

impl ToolContextBuilder {
    #[must_use]
    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    #[must_use]
    pub fn setting(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.settings.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn config(mut self, config: impl Into<Arc<RuntimeConfig>>) -> Self {
        self.config = Some(config.into());
        self
    }

    #[must_use]
    pub fn files<I, P>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.files = files.into_iter().map(Into::into).collect();
        self
    }

    /// Injects a shared [`PathResolver`]. Contexts built from the same
    /// resolver share its caches.
    #[must_use]
    pub fn path_resolver(mut self, paths: PathResolver) -> Self {
        self.paths = Some(paths);
        self
    }

    #[must_use]
    pub fn build(self) -> ToolContext {
        ToolContext {
            root: self.root,
            settings: self.settings,
            config: self.config.unwrap_or_default(),
            files: self.files,
            paths: self.paths.unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test_log::test]
    fn test_setting_presence_not_truthiness() {
        let ctx = ToolContext::builder("/repo")
            .setting("strict", false)
            .setting("level", 0)
            .setting("name", "")
            .setting("missing", Value::Null)
            .build();

        assert_eq!(ctx.setting(["strict"]), Some(&json!(false)));
        assert_eq!(ctx.setting(["level"]), Some(&json!(0)));
        assert_eq!(ctx.setting(["name"]), Some(&json!("")));
        assert_eq!(ctx.setting(["missing"]), None);
    }

    #[test_log::test]
    fn test_setting_aliases_and_dash_fallback() {
        let ctx = ToolContext::builder("/repo")
            .setting("max_line_length", 99)
            .setting("config", "a.toml")
            .build();

        assert_eq!(ctx.setting(["max-line-length"]), Some(&json!(99)));
        assert_eq!(ctx.setting(["unset", "config"]), Some(&json!("a.toml")));
        assert_eq!(ctx.setting(["unset", "other"]), None);
    }

    #[test_log::test]
    fn test_setting_list_and_anchor() {
        let ctx = ToolContext::builder("/repo")
            .setting("paths", json!(["src", "tests"]))
            .build();

        assert_eq!(ctx.setting_list("paths"), vec!["src", "tests"]);
        assert!(ctx.setting_list("absent").is_empty());
        assert_eq!(ctx.anchor(Path::new("lib")), PathBuf::from("/repo/lib"));
        assert_eq!(ctx.anchor(Path::new("/abs")), PathBuf::from("/abs"));
        assert_eq!(ctx.resolve_path("src/../lib"), PathBuf::from("/repo/lib"));
    }

    #[test_log::test]
    fn test_builder_defaults() {
        let ctx = ToolContext::builder("/repo").build();
        assert_eq!(ctx.config(), &RuntimeConfig::default());
        assert!(ctx.files().is_empty());
        assert_eq!(ctx.paths().capacity(), crate::paths::DEFAULT_CACHE_CAPACITY);
    }
}
