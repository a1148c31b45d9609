//! Static registry of catalog strategy compilers.
//!
//! Catalog entries name their strategy by string. Every known name is
//! registered up front, so an unknown name is rejected when the tool
//! definition is compiled rather than when it first runs.

use std::{collections::BTreeMap, path::PathBuf, sync::Arc};

use serde_json::Value;

use crate::{
    artifacts::{ArtifactProvider, DownloadInstaller, UnavailableArtifactProvider},
    context::ToolContext,
    diagnostics::{DiagnosticExtractor, RawDiagnostic},
    entry::require_object,
    error::{ArtifactError, CatalogIntegrityError},
    parsers::{ParserStrategy, compile_json_parser, compile_text_parser},
    strategies::{
        Command, CommandStrategy, DownloadBinaryCommand, OptionMapCommand, ProjectScannerCommand,
    },
};

/// Compiles one catalog entry's `config` object.
pub type StrategyCompiler =
    fn(&Value, &Arc<dyn ArtifactProvider>) -> Result<CompiledStrategy, CatalogIntegrityError>;

/// Output of a [`StrategyCompiler`].
#[derive(Debug, Clone)]
pub enum CompiledStrategy {
    Command(CommandStrategy),
    Parser(ParserStrategy),
    Installer(DownloadInstaller),
}

impl CompiledStrategy {
    #[must_use]
    pub const fn as_command(&self) -> Option<&CommandStrategy> {
        match self {
            Self::Command(strategy) => Some(strategy),
            Self::Parser(_) | Self::Installer(_) => None,
        }
    }

    #[must_use]
    pub const fn as_parser(&self) -> Option<&ParserStrategy> {
        match self {
            Self::Parser(parser) => Some(parser),
            Self::Command(_) | Self::Installer(_) => None,
        }
    }

    #[must_use]
    pub const fn as_installer(&self) -> Option<&DownloadInstaller> {
        match self {
            Self::Installer(installer) => Some(installer),
            Self::Command(_) | Self::Parser(_) => None,
        }
    }
}

/// Registry of strategy compilers, keyed by catalog strategy name.
#[derive(Debug)]
pub struct StrategyRegistry {
    compilers: BTreeMap<&'static str, StrategyCompiler>,
    provider: Arc<dyn ArtifactProvider>,
}

impl StrategyRegistry {
    /// Creates a registry with every built-in strategy. Download strategies
    /// obtain their binaries from `provider`.
    #[must_use]
    pub fn new(provider: Arc<dyn ArtifactProvider>) -> Self {
        let mut registry = Self {
            compilers: BTreeMap::new(),
            provider,
        };

        registry.register_builtin_strategies();

        registry
    }

    /// Registers a compiler, replacing any previous one with the same name.
    pub fn register(&mut self, name: &'static str, compiler: StrategyCompiler) {
        self.compilers.insert(name, compiler);
    }

    fn register_builtin_strategies(&mut self) {
        self.register("command_option_map", |config, _| {
            Ok(CompiledStrategy::Command(OptionMapCommand::compile(config)?.into()))
        });
        self.register("command_project_scanner", |config, _| {
            Ok(CompiledStrategy::Command(ProjectScannerCommand::compile(config)?.into()))
        });
        self.register("command_download_binary", |config, provider| {
            Ok(CompiledStrategy::Command(
                DownloadBinaryCommand::compile(config, provider.clone())?.into(),
            ))
        });
        self.register("parser_json_diagnostics", |config, _| {
            Ok(CompiledStrategy::Parser(DiagnosticExtractor::from_config(config)?.into()))
        });
        self.register("json_parser", |config, _| {
            Ok(CompiledStrategy::Parser(compile_json_parser(config)?.into()))
        });
        self.register("text_parser", |config, _| {
            Ok(CompiledStrategy::Parser(compile_text_parser(config)?.into()))
        });
        self.register("install_download_artifact", |config, provider| {
            Ok(CompiledStrategy::Installer(DownloadInstaller::compile(
                config,
                provider.clone(),
            )?))
        });
    }

    /// Registered strategy names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.compilers.keys().copied()
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.compilers.contains_key(name)
    }

    /// Compiles `config` with the compiler registered as `name`.
    ///
    /// # Errors
    ///
    /// * If no compiler is registered as `name`
    /// * If the compiler rejects `config`
    pub fn compile(&self, name: &str, config: &Value) -> Result<CompiledStrategy, CatalogIntegrityError> {
        let compiler = self.compilers.get(name).ok_or_else(|| {
            CatalogIntegrityError::new("strategy", format!("unknown strategy '{name}'"))
        })?;

        log::debug!("compile: strategy={name}");

        compiler(config, &self.provider)
    }

    /// Compiles a whole tool definition.
    ///
    /// ```json
    /// {
    ///   "name": "bandit",
    ///   "command": { "strategy": "command_project_scanner", "config": { ... } },
    ///   "parser": { "strategy": "parser_json_diagnostics", "config": { ... } },
    ///   "installers": [{ "strategy": "install_download_artifact", "config": { ... } }]
    /// }
    /// ```
    ///
    /// # Errors
    ///
    /// * If the definition or any strategy reference is malformed
    /// * If a referenced strategy is unknown or rejects its config
    /// * If `command` does not name a command strategy, `parser` a parser or
    ///   an `installers` entry an installer
    pub fn compile_tool(&self, definition: &Value) -> Result<ToolDefinition, CatalogIntegrityError> {
        let definition = require_object(definition, "tool", "definition must be an object")?;

        let name = definition
            .get("name")
            .and_then(Value::as_str)
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| CatalogIntegrityError::new("tool", "'name' must be a non-empty string"))?
            .to_string();

        let command = match definition.get("command") {
            None | Some(Value::Null) => None,
            Some(reference) => match self.compile_reference(reference, &format!("{name}.command"))? {
                CompiledStrategy::Command(command) => Some(command),
                _ => {
                    return Err(CatalogIntegrityError::new(
                        format!("{name}.command"),
                        "strategy does not build commands",
                    ));
                }
            },
        };

        let parser = match definition.get("parser") {
            None | Some(Value::Null) => None,
            Some(reference) => match self.compile_reference(reference, &format!("{name}.parser"))? {
                CompiledStrategy::Parser(parser) => Some(parser),
                _ => {
                    return Err(CatalogIntegrityError::new(
                        format!("{name}.parser"),
                        "strategy does not parse diagnostics",
                    ));
                }
            },
        };

        let installers = match definition.get("installers") {
            None | Some(Value::Null) => vec![],
            Some(Value::Array(references)) => references
                .iter()
                .enumerate()
                .map(|(index, reference)| {
                    let context = format!("{name}.installers[{index}]");
                    match self.compile_reference(reference, &context)? {
                        CompiledStrategy::Installer(installer) => Ok(installer),
                        _ => Err(CatalogIntegrityError::new(
                            context,
                            "strategy does not install artifacts",
                        )),
                    }
                })
                .collect::<Result<_, _>>()?,
            Some(_) => {
                return Err(CatalogIntegrityError::new(
                    format!("{name}.installers"),
                    "'installers' must be an array",
                ));
            }
        };

        Ok(ToolDefinition {
            name,
            command,
            parser,
            installers,
        })
    }

    fn compile_reference(
        &self,
        reference: &Value,
        context: &str,
    ) -> Result<CompiledStrategy, CatalogIntegrityError> {
        let reference = require_object(reference, context, "strategy reference must be an object")?;

        let name = reference
            .get("strategy")
            .and_then(Value::as_str)
            .ok_or_else(|| CatalogIntegrityError::new(context, "'strategy' must be a string"))?;

        let empty = Value::Object(serde_json::Map::new());
        self.compile(name, reference.get("config").unwrap_or(&empty))
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::new(Arc::new(UnavailableArtifactProvider))
    }
}

/// A compiled tool: its command, parser and installers.
#[derive(Debug, Clone)]
pub struct ToolDefinition {
    pub name: String,
    pub command: Option<CommandStrategy>,
    pub parser: Option<ParserStrategy>,
    pub installers: Vec<DownloadInstaller>,
}

impl ToolDefinition {
    /// Builds the tool's command, or `None` when it has no command strategy.
    ///
    /// # Errors
    ///
    /// * If a download-binary strategy cannot obtain its artifact
    pub fn build_command(&self, ctx: &ToolContext) -> Result<Option<Command>, ArtifactError> {
        self.command
            .as_ref()
            .map(|strategy| strategy.build(ctx))
            .transpose()
    }

    /// Parses captured output, or yields nothing when the tool has no parser.
    #[must_use]
    pub fn parse_output(&self, stdout: &str, ctx: &ToolContext) -> Vec<RawDiagnostic> {
        self.parser
            .as_ref()
            .map(|parser| parser.parse(stdout, ctx))
            .unwrap_or_default()
    }

    /// Runs every installer in declared order.
    ///
    /// # Errors
    ///
    /// * If any installer fails
    pub fn install(&self, ctx: &ToolContext) -> Result<Vec<PathBuf>, ArtifactError> {
        self.installers
            .iter()
            .map(|installer| installer.install(ctx))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::parsers::{JsonTransform, TextTransform};

    #[test_log::test]
    fn test_builtin_names() {
        let registry = StrategyRegistry::default();
        assert_eq!(
            registry.names().collect::<Vec<_>>(),
            vec![
                "command_download_binary",
                "command_option_map",
                "command_project_scanner",
                "install_download_artifact",
                "json_parser",
                "parser_json_diagnostics",
                "text_parser",
            ]
        );
        assert!(registry.contains("command_option_map"));
        assert!(!registry.contains("xml_parser"));
    }

    #[test_log::test]
    fn test_unknown_strategy_is_integrity_error() {
        let error = StrategyRegistry::default()
            .compile("xml_parser", &json!({}))
            .unwrap_err();
        assert_eq!(error.context, "strategy");
        assert_eq!(error.to_string(), "strategy: unknown strategy 'xml_parser'");
    }

    #[test_log::test]
    fn test_compile_known_parser_transforms() {
        let registry = StrategyRegistry::default();

        let parser = registry
            .compile("json_parser", &json!({"transform": "ruff"}))
            .unwrap();
        assert_eq!(
            parser.as_parser(),
            Some(&ParserStrategy::Json(JsonTransform::Ruff))
        );

        let parser = registry
            .compile("text_parser", &json!({"transform": "tsc"}))
            .unwrap();
        assert_eq!(
            parser.as_parser(),
            Some(&ParserStrategy::Text(TextTransform::Tsc))
        );
    }

    #[test_log::test]
    fn test_unknown_parser_transform_is_integrity_error() {
        let registry = StrategyRegistry::default();

        let error = registry
            .compile("json_parser", &json!({"transform": "rufff"}))
            .unwrap_err();
        assert_eq!(error.context, "json_parser.transform");
        assert_eq!(error.reason, "unknown transform 'rufff'");

        let error = registry
            .compile("text_parser", &json!({"transform": "ruff"}))
            .unwrap_err();
        assert_eq!(error.context, "text_parser.transform");

        let error = registry.compile("json_parser", &json!({})).unwrap_err();
        assert_eq!(error.to_string(), "json_parser: expected 'transform' to be a string");
    }

    #[test_log::test]
    fn test_compile_dispatches_by_name() {
        let registry = StrategyRegistry::default();

        assert!(
            registry
                .compile("command_option_map", &json!({"base": ["tool"]}))
                .unwrap()
                .as_command()
                .is_some()
        );
        assert!(
            registry
                .compile("parser_json_diagnostics", &json!({"mappings": {"message": "m"}}))
                .unwrap()
                .as_parser()
                .is_some()
        );
        assert!(
            registry
                .compile("install_download_artifact", &json!({"download": {}}))
                .unwrap()
                .as_installer()
                .is_some()
        );
    }

    #[test_log::test]
    fn test_compile_tool() {
        let tool = StrategyRegistry::default()
            .compile_tool(&json!({
                "name": "ruff",
                "command": {"strategy": "command_option_map", "config": {"base": ["ruff", "check"]}},
                "parser": {
                    "strategy": "parser_json_diagnostics",
                    "config": {"mappings": {"message": "message", "code": "code"}}
                }
            }))
            .unwrap();

        let ctx = ToolContext::builder("/repo").files(["a.py"]).build();
        assert_eq!(
            tool.build_command(&ctx).unwrap().unwrap().args(),
            ["ruff", "check", "a.py"]
        );
        assert_eq!(
            tool.parse_output(r#"[{"message": "bad", "code": "E1"}]"#, &ctx)[0].code.as_deref(),
            Some("E1")
        );
        assert!(tool.install(&ctx).unwrap().is_empty());
    }

    #[test_log::test]
    fn test_compile_tool_rejects_mismatched_roles() {
        let error = StrategyRegistry::default()
            .compile_tool(&json!({
                "name": "ruff",
                "command": {"strategy": "parser_json_diagnostics", "config": {"mappings": {"message": "m"}}}
            }))
            .unwrap_err();
        assert_eq!(error.to_string(), "ruff.command: strategy does not build commands");

        let error = StrategyRegistry::default()
            .compile_tool(&json!({"name": " "}))
            .unwrap_err();
        assert_eq!(error.to_string(), "tool: 'name' must be a non-empty string");
    }
}
