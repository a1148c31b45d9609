//! Shared runtime configuration consulted for option defaults.
//!
//! Every section and field is defaulted, so an empty TOML document yields the
//! stock configuration:
//!
//! ```toml
//! [execution]
//! line_length = 100
//! python_version = "3.11"
//! pylint_plugins = ["pylint_django"]
//!
//! [severity]
//! bandit_level = "high"
//!
//! [file_discovery]
//! excludes = ["build", "vendor"]
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, EnumString};

use crate::error::ConfigError;

/// Python version assumed when neither the settings nor the configuration
/// name one.
pub const DEFAULT_PYTHON_VERSION: &str = "3.12";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub execution: ExecutionConfig,
    pub complexity: ComplexityConfig,
    pub severity: SeverityConfig,
    pub strictness: StrictnessConfig,
    pub file_discovery: FileDiscoveryConfig,
}

impl RuntimeConfig {
    /// Parses a TOML document.
    ///
    /// # Errors
    ///
    /// * If the document is not valid TOML or has mistyped fields
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    /// Reads and parses a TOML file.
    ///
    /// # Errors
    ///
    /// * If the file cannot be read
    /// * If the document is not valid TOML or has mistyped fields
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        log::debug!("Loading runtime configuration from '{}'", path.display());
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    pub line_length: u32,
    pub sql_dialect: String,
    pub python_version: Option<String>,
    /// Pylint plugins available to the project, passed via `--load-plugins`.
    pub pylint_plugins: Vec<String>,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            line_length: 120,
            sql_dialect: "postgresql".to_string(),
            python_version: None,
            pylint_plugins: vec![],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComplexityConfig {
    pub max_complexity: Option<u32>,
    pub max_arguments: Option<u32>,
}

impl Default for ComplexityConfig {
    fn default() -> Self {
        Self {
            max_complexity: Some(10),
            max_arguments: Some(5),
        }
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum BanditLevel {
    Low,
    #[default]
    Medium,
    High,
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum BanditConfidence {
    Low,
    #[default]
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeverityConfig {
    pub bandit_level: BanditLevel,
    pub bandit_confidence: BanditConfidence,
    pub pylint_fail_under: Option<f64>,
    pub max_warnings: Option<u32>,
}

impl Default for SeverityConfig {
    fn default() -> Self {
        Self {
            bandit_level: BanditLevel::default(),
            bandit_confidence: BanditConfidence::default(),
            pylint_fail_under: Some(9.5),
            max_warnings: None,
        }
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum StrictnessLevel {
    Lenient,
    #[default]
    Standard,
    Strict,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrictnessConfig {
    pub type_checking: StrictnessLevel,
}

/// Discovery state exposed to scanner-style commands.
///
/// Relative entries are interpreted against the execution root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileDiscoveryConfig {
    pub roots: Vec<PathBuf>,
    pub excludes: Vec<PathBuf>,
    pub explicit_files: Vec<PathBuf>,
}

impl Default for FileDiscoveryConfig {
    fn default() -> Self {
        Self {
            roots: vec![PathBuf::from(".")],
            excludes: vec![],
            explicit_files: vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test_log::test]
    fn test_empty_document_yields_defaults() {
        let config = RuntimeConfig::from_toml_str("").unwrap();
        assert_eq!(config, RuntimeConfig::default());
        assert_eq!(config.execution.line_length, 120);
        assert_eq!(config.execution.sql_dialect, "postgresql");
        assert_eq!(config.complexity.max_complexity, Some(10));
        assert_eq!(config.complexity.max_arguments, Some(5));
        assert_eq!(config.severity.bandit_level, BanditLevel::Medium);
        assert_eq!(config.severity.pylint_fail_under, Some(9.5));
        assert_eq!(config.strictness.type_checking, StrictnessLevel::Standard);
        assert_eq!(config.file_discovery.roots, vec![PathBuf::from(".")]);
    }

    #[test_log::test]
    fn test_partial_sections_keep_remaining_defaults() {
        let config = RuntimeConfig::from_toml_str(
            r#"
            [execution]
            line_length = 88
            python_version = "3.11"

            [severity]
            bandit_level = "high"

            [strictness]
            type_checking = "strict"

            [file_discovery]
            excludes = ["build"]
            "#,
        )
        .unwrap();

        assert_eq!(config.execution.line_length, 88);
        assert_eq!(config.execution.sql_dialect, "postgresql");
        assert_eq!(config.execution.python_version.as_deref(), Some("3.11"));
        assert_eq!(config.severity.bandit_level, BanditLevel::High);
        assert_eq!(config.severity.bandit_confidence, BanditConfidence::Medium);
        assert_eq!(config.strictness.type_checking, StrictnessLevel::Strict);
        assert_eq!(config.file_discovery.excludes, vec![PathBuf::from("build")]);
        assert_eq!(config.file_discovery.roots, vec![PathBuf::from(".")]);
    }

    #[test_log::test]
    fn test_mistyped_field_is_rejected() {
        assert!(RuntimeConfig::from_toml_str("[execution]\nline_length = \"wide\"").is_err());
    }

    #[test_log::test]
    fn test_enum_names_render_lowercase() {
        assert_eq!(BanditLevel::High.as_ref(), "high");
        assert_eq!(StrictnessLevel::Lenient.as_ref(), "lenient");
    }
}
