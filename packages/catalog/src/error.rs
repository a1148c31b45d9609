//! Error types for catalog compilation and execution.

use std::path::PathBuf;

use lintcat_json_path::PathError;
use thiserror::Error;

/// A catalog entry has the wrong shape.
///
/// Raised only while compiling catalog configuration into strategies,
/// mappings or extractors. Already-compiled strategies never produce it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{context}: {reason}")]
pub struct CatalogIntegrityError {
    /// Dotted location of the offending entry, e.g.
    /// `command_project_scanner.targets.settings`.
    pub context: String,
    /// Human-readable description of the problem.
    pub reason: String,
}

impl CatalogIntegrityError {
    #[must_use]
    pub fn new(context: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            context: context.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn from_path(context: &str, error: &PathError) -> Self {
        Self::new(context, error.to_string())
    }
}

/// Failure reported by an [`ArtifactProvider`](crate::artifacts::ArtifactProvider).
///
/// Passed through to the caller unmodified.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("{context}: artifact not available: {reason}")]
    Unavailable { context: String, reason: String },
    #[error("{context}: artifact '{}' does not exist", path.display())]
    Missing { context: String, path: PathBuf },
    #[error(transparent)]
    IO(#[from] std::io::Error),
}

/// Failure loading the runtime configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    IO(#[from] std::io::Error),
    #[error(transparent)]
    Toml(#[from] toml::de::Error),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    CatalogIntegrity(#[from] CatalogIntegrityError),
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    IO(#[from] std::io::Error),
    #[error("tool '{tool}' has no {role} strategy")]
    MissingStrategy { tool: String, role: &'static str },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_log::test]
    fn test_integrity_error_renders_context_and_reason() {
        let error = CatalogIntegrityError::new(
            "command_project_scanner.targets.settings",
            "must be string or array of strings",
        );
        assert_eq!(
            error.to_string(),
            "command_project_scanner.targets.settings: must be string or array of strings"
        );
    }

    #[test_log::test]
    fn test_integrity_error_from_path_error() {
        let error = CatalogIntegrityError::from_path(
            "parser_json_diagnostics",
            &PathError::UnmatchedBracket("a[".to_string()),
        );
        assert_eq!(error.context, "parser_json_diagnostics");
        assert_eq!(error.reason, "unmatched '[' in path 'a['");
    }
}
