//! Boundary to the collaborator that materialises downloadable binaries.
//!
//! Artifact resolution is the only blocking I/O reachable from a compiled
//! strategy. Failures are passed through as [`ArtifactError`] unchanged.

use std::{
    fmt,
    path::{Path, PathBuf},
    sync::Arc,
};

use serde_json::Value;

use crate::{
    context::ToolContext,
    entry::{Entry, optional_non_empty_string, optional_string, require_object},
    error::{ArtifactError, CatalogIntegrityError},
};

/// Directory under the execution root that holds downloaded artifacts.
pub const CACHE_DIRECTORY: &str = ".lint-cache";

/// Context used by installers that do not set `contextLabel`.
pub const DEFAULT_INSTALL_CONTEXT: &str = "install_download_artifact.download";

/// Everything a provider needs to locate or fetch one artifact.
#[derive(Debug, Clone, Copy)]
pub struct ArtifactRequest<'a> {
    /// The catalog's `download` object, passed through uninterpreted.
    pub download: &'a Entry,
    pub version: Option<&'a str>,
    pub cache_root: &'a Path,
    /// Dotted catalog location, for error reporting.
    pub context: &'a str,
}

/// Resolves a download specification to a local binary.
///
/// Implementations may block for as long as the download takes.
pub trait ArtifactProvider: fmt::Debug + Send + Sync {
    /// Returns the path of the materialised artifact.
    ///
    /// # Errors
    ///
    /// * If the artifact cannot be obtained
    fn provide(&self, request: &ArtifactRequest<'_>) -> Result<PathBuf, ArtifactError>;
}

/// Provider used when none is configured. Every request fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableArtifactProvider;

impl ArtifactProvider for UnavailableArtifactProvider {
    fn provide(&self, request: &ArtifactRequest<'_>) -> Result<PathBuf, ArtifactError> {
        Err(ArtifactError::Unavailable {
            context: request.context.to_string(),
            reason: "no artifact provider configured".to_string(),
        })
    }
}

/// Provider that always answers with one pre-installed binary.
#[derive(Debug, Clone)]
pub struct FixedArtifactProvider {
    path: PathBuf,
}

impl FixedArtifactProvider {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ArtifactProvider for FixedArtifactProvider {
    fn provide(&self, request: &ArtifactRequest<'_>) -> Result<PathBuf, ArtifactError> {
        log::debug!(
            "FixedArtifactProvider: {} version={:?} -> {}",
            request.context,
            request.version,
            self.path.display()
        );

        if !self.path.exists() {
            return Err(ArtifactError::Missing {
                context: request.context.to_string(),
                path: self.path.clone(),
            });
        }

        Ok(self.path.clone())
    }
}

/// `<root>/.lint-cache`
#[must_use]
pub fn cache_root(ctx: &ToolContext) -> PathBuf {
    ctx.root().join(CACHE_DIRECTORY)
}

/// Compiled `install_download_artifact` entry.
#[derive(Debug, Clone)]
pub struct DownloadInstaller {
    download: Entry,
    version: Option<String>,
    context_label: String,
    provider: Arc<dyn ArtifactProvider>,
}

impl DownloadInstaller {
    /// Compiles `{ download, version?, contextLabel? }`.
    ///
    /// # Errors
    ///
    /// * If the configuration or `download` is not an object
    /// * If `version` is not a string
    /// * If `contextLabel` is blank or not a string
    pub fn compile(
        config: &Value,
        provider: Arc<dyn ArtifactProvider>,
    ) -> Result<Self, CatalogIntegrityError> {
        const CONTEXT: &str = "install_download_artifact";

        let config = require_object(config, CONTEXT, "configuration must be an object")?;
        let download = config
            .get("download")
            .and_then(Value::as_object)
            .ok_or_else(|| CatalogIntegrityError::new(CONTEXT, "'download' must be an object"))?
            .clone();

        Ok(Self {
            download,
            version: optional_string(config, "version", CONTEXT)?,
            context_label: optional_non_empty_string(config, "contextLabel", CONTEXT)?
                .unwrap_or_else(|| DEFAULT_INSTALL_CONTEXT.to_string()),
            provider,
        })
    }

    #[must_use]
    pub fn context_label(&self) -> &str {
        &self.context_label
    }

    /// Materialises the artifact under `<root>/.lint-cache`.
    ///
    /// # Errors
    ///
    /// * If the provider fails
    pub fn install(&self, ctx: &ToolContext) -> Result<PathBuf, ArtifactError> {
        let cache_root = cache_root(ctx);
        self.provider.provide(&ArtifactRequest {
            download: &self.download,
            version: self.version.as_deref(),
            cache_root: &cache_root,
            context: &self.context_label,
        })
    }
}
