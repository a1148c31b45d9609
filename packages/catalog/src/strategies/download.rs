//! `command_download_binary`: run a binary obtained from an
//! [`ArtifactProvider`].

use std::sync::Arc;

use lintcat_json_path::coerce;
use serde_json::Value;

use crate::{
    artifacts::{ArtifactProvider, ArtifactRequest, cache_root},
    context::ToolContext,
    entry::{Entry, optional_string, require_object},
    error::{ArtifactError, CatalogIntegrityError},
    options::{OptionMapping, apply_option_mappings, compile_option_mappings},
    targets::{Exclusions, TargetSelector},
};

use super::Command;

const CONTEXT: &str = "command_download_binary";
const DOWNLOAD_CONTEXT: &str = "command_download_binary.download";

/// Token in `base` replaced by the resolved binary path.
pub const DEFAULT_BINARY_PLACEHOLDER: &str = "${binary}";

#[derive(Debug, Clone)]
pub struct DownloadBinaryCommand {
    download: Entry,
    version: Option<String>,
    placeholder: String,
    base: Vec<String>,
    options: Vec<OptionMapping>,
    targets: Option<TargetSelector>,
    provider: Arc<dyn ArtifactProvider>,
}

impl DownloadBinaryCommand {
    /// Compiles `{ download, version?, binaryPlaceholder?, base?, options?,
    /// targets? }`.
    ///
    /// A missing or empty `base` becomes just the placeholder, and the
    /// placeholder is prepended when `base` does not mention it.
    ///
    /// # Errors
    ///
    /// * If the configuration or `download` is not an object
    /// * If `version` is not a string
    /// * If `binaryPlaceholder` is blank or not a string
    /// * If `base` is not an array
    /// * If any option or the target selector fails to compile
    pub fn compile(
        config: &Value,
        provider: Arc<dyn ArtifactProvider>,
    ) -> Result<Self, CatalogIntegrityError> {
        let config = require_object(config, CONTEXT, "configuration must be an object")?;

        let download = config
            .get("download")
            .and_then(Value::as_object)
            .ok_or_else(|| CatalogIntegrityError::new(CONTEXT, "'download' must be an object"))?
            .clone();

        let placeholder = match config.get("binaryPlaceholder") {
            None | Some(Value::Null) => DEFAULT_BINARY_PLACEHOLDER.to_string(),
            Some(Value::String(placeholder)) if !placeholder.is_empty() => placeholder.clone(),
            Some(_) => {
                return Err(CatalogIntegrityError::new(
                    CONTEXT,
                    "'binaryPlaceholder' must be a non-empty string",
                ));
            }
        };

        let mut base = match config.get("base") {
            None | Some(Value::Null) => vec![],
            Some(Value::Array(parts)) => parts
                .iter()
                .filter_map(coerce::to_optional_string)
                .collect(),
            Some(_) => {
                return Err(CatalogIntegrityError::new(
                    CONTEXT,
                    "'base' must be an array of arguments",
                ));
            }
        };
        if !base.contains(&placeholder) {
            base.insert(0, placeholder.clone());
        }

        let targets = match config.get("targets") {
            None | Some(Value::Null) => None,
            Some(targets) => Some(TargetSelector::compile(targets, &format!("{CONTEXT}.targets"))?),
        };

        Ok(Self {
            download,
            version: optional_string(config, "version", CONTEXT)?,
            placeholder,
            base,
            options: compile_option_mappings(config.get("options"), &format!("{CONTEXT}.options"))?,
            targets,
            provider,
        })
    }

    #[must_use]
    pub fn base(&self) -> &[String] {
        &self.base
    }

    /// Obtains the binary, then renders the base with the placeholder
    /// replaced, the options and the selected targets.
    ///
    /// # Errors
    ///
    /// * If the artifact provider fails
    pub fn build(&self, ctx: &ToolContext) -> Result<Command, ArtifactError> {
        let cache_root = cache_root(ctx);
        let binary = self.provider.provide(&ArtifactRequest {
            download: &self.download,
            version: self.version.as_deref(),
            cache_root: &cache_root,
            context: DOWNLOAD_CONTEXT,
        })?;
        let binary = binary.display().to_string();

        let mut command = self
            .base
            .iter()
            .map(|part| {
                if *part == self.placeholder {
                    binary.clone()
                } else {
                    part.clone()
                }
            })
            .collect::<Vec<_>>();

        apply_option_mappings(&self.options, ctx, &mut command);

        if let Some(selector) = &self.targets {
            command.extend(selector.select(ctx, &Exclusions::new()));
        }

        Ok(command.into())
    }
}
