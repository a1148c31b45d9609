//! `command_option_map`: base arguments, mapped options, selected files.

use serde_json::Value;

use crate::{
    context::ToolContext,
    entry::{require_arguments, require_object, truthy_flag},
    error::CatalogIntegrityError,
    options::{OptionMapping, apply_option_mappings, compile_option_mappings},
};

use super::Command;

const CONTEXT: &str = "command_option_map";

#[derive(Debug, Clone, PartialEq)]
pub struct OptionMapCommand {
    base: Vec<String>,
    options: Vec<OptionMapping>,
    append_files: bool,
}

impl OptionMapCommand {
    /// Compiles `{ base, appendFiles?, options? }`.
    ///
    /// # Errors
    ///
    /// * If the configuration is not an object
    /// * If `base` is missing, empty or not an array
    /// * If any option fails to compile
    pub fn compile(config: &Value) -> Result<Self, CatalogIntegrityError> {
        let config = require_object(config, CONTEXT, "configuration must be an object")?;

        Ok(Self {
            base: require_arguments(config, "base", CONTEXT)?,
            options: compile_option_mappings(config.get("options"), &format!("{CONTEXT}.options"))?,
            append_files: truthy_flag(config, "appendFiles", true),
        })
    }

    #[must_use]
    pub fn build(&self, ctx: &ToolContext) -> Command {
        let mut command = self.base.clone();

        apply_option_mappings(&self.options, ctx, &mut command);

        if self.append_files {
            command.extend(ctx.files().iter().map(|file| file.display().to_string()));
        }

        command.into()
    }
}
