//! `command_project_scanner`: project-aware scanners with exclusions and a
//! target plan.

use itertools::Itertools as _;
use serde_json::Value;

use crate::{
    context::ToolContext,
    entry::{Entry, require_arguments, require_object, string_or_list, truthy_flag},
    error::CatalogIntegrityError,
    options::{OptionMapping, apply_option_mappings, compile_option_mappings},
    paths::compile_exclude_arguments,
    targets::{Exclusions, TargetPlan},
};

use super::Command;

const CONTEXT: &str = "command_project_scanner";
const DEFAULT_EXCLUDE_SEPARATOR: &str = ",";

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectScannerCommand {
    base: Vec<String>,
    options: Vec<OptionMapping>,
    exclude_settings: Vec<String>,
    include_discovery_excludes: bool,
    exclude_flag: Option<String>,
    exclude_separator: String,
    targets: Option<TargetPlan>,
}

impl ProjectScannerCommand {
    /// Compiles `{ base, options?, exclude?, targets? }`.
    ///
    /// # Errors
    ///
    /// * If the configuration or `exclude` is not an object
    /// * If `base` is missing, empty or not an array
    /// * If any option fails to compile
    /// * If `exclude.settings`, `exclude.flag` or `exclude.separator` have
    ///   the wrong shape
    /// * If `targets` fails [`TargetPlan::compile`]
    pub fn compile(config: &Value) -> Result<Self, CatalogIntegrityError> {
        let config = require_object(config, CONTEXT, "configuration must be an object")?;

        let base = require_arguments(config, "base", CONTEXT)?;
        let options = compile_option_mappings(config.get("options"), &format!("{CONTEXT}.options"))?;

        let empty = Entry::new();
        let exclude = match config.get("exclude") {
            None | Some(Value::Null) => &empty,
            Some(Value::Object(exclude)) => exclude,
            Some(_) => {
                return Err(CatalogIntegrityError::new(
                    CONTEXT,
                    "'exclude' must be an object when provided",
                ));
            }
        };

        let exclude_flag = match exclude.get("flag") {
            None | Some(Value::Null) => None,
            Some(Value::String(flag)) => Some(flag.clone()),
            Some(_) => {
                return Err(CatalogIntegrityError::new(
                    CONTEXT,
                    "exclude.flag must be a string when provided",
                ));
            }
        };

        let exclude_separator = match exclude.get("separator") {
            None | Some(Value::Null) => DEFAULT_EXCLUDE_SEPARATOR.to_string(),
            Some(Value::String(separator)) if !separator.is_empty() => separator.clone(),
            Some(_) => {
                return Err(CatalogIntegrityError::new(
                    CONTEXT,
                    "exclude.separator must be a non-empty string",
                ));
            }
        };

        let targets = match config.get("targets") {
            None | Some(Value::Null) => None,
            Some(targets) => Some(TargetPlan::compile(targets, &format!("{CONTEXT}.targets"))?),
        };

        Ok(Self {
            base,
            options,
            exclude_settings: string_or_list(
                exclude.get("settings"),
                CONTEXT,
                "exclude.settings must be string or array of strings",
            )?,
            include_discovery_excludes: truthy_flag(exclude, "includeDiscovery", false),
            exclude_flag,
            exclude_separator,
            targets,
        })
    }

    /// Renders `base`, the exclusion argument, options and targets, in that
    /// order.
    #[must_use]
    pub fn build(&self, ctx: &ToolContext) -> Command {
        let mut command = self.base.clone();
        let excluded = self.excluded_paths(ctx);

        if let Some(flag) = &self.exclude_flag {
            let arguments = compile_exclude_arguments(&excluded, ctx.root());
            if !arguments.is_empty() {
                command.push(flag.clone());
                command.push(arguments.iter().join(&self.exclude_separator));
            }
        }

        apply_option_mappings(&self.options, ctx, &mut command);

        if let Some(plan) = &self.targets {
            command.extend(plan.resolve(ctx, &excluded));
        }

        command.into()
    }

    /// Paths named by the exclude settings, plus the discovery excludes when
    /// enabled.
    #[must_use]
    pub fn excluded_paths(&self, ctx: &ToolContext) -> Exclusions {
        let mut excluded = self
            .exclude_settings
            .iter()
            .flat_map(|name| ctx.setting_list(name))
            .map(|value| ctx.resolve_path(&value))
            .collect::<Exclusions>();

        if self.include_discovery_excludes {
            excluded.extend(ctx.discovery().excludes.iter().map(|path| ctx.anchor(path)));
        }

        excluded
    }
}
