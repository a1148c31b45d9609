//! Command strategies: compiled catalog entries that render a [`Command`].

use std::{fmt, ops::Deref};

use serde::{Deserialize, Serialize};

use crate::{context::ToolContext, error::ArtifactError};

pub mod download;
pub mod option_map;
pub mod project_scanner;

pub use download::DownloadBinaryCommand;
pub use option_map::OptionMapCommand;
pub use project_scanner::ProjectScannerCommand;

/// Final argument vector, ready for a process runner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Command(Vec<String>);

impl Command {
    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.0
    }

    #[must_use]
    pub fn into_args(self) -> Vec<String> {
        self.0
    }
}

impl From<Vec<String>> for Command {
    fn from(args: Vec<String>) -> Self {
        Self(args)
    }
}

impl Deref for Command {
    type Target = [String];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<'a> IntoIterator for &'a Command {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, arg) in self.0.iter().enumerate() {
            if index > 0 {
                f.write_str(" ")?;
            }
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, "{arg:?}")?;
            } else {
                f.write_str(arg)?;
            }
        }
        Ok(())
    }
}

/// One of the compiled command strategies.
#[derive(Debug, Clone)]
pub enum CommandStrategy {
    OptionMap(OptionMapCommand),
    ProjectScanner(ProjectScannerCommand),
    DownloadBinary(DownloadBinaryCommand),
}

impl CommandStrategy {
    /// Renders the command for one invocation.
    ///
    /// # Errors
    ///
    /// * If a download-binary strategy cannot obtain its artifact
    pub fn build(&self, ctx: &ToolContext) -> Result<Command, ArtifactError> {
        match self {
            Self::OptionMap(strategy) => Ok(strategy.build(ctx)),
            Self::ProjectScanner(strategy) => Ok(strategy.build(ctx)),
            Self::DownloadBinary(strategy) => strategy.build(ctx),
        }
    }
}

impl From<OptionMapCommand> for CommandStrategy {
    fn from(value: OptionMapCommand) -> Self {
        Self::OptionMap(value)
    }
}

impl From<ProjectScannerCommand> for CommandStrategy {
    fn from(value: ProjectScannerCommand) -> Self {
        Self::ProjectScanner(value)
    }
}

impl From<DownloadBinaryCommand> for CommandStrategy {
    fn from(value: DownloadBinaryCommand) -> Self {
        Self::DownloadBinary(value)
    }
}
