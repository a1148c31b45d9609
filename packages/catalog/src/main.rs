#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

use std::{
    io::Read as _,
    path::{Path, PathBuf},
    sync::Arc,
};

use clap::{Parser, Subcommand, ValueEnum};
use itertools::Itertools as _;
use lintcat_catalog::{
    Error, FixedArtifactProvider, RawDiagnostic, RuntimeConfig, Settings, StrategyRegistry,
    ToolContext, ToolDefinition,
};

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
#[clap(rename_all = "kebab_case")]
pub enum OutputType {
    Json,
    Raw,
}

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand, Debug, Clone)]
enum Commands {
    /// Render the command a tool definition would run
    Build {
        /// Tool definition (JSON)
        #[arg(index = 1)]
        definition: PathBuf,

        /// Files selected by the caller
        #[arg(index = 2)]
        files: Vec<PathBuf>,

        #[arg(long, default_value = ".")]
        root: PathBuf,

        /// Tool settings (JSON object)
        #[arg(long)]
        settings: Option<PathBuf>,

        /// Runtime configuration (TOML)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Pre-installed binary used by download strategies
        #[arg(long)]
        binary: Option<PathBuf>,

        #[arg(short, long, value_enum, default_value_t=OutputType::Raw)]
        output: OutputType,
    },
    /// Extract diagnostics from captured tool output
    Parse {
        /// Tool definition (JSON)
        #[arg(index = 1)]
        definition: PathBuf,

        /// Captured stdout; read from stdin when omitted
        #[arg(long)]
        input: Option<PathBuf>,

        /// Root that reported absolute paths are made relative to
        #[arg(long, default_value = ".")]
        root: PathBuf,

        #[arg(short, long, value_enum, default_value_t=OutputType::Raw)]
        output: OutputType,
    },
}

fn main() -> Result<(), Error> {
    pretty_env_logger::init();

    let args = Args::parse();

    let result = match args.cmd {
        Commands::Build {
            definition,
            files,
            root,
            settings,
            config,
            binary,
            output,
        } => {
            let registry = binary.map_or_else(StrategyRegistry::default, |binary| {
                StrategyRegistry::new(Arc::new(FixedArtifactProvider::new(binary)))
            });
            let tool = load_tool(&registry, &definition)?;

            let settings = match settings {
                Some(path) => {
                    log::debug!("Loading settings '{}'", path.display());
                    serde_json::from_str::<Settings>(&std::fs::read_to_string(path)?)?
                }
                None => Settings::new(),
            };
            let config = match config {
                Some(path) => RuntimeConfig::load(&path)?,
                None => RuntimeConfig::default(),
            };

            let ctx = ToolContext::builder(root)
                .settings(settings)
                .config(config)
                .files(files)
                .build();

            let command = tool
                .build_command(&ctx)?
                .ok_or_else(|| Error::MissingStrategy {
                    tool: tool.name.clone(),
                    role: "command",
                })?;

            match output {
                OutputType::Json => serde_json::to_string(&command)?,
                OutputType::Raw => command.to_string(),
            }
        }
        Commands::Parse {
            definition,
            input,
            root,
            output,
        } => {
            let tool = load_tool(&StrategyRegistry::default(), &definition)?;
            if tool.parser.is_none() {
                return Err(Error::MissingStrategy {
                    tool: tool.name,
                    role: "parser",
                });
            }

            let stdout = match input {
                Some(path) => std::fs::read_to_string(path)?,
                None => {
                    let mut buffer = String::new();
                    std::io::stdin().read_to_string(&mut buffer)?;
                    buffer
                }
            };

            let ctx = ToolContext::builder(root).build();
            let diagnostics = tool.parse_output(&stdout, &ctx);
            log::debug!("Parsed {} diagnostic(s)", diagnostics.len());

            match output {
                OutputType::Json => serde_json::to_string(&diagnostics)?,
                OutputType::Raw => diagnostics.iter().map(format_diagnostic).join("\n"),
            }
        }
    };

    if !result.is_empty() {
        println!("{result}");
    }

    Ok(())
}

fn load_tool(registry: &StrategyRegistry, path: &Path) -> Result<ToolDefinition, Error> {
    log::debug!("Loading tool definition '{}'", path.display());
    let source = std::fs::read_to_string(path)?;
    let definition: serde_json::Value = serde_json::from_str(&source)?;
    Ok(registry.compile_tool(&definition)?)
}

fn format_diagnostic(diagnostic: &RawDiagnostic) -> String {
    let location = [
        diagnostic.file.clone(),
        diagnostic.line.map(|line| line.to_string()),
        diagnostic.column.map(|column| column.to_string()),
    ]
    .into_iter()
    .flatten()
    .join(":");

    let mut line = String::new();
    if !location.is_empty() {
        line.push_str(&location);
        line.push_str(": ");
    }
    if let Some(severity) = &diagnostic.severity {
        line.push_str(severity);
        line.push(' ');
    }
    if let Some(code) = &diagnostic.code {
        line.push('[');
        line.push_str(code);
        line.push_str("] ");
    }
    line.push_str(&diagnostic.message);
    line
}
