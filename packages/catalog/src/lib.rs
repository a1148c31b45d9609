//! Catalog command and diagnostic mapping engine.
//!
//! Tool definitions in the catalog are declarative. This crate compiles them
//! into reusable strategies that
//!
//! * render a [`Command`] (argument vector) from a [`ToolContext`], and
//! * turn a tool's output back into [`RawDiagnostic`]s, either through a
//!   declarative field mapping or a built-in [`JsonTransform`]/[`TextTransform`].
//!
//! Malformed catalog entries are rejected while compiling, with a
//! [`CatalogIntegrityError`]. Compiled strategies never fail on bad runtime
//! values; they degrade to "no value" instead. The only runtime failure is an
//! [`ArtifactError`] from the [`ArtifactProvider`] used by download strategies.
//!
//! ```rust
//! use lintcat_catalog::{StrategyRegistry, ToolContext};
//! use serde_json::json;
//!
//! let registry = StrategyRegistry::default();
//! let strategy = registry
//!     .compile(
//!         "command_option_map",
//!         &json!({
//!             "base": ["ruff", "check"],
//!             "options": [{"setting": "line-length", "flag": "--line-length"}]
//!         }),
//!     )
//!     .unwrap();
//!
//! let ctx = ToolContext::builder("/repo")
//!     .setting("line-length", 100)
//!     .files(["app.py"])
//!     .build();
//!
//! let command = strategy.as_command().unwrap().build(&ctx).unwrap();
//! assert_eq!(command.args(), ["ruff", "check", "--line-length", "100", "app.py"]);
//! ```

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

pub mod artifacts;
pub mod config;
pub mod context;
pub mod defaults;
pub mod diagnostics;
pub mod entry;
pub mod error;
pub mod options;
pub mod parsers;
pub mod paths;
pub mod registry;
pub mod strategies;
pub mod targets;
pub mod transforms;

pub use artifacts::{ArtifactProvider, ArtifactRequest, DownloadInstaller, FixedArtifactProvider};
pub use config::RuntimeConfig;
pub use context::{Settings, ToolContext};
pub use diagnostics::{DiagnosticExtractor, FieldSpec, InputFormat, RawDiagnostic};
pub use error::{ArtifactError, CatalogIntegrityError, ConfigError, Error};
pub use options::{OptionKind, OptionMapping};
pub use parsers::{JsonTransform, ParserStrategy, TextTransform};
pub use paths::PathResolver;
pub use registry::{CompiledStrategy, StrategyRegistry, ToolDefinition};
pub use strategies::{Command, CommandStrategy};
pub use targets::{TargetPlan, TargetSelector};
pub use transforms::Transform;
