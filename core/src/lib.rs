//! Command registry and resolution engine for command-line applications.
//!
//! Applications declare a tree of named commands, each with flags and
//! positional arguments, and the engine turns a raw token stream into exactly
//! one command with its values bound, or an aggregated error for the phase
//! that failed.
//!
//! - [`Registry`]: registration, validation ([`Registry::validate`]) and
//!   tree construction ([`Registry::build_tree`]).
//! - [`Registry::resolve`]: longest-prefix path resolution with
//!   default-subcommand delegation.
//! - [`FlagSet`] / [`FlagDef`] / [`ArgDef`]: declarative flags and
//!   arguments that write through [`Binding`] handles.
//! - [`Runner`]: the per-invocation pipeline (help handling, trigger-flag
//!   routing, layered flag parsing, raw-flag validation, argument binding)
//!   and command execution.
//! - [`collect_examples`]: example invocations for help screens.
//!
//! Errors from each phase are collected with [`ErrorList`] and surfaced as
//! one [`CliError`].
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use cmdtree_core::*;
//!
//! let runner = Runner::new(RunnerConfig::default());
//! let mut registry = runner.registry();
//!
//! let steps = Binding::new(0);
//! let db = registry.register(CommandMetadata::new("db"), &[]).unwrap();
//! let migrate = registry.register(CommandMetadata::new("migrate"), &[db]).unwrap();
//! let up = registry
//!     .register(
//!         CommandMetadata::new("up").with_flag_set(Arc::new(
//!             FlagSet::new("up").with_flag(FlagDef::int("steps", steps.clone())),
//!         )),
//!         &[migrate],
//!     )
//!     .unwrap();
//! registry.set_delegate(migrate, up).unwrap();
//! registry.initialize().unwrap();
//!
//! let tokens: Vec<String> = ["db", "migrate", "latest", "--steps=2"]
//!     .iter()
//!     .map(|s| s.to_string())
//!     .collect();
//! let parsed = runner.parse(&registry, &tokens).unwrap();
//!
//! assert_eq!(parsed.path, "db.migrate.up");
//! assert_eq!(steps.get(), 2);
//! ```

mod arg;
mod binding;
mod command;
mod config;
mod error;
mod examples;
mod flag;
mod options;
mod registry;
mod resolve;
mod runner;
mod tree;

pub use arg::{ArgDef, assign_args};
pub use binding::Binding;
pub use command::{
    CancelFlag, Command, CommandId, CommandMetadata, Example, RunContext, SharedWriter,
};
pub use config::{OptionDefaults, RunnerConfig};
pub use error::{
    ArgError, CliError, ErrorList, ExecError, ParseError, Phase, RegistrationError,
    ResolutionError, Result,
};
pub use examples::{auto_examples, collect_examples};
pub use flag::{END_OF_FLAGS, FlagDef, FlagKind, FlagSet, FlagTarget, FlagValue, Validator};
pub use options::{GLOBAL_FLAG_SET, GlobalOptions, Verbosity, VerbosityError};
pub use registry::Registry;
pub use resolve::{Resolution, extract_raw_flags};
pub use runner::{ParsedCommand, Runner};
