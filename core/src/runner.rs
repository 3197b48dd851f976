//! The per-invocation pipeline: tokens in, a bound command out.

use tracing::debug;

use crate::arg::assign_args;
use crate::command::{CommandId, RunContext};
use crate::config::RunnerConfig;
use crate::error::{CliError, ErrorList, ResolutionError};
use crate::flag::END_OF_FLAGS;
use crate::options::GlobalOptions;
use crate::registry::Registry;
use crate::resolve::extract_raw_flags;

const HELP_FLAG: &str = "--help";

/// A resolved command whose flags and arguments are bound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    pub id: CommandId,
    /// Dotted path the command was resolved under
    pub path: String,
    /// Positional tokens bound to the command's argument definitions
    pub args: Vec<String>,
    /// Tokens left after the global layer, handed to the command at run time
    pub context_args: Vec<String>,
    /// Dash-prefixed tokens from the original input
    pub raw_flags: Vec<String>,
}

/// Drives parsing and execution for one application.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use cmdtree_core::{
///     ArgDef, Binding, CommandMetadata, FlagDef, FlagSet, Runner, RunnerConfig,
/// };
///
/// let runner = Runner::new(RunnerConfig::default());
/// let mut registry = runner.registry();
///
/// let target = Binding::new(String::new());
/// let force = Binding::new(false);
/// registry
///     .register(
///         CommandMetadata::new("deploy")
///             .with_flag_set(Arc::new(
///                 FlagSet::new("deploy").with_flag(FlagDef::boolean("now", force.clone())),
///             ))
///             .with_arg(ArgDef::required("target", target.clone())),
///         &[],
///     )
///     .unwrap();
/// registry.initialize().unwrap();
///
/// let tokens: Vec<String> = ["-q", "deploy", "--now", "prod"]
///     .iter()
///     .map(|s| s.to_string())
///     .collect();
/// let parsed = runner.parse(&registry, &tokens).unwrap();
///
/// assert_eq!(parsed.path, "deploy");
/// assert_eq!(target.get(), "prod");
/// assert!(force.get());
/// assert!(runner.options().quiet());
/// ```
#[derive(Debug, Clone)]
pub struct Runner {
    config: RunnerConfig,
    options: GlobalOptions,
}

impl Runner {
    pub fn new(config: RunnerConfig) -> Self {
        let options = GlobalOptions::new(&config.defaults);
        Self { config, options }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Standard options, updated by every [`parse`](Runner::parse).
    pub fn options(&self) -> &GlobalOptions {
        &self.options
    }

    /// An empty registry whose global scope holds the standard options.
    pub fn registry(&self) -> Registry {
        Registry::with_global_flags(self.options.flag_set())
    }

    /// Resolves `tokens` and binds every flag and argument.
    ///
    /// Phases run in a fixed order and the first failing phase is returned
    /// with all of its violations.
    pub fn parse(&self, registry: &Registry, tokens: &[String]) -> Result<ParsedCommand, CliError> {
        let mut tokens = tokens.to_vec();
        self.handle_help(&mut tokens);
        let raw_flags = extract_raw_flags(&tokens);
        if tokens.is_empty() {
            if let Some(help) = &self.config.help_command {
                tokens.push(help.clone());
            }
        }

        let tokens = registry.route_trigger_flag(tokens);

        let mut errors = ErrorList::new();
        let context_args = registry.global_flags().parse(tokens, &mut errors);

        let resolution = match registry.resolve(&context_args) {
            Ok(resolution) => resolution,
            Err(err) => {
                // A global flag may have swallowed the command token.
                errors.into_result()?;
                return Err(err.into());
            }
        };
        let rest = registry.parse_command_flags(resolution.id, resolution.remaining, &mut errors);
        errors.into_result()?;

        if self.config.validate_raw_flags {
            let unknown = registry.unknown_flags(resolution.id, &raw_flags);
            if !unknown.is_empty() {
                return Err(CliError::UnknownFlags(unknown));
            }
        }

        let args = strip_end_of_flags(rest);
        let meta = registry
            .metadata(resolution.id)
            .ok_or_else(|| ResolutionError::UnknownCommand {
                args: vec![resolution.path.clone()],
            })?;
        assign_args(&meta.arg_defs, &args)?;

        debug!(path = %resolution.path, args = args.len(), "Parsed command");
        Ok(ParsedCommand {
            id: resolution.id,
            path: resolution.path,
            args,
            context_args,
            raw_flags,
        })
    }

    /// Injects `ctx` into the parsed command and executes it.
    pub fn run(
        &self,
        registry: &mut Registry,
        parsed: &ParsedCommand,
        mut ctx: RunContext,
    ) -> Result<(), CliError> {
        let mut args = parsed.context_args.clone();
        if let Some(help) = &self.config.help_command {
            if parsed.path == *help && args.first() == Some(help) {
                args.remove(0);
            }
        }
        ctx.path = parsed.path.clone();
        ctx.args = args;

        let command = registry
            .command_mut(parsed.id)
            .ok_or_else(|| ResolutionError::UnknownCommand {
                args: vec![parsed.path.clone()],
            })?;
        command.set_context(ctx);

        debug!(path = %parsed.path, "Executing command");
        command.execute().map_err(|source| CliError::Execution {
            command: parsed.path.clone(),
            source,
        })
    }

    /// [`parse`](Runner::parse) followed by [`run`](Runner::run).
    pub fn dispatch(
        &self,
        registry: &mut Registry,
        tokens: &[String],
        ctx: RunContext,
    ) -> Result<ParsedCommand, CliError> {
        let parsed = self.parse(registry, tokens)?;
        self.run(registry, &parsed, ctx)?;
        Ok(parsed)
    }

    /// Replaces any `--help` before `--` with a leading help command.
    fn handle_help(&self, tokens: &mut Vec<String>) {
        let Some(help) = &self.config.help_command else {
            return;
        };
        let end = tokens
            .iter()
            .position(|t| t == END_OF_FLAGS)
            .unwrap_or(tokens.len());
        let before = tokens[..end].len();
        let mut kept: Vec<String> = tokens[..end]
            .iter()
            .filter(|t| t.as_str() != HELP_FLAG)
            .cloned()
            .collect();
        if kept.len() == before {
            return;
        }
        kept.insert(0, help.clone());
        kept.extend(tokens.drain(end..));
        *tokens = kept;
    }
}

impl Default for Runner {
    fn default() -> Self {
        Self::new(RunnerConfig::default())
    }
}

/// Drops the first `--`; everything after it is positional.
fn strip_end_of_flags(mut tokens: Vec<String>) -> Vec<String> {
    if let Some(pos) = tokens.iter().position(|t| t == END_OF_FLAGS) {
        tokens.remove(pos);
    }
    tokens
}
