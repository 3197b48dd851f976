//! Command metadata and the command capability contract.
//!
//! Concrete commands hold a [`CommandMetadata`] value and implement
//! [`Command`]; tree linkage (parents, children, delegate) lives in the
//! [`Registry`](crate::Registry), which hands out [`CommandId`] handles.

use std::fmt;
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use crate::arg::ArgDef;
use crate::error::ExecError;
use crate::flag::FlagSet;
use crate::options::GlobalOptions;

/// Opaque handle for a registered command.
///
/// Returned by [`Registry::register`](crate::Registry::register) and passed
/// back when declaring a child's parents or a delegate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommandId {
    pub(crate) registry: u64,
    pub(crate) index: usize,
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}@registry{}", self.index, self.registry)
    }
}

/// A documented invocation shown in help output.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Example {
    pub descr: String,
    pub cmd: String,
}

impl Example {
    pub fn new(descr: &str, cmd: &str) -> Self {
        Self {
            descr: descr.to_string(),
            cmd: cmd.to_string(),
        }
    }
}

/// Declarative metadata for one command.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use cmdtree_core::{ArgDef, Binding, CommandMetadata, FlagDef, FlagSet};
///
/// let force = Binding::new(false);
/// let target = Binding::new(String::new());
/// let meta = CommandMetadata::new("deploy")
///     .with_usage("deploy [--force] <target>")
///     .with_description("Deploy the current build")
///     .with_flag_set(Arc::new(
///         FlagSet::new("deploy").with_flag(FlagDef::boolean("force", force)),
///     ))
///     .with_arg(ArgDef::required("target", target))
///     .with_order(1);
///
/// assert_eq!(meta.name, "deploy");
/// assert_eq!(meta.flag_sets.len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct CommandMetadata {
    /// Leaf name (unique among siblings)
    pub name: String,
    pub usage: String,
    pub description: String,
    /// Command-owned flag sets, parsed after the global set
    pub flag_sets: Vec<Arc<FlagSet>>,
    pub arg_defs: Vec<ArgDef>,
    /// Custom examples
    pub examples: Vec<Example>,
    /// Do not produce any examples
    pub no_examples: bool,
    /// Produce generated examples even when custom ones exist
    pub auto_examples: bool,
    /// Display order in listings (0 = last, 1+ = ascending)
    pub order: u32,
    /// Global flag that routes to this command (e.g. "setup" for `--setup`)
    pub trigger_flag: Option<String>,
    /// Hidden from listings and examples
    pub hidden: bool,
}

impl CommandMetadata {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn with_usage(mut self, usage: &str) -> Self {
        self.usage = usage.to_string();
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn with_flag_set(mut self, flag_set: Arc<FlagSet>) -> Self {
        self.flag_sets.push(flag_set);
        self
    }

    pub fn with_arg(mut self, arg: ArgDef) -> Self {
        self.arg_defs.push(arg);
        self
    }

    pub fn with_example(mut self, example: Example) -> Self {
        self.examples.push(example);
        self
    }

    pub fn with_order(mut self, order: u32) -> Self {
        self.order = order;
        self
    }

    pub fn with_trigger_flag(mut self, flag: &str) -> Self {
        self.trigger_flag = Some(flag.to_string());
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn without_examples(mut self) -> Self {
        self.no_examples = true;
        self
    }

    pub fn with_auto_examples(mut self) -> Self {
        self.auto_examples = true;
        self
    }
}

/// Output handle shared between the runner and executing commands.
#[derive(Clone)]
pub struct SharedWriter {
    inner: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl SharedWriter {
    pub fn new(writer: impl Write + Send + 'static) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }

    pub fn write_line(&self, line: &str) -> io::Result<()> {
        let mut writer = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        writeln!(writer, "{line}")?;
        writer.flush()
    }
}

impl fmt::Debug for SharedWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SharedWriter")
    }
}

/// Cooperative cancellation signal.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag {
    cancelled: Arc<AtomicBool>,
}

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Runtime context injected into a command right before it executes.
#[derive(Debug, Clone)]
pub struct RunContext {
    /// Dotted path the command was resolved under
    pub path: String,
    /// Invocation tokens after global flags were consumed
    pub args: Vec<String>,
    pub options: GlobalOptions,
    pub writer: SharedWriter,
    pub cancel: CancelFlag,
}

impl RunContext {
    pub fn new(options: GlobalOptions, writer: SharedWriter, cancel: CancelFlag) -> Self {
        Self {
            path: String::new(),
            args: Vec::new(),
            options,
            writer,
            cancel,
        }
    }
}

/// The capability contract every registered command provides.
///
/// Only [`metadata`](Command::metadata) is mandatory. Pure grouping
/// commands (e.g. `db` in `db migrate`) can rely on the defaults, and
/// [`CommandMetadata`] itself implements the trait for that purpose.
pub trait Command: Send + Sync {
    fn metadata(&self) -> &CommandMetadata;

    /// Receives runtime context immediately before [`execute`](Command::execute).
    fn set_context(&mut self, _ctx: RunContext) {}

    /// Performs the command's action.
    fn execute(&self) -> Result<(), ExecError> {
        Err(format!(
            "command '{}' does not implement handler logic",
            self.metadata().name
        )
        .into())
    }
}

impl Command for CommandMetadata {
    fn metadata(&self) -> &CommandMetadata {
        self
    }
}
