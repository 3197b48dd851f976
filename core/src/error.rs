//! Error types for every phase of command resolution.
//!
//! Each phase (registration, resolution, flag parsing, argument assignment,
//! raw-flag validation) collects *all* violations it can find into an
//! [`ErrorList`] instead of stopping at the first one. [`CliError`] wraps the
//! aggregate of whichever phase failed and reports that phase through
//! [`CliError::phase`].

use std::fmt;

use thiserror::Error;

/// Accumulates errors from a sequence of fallible steps.
///
/// Unlike `?`, pushing an error never short-circuits the surrounding code,
/// so a validation pass can report every problem at once.
///
/// # Examples
///
/// ```
/// use cmdtree_core::ErrorList;
///
/// let mut errors: ErrorList<String> = ErrorList::new();
/// let parsed: Option<i32> = errors.collect("7".parse::<i32>().map_err(|e| e.to_string()));
/// errors.collect("x".parse::<i32>().map_err(|e| e.to_string()));
///
/// assert_eq!(parsed, Some(7));
/// assert_eq!(errors.len(), 1);
/// assert!(errors.into_result().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorList<E> {
    errors: Vec<E>,
}

impl<E> ErrorList<E> {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self { errors: Vec::new() }
    }

    /// Appends one error.
    pub fn push(&mut self, error: E) {
        self.errors.push(error);
    }

    /// Records the error side of `result` and hands back the success value.
    pub fn collect<T>(&mut self, result: std::result::Result<T, E>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(error) => {
                self.errors.push(error);
                None
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, E> {
        self.errors.iter()
    }

    pub fn into_vec(self) -> Vec<E> {
        self.errors
    }

    /// `Ok(())` when nothing was collected, otherwise the whole list.
    pub fn into_result(self) -> std::result::Result<(), Self> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl<E> Default for ErrorList<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Extend<E> for ErrorList<E> {
    fn extend<I: IntoIterator<Item = E>>(&mut self, iter: I) {
        self.errors.extend(iter);
    }
}

impl<E> FromIterator<E> for ErrorList<E> {
    fn from_iter<I: IntoIterator<Item = E>>(iter: I) -> Self {
        Self {
            errors: iter.into_iter().collect(),
        }
    }
}

impl<E> IntoIterator for ErrorList<E> {
    type Item = E;
    type IntoIter = std::vec::IntoIter<E>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

impl<'a, E> IntoIterator for &'a ErrorList<E> {
    type Item = &'a E;
    type IntoIter = std::slice::Iter<'a, E>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.iter()
    }
}

impl<E: fmt::Display> fmt::Display for ErrorList<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{error}")?;
        }
        Ok(())
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for ErrorList<E> {}

/// Structural problems found while registering commands and flags.
///
/// These are start-up errors: an application that sees one has declared an
/// inconsistent command tree and should not run any command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    /// Two flags in one flag set share a name.
    #[error("command '{command}': duplicate flag '{flag}' in flag set '{set}'")]
    DuplicateFlag {
        command: String,
        set: String,
        flag: String,
    },
    /// Two flags in one flag set share a shortcut.
    #[error("command '{command}': duplicate shortcut '-{shortcut}' in flag set '{set}'")]
    DuplicateShortcut {
        command: String,
        set: String,
        shortcut: char,
    },
    /// Shortcut is not a single printable ASCII character.
    #[error(
        "command '{command}': flag '{flag}' shortcut {shortcut:?} must be a single printable ASCII character"
    )]
    InvalidShortcut {
        command: String,
        flag: String,
        shortcut: char,
    },
    /// Flag has no binding, so its value type cannot be discovered.
    #[error(
        "flag '{flag}': flag type is not discoverable; exactly one of string, bool, int or int64 must be bound"
    )]
    FlagTypeNotDiscoverable { flag: String },
    /// Default value does not match the bound type.
    #[error("flag '{flag}': default value is {found}, but the flag is bound to {expected}")]
    DefaultTypeMismatch {
        flag: String,
        expected: &'static str,
        found: &'static str,
    },
    /// Global flag name is empty or not `[a-z0-9-]+`.
    #[error("flag '{flag}': name may contain only lowercase letters, numbers, and dashes")]
    InvalidFlagName { flag: String },
    /// Global flag declared without usage text.
    #[error("flag '{flag}': usage cannot be empty")]
    EmptyFlagUsage { flag: String },
    /// Global flag name is already taken.
    #[error("flag '{flag}': duplicate flag in global flags")]
    DuplicateGlobalFlag { flag: String },
    /// A trigger flag name collides with an existing global flag.
    #[error("command '{command}': trigger flag '{flag}' conflicts with existing global flag '{flag}'")]
    TriggerConflict { command: String, flag: String },
    /// Two commands declare the same trigger flag.
    #[error("trigger flag '{flag}' is declared by both '{existing}' and '{incoming}'")]
    DuplicateTrigger {
        flag: String,
        existing: String,
        incoming: String,
    },
    /// Only top-level commands may be routed from a flag.
    #[error(
        "command '{command}': subcommands cannot have trigger flag '{flag}' (only top-level commands can use flag routing)"
    )]
    TriggerOnSubcommand { command: String, flag: String },
    /// A declared parent handle does not belong to this registry.
    #[error("parent command {parent} not found for command '{child}'")]
    ParentNotFound { parent: String, child: String },
    /// A delegate handle is unknown or not a child of the delegating command.
    #[error("command '{command}': delegate {delegate} is not a registered subcommand")]
    InvalidDelegate { command: String, delegate: String },
    /// Two distinct commands resolve to the same dotted path.
    #[error("command path '{path}' is claimed by both '{existing}' and '{incoming}'")]
    PathCollision {
        path: String,
        existing: String,
        incoming: String,
    },
    /// `register` was called after the tree was built.
    #[error("command '{command}': registry is frozen; register commands before building the tree")]
    Frozen { command: String },
}

/// Failure to map the leading tokens onto a registered command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    /// No prefix of the input names a registered command.
    #[error("unknown command: {}", .args.join(" "))]
    UnknownCommand { args: Vec<String> },
    /// Resolution was attempted before the tree was built.
    #[error("command tree has not been built")]
    NotBuilt,
}

/// A single flag-set layer failed to bind one of its flags.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// `--name` given as the last token for a flag that takes a value.
    #[error("flag '--{flag}' needs a value")]
    MissingValue { flag: String },
    /// Value could not be converted to the bound type.
    #[error("invalid value {value:?} for flag '--{flag}': expected {expected}")]
    InvalidValue {
        flag: String,
        value: String,
        expected: &'static str,
    },
    /// Required flag was not supplied.
    #[error("flag '--{flag}' is required")]
    RequiredFlag { flag: String },
    /// Value did not match the flag's regex.
    #[error("invalid value {value:?} for flag '--{flag}': must match {pattern}")]
    PatternMismatch {
        flag: String,
        value: String,
        pattern: String,
    },
    /// Custom validation function rejected the value.
    #[error("flag validation failed for '--{flag}': {message}")]
    Validation { flag: String, message: String },
}

/// Positional arguments could not be bound.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArgError {
    #[error("expected at least {expected} arguments, got {got}")]
    TooFew { expected: usize, got: usize },
    #[error("required argument '{name}' missing")]
    Missing { name: String },
}

/// Error returned by [`Command::execute`](crate::Command::execute).
pub type ExecError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The phase a [`CliError`] originated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Registration,
    Resolution,
    Parsing,
    Arguments,
    UnknownFlags,
    Execution,
}

/// Aggregate error for one phase of the command pipeline.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("command registration failed:\n{0}")]
    Registration(ErrorList<RegistrationError>),
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
    #[error("flags parsing failed:\n{0}")]
    Parse(ErrorList<ParseError>),
    #[error("assigning args failed:\n{0}")]
    Args(ErrorList<ArgError>),
    #[error("unknown flag(s): {}", .0.join(", "))]
    UnknownFlags(Vec<String>),
    #[error("command '{command}' failed: {source}")]
    Execution {
        command: String,
        #[source]
        source: ExecError,
    },
}

impl CliError {
    pub fn phase(&self) -> Phase {
        match self {
            Self::Registration(_) => Phase::Registration,
            Self::Resolution(_) => Phase::Resolution,
            Self::Parse(_) => Phase::Parsing,
            Self::Args(_) => Phase::Arguments,
            Self::UnknownFlags(_) => Phase::UnknownFlags,
            Self::Execution { .. } => Phase::Execution,
        }
    }

    /// Whether the entry layer should fall back to showing usage.
    ///
    /// Every failure before execution is a usage problem.
    pub fn shows_usage(&self) -> bool {
        !matches!(self, Self::Execution { .. })
    }
}

impl From<ErrorList<RegistrationError>> for CliError {
    fn from(errors: ErrorList<RegistrationError>) -> Self {
        Self::Registration(errors)
    }
}

impl From<ErrorList<ParseError>> for CliError {
    fn from(errors: ErrorList<ParseError>) -> Self {
        Self::Parse(errors)
    }
}

impl From<ErrorList<ArgError>> for CliError {
    fn from(errors: ErrorList<ArgError>) -> Self {
        Self::Args(errors)
    }
}

/// Convenience alias for results with [`CliError`].
pub type Result<T> = std::result::Result<T, CliError>;
