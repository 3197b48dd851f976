//! Flag definitions, flag sets and single-layer flag parsing.
//!
//! A [`FlagSet`] is parsed *permissively*: it consumes the flags it
//! recognizes wherever they appear and returns every other token untouched,
//! in order, so the next layer (or positional binding) can see it.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::binding::Binding;
use crate::error::{ErrorList, ParseError, RegistrationError};

/// Terminates flag parsing; everything after it is positional.
pub const END_OF_FLAGS: &str = "--";

/// The value type a flag is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlagKind {
    String,
    Bool,
    Int,
    Int64,
}

impl FlagKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Int64 => "int64",
        }
    }
}

impl fmt::Display for FlagKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed or default flag value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FlagValue {
    String(String),
    Bool(bool),
    Int(i32),
    Int64(i64),
}

impl FlagValue {
    pub fn kind(&self) -> FlagKind {
        match self {
            Self::String(_) => FlagKind::String,
            Self::Bool(_) => FlagKind::Bool,
            Self::Int(_) => FlagKind::Int,
            Self::Int64(_) => FlagKind::Int64,
        }
    }
}

impl fmt::Display for FlagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => f.write_str(s),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(n) => write!(f, "{n}"),
            Self::Int64(n) => write!(f, "{n}"),
        }
    }
}

impl From<&str> for FlagValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for FlagValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for FlagValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i32> for FlagValue {
    fn from(value: i32) -> Self {
        Self::Int(value)
    }
}

impl From<i64> for FlagValue {
    fn from(value: i64) -> Self {
        Self::Int64(value)
    }
}

/// Where a flag's parsed value is written.
#[derive(Debug, Clone)]
pub enum FlagTarget {
    String(Binding<String>),
    Bool(Binding<bool>),
    Int(Binding<i32>),
    Int64(Binding<i64>),
}

impl FlagTarget {
    pub fn kind(&self) -> FlagKind {
        match self {
            Self::String(_) => FlagKind::String,
            Self::Bool(_) => FlagKind::Bool,
            Self::Int(_) => FlagKind::Int,
            Self::Int64(_) => FlagKind::Int64,
        }
    }

    /// Current value of the bound slot.
    pub fn current(&self) -> FlagValue {
        match self {
            Self::String(b) => FlagValue::String(b.get()),
            Self::Bool(b) => FlagValue::Bool(b.get()),
            Self::Int(b) => FlagValue::Int(b.get()),
            Self::Int64(b) => FlagValue::Int64(b.get()),
        }
    }

    /// Writes `value` through; values of another kind are ignored.
    fn store(&self, value: &FlagValue) {
        match (self, value) {
            (Self::String(b), FlagValue::String(v)) => b.set(v.clone()),
            (Self::Bool(b), FlagValue::Bool(v)) => b.set(*v),
            (Self::Int(b), FlagValue::Int(v)) => b.set(*v),
            (Self::Int64(b), FlagValue::Int64(v)) => b.set(*v),
            _ => {}
        }
    }
}

/// Custom validation hook run on every parsed value.
pub type Validator = Arc<dyn Fn(&FlagValue) -> Result<(), String> + Send + Sync>;

/// Declarative description of one flag.
///
/// # Examples
///
/// ```
/// use cmdtree_core::{Binding, FlagDef, FlagKind};
///
/// let count = Binding::new(0);
/// let flag = FlagDef::int("count", count.clone())
///     .with_shortcut('c')
///     .with_usage("How many times to run")
///     .with_default(1);
///
/// assert_eq!(flag.kind(), Some(FlagKind::Int));
/// assert!(flag.takes_value());
/// ```
#[derive(Clone)]
pub struct FlagDef {
    /// Long name without dashes (e.g. "dry-run")
    pub name: String,
    /// Single-character short form (e.g. 'f' for `-f`)
    pub shortcut: Option<char>,
    /// Value written when the flag is absent
    pub default: Option<FlagValue>,
    pub usage: String,
    pub required: bool,
    /// Pattern the textual value must match
    pub regex: Option<Regex>,
    pub validator: Option<Validator>,
    /// Bound slot; `None` is rejected at registration
    pub target: Option<FlagTarget>,
    /// Sample value used when generating examples
    pub example: Option<String>,
}

impl FlagDef {
    /// Creates a flag with no binding yet.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            shortcut: None,
            default: None,
            usage: String::new(),
            required: false,
            regex: None,
            validator: None,
            target: None,
            example: None,
        }
    }

    pub fn string(name: &str, target: Binding<String>) -> Self {
        Self::new(name).bind(FlagTarget::String(target))
    }

    pub fn boolean(name: &str, target: Binding<bool>) -> Self {
        Self::new(name).bind(FlagTarget::Bool(target))
    }

    pub fn int(name: &str, target: Binding<i32>) -> Self {
        Self::new(name).bind(FlagTarget::Int(target))
    }

    pub fn int64(name: &str, target: Binding<i64>) -> Self {
        Self::new(name).bind(FlagTarget::Int64(target))
    }

    pub fn bind(mut self, target: FlagTarget) -> Self {
        self.target = Some(target);
        self
    }

    pub fn with_shortcut(mut self, shortcut: char) -> Self {
        self.shortcut = Some(shortcut);
        self
    }

    pub fn with_default(mut self, value: impl Into<FlagValue>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn with_usage(mut self, usage: &str) -> Self {
        self.usage = usage.to_string();
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_regex(mut self, regex: Regex) -> Self {
        self.regex = Some(regex);
        self
    }

    pub fn with_validator<F>(mut self, validator: F) -> Self
    where
        F: Fn(&FlagValue) -> Result<(), String> + Send + Sync + 'static,
    {
        self.validator = Some(Arc::new(validator));
        self
    }

    pub fn with_example(mut self, example: &str) -> Self {
        self.example = Some(example.to_string());
        self
    }

    pub fn kind(&self) -> Option<FlagKind> {
        self.target.as_ref().map(FlagTarget::kind)
    }

    /// Whether `--name` consumes the following token as its value.
    pub fn takes_value(&self) -> bool {
        !matches!(self.kind(), Some(FlagKind::Bool))
    }

    /// Current value of the bound slot, if any.
    pub fn value(&self) -> Option<FlagValue> {
        self.target.as_ref().map(FlagTarget::current)
    }

    /// Registration-time checks on this definition alone.
    pub(crate) fn check_binding(&self, errors: &mut ErrorList<RegistrationError>) {
        let Some(kind) = self.kind() else {
            errors.push(RegistrationError::FlagTypeNotDiscoverable {
                flag: self.name.clone(),
            });
            return;
        };
        match &self.default {
            Some(default) if default.kind() != kind => {
                errors.push(RegistrationError::DefaultTypeMismatch {
                    flag: self.name.clone(),
                    expected: kind.as_str(),
                    found: default.kind().as_str(),
                });
            }
            _ => {}
        }
    }

    /// Converts `raw`, validates it and writes it through the binding.
    pub fn assign(&self, raw: &str) -> Result<FlagValue, ParseError> {
        let Some(target) = &self.target else {
            return Err(ParseError::Validation {
                flag: self.name.clone(),
                message: "flag has no binding".to_string(),
            });
        };
        let value = self.convert(target.kind(), raw)?;
        self.validate(raw, &value)?;
        target.store(&value);
        Ok(value)
    }

    fn convert(&self, kind: FlagKind, raw: &str) -> Result<FlagValue, ParseError> {
        let invalid = || ParseError::InvalidValue {
            flag: self.name.clone(),
            value: raw.to_string(),
            expected: kind.as_str(),
        };
        match kind {
            FlagKind::String => Ok(FlagValue::String(raw.to_string())),
            FlagKind::Bool => parse_bool(raw).map(FlagValue::Bool).ok_or_else(invalid),
            FlagKind::Int => raw.parse().map(FlagValue::Int).map_err(|_| invalid()),
            FlagKind::Int64 => raw.parse().map(FlagValue::Int64).map_err(|_| invalid()),
        }
    }

    fn validate(&self, raw: &str, value: &FlagValue) -> Result<(), ParseError> {
        if raw.is_empty() {
            if self.required {
                return Err(ParseError::RequiredFlag {
                    flag: self.name.clone(),
                });
            }
            return Ok(());
        }

        if let (Some(regex), FlagValue::String(s)) = (&self.regex, value) {
            if !regex.is_match(s) {
                return Err(ParseError::PatternMismatch {
                    flag: self.name.clone(),
                    value: s.clone(),
                    pattern: regex.as_str().to_string(),
                });
            }
        }

        if let Some(validator) = &self.validator {
            validator(value).map_err(|message| ParseError::Validation {
                flag: self.name.clone(),
                message,
            })?;
        }

        Ok(())
    }

    fn apply_default(&self) {
        if let (Some(target), Some(default)) = (&self.target, &self.default) {
            target.store(default);
        }
    }
}

impl fmt::Debug for FlagDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlagDef")
            .field("name", &self.name)
            .field("shortcut", &self.shortcut)
            .field("default", &self.default)
            .field("usage", &self.usage)
            .field("required", &self.required)
            .field("regex", &self.regex.as_ref().map(Regex::as_str))
            .field("validator", &self.validator.is_some())
            .field("kind", &self.kind())
            .field("example", &self.example)
            .finish()
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "t" | "1" | "yes" => Some(true),
        "false" | "f" | "0" | "no" => Some(false),
        _ => None,
    }
}

/// A named, ordered group of flag definitions.
///
/// Commands hold flag sets behind an `Arc`, so one set can be shared by
/// several commands and is still validated only once.
///
/// # Examples
///
/// ```
/// use cmdtree_core::{Binding, ErrorList, FlagDef, FlagSet};
///
/// let count = Binding::new(0);
/// let set = FlagSet::new("run").with_flag(FlagDef::int("count", count.clone()));
///
/// let mut errors = ErrorList::new();
/// let rest = set.parse(vec!["--count=3".into(), "--bad".into()], &mut errors);
///
/// assert_eq!(count.get(), 3);
/// assert_eq!(rest, vec!["--bad".to_string()]);
/// assert!(errors.is_empty());
/// ```
#[derive(Debug, Clone, Default)]
pub struct FlagSet {
    pub name: String,
    pub flags: Vec<FlagDef>,
}

impl FlagSet {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            flags: Vec::new(),
        }
    }

    pub fn with_flag(mut self, flag: FlagDef) -> Self {
        self.flags.push(flag);
        self
    }

    pub fn find(&self, name: &str) -> Option<&FlagDef> {
        self.flags.iter().find(|f| f.name == name)
    }

    pub fn find_shortcut(&self, shortcut: char) -> Option<&FlagDef> {
        self.flags.iter().find(|f| f.shortcut == Some(shortcut))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.flags.iter().map(|f| f.name.as_str())
    }

    /// Consumes this set's flags from `tokens` and returns what is left.
    ///
    /// Unrecognized tokens are passed through in order. Parsing stops at
    /// [`END_OF_FLAGS`], which is kept in the output. Flags that were not
    /// supplied receive their default; missing required flags are reported.
    pub fn parse(&self, tokens: Vec<String>, errors: &mut ErrorList<ParseError>) -> Vec<String> {
        let mut remaining = Vec::with_capacity(tokens.len());
        let mut seen: HashSet<&str> = HashSet::new();
        let mut iter = tokens.into_iter();

        while let Some(token) = iter.next() {
            if token == END_OF_FLAGS {
                remaining.push(token);
                remaining.extend(iter.by_ref());
                break;
            }
            let Some((def, inline)) = self.match_token(&token) else {
                remaining.push(token);
                continue;
            };
            seen.insert(def.name.as_str());

            let raw = match inline {
                Some(value) => value,
                None if !def.takes_value() => "true".to_string(),
                None => match iter.next() {
                    Some(value) => value,
                    None => {
                        errors.push(ParseError::MissingValue {
                            flag: def.name.clone(),
                        });
                        continue;
                    }
                },
            };
            errors.collect(def.assign(&raw));
        }

        for def in &self.flags {
            if seen.contains(def.name.as_str()) {
                continue;
            }
            if def.required {
                errors.push(ParseError::RequiredFlag {
                    flag: def.name.clone(),
                });
                continue;
            }
            def.apply_default();
        }

        remaining
    }

    /// Finds the definition a dash-prefixed token refers to.
    fn match_token(&self, token: &str) -> Option<(&FlagDef, Option<String>)> {
        let (body, double) = match token.strip_prefix("--") {
            Some(rest) => (rest, true),
            None => (token.strip_prefix('-')?, false),
        };
        let (name, inline) = match body.split_once('=') {
            Some((name, value)) => (name, Some(value.to_string())),
            None => (body, None),
        };
        if name.is_empty() {
            return None;
        }

        let def = match single_char(name) {
            Some(c) if !double => self.find_shortcut(c),
            _ => self.find(name),
        }?;
        Some((def, inline))
    }

    /// Structural checks run once per distinct set by registry validation.
    pub(crate) fn check_declarations(
        &self,
        command: &str,
        errors: &mut ErrorList<RegistrationError>,
    ) {
        let mut names: HashSet<&str> = HashSet::new();
        let mut shortcuts: HashSet<char> = HashSet::new();

        for def in &self.flags {
            if !names.insert(def.name.as_str()) {
                errors.push(RegistrationError::DuplicateFlag {
                    command: command.to_string(),
                    set: self.name.clone(),
                    flag: def.name.clone(),
                });
                continue;
            }
            if let Some(shortcut) = def.shortcut {
                if !is_valid_shortcut(shortcut) {
                    errors.push(RegistrationError::InvalidShortcut {
                        command: command.to_string(),
                        flag: def.name.clone(),
                        shortcut,
                    });
                } else if !shortcuts.insert(shortcut) {
                    errors.push(RegistrationError::DuplicateShortcut {
                        command: command.to_string(),
                        set: self.name.clone(),
                        shortcut,
                    });
                }
            }
            def.check_binding(errors);
        }
    }
}

pub(crate) fn is_valid_shortcut(c: char) -> bool {
    c.is_ascii_graphic() && c != '-' && c != '='
}

pub(crate) fn single_char(s: &str) -> Option<char> {
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}
