//! Error types for manifest and configuration loading.

use std::path::PathBuf;

use cmdtree_core::{FlagKind, RegistrationError};
use thiserror::Error;

/// Errors that can occur while loading a manifest or turning it into a
/// registry.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// File I/O failure.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON parsing or serialization failure.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// File extension is neither JSON nor YAML.
    #[error("unsupported manifest format: {}", .0.display())]
    UnsupportedFormat(PathBuf),

    /// Two commands share one key.
    #[error("duplicate command key '{0}'")]
    DuplicateKey(String),

    /// A command references a flag set the manifest does not define.
    #[error("command '{command}': unknown flag set '{set}'")]
    UnknownFlagSet { command: String, set: String },

    /// A parent key is unknown or declared after the child.
    #[error("command '{command}': unknown parent '{parent}' (parents must be declared first)")]
    UnknownParent { command: String, parent: String },

    /// A delegate key is unknown.
    #[error("command '{command}': unknown delegate '{delegate}'")]
    UnknownDelegate { command: String, delegate: String },

    /// Flag regex does not compile.
    #[error("flag '{flag}': invalid regex: {source}")]
    InvalidRegex {
        flag: String,
        #[source]
        source: regex::Error,
    },

    /// Default value cannot be represented as the flag's type.
    #[error("flag '{flag}': default {value} is not a valid {expected}")]
    InvalidDefault {
        flag: String,
        value: String,
        expected: FlagKind,
    },

    /// Shortcut is not exactly one character.
    #[error("flag '{flag}': shortcut '{shortcut}' must be a single character")]
    InvalidShortcut { flag: String, shortcut: String },

    /// The registry refused a registration.
    #[error(transparent)]
    Registration(#[from] RegistrationError),
}

/// Convenience alias for results with [`ManifestError`].
pub type Result<T> = std::result::Result<T, ManifestError>;
