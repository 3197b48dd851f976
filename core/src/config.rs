//! Runner configuration.
//!
//! All fields have defaults, so an empty document (or `RunnerConfig::default()`)
//! yields the standard behavior.
//!
//! # Example YAML
//!
//! ```yaml
//! help_command: help
//! validate_raw_flags: true
//! defaults:
//!   verbosity: 2
//!   timeout_secs: 10
//! ```

use serde::{Deserialize, Serialize};

/// Defaults for the standard global options.
///
/// # Examples
///
/// ```
/// use cmdtree_core::OptionDefaults;
///
/// let defaults = OptionDefaults::default();
/// assert_eq!(defaults.verbosity, 1);
/// assert_eq!(defaults.timeout_secs, 3);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptionDefaults {
    /// Verbosity level, 0 (silent) to 3 (high).
    pub verbosity: i32,
    pub quiet: bool,
    /// Timeout in seconds.
    pub timeout_secs: i32,
    pub dry_run: bool,
    pub force: bool,
}

impl Default for OptionDefaults {
    fn default() -> Self {
        Self {
            verbosity: 1,
            quiet: false,
            timeout_secs: 3,
            dry_run: false,
            force: false,
        }
    }
}

/// Settings for [`Runner`](crate::Runner).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Command run for an empty invocation or when `--help` is given.
    /// `None` disables both behaviors.
    pub help_command: Option<String>,
    /// Reject dash-prefixed tokens that no known flag accepts.
    pub validate_raw_flags: bool,
    pub defaults: OptionDefaults,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            help_command: Some("help".to_string()),
            validate_raw_flags: true,
            defaults: OptionDefaults::default(),
        }
    }
}
