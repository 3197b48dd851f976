//! Standard global options shared by every command.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::binding::Binding;
use crate::config::OptionDefaults;
use crate::flag::{FlagDef, FlagSet, FlagValue};

/// Name of the global flag set.
pub const GLOBAL_FLAG_SET: &str = "global";

/// How much command-line output to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Verbosity {
    None = 0,
    Low = 1,
    Medium = 2,
    High = 3,
}

/// Verbosity level outside `0..=3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum VerbosityError {
    #[error("invalid verbosity level {0}: verbosity too low; must be between 0..3 inclusive")]
    TooLow(i32),
    #[error("invalid verbosity level {0}: verbosity too high; must be between 0..3 inclusive")]
    TooHigh(i32),
}

impl TryFrom<i32> for Verbosity {
    type Error = VerbosityError;

    fn try_from(level: i32) -> Result<Self, Self::Error> {
        match level {
            i32::MIN..=-1 => Err(VerbosityError::TooLow(level)),
            0 => Ok(Self::None),
            1 => Ok(Self::Low),
            2 => Ok(Self::Medium),
            3 => Ok(Self::High),
            _ => Err(VerbosityError::TooHigh(level)),
        }
    }
}

/// The verbosity, quiet, timeout, dry-run and force options.
///
/// Each option is a [`Binding`] shared with the flag set returned by
/// [`flag_set`](GlobalOptions::flag_set), so parsing the global layer updates
/// the accessors directly.
///
/// # Examples
///
/// ```
/// use cmdtree_core::{ErrorList, GlobalOptions, OptionDefaults, Verbosity};
///
/// let options = GlobalOptions::new(&OptionDefaults::default());
/// let flags = options.flag_set();
///
/// let mut errors = ErrorList::new();
/// let rest = flags.parse(vec!["-v".into(), "3".into(), "deploy".into()], &mut errors);
///
/// assert!(errors.is_empty());
/// assert_eq!(rest, vec!["deploy".to_string()]);
/// assert_eq!(options.verbosity(), Verbosity::High);
/// ```
#[derive(Debug, Clone)]
pub struct GlobalOptions {
    verbosity: Binding<i32>,
    quiet: Binding<bool>,
    timeout: Binding<i32>,
    dry_run: Binding<bool>,
    force: Binding<bool>,
    defaults: OptionDefaults,
}

impl GlobalOptions {
    pub fn new(defaults: &OptionDefaults) -> Self {
        Self {
            verbosity: Binding::new(defaults.verbosity),
            quiet: Binding::new(defaults.quiet),
            timeout: Binding::new(defaults.timeout_secs),
            dry_run: Binding::new(defaults.dry_run),
            force: Binding::new(defaults.force),
            defaults: defaults.clone(),
        }
    }

    /// Builds the `global` flag set bound to these options.
    pub fn flag_set(&self) -> FlagSet {
        let d = &self.defaults;
        FlagSet::new(GLOBAL_FLAG_SET)
            .with_flag(
                FlagDef::int("verbosity", self.verbosity.clone())
                    .with_shortcut('v')
                    .with_default(d.verbosity)
                    .with_usage("Verbosity of most command line output (0 to 3, default 1)")
                    .with_validator(|value| match value {
                        FlagValue::Int(level) => Verbosity::try_from(*level)
                            .map(|_| ())
                            .map_err(|e| e.to_string()),
                        _ => Ok(()),
                    }),
            )
            .with_flag(
                FlagDef::boolean("quiet", self.quiet.clone())
                    .with_shortcut('q')
                    .with_default(d.quiet)
                    .with_usage("Disable display of most command line output"),
            )
            .with_flag(
                FlagDef::int("timeout", self.timeout.clone())
                    .with_shortcut('t')
                    .with_default(d.timeout_secs)
                    .with_usage("Timeout in seconds for the command to complete")
                    .with_validator(|value| match value {
                        FlagValue::Int(secs) if *secs < 0 => {
                            Err("timeout cannot be negative".to_string())
                        }
                        _ => Ok(()),
                    }),
            )
            .with_flag(
                FlagDef::boolean("dry-run", self.dry_run.clone())
                    .with_default(d.dry_run)
                    .with_usage("Show what command results will be if command is run"),
            )
            .with_flag(
                FlagDef::boolean("force", self.force.clone())
                    .with_shortcut('f')
                    .with_default(d.force)
                    .with_usage("Force the action even if warnings"),
            )
    }

    /// Current verbosity; out-of-range values saturate to the nearest level.
    pub fn verbosity(&self) -> Verbosity {
        match Verbosity::try_from(self.verbosity.get()) {
            Ok(v) => v,
            Err(VerbosityError::TooLow(_)) => Verbosity::None,
            Err(VerbosityError::TooHigh(_)) => Verbosity::High,
        }
    }

    pub fn quiet(&self) -> bool {
        self.quiet.get()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(u64::try_from(self.timeout.get()).unwrap_or(0))
    }

    pub fn dry_run(&self) -> bool {
        self.dry_run.get()
    }

    pub fn force(&self) -> bool {
        self.force.get()
    }
}

impl Default for GlobalOptions {
    fn default() -> Self {
        Self::new(&OptionDefaults::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorList, ParseError};

    #[test]
    fn test_verbosity_bounds() {
        assert_eq!(Verbosity::try_from(0), Ok(Verbosity::None));
        assert_eq!(Verbosity::try_from(3), Ok(Verbosity::High));
        assert_eq!(Verbosity::try_from(-1), Err(VerbosityError::TooLow(-1)));
        assert_eq!(Verbosity::try_from(10), Err(VerbosityError::TooHigh(10)));
    }

    #[test]
    fn test_defaults_flow_into_accessors() {
        let defaults = OptionDefaults {
            timeout_secs: 30,
            dry_run: true,
            ..OptionDefaults::default()
        };
        let options = GlobalOptions::new(&defaults);

        assert_eq!(options.timeout(), Duration::from_secs(30));
        assert!(options.dry_run());
        assert!(!options.force());
        assert_eq!(options.verbosity(), Verbosity::Low);
    }

    #[test]
    fn test_out_of_range_verbosity_is_rejected() {
        let options = GlobalOptions::default();
        let flags = options.flag_set();

        let mut errors = ErrorList::new();
        flags.parse(vec!["--verbosity=7".to_string()], &mut errors);

        assert!(matches!(
            errors.into_vec().as_slice(),
            [ParseError::Validation { flag, .. }] if flag == "verbosity"
        ));
        assert_eq!(options.verbosity(), Verbosity::Low);
    }

    #[test]
    fn test_flag_set_parses_all_options() {
        let options = GlobalOptions::default();
        let flags = options.flag_set();

        let mut errors = ErrorList::new();
        let rest = flags.parse(
            ["-q", "--dry-run", "-f", "--timeout", "9", "build"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            &mut errors,
        );

        assert!(errors.is_empty());
        assert_eq!(rest, vec!["build".to_string()]);
        assert!(options.quiet());
        assert!(options.dry_run());
        assert!(options.force());
        assert_eq!(options.timeout(), Duration::from_secs(9));
    }
}
