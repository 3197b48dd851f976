//! Token-stream resolution against a built registry.
//!
//! Covers the longest-prefix path walk, default-subcommand delegation, the
//! trigger-flag rewrite, per-command flag layers and raw-flag validation.

use tracing::{debug, warn};

use crate::command::CommandId;
use crate::error::{ErrorList, ParseError, ResolutionError};
use crate::flag::{END_OF_FLAGS, FlagSet, single_char};
use crate::registry::Registry;

/// Outcome of [`Registry::resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub id: CommandId,
    /// Dotted path reported to the caller (the delegate's path after delegation)
    pub path: String,
    /// Tokens not consumed by the path walk
    pub remaining: Vec<String>,
}

impl Registry {
    /// Maps the leading tokens onto the deepest registered dotted path.
    ///
    /// The walk stops at the first dash-prefixed token. Candidates are tried
    /// longest first, so `db migrate up` tries `db.migrate.up`, then
    /// `db.migrate`, then `db`.
    ///
    /// # Examples
    ///
    /// ```
    /// use cmdtree_core::{CommandMetadata, Registry};
    ///
    /// let mut registry = Registry::new();
    /// let a = registry.register(CommandMetadata::new("a"), &[]).unwrap();
    /// registry.register(CommandMetadata::new("b"), &[a]).unwrap();
    /// registry.initialize().unwrap();
    ///
    /// let tokens: Vec<String> = ["a", "b", "--flag"].iter().map(|s| s.to_string()).collect();
    /// let resolved = registry.resolve(&tokens).unwrap();
    /// assert_eq!(resolved.path, "a.b");
    /// assert_eq!(resolved.remaining, vec!["--flag".to_string()]);
    /// ```
    pub fn resolve(&self, tokens: &[String]) -> Result<Resolution, ResolutionError> {
        if !self.built {
            return Err(ResolutionError::NotBuilt);
        }

        let walk = tokens.iter().take_while(|t| !t.starts_with('-')).count();
        for k in (1..=walk).rev() {
            let candidate = tokens[..k].join(".");
            let Some(id) = self.lookup_path(&candidate) else {
                continue;
            };
            let remaining = tokens[k..].to_vec();
            debug!(path = %candidate, remaining = remaining.len(), "Resolved command");

            return Ok(match self.get_default_command(id, &candidate, &remaining) {
                Some((delegate, path)) => {
                    debug!(from = %candidate, to = %path, "Delegated to default subcommand");
                    Resolution {
                        id: delegate,
                        path,
                        remaining,
                    }
                }
                None => Resolution {
                    id,
                    path: candidate,
                    remaining,
                },
            });
        }

        Err(ResolutionError::UnknownCommand {
            args: tokens.to_vec(),
        })
    }

    /// The delegate to run instead of `id`, with the path it runs under.
    ///
    /// Delegation happens only when at least one token remains and the next
    /// one is not a flag. The reported path is the delegate path extending
    /// `path`.
    pub fn get_default_command(
        &self,
        id: CommandId,
        path: &str,
        remaining: &[String],
    ) -> Option<(CommandId, String)> {
        let delegate = self.delegate(id)?;
        match remaining.first() {
            Some(next) if !next.starts_with('-') => {}
            _ => return None,
        }

        let prefix = format!("{path}.");
        match self.paths(delegate).iter().find(|p| p.starts_with(&prefix)) {
            Some(found) => Some((delegate, found.clone())),
            None => {
                warn!(path, delegate = %delegate, "Delegate has no path under the matched command");
                None
            }
        }
    }

    /// Rewrites a leading `--name` trigger flag into its command's name.
    ///
    /// Must run before any flag layer sees the tokens, otherwise the global
    /// layer would consume the trigger as a plain boolean.
    pub fn route_trigger_flag(&self, mut tokens: Vec<String>) -> Vec<String> {
        let Some(first) = tokens.first() else {
            return tokens;
        };
        let Some(name) = first.strip_prefix("--") else {
            return tokens;
        };
        if !self.global.contains(name) {
            return tokens;
        }
        let Some(target) = self.trigger_command(name).and_then(|id| self.metadata(id)) else {
            return tokens;
        };

        debug!(flag = name, command = %target.name, "Routed trigger flag");
        tokens[0] = target.name.clone();
        tokens
    }

    /// Runs the command's own flag sets over `tokens`, in declaration order.
    ///
    /// Every layer runs even if an earlier one reported errors.
    pub fn parse_command_flags(
        &self,
        id: CommandId,
        tokens: Vec<String>,
        errors: &mut ErrorList<ParseError>,
    ) -> Vec<String> {
        let Some(meta) = self.metadata(id) else {
            return tokens;
        };
        meta.flag_sets
            .iter()
            .fold(tokens, |rest, set| set.parse(rest, errors))
    }

    /// The raw flags that neither the global scope nor `id`'s own sets know.
    ///
    /// Leading dashes (at most two) and any `=value` suffix are ignored when
    /// matching. A single-dash, single-character token also matches a shortcut.
    pub fn unknown_flags(&self, id: CommandId, raw_flags: &[String]) -> Vec<String> {
        let sets: Vec<&FlagSet> = std::iter::once(&self.global)
            .chain(
                self.metadata(id)
                    .into_iter()
                    .flat_map(|m| m.flag_sets.iter().map(|s| s.as_ref())),
            )
            .collect();

        let mut unknown: Vec<String> = Vec::new();
        for raw in raw_flags {
            let (body, double) = match raw.strip_prefix("--") {
                Some(rest) => (rest, true),
                None => (raw.strip_prefix('-').unwrap_or(raw.as_str()), false),
            };
            let name = body.split_once('=').map_or(body, |(name, _)| name);

            let shortcut = match (double, single_char(name)) {
                (false, Some(c)) => Some(c),
                _ => None,
            };
            let known = sets.iter().any(|set| {
                set.contains(name) || shortcut.is_some_and(|c| set.find_shortcut(c).is_some())
            });
            if !known && !unknown.contains(raw) {
                unknown.push(raw.clone());
            }
        }
        unknown
    }
}

/// Dash-prefixed tokens of the input as given, up to `--`.
///
/// A bare `-` and negative numbers are positional values, not flags.
pub fn extract_raw_flags(tokens: &[String]) -> Vec<String> {
    tokens
        .iter()
        .take_while(|t| t.as_str() != END_OF_FLAGS)
        .filter(|t| t.starts_with('-') && t.as_str() != "-" && !is_negative_number(t))
        .cloned()
        .collect()
}

fn is_negative_number(token: &str) -> bool {
    let Some(digits) = token.strip_prefix('-') else {
        return false;
    };
    digits.starts_with(|c: char| c.is_ascii_digit())
        && digits.chars().all(|c| c.is_ascii_digit() || c == '.')
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::binding::Binding;
    use crate::command::CommandMetadata;
    use crate::flag::FlagDef;

    fn tokens(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn db_registry() -> (Registry, CommandId, CommandId) {
        let mut registry = Registry::new();
        let db = registry.register(CommandMetadata::new("db"), &[]).unwrap();
        let migrate = registry
            .register(CommandMetadata::new("migrate"), &[db])
            .unwrap();
        let up = registry.register(CommandMetadata::new("up"), &[migrate]).unwrap();
        registry.set_delegate(migrate, up).unwrap();
        registry.initialize().unwrap();
        (registry, migrate, up)
    }

    #[test]
    fn test_resolve_before_build_fails() {
        let registry = Registry::new();
        assert_eq!(
            registry.resolve(&tokens(&["a"])),
            Err(ResolutionError::NotBuilt)
        );
    }

    #[test]
    fn test_resolve_falls_back_to_shallower_path() {
        let (registry, _, _) = db_registry();
        let resolved = registry.resolve(&tokens(&["db", "status"])).unwrap();
        assert_eq!(resolved.path, "db");
        assert_eq!(resolved.remaining, tokens(&["status"]));
    }

    #[test]
    fn test_unknown_command() {
        let (registry, _, _) = db_registry();
        let err = registry.resolve(&tokens(&["deploy", "now"])).unwrap_err();
        assert_eq!(err.to_string(), "unknown command: deploy now");
        assert!(registry.resolve(&tokens(&["--verbose"])).is_err());
    }

    #[test]
    fn test_delegation_requires_positional_token() {
        let (registry, migrate, up) = db_registry();

        let plain = registry.resolve(&tokens(&["db", "migrate"])).unwrap();
        assert_eq!((plain.id, plain.path.as_str()), (migrate, "db.migrate"));

        let flagged = registry
            .resolve(&tokens(&["db", "migrate", "--dry-run"]))
            .unwrap();
        assert_eq!(flagged.id, migrate);

        let delegated = registry
            .resolve(&tokens(&["db", "migrate", "20240101"]))
            .unwrap();
        assert_eq!(delegated.id, up);
        assert_eq!(delegated.path, "db.migrate.up");
        assert_eq!(delegated.remaining, tokens(&["20240101"]));
    }

    #[test]
    fn test_route_trigger_flag() {
        let mut registry = Registry::new();
        registry
            .register(CommandMetadata::new("setup").with_trigger_flag("setup"), &[])
            .unwrap();
        registry.initialize().unwrap();

        assert_eq!(
            registry.route_trigger_flag(tokens(&["--setup", "--force"])),
            tokens(&["setup", "--force"])
        );
        assert_eq!(
            registry.route_trigger_flag(tokens(&["run", "--setup"])),
            tokens(&["run", "--setup"])
        );
        assert_eq!(
            registry.route_trigger_flag(tokens(&["--other"])),
            tokens(&["--other"])
        );
    }

    #[test]
    fn test_extract_raw_flags() {
        let raw = extract_raw_flags(&tokens(&[
            "run", "-x", "--name=v", "-", "-12", "-1.5", "--", "--after",
        ]));
        assert_eq!(raw, tokens(&["-x", "--name=v"]));
    }

    #[test]
    fn test_unknown_flags_checks_global_and_command_sets() {
        let mut registry = Registry::new();
        registry
            .add_global_flag(
                FlagDef::boolean("quiet", Binding::default())
                    .with_shortcut('q')
                    .with_usage("Quiet"),
            )
            .unwrap();
        let set = Arc::new(
            FlagSet::new("list").with_flag(FlagDef::string("format", Binding::default())),
        );
        let list = registry
            .register(CommandMetadata::new("list").with_flag_set(set), &[])
            .unwrap();
        registry.initialize().unwrap();

        let unknown = registry.unknown_flags(
            list,
            &tokens(&["--quiet", "-q", "--format=json", "--bad", "-z", "--bad"]),
        );
        assert_eq!(unknown, tokens(&["--bad", "-z"]));
    }

    #[test]
    fn test_parse_command_flags_runs_every_layer() {
        let count = Binding::new(0);
        let name = Binding::new(String::new());
        let mut registry = Registry::new();
        let id = registry
            .register(
                CommandMetadata::new("run")
                    .with_flag_set(Arc::new(
                        FlagSet::new("a").with_flag(FlagDef::int("count", count.clone())),
                    ))
                    .with_flag_set(Arc::new(
                        FlagSet::new("b").with_flag(FlagDef::string("name", name.clone())),
                    )),
                &[],
            )
            .unwrap();
        registry.initialize().unwrap();

        let mut errors = ErrorList::new();
        let rest = registry.parse_command_flags(
            id,
            tokens(&["--count=nope", "--name", "x", "arg"]),
            &mut errors,
        );

        assert_eq!(rest, tokens(&["arg"]));
        assert_eq!(errors.len(), 1);
        assert_eq!(name.get(), "x");
    }
}
