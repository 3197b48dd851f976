//! Command registration and structural validation.
//!
//! The [`Registry`] follows a strict lifecycle: commands are registered
//! during start-up, [`validate`](Registry::validate) checks the declared
//! metadata, and [`build_tree`](Registry::build_tree) freezes the path and
//! trigger-flag indices. After a successful build the registry only answers
//! queries.
//!
//! # Examples
//!
//! ```
//! use cmdtree_core::{CommandMetadata, Registry};
//!
//! let mut registry = Registry::new();
//! let db = registry.register(CommandMetadata::new("db"), &[]).unwrap();
//! let migrate = registry.register(CommandMetadata::new("migrate"), &[db]).unwrap();
//! registry.initialize().unwrap();
//!
//! assert_eq!(registry.lookup_path("db.migrate"), Some(migrate));
//! assert_eq!(registry.children(db), &[migrate]);
//! ```

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::LazyLock;
use std::sync::atomic::{AtomicU64, Ordering};

use regex::Regex;
use tracing::debug;

use crate::binding::Binding;
use crate::command::{Command, CommandId, CommandMetadata};
use crate::error::{CliError, ErrorList, RegistrationError};
use crate::flag::FlagDef;
use crate::flag::FlagSet;
use crate::options::GLOBAL_FLAG_SET;

static NEXT_REGISTRY: AtomicU64 = AtomicU64::new(1);

static FLAG_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9-]+$").expect("static regex must compile"));

pub(crate) struct Entry {
    pub(crate) command: Box<dyn Command>,
    pub(crate) parents: Vec<CommandId>,
    pub(crate) delegate: Option<CommandId>,
    pub(crate) children: Vec<CommandId>,
    pub(crate) paths: Vec<String>,
}

/// The set of commands known to one application.
pub struct Registry {
    pub(crate) id: u64,
    pub(crate) entries: Vec<Entry>,
    pub(crate) global: FlagSet,
    pub(crate) path_index: BTreeMap<String, CommandId>,
    pub(crate) trigger_index: HashMap<String, CommandId>,
    pub(crate) pending: ErrorList<RegistrationError>,
    pub(crate) built: bool,
}

impl Registry {
    /// Creates a registry with an empty global flag set.
    pub fn new() -> Self {
        Self::with_global_flags(FlagSet::new(GLOBAL_FLAG_SET))
    }

    /// Creates a registry whose global scope is `global`.
    pub fn with_global_flags(global: FlagSet) -> Self {
        Self {
            id: NEXT_REGISTRY.fetch_add(1, Ordering::Relaxed),
            entries: Vec::new(),
            global,
            path_index: BTreeMap::new(),
            trigger_index: HashMap::new(),
            pending: ErrorList::new(),
            built: false,
        }
    }

    /// Registers `command` as a child of each of `parents`.
    ///
    /// Problems that leave the command registered (such as a trigger flag
    /// clashing with a global flag) are collected and reported by
    /// [`validate`](Registry::validate). The only immediate failure is
    /// registering into an already built registry.
    pub fn register(
        &mut self,
        command: impl Command + 'static,
        parents: &[CommandId],
    ) -> Result<CommandId, RegistrationError> {
        let meta = command.metadata();
        let name = meta.name.clone();
        if self.built {
            return Err(RegistrationError::Frozen { command: name });
        }

        if let Some(flag) = meta.trigger_flag.clone() {
            self.register_trigger_flag(&name, &flag);
        }

        let id = CommandId {
            registry: self.id,
            index: self.entries.len(),
        };
        debug!(command = %name, id = %id, parents = parents.len(), "Registered command");
        self.entries.push(Entry {
            command: Box::new(command),
            parents: parents.to_vec(),
            delegate: None,
            children: Vec::new(),
            paths: Vec::new(),
        });
        Ok(id)
    }

    /// Auto-creates the boolean global flag backing a trigger flag name.
    fn register_trigger_flag(&mut self, command: &str, flag: &str) {
        if self.global.contains(flag) {
            let owner = self.entries.iter().find_map(|e| {
                let meta = e.command.metadata();
                (meta.trigger_flag.as_deref() == Some(flag)).then(|| meta.name.clone())
            });
            let error = match owner {
                Some(existing) => RegistrationError::DuplicateTrigger {
                    flag: flag.to_string(),
                    existing,
                    incoming: command.to_string(),
                },
                None => RegistrationError::TriggerConflict {
                    command: command.to_string(),
                    flag: flag.to_string(),
                },
            };
            self.pending.push(error);
            return;
        }

        let def = FlagDef::boolean(flag, Binding::default())
            .with_usage(&format!("Run {command} command"));
        if let Err(errors) = self.add_global_flag(def) {
            self.pending.extend(errors);
        }
    }

    /// Makes `to` the default subcommand of `from`.
    ///
    /// `to` must be registered as a child of `from`; this is checked by
    /// [`build_tree`](Registry::build_tree).
    pub fn set_delegate(&mut self, from: CommandId, to: CommandId) -> Result<(), RegistrationError> {
        let Some(index) = self.index_of(from) else {
            return Err(RegistrationError::InvalidDelegate {
                command: from.to_string(),
                delegate: to.to_string(),
            });
        };
        if self.built {
            return Err(RegistrationError::Frozen {
                command: self.entries[index].command.metadata().name.clone(),
            });
        }
        self.entries[index].delegate = Some(to);
        Ok(())
    }

    /// Adds a flag to the global scope.
    ///
    /// The name must be lowercase alphanumeric with dashes and not already
    /// taken, exactly one binding type must be set, and usage text is
    /// mandatory. Every violation is reported.
    pub fn add_global_flag(&mut self, def: FlagDef) -> Result<(), ErrorList<RegistrationError>> {
        let mut errors = ErrorList::new();

        if !FLAG_NAME_RE.is_match(&def.name) {
            errors.push(RegistrationError::InvalidFlagName {
                flag: def.name.clone(),
            });
        }
        if self.global.contains(&def.name) {
            errors.push(RegistrationError::DuplicateGlobalFlag {
                flag: def.name.clone(),
            });
        }
        def.check_binding(&mut errors);
        if def.usage.trim().is_empty() {
            errors.push(RegistrationError::EmptyFlagUsage {
                flag: def.name.clone(),
            });
        }

        errors.into_result()?;
        self.global.flags.push(def);
        Ok(())
    }

    /// Checks every distinct flag set and the trigger-flag rules.
    ///
    /// Includes problems collected during registration. Does not modify the
    /// registry, so repeated calls return the same result.
    pub fn validate(&self) -> Result<(), CliError> {
        let mut errors = self.pending.clone();

        self.global.check_declarations(GLOBAL_FLAG_SET, &mut errors);

        let mut seen: HashSet<*const FlagSet> = HashSet::new();
        for entry in &self.entries {
            let meta = entry.command.metadata();
            for set in &meta.flag_sets {
                if !seen.insert(std::sync::Arc::as_ptr(set)) {
                    continue;
                }
                set.check_declarations(&meta.name, &mut errors);
            }

            if let (false, Some(flag)) = (entry.parents.is_empty(), &meta.trigger_flag) {
                errors.push(RegistrationError::TriggerOnSubcommand {
                    command: meta.name.clone(),
                    flag: flag.clone(),
                });
            }
        }

        errors.into_result().map_err(CliError::Registration)
    }

    /// Validates, then builds the tree.
    pub fn initialize(&mut self) -> Result<(), CliError> {
        self.validate()?;
        self.build_tree()
    }

    /// Problems recorded by `register` so far.
    pub fn pending_errors(&self) -> &ErrorList<RegistrationError> {
        &self.pending
    }

    pub fn is_built(&self) -> bool {
        self.built
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn global_flags(&self) -> &FlagSet {
        &self.global
    }

    pub(crate) fn index_of(&self, id: CommandId) -> Option<usize> {
        (id.registry == self.id && id.index < self.entries.len()).then_some(id.index)
    }

    pub(crate) fn id_at(&self, index: usize) -> CommandId {
        CommandId {
            registry: self.id,
            index,
        }
    }

    pub fn command(&self, id: CommandId) -> Option<&dyn Command> {
        self.index_of(id).map(|i| self.entries[i].command.as_ref())
    }

    pub(crate) fn command_mut(&mut self, id: CommandId) -> Option<&mut (dyn Command + 'static)> {
        let index = self.index_of(id)?;
        Some(self.entries[index].command.as_mut())
    }

    pub fn metadata(&self, id: CommandId) -> Option<&CommandMetadata> {
        self.command(id).map(|c| c.metadata())
    }

    /// Commands in registration order.
    pub fn commands(&self) -> impl Iterator<Item = (CommandId, &dyn Command)> {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, e)| (self.id_at(i), e.command.as_ref()))
    }

    pub fn parents(&self, id: CommandId) -> &[CommandId] {
        self.index_of(id)
            .map(|i| self.entries[i].parents.as_slice())
            .unwrap_or(&[])
    }

    pub fn delegate(&self, id: CommandId) -> Option<CommandId> {
        self.index_of(id).and_then(|i| self.entries[i].delegate)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("id", &self.id)
            .field("commands", &self.entries.len())
            .field("paths", &self.path_index.keys().collect::<Vec<_>>())
            .field("built", &self.built)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn bool_flag(name: &str) -> FlagDef {
        FlagDef::boolean(name, Binding::default()).with_usage("test flag")
    }

    #[test]
    fn test_trigger_flag_creates_global_flag() {
        let mut registry = Registry::new();
        registry
            .register(CommandMetadata::new("setup").with_trigger_flag("setup"), &[])
            .unwrap();

        let flag = registry.global_flags().find("setup").unwrap();
        assert_eq!(flag.usage, "Run setup command");
        assert!(registry.pending_errors().is_empty());
    }

    #[test]
    fn test_duplicate_trigger_flags_fail_at_registration() {
        let mut registry = Registry::new();
        registry
            .register(CommandMetadata::new("setup").with_trigger_flag("init"), &[])
            .unwrap();
        registry
            .register(CommandMetadata::new("bootstrap").with_trigger_flag("init"), &[])
            .unwrap();

        assert_eq!(
            registry.pending_errors().clone().into_vec(),
            vec![RegistrationError::DuplicateTrigger {
                flag: "init".to_string(),
                existing: "setup".to_string(),
                incoming: "bootstrap".to_string(),
            }]
        );
        assert_eq!(
            registry.pending_errors().iter().next().unwrap().to_string(),
            "trigger flag 'init' is declared by both 'setup' and 'bootstrap'"
        );
        assert!(matches!(
            registry.validate(),
            Err(CliError::Registration(_))
        ));
    }

    #[test]
    fn test_trigger_conflicts_with_existing_global_flag() {
        let mut registry = Registry::new();
        registry.add_global_flag(bool_flag("force")).unwrap();
        registry
            .register(CommandMetadata::new("nuke").with_trigger_flag("force"), &[])
            .unwrap();

        assert!(matches!(
            registry.pending_errors().iter().next(),
            Some(RegistrationError::TriggerConflict { .. })
        ));
    }

    #[test]
    fn test_subcommand_cannot_have_trigger_flag() {
        let mut registry = Registry::new();
        let db = registry.register(CommandMetadata::new("db"), &[]).unwrap();
        registry
            .register(CommandMetadata::new("seed").with_trigger_flag("seed"), &[db])
            .unwrap();

        let Err(CliError::Registration(errors)) = registry.validate() else {
            panic!("expected registration error");
        };
        assert_eq!(
            errors.into_vec(),
            vec![RegistrationError::TriggerOnSubcommand {
                command: "seed".to_string(),
                flag: "seed".to_string()
            }]
        );
    }

    #[test]
    fn test_add_global_flag_reports_every_violation() {
        let mut registry = Registry::new();
        let errors = registry.add_global_flag(FlagDef::new("Bad_Name")).unwrap_err();

        assert_eq!(
            errors.into_vec(),
            vec![
                RegistrationError::InvalidFlagName {
                    flag: "Bad_Name".to_string()
                },
                RegistrationError::FlagTypeNotDiscoverable {
                    flag: "Bad_Name".to_string()
                },
                RegistrationError::EmptyFlagUsage {
                    flag: "Bad_Name".to_string()
                },
            ]
        );
        assert!(registry.global_flags().flags.is_empty());
    }

    #[test]
    fn test_shared_flag_set_validated_once() {
        let shared = Arc::new(
            FlagSet::new("output")
                .with_flag(bool_flag("json"))
                .with_flag(bool_flag("json")),
        );
        let mut registry = Registry::new();
        registry
            .register(CommandMetadata::new("list").with_flag_set(Arc::clone(&shared)), &[])
            .unwrap();
        registry
            .register(CommandMetadata::new("show").with_flag_set(shared), &[])
            .unwrap();

        let Err(CliError::Registration(errors)) = registry.validate() else {
            panic!("expected registration error");
        };
        assert_eq!(
            errors.into_vec(),
            vec![RegistrationError::DuplicateFlag {
                command: "list".to_string(),
                set: "output".to_string(),
                flag: "json".to_string()
            }]
        );
    }

    #[test]
    fn test_validate_is_idempotent() {
        let mut registry = Registry::new();
        registry
            .register(
                CommandMetadata::new("run").with_flag_set(Arc::new(
                    FlagSet::new("run").with_flag(FlagDef::new("untyped")),
                )),
                &[],
            )
            .unwrap();

        let first = registry.validate().unwrap_err().to_string();
        let second = registry.validate().unwrap_err().to_string();
        assert_eq!(first, second);
    }

    #[test]
    fn test_register_after_build_is_rejected() {
        let mut registry = Registry::new();
        registry.register(CommandMetadata::new("a"), &[]).unwrap();
        registry.initialize().unwrap();

        assert_eq!(
            registry.register(CommandMetadata::new("b"), &[]),
            Err(RegistrationError::Frozen {
                command: "b".to_string()
            })
        );
    }
}
