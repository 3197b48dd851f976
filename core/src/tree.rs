//! Command tree construction and structural queries.
//!
//! [`Registry::build_tree`] walks the commands in registration order. Because
//! a parent handle only exists once the parent is registered, every parent's
//! dotted paths are already known when its children are visited, so a single
//! pass suffices.

use std::cmp::Ordering;

use tracing::debug;

use crate::command::{Command, CommandId};
use crate::error::{CliError, ErrorList, RegistrationError};
use crate::registry::Registry;

impl Registry {
    /// Builds the dotted-path and trigger-flag indices and the child lists.
    ///
    /// Rebuilds from scratch on every call, so calling it twice on an
    /// unchanged registry yields the same indices and the same errors. On
    /// success the registry is frozen.
    pub fn build_tree(&mut self) -> Result<(), CliError> {
        self.path_index.clear();
        self.trigger_index.clear();
        for entry in &mut self.entries {
            entry.children.clear();
            entry.paths.clear();
        }
        self.built = false;

        let mut errors = ErrorList::new();

        for index in 0..self.entries.len() {
            let id = self.id_at(index);
            let name = self.entries[index].command.metadata().name.clone();
            let parents = self.entries[index].parents.clone();

            if parents.is_empty() {
                if self.index_path(&name, id, &mut errors) {
                    self.entries[index].paths.push(name);
                }
                continue;
            }

            for parent in parents {
                let Some(parent_index) = self.index_of(parent).filter(|&p| p < index) else {
                    errors.push(RegistrationError::ParentNotFound {
                        parent: parent.to_string(),
                        child: name.clone(),
                    });
                    continue;
                };

                if !self.entries[parent_index].children.contains(&id) {
                    self.entries[parent_index].children.push(id);
                }

                let parent_paths = self.entries[parent_index].paths.clone();
                for parent_path in parent_paths {
                    let path = format!("{parent_path}.{name}");
                    if self.index_path(&path, id, &mut errors) {
                        self.entries[index].paths.push(path);
                    }
                }
            }
        }

        self.check_delegates(&mut errors);

        for index in 0..self.entries.len() {
            let entry = &self.entries[index];
            if !entry.parents.is_empty() {
                continue;
            }
            if let Some(flag) = &entry.command.metadata().trigger_flag {
                let id = self.id_at(index);
                self.trigger_index.entry(flag.clone()).or_insert(id);
            }
        }

        errors.into_result().map_err(CliError::Registration)?;
        self.built = true;
        debug!(
            commands = self.entries.len(),
            paths = self.path_index.len(),
            triggers = self.trigger_index.len(),
            "Built command tree"
        );
        Ok(())
    }

    /// Indexes `path` for `id`; returns whether it was newly added.
    fn index_path(
        &mut self,
        path: &str,
        id: CommandId,
        errors: &mut ErrorList<RegistrationError>,
    ) -> bool {
        match self.path_index.get(path) {
            None => {
                self.path_index.insert(path.to_string(), id);
                true
            }
            Some(existing) if *existing == id => false,
            Some(existing) => {
                errors.push(RegistrationError::PathCollision {
                    path: path.to_string(),
                    existing: self.entries[existing.index].command.metadata().name.clone(),
                    incoming: self.entries[id.index].command.metadata().name.clone(),
                });
                false
            }
        }
    }

    fn check_delegates(&self, errors: &mut ErrorList<RegistrationError>) {
        for (index, entry) in self.entries.iter().enumerate() {
            let Some(delegate) = entry.delegate else {
                continue;
            };
            let id = self.id_at(index);
            let is_child = self
                .index_of(delegate)
                .is_some_and(|d| self.entries[d].parents.contains(&id));
            if !is_child {
                errors.push(RegistrationError::InvalidDelegate {
                    command: entry.command.metadata().name.clone(),
                    delegate: delegate.to_string(),
                });
            }
        }
    }

    /// Every dotted path the command is known by, one per parent path.
    pub fn paths(&self, id: CommandId) -> &[String] {
        self.index_of(id)
            .map(|i| self.entries[i].paths.as_slice())
            .unwrap_or(&[])
    }

    pub fn children(&self, id: CommandId) -> &[CommandId] {
        self.index_of(id)
            .map(|i| self.entries[i].children.as_slice())
            .unwrap_or(&[])
    }

    pub fn lookup_path(&self, path: &str) -> Option<CommandId> {
        self.path_index.get(path).copied()
    }

    /// The command registered at exactly `path`.
    pub fn get_exact_command(&self, path: &str) -> Option<&dyn Command> {
        self.lookup_path(path).and_then(|id| self.command(id))
    }

    /// All indexed paths, sorted.
    pub fn command_paths(&self) -> impl Iterator<Item = (&str, CommandId)> {
        self.path_index.iter().map(|(p, id)| (p.as_str(), *id))
    }

    /// The command a trigger flag routes to.
    pub fn trigger_command(&self, flag: &str) -> Option<CommandId> {
        self.trigger_index.get(flag).copied()
    }

    /// Visible top-level commands in display order.
    ///
    /// Commands with an explicit order (1, 2, ...) come first, ascending;
    /// order 0 sorts last. Ties are broken by name.
    pub fn top_level(&self) -> Vec<CommandId> {
        let mut ids: Vec<CommandId> = self
            .commands()
            .filter(|(id, cmd)| self.parents(*id).is_empty() && !cmd.metadata().hidden)
            .map(|(id, _)| id)
            .collect();

        ids.sort_by(|a, b| {
            let (a, b) = (&self.entries[a.index], &self.entries[b.index]);
            let (a, b) = (a.command.metadata(), b.command.metadata());
            match (a.order, b.order) {
                (x, y) if x == y => a.name.cmp(&b.name),
                (0, _) => Ordering::Greater,
                (_, 0) => Ordering::Less,
                (x, y) => x.cmp(&y),
            }
        });
        ids
    }

    /// Direct children of the command at `path`, in registration order.
    pub fn subcommands(&self, path: &str) -> Vec<CommandId> {
        self.lookup_path(path)
            .map(|id| self.children(id).to_vec())
            .unwrap_or_default()
    }
}
