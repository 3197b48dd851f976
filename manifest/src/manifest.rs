//! Declarative command-tree manifests.
//!
//! A manifest describes named flag sets and a list of commands. Commands
//! reference flag sets by name and parents by command key; parents must be
//! listed before their children.
//!
//! # Example YAML
//!
//! ```yaml
//! flag_sets:
//!   output:
//!     - name: format
//!       type: string
//!       shortcut: o
//!       default: text
//!       regex: "^(text|json)$"
//!       usage: Output format
//! commands:
//!   - name: db
//!     description: Database maintenance
//!     delegate: migrate
//!   - name: migrate
//!     parents: [db]
//!     flag_sets: [output]
//!     args:
//!       - name: target
//!         required: true
//! ```

use std::collections::{BTreeMap, HashMap};
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use cmdtree_core::{
    ArgDef, Binding, CommandId, CommandMetadata, Example, FlagDef, FlagKind, FlagSet, FlagTarget,
    FlagValue, Registry,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ManifestError, Result};

/// One flag inside a named flag set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlagSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: FlagKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shortcut: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
    #[serde(default)]
    pub usage: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regex: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<String>,
}

/// One positional argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgSpec {
    pub name: String,
    #[serde(default)]
    pub usage: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<String>,
}

/// One command entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandSpec {
    pub name: String,
    /// Identifier used by `parents` and `delegate`; defaults to `name`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub usage: String,
    pub description: String,
    pub parents: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delegate: Option<String>,
    /// Trigger flag name (top-level commands only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger: Option<String>,
    pub hidden: bool,
    pub order: u32,
    pub flag_sets: Vec<String>,
    pub args: Vec<ArgSpec>,
    pub examples: Vec<Example>,
    pub no_examples: bool,
    pub auto_examples: bool,
}

impl CommandSpec {
    pub fn key(&self) -> &str {
        self.key.as_deref().unwrap_or(&self.name)
    }
}

/// A complete command-tree manifest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Manifest {
    pub flag_sets: BTreeMap<String, Vec<FlagSpec>>,
    pub commands: Vec<CommandSpec>,
}

/// Bindings created for a manifest's flags and arguments.
///
/// Flag sets are built once and shared by every command that names them,
/// so a set's bindings are shared as well.
#[derive(Debug, Clone, Default)]
pub struct Captured {
    sets: HashMap<String, Vec<(String, FlagTarget)>>,
    commands: HashMap<CommandId, CapturedCommand>,
}

#[derive(Debug, Clone, Default)]
struct CapturedCommand {
    key: String,
    sets: Vec<String>,
    args: Vec<(String, Binding<String>)>,
}

impl Captured {
    /// The manifest key the command was registered under.
    pub fn key(&self, id: CommandId) -> Option<&str> {
        self.commands.get(&id).map(|c| c.key.as_str())
    }

    /// Current flag and argument values of a command as JSON.
    ///
    /// ```json
    /// { "flags": { "format": "json" }, "args": { "target": "latest" } }
    /// ```
    pub fn values(&self, id: CommandId) -> serde_json::Value {
        let mut flags = serde_json::Map::new();
        let mut args = serde_json::Map::new();

        if let Some(command) = self.commands.get(&id) {
            for set in &command.sets {
                for (name, target) in self.sets.get(set).into_iter().flatten() {
                    let value = serde_json::to_value(target.current())
                        .unwrap_or(serde_json::Value::Null);
                    flags.insert(name.clone(), value);
                }
            }
            for (name, binding) in &command.args {
                args.insert(name.clone(), serde_json::Value::String(binding.get()));
            }
        }

        serde_json::json!({ "flags": flags, "args": args })
    }
}

impl Manifest {
    /// Loads a manifest, choosing JSON or YAML by file extension.
    ///
    /// # Errors
    ///
    /// Returns [`UnsupportedFormat`](ManifestError::UnsupportedFormat) for
    /// other extensions, [`IoError`](ManifestError::IoError) if the file
    /// cannot be read, or a parse error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let extension = path.extension().and_then(|e| e.to_str());
        match extension {
            Some("json") => {
                let reader = BufReader::new(std::fs::File::open(path)?);
                Ok(serde_json::from_reader(reader)?)
            }
            Some("yaml" | "yml") => {
                let reader = BufReader::new(std::fs::File::open(path)?);
                Ok(serde_yaml::from_reader(reader)?)
            }
            _ => Err(ManifestError::UnsupportedFormat(path.to_path_buf())),
        }
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Builds an unvalidated registry with an empty global scope.
    ///
    /// Call [`Registry::initialize`] on the result to validate and build the
    /// tree.
    pub fn into_registry(&self) -> Result<(Registry, Captured)> {
        let mut registry = Registry::new();
        let captured = self.register_into(&mut registry)?;
        Ok((registry, captured))
    }

    /// Registers every command into an existing registry.
    pub fn register_into(&self, registry: &mut Registry) -> Result<Captured> {
        let mut captured = Captured::default();
        let mut sets: HashMap<&str, Arc<FlagSet>> = HashMap::new();
        for (name, specs) in &self.flag_sets {
            let (set, targets) = build_flag_set(name, specs)?;
            sets.insert(name.as_str(), Arc::new(set));
            captured.sets.insert(name.clone(), targets);
        }

        let mut ids: HashMap<&str, CommandId> = HashMap::new();
        for spec in &self.commands {
            if ids.contains_key(spec.key()) {
                return Err(ManifestError::DuplicateKey(spec.key().to_string()));
            }

            let mut meta = CommandMetadata::new(&spec.name)
                .with_usage(&spec.usage)
                .with_description(&spec.description)
                .with_order(spec.order);
            meta.hidden = spec.hidden;
            meta.no_examples = spec.no_examples;
            meta.auto_examples = spec.auto_examples;
            meta.examples = spec.examples.clone();
            meta.trigger_flag = spec.trigger.clone();

            for set_name in &spec.flag_sets {
                let set = sets.get(set_name.as_str()).ok_or_else(|| {
                    ManifestError::UnknownFlagSet {
                        command: spec.name.clone(),
                        set: set_name.clone(),
                    }
                })?;
                meta = meta.with_flag_set(Arc::clone(set));
            }

            let mut args = Vec::with_capacity(spec.args.len());
            for arg in &spec.args {
                let binding = Binding::new(String::new());
                meta = meta.with_arg(build_arg(arg, binding.clone()));
                args.push((arg.name.clone(), binding));
            }

            let parents = spec
                .parents
                .iter()
                .map(|p| {
                    ids.get(p.as_str())
                        .copied()
                        .ok_or_else(|| ManifestError::UnknownParent {
                            command: spec.name.clone(),
                            parent: p.clone(),
                        })
                })
                .collect::<Result<Vec<_>>>()?;

            let id = registry.register(meta, &parents)?;
            debug!(key = spec.key(), id = %id, "Registered manifest command");
            ids.insert(spec.key(), id);
            captured.commands.insert(
                id,
                CapturedCommand {
                    key: spec.key().to_string(),
                    sets: spec.flag_sets.clone(),
                    args,
                },
            );
        }

        for spec in &self.commands {
            let Some(delegate) = &spec.delegate else {
                continue;
            };
            let to = ids
                .get(delegate.as_str())
                .copied()
                .ok_or_else(|| ManifestError::UnknownDelegate {
                    command: spec.name.clone(),
                    delegate: delegate.clone(),
                })?;
            registry.set_delegate(ids[spec.key()], to)?;
        }

        Ok(captured)
    }
}

fn build_flag_set(name: &str, specs: &[FlagSpec]) -> Result<(FlagSet, Vec<(String, FlagTarget)>)> {
    let mut set = FlagSet::new(name);
    let mut targets = Vec::with_capacity(specs.len());

    for spec in specs {
        let target = match spec.kind {
            FlagKind::String => FlagTarget::String(Binding::default()),
            FlagKind::Bool => FlagTarget::Bool(Binding::default()),
            FlagKind::Int => FlagTarget::Int(Binding::default()),
            FlagKind::Int64 => FlagTarget::Int64(Binding::default()),
        };
        let mut def = FlagDef::new(&spec.name)
            .bind(target.clone())
            .with_usage(&spec.usage);

        if let Some(shortcut) = &spec.shortcut {
            let mut chars = shortcut.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => def = def.with_shortcut(c),
                _ => {
                    return Err(ManifestError::InvalidShortcut {
                        flag: spec.name.clone(),
                        shortcut: shortcut.clone(),
                    });
                }
            }
        }
        if let Some(default) = &spec.default {
            def = def.with_default(convert_default(&spec.name, spec.kind, default)?);
        }
        if spec.required {
            def = def.required();
        }
        if let Some(pattern) = &spec.regex {
            let regex = Regex::new(pattern).map_err(|source| ManifestError::InvalidRegex {
                flag: spec.name.clone(),
                source,
            })?;
            def = def.with_regex(regex);
        }
        if let Some(example) = &spec.example {
            def = def.with_example(example);
        }

        targets.push((spec.name.clone(), target));
        set = set.with_flag(def);
    }

    Ok((set, targets))
}

fn convert_default(flag: &str, kind: FlagKind, value: &serde_json::Value) -> Result<FlagValue> {
    use serde_json::Value;

    let converted = match (kind, value) {
        (FlagKind::String, Value::String(s)) => Some(FlagValue::String(s.clone())),
        (FlagKind::String, Value::Number(n)) => Some(FlagValue::String(n.to_string())),
        (FlagKind::Bool, Value::Bool(b)) => Some(FlagValue::Bool(*b)),
        (FlagKind::Int, Value::Number(n)) => n
            .as_i64()
            .and_then(|n| i32::try_from(n).ok())
            .map(FlagValue::Int),
        (FlagKind::Int64, Value::Number(n)) => n.as_i64().map(FlagValue::Int64),
        _ => None,
    };
    converted.ok_or_else(|| ManifestError::InvalidDefault {
        flag: flag.to_string(),
        value: value.to_string(),
        expected: kind,
    })
}

fn build_arg(spec: &ArgSpec, binding: Binding<String>) -> ArgDef {
    let mut arg = if spec.required {
        ArgDef::required(&spec.name, binding)
    } else {
        ArgDef::optional(&spec.name, binding)
    };
    arg = arg.with_usage(&spec.usage);
    if let Some(default) = &spec.default {
        arg = arg.with_default(default);
    }
    if let Some(example) = &spec.example {
        arg = arg.with_example(example);
    }
    arg
}
