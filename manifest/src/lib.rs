//! Declarative command-tree manifests and runner configuration files.
//!
//! A [`Manifest`] describes flag sets and commands in YAML or JSON and turns
//! into a populated [`Registry`](cmdtree_core::Registry). The bindings it
//! creates are kept in a [`Captured`] value so resolved flag and argument
//! values can be reported after parsing.
//!
//! # Quick start
//!
//! ```
//! use cmdtree_core::Runner;
//! use cmdtree_manifest::Manifest;
//!
//! let manifest = Manifest::from_yaml_str(r#"
//! commands:
//!   - name: greet
//!     args:
//!       - name: who
//!         required: true
//! "#).unwrap();
//!
//! let runner = Runner::default();
//! let mut registry = runner.registry();
//! let captured = manifest.register_into(&mut registry).unwrap();
//! registry.initialize().unwrap();
//!
//! let parsed = runner.parse(&registry, &["greet".to_string(), "world".to_string()]).unwrap();
//! assert_eq!(captured.values(parsed.id)["args"]["who"], "world");
//! ```

mod config;
mod error;
mod manifest;

pub use config::{ConfigFile, load_config, save_config};
pub use error::{ManifestError, Result};
pub use manifest::{ArgSpec, Captured, CommandSpec, FlagSpec, Manifest};
