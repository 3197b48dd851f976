//! Manifest-driven command tree example.
//!
//! Declares a command tree in YAML, loads it with `cmdtree-manifest`, and
//! resolves a few invocations against it, printing the captured flag and
//! argument values as JSON.
//!
//! # Usage
//!
//! ```bash
//! cargo run -p cmdtree-demos --example manifest_tool
//! cargo run -p cmdtree-demos --example manifest_tool -- cache purge --all
//! ```

use cmdtree_core::{Runner, RunnerConfig};
use cmdtree_manifest::Manifest;
use tracing_subscriber::EnvFilter;

const MANIFEST: &str = r#"
flag_sets:
  output:
    - name: json
      type: bool
      shortcut: j
      usage: Print JSON
  purge:
    - name: all
      type: bool
      usage: Purge every entry
    - name: older-than
      type: int64
      default: 86400
      example: "3600"
commands:
  - name: help
    no_examples: true
  - name: cache
    description: Manage the local cache
    delegate: list
  - name: list
    parents: [cache]
    flag_sets: [output]
  - name: purge
    parents: [cache]
    flag_sets: [purge]
    args:
      - name: pattern
        default: "*"
"#;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let manifest = match Manifest::from_yaml_str(MANIFEST) {
        Ok(manifest) => manifest,
        Err(err) => {
            eprintln!("invalid manifest: {err}");
            std::process::exit(1);
        }
    };

    let runner = Runner::new(RunnerConfig::default());
    let mut registry = runner.registry();
    let captured = match manifest.register_into(&mut registry) {
        Ok(captured) => captured,
        Err(err) => {
            eprintln!("invalid manifest: {err}");
            std::process::exit(1);
        }
    };
    if let Err(err) = registry.initialize() {
        eprintln!("invalid command tree: {err}");
        std::process::exit(1);
    }

    println!("Paths:");
    for (path, _) in registry.command_paths() {
        println!("  {path}");
    }
    println!();

    let user_args: Vec<String> = std::env::args().skip(1).collect();
    let invocations: Vec<Vec<String>> = if user_args.is_empty() {
        [
            vec!["cache", "list", "-j"],
            vec!["cache", "-j"],
            vec!["cache", "purge", "tmp-*", "--older-than=3600"],
            vec!["cache", "purge", "--all"],
            vec!["cache", "purge", "--older-than=soon"],
        ]
        .into_iter()
        .map(|tokens| tokens.into_iter().map(String::from).collect())
        .collect()
    } else {
        vec![user_args]
    };

    for tokens in invocations {
        println!("$ tool {}", tokens.join(" "));
        match runner.parse(&registry, &tokens) {
            Ok(parsed) => {
                let values = captured.values(parsed.id);
                println!("  resolved: {}", parsed.path);
                match serde_json::to_string_pretty(&values) {
                    Ok(json) => println!("{json}"),
                    Err(err) => println!("  failed to render values: {err}"),
                }
            }
            Err(err) => println!("  error ({:?}): {err}", err.phase()),
        }
        println!();
    }
}
