//! Example invocations for help output.

use std::collections::HashSet;

use crate::command::{CommandMetadata, Example};
use crate::registry::Registry;

/// Collects the examples shown on the top-level help screen.
///
/// Starts with two generic help invocations, then adds each visible
/// top-level command's custom examples, generated ones, or both when the
/// command asks for [`auto_examples`](CommandMetadata::auto_examples).
/// Duplicates are removed.
///
/// # Examples
///
/// ```
/// use cmdtree_core::{collect_examples, CommandMetadata, Registry};
///
/// let mut registry = Registry::new();
/// registry
///     .register(CommandMetadata::new("status").with_usage("status"), &[])
///     .unwrap();
/// registry.initialize().unwrap();
///
/// let examples = collect_examples(&registry, "app");
/// assert_eq!(examples[0].cmd, "app help <command>");
/// assert!(examples.iter().any(|e| e.cmd == "app help status"));
/// ```
pub fn collect_examples(registry: &Registry, exe: &str) -> Vec<Example> {
    let mut all = vec![
        Example::new(
            "Show help for a specific command",
            &format!("{exe} help <command>"),
        ),
        Example::new(
            "Show help for a subcommand",
            &format!("{exe} help <command> <subcommand>"),
        ),
    ];

    for id in registry.top_level() {
        let Some(meta) = registry.metadata(id) else {
            continue;
        };
        if meta.no_examples {
            continue;
        }
        if meta.examples.is_empty() {
            all.extend(auto_examples(registry, exe, meta));
        } else if meta.auto_examples {
            all.extend(meta.examples.iter().cloned());
            all.extend(auto_examples(registry, exe, meta));
        } else {
            all.extend(meta.examples.iter().cloned());
        }
    }

    dedupe(all)
}

/// Generated examples for one top-level command.
pub fn auto_examples(registry: &Registry, exe: &str, meta: &CommandMetadata) -> Vec<Example> {
    let name = &meta.name;
    let mut out = vec![Example::new(
        &format!("Help for {name}"),
        &format!("{exe} help {name}"),
    )];

    let first_sub = registry
        .subcommands(name)
        .into_iter()
        .find_map(|id| registry.metadata(id));
    if let Some(sub) = first_sub {
        out.push(Example::new(
            &format!("Help for {name} {}", sub.name),
            &format!("{exe} help {name} {}", sub.name),
        ));
    }

    let usage = match meta.usage.trim() {
        "" => name.as_str(),
        usage => usage,
    };
    let mut cmdline = if usage.starts_with(name.as_str()) {
        format!("{exe} {usage}")
    } else {
        format!("{exe} {name} {usage}")
    };

    let samples: Vec<String> = sample_flags(meta)
        .into_iter()
        .chain(sample_args(meta))
        .collect();
    if !samples.is_empty() {
        cmdline.push(' ');
        cmdline.push_str(&samples.join(" "));
    }

    out.push(Example::new(
        &format!("Example: {name}"),
        &normalize_spaces(&cmdline),
    ));
    out
}

/// `--name=value` for every flag with an example or default.
fn sample_flags(meta: &CommandMetadata) -> Vec<String> {
    meta.flag_sets
        .iter()
        .flat_map(|set| set.flags.iter())
        .filter_map(|def| {
            let value = def
                .example
                .clone()
                .filter(|v| !v.is_empty())
                .or_else(|| def.default.as_ref().map(|d| d.to_string()))?;
            Some(format!("--{}={}", def.name, quote_if_needed(&value)))
        })
        .collect()
}

/// Example, then default, then a `<name>` placeholder for required args.
fn sample_args(meta: &CommandMetadata) -> Vec<String> {
    meta.arg_defs
        .iter()
        .filter_map(|arg| {
            let value = [&arg.example, &arg.default]
                .into_iter()
                .flatten()
                .find(|v| !v.is_empty())
                .cloned()
                .or_else(|| arg.required.then(|| format!("<{}>", arg.name)))?;
            Some(quote_if_needed(&value))
        })
        .collect()
}

fn quote_if_needed(value: &str) -> String {
    if value.contains([' ', '\t', '"', '\'']) {
        format!("{value:?}")
    } else {
        value.to_string()
    }
}

fn normalize_spaces(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn dedupe(examples: Vec<Example>) -> Vec<Example> {
    let mut seen = HashSet::new();
    examples
        .into_iter()
        .filter(|e| seen.insert((e.descr.clone(), e.cmd.clone())))
        .collect()
}
