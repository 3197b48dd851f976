use std::sync::Arc;

use cmdtree_core::{
    ArgDef, ArgError, Binding, CliError, CommandId, CommandMetadata, ErrorList, FlagDef, FlagSet,
    Phase, RegistrationError, Registry, Runner, RunnerConfig,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn tokens(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn registration_errors(result: Result<(), CliError>) -> Vec<RegistrationError> {
    match result {
        Err(CliError::Registration(errors)) => errors.into_vec(),
        other => panic!("expected registration errors, got {other:?}"),
    }
}

/// `a`, `a.b`, `a.b.c`
fn abc_registry() -> (Registry, CommandId, CommandId, CommandId) {
    let mut registry = Registry::new();
    let a = registry.register(CommandMetadata::new("a"), &[]).unwrap();
    let b = registry.register(CommandMetadata::new("b"), &[a]).unwrap();
    let c = registry.register(CommandMetadata::new("c"), &[b]).unwrap();
    registry.initialize().unwrap();
    (registry, a, b, c)
}

// ---------------------------------------------------------------------------
// Tree building
// ---------------------------------------------------------------------------

#[test]
fn test_every_path_returns_same_instance() {
    let mut registry = Registry::new();
    let users = registry.register(CommandMetadata::new("users"), &[]).unwrap();
    let groups = registry.register(CommandMetadata::new("groups"), &[]).unwrap();
    let list = registry
        .register(CommandMetadata::new("list"), &[users, groups])
        .unwrap();
    registry.initialize().unwrap();

    let paths = registry.paths(list).to_vec();
    assert_eq!(paths, tokens(&["users.list", "groups.list"]));

    let first = registry.get_exact_command(&paths[0]).unwrap();
    for path in &paths {
        let cmd = registry.get_exact_command(path).unwrap();
        assert!(std::ptr::addr_eq(first, cmd));
        assert_eq!(registry.lookup_path(path), Some(list));
    }
}

#[test]
fn test_missing_parent_names_parent_and_child() {
    let mut elsewhere = Registry::new();
    let ghost = elsewhere.register(CommandMetadata::new("ghost"), &[]).unwrap();

    let mut registry = Registry::new();
    registry.register(CommandMetadata::new("top"), &[]).unwrap();
    registry
        .register(CommandMetadata::new("haunted"), &[ghost])
        .unwrap();

    let errors = registration_errors(registry.build_tree());
    assert_eq!(errors.len(), 1);
    let message = errors[0].to_string();
    assert!(message.contains(&ghost.to_string()));
    assert!(message.contains("haunted"));

    // the parentless command is still indexed
    assert!(registry.lookup_path("top").is_some());
    assert!(registry.resolve(&tokens(&["top"])).is_err());
}

#[test]
fn test_validate_and_build_are_idempotent() {
    let shared = Arc::new(
        FlagSet::new("shared")
            .with_flag(FlagDef::boolean("x", Binding::default()).with_shortcut('x'))
            .with_flag(FlagDef::boolean("y", Binding::default()).with_shortcut('x')),
    );
    let mut registry = Registry::new();
    let root = registry
        .register(CommandMetadata::new("root").with_flag_set(Arc::clone(&shared)), &[])
        .unwrap();
    registry
        .register(CommandMetadata::new("leaf").with_flag_set(shared), &[root])
        .unwrap();

    let first = registration_errors(registry.validate());
    let second = registration_errors(registry.validate());
    assert_eq!(first, second);
    assert_eq!(
        first,
        vec![RegistrationError::DuplicateShortcut {
            command: "root".to_string(),
            set: "shared".to_string(),
            shortcut: 'x'
        }]
    );

    registry.build_tree().unwrap();
    let before: Vec<(String, CommandId)> = registry
        .command_paths()
        .map(|(p, id)| (p.to_string(), id))
        .collect();
    registry.build_tree().unwrap();
    let after: Vec<(String, CommandId)> = registry
        .command_paths()
        .map(|(p, id)| (p.to_string(), id))
        .collect();
    assert_eq!(before, after);
    assert_eq!(registry.children(root).len(), 1);
}

#[test]
fn test_default_type_must_match_binding() {
    let mut registry = Registry::new();
    registry
        .register(
            CommandMetadata::new("serve").with_flag_set(Arc::new(
                FlagSet::new("serve")
                    .with_flag(FlagDef::int("port", Binding::default()).with_default("eighty")),
            )),
            &[],
        )
        .unwrap();

    let errors = registration_errors(registry.validate());
    assert!(matches!(
        errors.as_slice(),
        [RegistrationError::DefaultTypeMismatch { flag, expected: "int", .. }] if flag == "port"
    ));
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

#[test]
fn test_longest_match_wins() {
    let (registry, _, _, c) = abc_registry();
    let resolved = registry.resolve(&tokens(&["a", "b", "c"])).unwrap();
    assert_eq!(resolved.id, c);
    assert_eq!(resolved.path, "a.b.c");
    assert!(resolved.remaining.is_empty());
}

#[test]
fn test_walk_stops_at_first_flag() {
    let (registry, a, _, _) = abc_registry();
    let resolved = registry.resolve(&tokens(&["a", "--flag"])).unwrap();
    assert_eq!(resolved.id, a);
    assert_eq!(resolved.path, "a");
    assert_eq!(resolved.remaining, tokens(&["--flag"]));

    // `b` after a flag is not part of the path
    let resolved = registry.resolve(&tokens(&["a", "--flag", "b"])).unwrap();
    assert_eq!(resolved.id, a);
}

#[test]
fn test_unknown_command_reports_tokens() {
    let (registry, _, _, _) = abc_registry();
    let err = registry.resolve(&tokens(&["x", "y"])).unwrap_err();
    assert_eq!(err.to_string(), "unknown command: x y");
    assert_eq!(CliError::from(err).phase(), Phase::Resolution);
}

// ---------------------------------------------------------------------------
// Delegation
// ---------------------------------------------------------------------------

#[test]
fn test_delegation_needs_a_positional_token() {
    let mut registry = Registry::new();
    let cache = registry.register(CommandMetadata::new("cache"), &[]).unwrap();
    let clear = registry
        .register(CommandMetadata::new("clear"), &[cache])
        .unwrap();
    registry.set_delegate(cache, clear).unwrap();
    registry.initialize().unwrap();

    let bare = registry.resolve(&tokens(&["cache"])).unwrap();
    assert_eq!((bare.id, bare.path.as_str()), (cache, "cache"));

    let flagged = registry.resolve(&tokens(&["cache", "-v"])).unwrap();
    assert_eq!(flagged.id, cache);

    let delegated = registry.resolve(&tokens(&["cache", "sessions"])).unwrap();
    assert_eq!(delegated.id, clear);
    assert_eq!(delegated.path, "cache.clear");
    assert!(registry.paths(clear).contains(&delegated.path));
    assert_eq!(delegated.remaining, tokens(&["sessions"]));
}

#[test]
fn test_delegate_path_extends_matched_prefix() {
    let mut registry = Registry::new();
    let local = registry.register(CommandMetadata::new("local"), &[]).unwrap();
    let remote = registry.register(CommandMetadata::new("remote"), &[]).unwrap();
    let sync = registry
        .register(CommandMetadata::new("sync"), &[local, remote])
        .unwrap();
    registry.set_delegate(remote, sync).unwrap();
    registry.initialize().unwrap();

    let delegated = registry.resolve(&tokens(&["remote", "origin"])).unwrap();
    assert_eq!(delegated.path, "remote.sync");
}

// ---------------------------------------------------------------------------
// Trigger flags
// ---------------------------------------------------------------------------

#[test]
fn test_duplicate_trigger_fails_at_registration() {
    let mut registry = Registry::new();
    registry
        .register(CommandMetadata::new("init").with_trigger_flag("init"), &[])
        .unwrap();
    registry
        .register(CommandMetadata::new("setup").with_trigger_flag("init"), &[])
        .unwrap();

    // recorded before any resolution is attempted
    assert_eq!(registry.pending_errors().len(), 1);
    let errors = registration_errors(registry.initialize());
    assert!(matches!(
        errors.as_slice(),
        [RegistrationError::DuplicateTrigger { flag, existing, incoming }]
            if flag == "init" && existing == "init" && incoming == "setup"
    ));
    assert!(!registry.is_built());
}

#[test]
fn test_trigger_flag_runs_command_with_remaining_flags() {
    let runner = Runner::default();
    let mut registry = runner.registry();
    let name = Binding::new(String::new());
    registry
        .register(
            CommandMetadata::new("init")
                .with_trigger_flag("init")
                .with_flag_set(Arc::new(
                    FlagSet::new("init").with_flag(FlagDef::string("name", name.clone())),
                )),
            &[],
        )
        .unwrap();
    registry.initialize().unwrap();

    let parsed = runner
        .parse(&registry, &tokens(&["--init", "--name", "demo"]))
        .unwrap();
    assert_eq!(parsed.path, "init");
    assert_eq!(name.get(), "demo");
}

// ---------------------------------------------------------------------------
// Flag parsing and raw-flag validation
// ---------------------------------------------------------------------------

#[test]
fn test_known_flag_bound_despite_unknown_one() {
    let count = Binding::new(0);
    let set = FlagSet::new("count").with_flag(FlagDef::int("count", count.clone()));

    let mut errors = ErrorList::new();
    let rest = set.parse(tokens(&["--count=3", "--bad"]), &mut errors);
    assert!(errors.is_empty());
    assert_eq!(count.get(), 3);
    assert_eq!(rest, tokens(&["--bad"]));

    let mut registry = Registry::new();
    let id = registry
        .register(CommandMetadata::new("run").with_flag_set(Arc::new(set)), &[])
        .unwrap();
    registry.initialize().unwrap();
    assert_eq!(
        registry.unknown_flags(id, &tokens(&["--count=3", "--bad"])),
        tokens(&["--bad"])
    );
}

#[test]
fn test_runner_reports_unknown_flag() {
    let runner = Runner::default();
    let mut registry = runner.registry();
    let count = Binding::new(0);
    registry
        .register(
            CommandMetadata::new("run").with_flag_set(Arc::new(
                FlagSet::new("run").with_flag(FlagDef::int("count", count.clone())),
            )),
            &[],
        )
        .unwrap();
    registry.initialize().unwrap();

    let err = runner
        .parse(&registry, &tokens(&["run", "--count=3", "--bad"]))
        .unwrap_err();
    assert_eq!(count.get(), 3);
    assert!(matches!(&err, CliError::UnknownFlags(flags) if flags == &tokens(&["--bad"])));
    assert!(err.shows_usage());
}

#[test]
fn test_required_flag_and_regex_are_aggregated() {
    let runner = Runner::new(RunnerConfig::default());
    let mut registry = runner.registry();
    registry
        .register(
            CommandMetadata::new("tag")
                .with_flag_set(Arc::new(
                    FlagSet::new("tag").with_flag(
                        FlagDef::string("version", Binding::default())
                            .with_regex(regex::Regex::new(r"^v\d+$").unwrap()),
                    ),
                ))
                .with_flag_set(Arc::new(
                    FlagSet::new("auth")
                        .with_flag(FlagDef::string("token", Binding::default()).required()),
                )),
            &[],
        )
        .unwrap();
    registry.initialize().unwrap();

    let err = runner
        .parse(&registry, &tokens(&["tag", "--version=1.0"]))
        .unwrap_err();
    assert_eq!(err.phase(), Phase::Parsing);
    let CliError::Parse(errors) = err else {
        panic!("expected parse errors");
    };
    assert_eq!(errors.len(), 2);
}

// ---------------------------------------------------------------------------
// Argument assignment
// ---------------------------------------------------------------------------

#[test]
fn test_too_few_arguments_fails_immediately() {
    let runner = Runner::default();
    let mut registry = runner.registry();
    registry
        .register(
            CommandMetadata::new("cp")
                .with_arg(ArgDef::required("src", Binding::default()))
                .with_arg(ArgDef::required("dst", Binding::default())),
            &[],
        )
        .unwrap();
    registry.initialize().unwrap();

    let err = runner.parse(&registry, &tokens(&["cp", "a"])).unwrap_err();
    let CliError::Args(errors) = err else {
        panic!("expected argument errors");
    };
    assert_eq!(
        errors.into_vec(),
        vec![ArgError::TooFew {
            expected: 2,
            got: 1
        }]
    );
}

#[test]
fn test_optional_arguments_take_defaults() {
    let runner = Runner::default();
    let mut registry = runner.registry();
    let src = Binding::new(String::new());
    let dst = Binding::new(String::new());
    registry
        .register(
            CommandMetadata::new("cp")
                .with_arg(ArgDef::required("src", src.clone()))
                .with_arg(ArgDef::optional("dst", dst.clone()).with_default(".")),
            &[],
        )
        .unwrap();
    registry.initialize().unwrap();

    let parsed = runner.parse(&registry, &tokens(&["cp", "notes.txt"])).unwrap();
    assert_eq!(parsed.args, tokens(&["notes.txt"]));
    assert_eq!(src.get(), "notes.txt");
    assert_eq!(dst.get(), ".");
}
