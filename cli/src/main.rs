use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use cmdtree_core::{CliError, Phase, Registry, Runner, RunnerConfig, Verbosity, collect_examples};
use cmdtree_manifest::{Captured, Manifest, load_config};
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// CLI-specific output format enum with clap argument parsing support.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum CliOutputFormat {
    Json,
    Yaml,
}

#[derive(Debug, Parser)]
#[command(name = "cmdtree")]
#[command(about = "Check command-tree manifests and resolve invocations against them")]
struct Cli {
    /// Log resolution steps to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,
    /// Output format for structured results.
    #[arg(long, global = true, default_value = "json")]
    format: CliOutputFormat,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Validate a manifest and list every dotted command path.
    Check(CheckArgs),
    /// Resolve an invocation and report the bound command, flags and args.
    Resolve(ResolveArgs),
    /// Print the generated help examples for a manifest.
    Examples(ExamplesArgs),
}

#[derive(Debug, Args)]
struct CheckArgs {
    /// Manifest file (.yaml, .yml or .json).
    manifest: PathBuf,
}

#[derive(Debug, Args)]
struct ResolveArgs {
    /// Manifest file (.yaml, .yml or .json).
    manifest: PathBuf,
    /// Runner configuration YAML.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Invocation tokens, given after `--`.
    #[arg(last = true, allow_hyphen_values = true)]
    tokens: Vec<String>,
}

#[derive(Debug, Args)]
struct ExamplesArgs {
    /// Manifest file (.yaml, .yml or .json).
    manifest: PathBuf,
    /// Executable name used in the examples.
    #[arg(long, default_value = "app")]
    exe: String,
}

#[derive(Debug, Serialize)]
struct PathRow {
    path: String,
    name: String,
    hidden: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    delegate: Option<String>,
}

#[derive(Debug, Serialize)]
struct OptionsReport {
    verbosity: Verbosity,
    quiet: bool,
    timeout_secs: u64,
    dry_run: bool,
    force: bool,
}

#[derive(Debug, Serialize)]
struct ResolveReport {
    path: String,
    positional: Vec<String>,
    args: serde_json::Value,
    flags: serde_json::Value,
    options: OptionsReport,
}

#[derive(Debug, Serialize)]
struct ErrorReport {
    phase: &'static str,
    errors: Vec<String>,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Command::Check(args) => run_check(args, cli.format),
        Command::Resolve(args) => run_resolve(args, cli.format),
        Command::Examples(args) => run_examples(args, cli.format),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    if let Err(err) = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
    {
        eprintln!("warning: logging disabled: {err}");
    }
}

fn emit<T: Serialize>(value: &T, format: CliOutputFormat) -> Result<(), String> {
    let raw = match format {
        CliOutputFormat::Json => serde_json::to_string_pretty(value)
            .map_err(|err| format!("Failed to serialize output: {err}"))?,
        CliOutputFormat::Yaml => serde_yaml::to_string(value)
            .map_err(|err| format!("Failed to serialize output: {err}"))?,
    };
    println!("{}", raw.trim_end());
    Ok(())
}

fn load_manifest(path: &Path) -> Result<Manifest, String> {
    Manifest::load(path).map_err(|err| format!("Failed to load '{}': {err}", path.display()))
}

/// Loads the manifest into a runner registry and builds the tree.
///
/// Registration failures are reported in `format` before returning.
fn build_registry(
    manifest: &Manifest,
    runner: &Runner,
    format: CliOutputFormat,
) -> Result<(Registry, Captured), String> {
    let mut registry = runner.registry();
    let captured = manifest
        .register_into(&mut registry)
        .map_err(|err| format!("Invalid manifest: {err}"))?;
    registry
        .initialize()
        .map_err(|err| report_failure(&err, format))?;
    debug!(commands = registry.len(), "Loaded manifest registry");
    Ok((registry, captured))
}

fn phase_name(phase: Phase) -> &'static str {
    match phase {
        Phase::Registration => "registration",
        Phase::Resolution => "resolution",
        Phase::Parsing => "parsing",
        Phase::Arguments => "arguments",
        Phase::UnknownFlags => "unknown-flags",
        Phase::Execution => "execution",
    }
}

fn error_items(err: &CliError) -> Vec<String> {
    match err {
        CliError::Registration(errors) => errors.iter().map(ToString::to_string).collect(),
        CliError::Parse(errors) => errors.iter().map(ToString::to_string).collect(),
        CliError::Args(errors) => errors.iter().map(ToString::to_string).collect(),
        CliError::UnknownFlags(flags) => flags.iter().map(|f| format!("unknown flag: {f}")).collect(),
        CliError::Resolution(_) | CliError::Execution { .. } => vec![err.to_string()],
    }
}

/// Emits the phase and its errors, returning the message for stderr.
fn report_failure(err: &CliError, format: CliOutputFormat) -> String {
    let phase = phase_name(err.phase());
    let report = ErrorReport {
        phase,
        errors: error_items(err),
    };
    match emit(&report, format) {
        Ok(()) => format!("{phase} phase failed"),
        Err(emit_err) => emit_err,
    }
}

fn run_check(args: CheckArgs, format: CliOutputFormat) -> Result<(), String> {
    let manifest = load_manifest(&args.manifest)?;
    let runner = Runner::default();
    let (registry, _) = build_registry(&manifest, &runner, format)?;

    let rows: Vec<PathRow> = registry
        .command_paths()
        .filter_map(|(path, id)| {
            let meta = registry.metadata(id)?;
            Some(PathRow {
                path: path.to_string(),
                name: meta.name.clone(),
                hidden: meta.hidden,
                delegate: registry
                    .delegate(id)
                    .and_then(|d| registry.metadata(d))
                    .map(|d| d.name.clone()),
            })
        })
        .collect();
    emit(&rows, format)
}

fn run_resolve(args: ResolveArgs, format: CliOutputFormat) -> Result<(), String> {
    let manifest = load_manifest(&args.manifest)?;
    let config = match &args.config {
        Some(path) => load_config(path)
            .map_err(|err| format!("Failed to load config '{}': {err}", path.display()))?,
        None => RunnerConfig::default(),
    };

    let runner = Runner::new(config);
    let (registry, captured) = build_registry(&manifest, &runner, format)?;
    let parsed = runner
        .parse(&registry, &args.tokens)
        .map_err(|err| report_failure(&err, format))?;

    let values = captured.values(parsed.id);
    let options = runner.options();
    emit(
        &ResolveReport {
            path: parsed.path.clone(),
            positional: parsed.args.clone(),
            args: values["args"].clone(),
            flags: values["flags"].clone(),
            options: OptionsReport {
                verbosity: options.verbosity(),
                quiet: options.quiet(),
                timeout_secs: options.timeout().as_secs(),
                dry_run: options.dry_run(),
                force: options.force(),
            },
        },
        format,
    )
}

fn run_examples(args: ExamplesArgs, format: CliOutputFormat) -> Result<(), String> {
    let manifest = load_manifest(&args.manifest)?;
    let runner = Runner::default();
    let (registry, _) = build_registry(&manifest, &runner, format)?;
    emit(&collect_examples(&registry, &args.exe), format)
}
