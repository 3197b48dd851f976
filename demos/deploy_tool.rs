//! Programmatic command tree example.
//!
//! Builds a small deployment tool by hand: a `help` command, a `deploy`
//! command with its own flags and a required target, a `db` group that
//! delegates to `db migrate`, and an `init` command reachable through the
//! `--init` trigger flag.
//!
//! # Usage
//!
//! ```bash
//! # Run a scripted set of invocations
//! cargo run -p cmdtree-demos --example deploy_tool
//!
//! # Or pass your own
//! cargo run -p cmdtree-demos --example deploy_tool -- deploy prod -e staging --dry-run
//! RUST_LOG=debug cargo run -p cmdtree-demos --example deploy_tool -- db 3
//! ```

use std::sync::Arc;

use cmdtree_core::{
    ArgDef, Binding, CancelFlag, Command, CommandMetadata, Example, FlagDef, FlagSet, Registry,
    RunContext, Runner, RunnerConfig, SharedWriter, collect_examples,
};
use regex::Regex;
use tracing_subscriber::EnvFilter;

/// Prints the generated examples, or the usage of one command.
struct Help {
    meta: CommandMetadata,
    lines: Binding<Vec<String>>,
    ctx: Option<RunContext>,
}

impl Command for Help {
    fn metadata(&self) -> &CommandMetadata {
        &self.meta
    }

    fn set_context(&mut self, ctx: RunContext) {
        self.ctx = Some(ctx);
    }

    fn execute(&self) -> Result<(), cmdtree_core::ExecError> {
        let Some(ctx) = &self.ctx else {
            return Err("help executed without context".into());
        };
        if !ctx.args.is_empty() {
            ctx.writer
                .write_line(&format!("help for: {}", ctx.args.join(" ")))?;
        }
        for line in self.lines.get() {
            ctx.writer.write_line(&line)?;
        }
        Ok(())
    }
}

struct Deploy {
    meta: CommandMetadata,
    env: Binding<String>,
    target: Binding<String>,
    ctx: Option<RunContext>,
}

impl Command for Deploy {
    fn metadata(&self) -> &CommandMetadata {
        &self.meta
    }

    fn set_context(&mut self, ctx: RunContext) {
        self.ctx = Some(ctx);
    }

    fn execute(&self) -> Result<(), cmdtree_core::ExecError> {
        let Some(ctx) = &self.ctx else {
            return Err("deploy executed without context".into());
        };
        if ctx.cancel.is_cancelled() {
            return Err("deploy cancelled".into());
        }
        let mode = if ctx.options.dry_run() { " (dry run)" } else { "" };
        ctx.writer.write_line(&format!(
            "deploying {} to {}{mode}",
            self.target.get(),
            self.env.get()
        ))?;
        Ok(())
    }
}

struct Migrate {
    meta: CommandMetadata,
    steps: Binding<i32>,
    version: Binding<String>,
    ctx: Option<RunContext>,
}

impl Command for Migrate {
    fn metadata(&self) -> &CommandMetadata {
        &self.meta
    }

    fn set_context(&mut self, ctx: RunContext) {
        self.ctx = Some(ctx);
    }

    fn execute(&self) -> Result<(), cmdtree_core::ExecError> {
        let Some(ctx) = &self.ctx else {
            return Err("migrate executed without context".into());
        };
        ctx.writer.write_line(&format!(
            "[{}] migrating to {} in {} step(s)",
            ctx.path,
            self.version.get(),
            self.steps.get()
        ))?;
        Ok(())
    }
}

struct Init {
    meta: CommandMetadata,
}

impl Command for Init {
    fn metadata(&self) -> &CommandMetadata {
        &self.meta
    }

    fn execute(&self) -> Result<(), cmdtree_core::ExecError> {
        println!("initialized a new project");
        Ok(())
    }
}

fn build(runner: &Runner, help_lines: Binding<Vec<String>>) -> Registry {
    let mut registry = runner.registry();

    let help = Help {
        meta: CommandMetadata::new("help")
            .with_usage("help [command]")
            .with_description("Show help")
            .without_examples(),
        lines: help_lines,
        ctx: None,
    };
    registry.register(help, &[]).unwrap();

    let env = Binding::new(String::new());
    let target = Binding::new(String::new());
    let deploy_flags = Arc::new(
        FlagSet::new("deploy").with_flag(
            FlagDef::string("env", env.clone())
                .with_shortcut('e')
                .with_default("production")
                .with_regex(Regex::new("^(production|staging)$").unwrap())
                .with_usage("Target environment"),
        ),
    );
    let deploy = Deploy {
        meta: CommandMetadata::new("deploy")
            .with_usage("deploy [flags] <target>")
            .with_description("Deploy a build")
            .with_order(1)
            .with_flag_set(deploy_flags)
            .with_arg(ArgDef::required("target", target.clone()).with_example("web")),
        env,
        target,
        ctx: None,
    };
    registry.register(deploy, &[]).unwrap();

    let db = registry
        .register(
            CommandMetadata::new("db")
                .with_description("Database maintenance")
                .with_order(2)
                .with_example(Example::new("Run pending migrations", "demo db")),
            &[],
        )
        .unwrap();

    let steps = Binding::new(0);
    let version = Binding::new(String::new());
    let migrate = Migrate {
        meta: CommandMetadata::new("migrate")
            .with_usage("migrate [--steps N] [version]")
            .with_flag_set(Arc::new(FlagSet::new("migrate").with_flag(
                FlagDef::int("steps", steps.clone()).with_default(1).with_example("2"),
            )))
            .with_arg(ArgDef::optional("version", version.clone()).with_default("latest")),
        steps,
        version,
        ctx: None,
    };
    let migrate = registry.register(migrate, &[db]).unwrap();
    registry.set_delegate(db, migrate).unwrap();

    let init = Init {
        meta: CommandMetadata::new("init")
            .with_description("Create a new project")
            .with_trigger_flag("init"),
    };
    registry.register(init, &[]).unwrap();

    registry
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let runner = Runner::new(RunnerConfig::default());
    let help_lines = Binding::new(Vec::new());
    let mut registry = build(&runner, help_lines.clone());

    if let Err(err) = registry.initialize() {
        eprintln!("invalid command tree: {err}");
        std::process::exit(1);
    }

    help_lines.set(
        collect_examples(&registry, "demo")
            .into_iter()
            .map(|e| format!("  {:<40} # {}", e.cmd, e.descr))
            .collect(),
    );

    let user_args: Vec<String> = std::env::args().skip(1).collect();
    let invocations: Vec<Vec<String>> = if user_args.is_empty() {
        [
            vec![],
            vec!["deploy", "web", "-e", "staging", "--dry-run"],
            vec!["db", "v7", "--steps=3"],
            vec!["db", "migrate"],
            vec!["--init"],
            vec!["deploy", "web", "--env", "qa"],
            vec!["deploy", "web", "--colour"],
        ]
        .into_iter()
        .map(|tokens| tokens.into_iter().map(String::from).collect())
        .collect()
    } else {
        vec![user_args]
    };

    for tokens in invocations {
        println!("$ demo {}", tokens.join(" "));
        let ctx = RunContext::new(
            runner.options().clone(),
            SharedWriter::stdout(),
            CancelFlag::new(),
        );
        match runner.dispatch(&mut registry, &tokens, ctx) {
            Ok(parsed) => tracing::debug!(path = %parsed.path, "done"),
            Err(err) => println!("error: {err}"),
        }
        println!();
    }
}
