//! CLI command definitions and dispatch
//!
//! Global flags are parsed by [`Cli`]. Everything after the first positional
//! argument belongs to a command: the [`Dispatcher`] looks the name up in its
//! registry, parses the command's own flags, and runs it with the shared
//! [`Context`].

use std::env::VarError;
use std::path::PathBuf;

use async_trait::async_trait;
use clap::{ArgMatches, Parser};

use llama_core::resolve::{DEFAULT_STORE_CONCURRENCY, STORE_ENV};
use llama_core::{resolve, ConfigManager, Error, Overrides, Result};

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};
use crate::runtime::{bootstrap, Context};

mod config;
mod get;
mod store;

/// llama - run work on remote compute, sharing data through an object store
///
/// Global flags go before the command name.
#[derive(Parser, Debug)]
#[command(name = "llama")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// AWS region for commands (overrides the config file)
    #[arg(long)]
    pub region: Option<String>,

    /// Object store location: s3://BUCKET/PATH or file:///PATH
    #[arg(long, value_name = "URI")]
    pub store: Option<String>,

    /// Log all AWS requests and responses
    #[arg(long)]
    pub debug_aws: bool,

    /// Write an execution trace to this file
    #[arg(long, value_name = "PATH")]
    pub trace: Option<PathBuf>,

    /// Maximum concurrent object store operations (0 or less: unlimited)
    #[arg(
        long = "s3-concurrency",
        value_name = "N",
        default_value_t = DEFAULT_STORE_CONCURRENCY,
        allow_negative_numbers = true
    )]
    pub s3_concurrency: i64,

    /// Output format: human-readable or JSON
    #[arg(long)]
    pub json: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Disable progress bar
    #[arg(long)]
    pub no_progress: bool,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Command to run, followed by its arguments
    #[arg(value_name = "COMMAND", trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}

impl Cli {
    pub fn output_config(&self) -> OutputConfig {
        OutputConfig {
            json: self.json,
            no_color: self.no_color,
            no_progress: self.no_progress,
            quiet: self.quiet,
        }
    }

    /// Runtime settings given on the command line
    pub fn overrides(&self) -> Overrides {
        Overrides {
            region: self.region.clone(),
            store: self.store.clone(),
            debug_provider: self.debug_aws,
            trace_output: self.trace.clone(),
            store_concurrency: Some(self.s3_concurrency),
        }
    }
}

/// A named unit of CLI behaviour
#[async_trait]
pub trait Command: Send + Sync {
    /// Name used to select the command
    fn name(&self) -> &'static str;

    /// One-line description for usage output
    fn synopsis(&self) -> &'static str;

    /// Register the command's flags and arguments
    fn configure(&self, cmd: clap::Command) -> clap::Command {
        cmd
    }

    /// Whether the session and store must be built before running
    fn requires_runtime(&self) -> bool {
        true
    }

    async fn execute(&self, ctx: &Context, args: &ArgMatches) -> ExitCode;
}

struct Registered {
    group: &'static str,
    command: Box<dyn Command>,
}

/// Outcome of matching arguments against the registry
pub enum Selection<'a> {
    /// Run this command with its parsed arguments
    Run {
        command: &'a dyn Command,
        args: ArgMatches,
    },
    /// Nothing to run; exit with this code
    Exit(ExitCode),
}

/// Registry of commands, in registration order
#[derive(Default)]
pub struct Dispatcher {
    commands: Vec<Registered>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a command under a usage group ("" for the top-level list)
    pub fn register(&mut self, command: Box<dyn Command>, group: &'static str) -> Result<()> {
        let name = command.name();
        if name == "help" || self.get(name).is_some() {
            return Err(Error::Config(format!("command '{name}' registered twice")));
        }
        self.commands.push(Registered { group, command });
        Ok(())
    }

    /// Look up a command by name
    pub fn get(&self, name: &str) -> Option<&dyn Command> {
        self.commands
            .iter()
            .find(|entry| entry.command.name() == name)
            .map(|entry| entry.command.as_ref())
    }

    /// The command list shown by `help` and on usage errors
    pub fn usage(&self) -> String {
        let mut groups: Vec<&'static str> = Vec::new();
        for entry in &self.commands {
            if !entry.group.is_empty() && !groups.contains(&entry.group) {
                groups.push(entry.group);
            }
        }

        let mut usage = String::from("Commands:\n");
        usage.push_str(&format!("  {:<10}{}\n", "help", "Describe commands and their flags"));
        self.push_group(&mut usage, "");
        for group in groups {
            usage.push_str(&format!("\nCommands for {group}:\n"));
            self.push_group(&mut usage, group);
        }
        usage
    }

    fn push_group(&self, usage: &mut String, group: &str) {
        let mut entries: Vec<&Registered> = self
            .commands
            .iter()
            .filter(|entry| entry.group == group)
            .collect();
        entries.sort_by_key(|entry| entry.command.name());
        for entry in entries {
            usage.push_str(&format!(
                "  {:<10}{}\n",
                entry.command.name(),
                entry.command.synopsis()
            ));
        }
    }

    fn clap_command(&self, command: &dyn Command) -> clap::Command {
        command.configure(
            clap::Command::new(command.name())
                .bin_name(format!("llama {}", command.name()))
                .about(command.synopsis()),
        )
    }

    /// Pick the command named by the first argument and parse its flags
    pub fn select(&self, args: &[String], formatter: &Formatter) -> Selection<'_> {
        let Some((name, rest)) = args.split_first() else {
            formatter.error("no command given");
            eprint!("\n{}", self.usage());
            return Selection::Exit(ExitCode::UsageError);
        };

        if name == "help" {
            return Selection::Exit(self.help(rest, formatter));
        }

        let Some(command) = self.get(name) else {
            formatter.error(&format!("unknown command '{name}'"));
            eprint!("\n{}", self.usage());
            return Selection::Exit(ExitCode::UsageError);
        };

        match self.clap_command(command).try_get_matches_from(args) {
            Ok(matches) => Selection::Run {
                command,
                args: matches,
            },
            Err(e) => {
                let _ = e.print();
                if e.use_stderr() {
                    Selection::Exit(ExitCode::UsageError)
                } else {
                    Selection::Exit(ExitCode::Success)
                }
            }
        }
    }

    fn help(&self, topics: &[String], formatter: &Formatter) -> ExitCode {
        let Some(topic) = topics.first() else {
            print!("{}", self.usage());
            return ExitCode::Success;
        };
        match self.get(topic) {
            Some(command) => {
                println!("{}", self.clap_command(command).render_help());
                ExitCode::Success
            }
            None => {
                formatter.error(&format!("no help for unknown command '{topic}'"));
                ExitCode::UsageError
            }
        }
    }
}

/// Build the command registry
pub fn registry() -> Result<Dispatcher> {
    let mut dispatcher = Dispatcher::new();
    dispatcher.register(Box::new(config::ConfigCommand), "")?;
    dispatcher.register(Box::new(store::StoreCommand), "internals")?;
    dispatcher.register(Box::new(get::GetCommand), "internals")?;
    Ok(dispatcher)
}

/// Select the command, build the runtime if it needs one, and run it
///
/// Returns the command's own exit code, or the code for a usage or fatal
/// initialization error.
pub async fn execute(cli: Cli, dispatcher: &Dispatcher) -> ExitCode {
    let formatter = Formatter::new(cli.output_config());

    let (command, args) = match dispatcher.select(&cli.command, &formatter) {
        Selection::Run { command, args } => (command, args),
        Selection::Exit(code) => return code,
    };

    let ctx = Context::new(cli.output_config());
    if command.requires_runtime() {
        if let Err(e) = init_runtime(&cli, &ctx).await {
            tracing::error!(error = %e, "initialization failed");
            formatter.error(&e.to_string());
            return ExitCode::GeneralError;
        }
    }

    tracing::info!(command = command.name(), "running command");
    let code = command.execute(&ctx, &args).await;
    tracing::info!(command = command.name(), exit_code = %code, "command finished");
    code
}

async fn init_runtime(cli: &Cli, ctx: &Context) -> Result<()> {
    let file = ConfigManager::new()?.load()?;
    let env_store = env_store(std::env::var(STORE_ENV))?;
    let config = resolve(&file, env_store.as_deref(), cli.overrides())?;
    ctx.attach(bootstrap(&config).await?)
}

/// The store environment variable's value; unset is `None`, non-UTF-8 is an error
fn env_store(value: std::result::Result<String, VarError>) -> Result<Option<String>> {
    match value {
        Ok(store) => Ok(Some(store)),
        Err(VarError::NotPresent) => Ok(None),
        Err(VarError::NotUnicode(_)) => Err(Error::Config(format!(
            "{STORE_ENV} is not valid UTF-8"
        ))),
    }
}
