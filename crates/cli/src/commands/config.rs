//! config command - Show or update the persisted defaults
//!
//! Without flags the current file is shown. With `--region` or `--store` the
//! given values are written back; an empty value clears the setting.

use std::fmt;

use async_trait::async_trait;
use clap::{ArgMatches, Args, FromArgMatches};
use serde::Serialize;

use llama_core::{Config, ConfigManager, StoreLocation};

use super::Command;
use crate::exit_code::ExitCode;
use crate::output::Formatter;
use crate::runtime::Context;

/// Show or update the configuration file
#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Default AWS region ("" to clear)
    #[arg(long)]
    pub region: Option<String>,

    /// Default object store: s3://BUCKET/PATH or file:///PATH ("" to clear)
    #[arg(long, value_name = "URI")]
    pub store: Option<String>,
}

/// Configuration file contents for display
#[derive(Debug, Serialize)]
struct ConfigOutput {
    path: String,
    region: Option<String>,
    store: Option<String>,
}

impl fmt::Display for ConfigOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "path:   {}", self.path)?;
        writeln!(f, "region: {}", self.region.as_deref().unwrap_or("-"))?;
        write!(f, "store:  {}", self.store.as_deref().unwrap_or("-"))
    }
}

pub struct ConfigCommand;

#[async_trait]
impl Command for ConfigCommand {
    fn name(&self) -> &'static str {
        "config"
    }

    fn synopsis(&self) -> &'static str {
        "Show or update the default region and object store"
    }

    fn configure(&self, cmd: clap::Command) -> clap::Command {
        ConfigArgs::augment_args(cmd)
    }

    fn requires_runtime(&self) -> bool {
        false
    }

    async fn execute(&self, ctx: &Context, args: &ArgMatches) -> ExitCode {
        let formatter = Formatter::new(ctx.output().clone());

        let args = match ConfigArgs::from_arg_matches(args) {
            Ok(args) => args,
            Err(e) => {
                formatter.error(&e.to_string());
                return ExitCode::UsageError;
            }
        };

        let manager = match ConfigManager::new() {
            Ok(manager) => manager,
            Err(e) => {
                formatter.error(&e.to_string());
                return ExitCode::GeneralError;
            }
        };
        let config = match manager.load() {
            Ok(config) => config,
            Err(e) => {
                formatter.error(&format!("Failed to load {}: {e}", manager.config_path().display()));
                return ExitCode::GeneralError;
            }
        };

        if args.region.is_none() && args.store.is_none() {
            formatter.output(&ConfigOutput {
                path: manager.config_path().display().to_string(),
                region: config.region,
                store: config.store,
            });
            return ExitCode::Success;
        }

        let config = match apply(config, &args) {
            Ok(config) => config,
            Err(message) => {
                formatter.error(&message);
                return ExitCode::UsageError;
            }
        };

        if let Err(e) = manager.save(&config) {
            formatter.error(&format!("Failed to save {}: {e}", manager.config_path().display()));
            return ExitCode::GeneralError;
        }
        tracing::debug!(path = %manager.config_path().display(), "configuration saved");

        formatter.success(&format!("Configuration saved to {}", manager.config_path().display()));
        ExitCode::Success
    }
}

/// Apply the given flags to a loaded configuration
fn apply(mut config: Config, args: &ConfigArgs) -> Result<Config, String> {
    if let Some(region) = &args.region {
        let region = region.trim();
        config.region = (!region.is_empty()).then(|| region.to_string());
    }

    if let Some(store) = &args.store {
        let store = store.trim();
        if store.is_empty() {
            config.store = None;
        } else {
            StoreLocation::parse(store).map_err(|e| format!("Invalid store '{store}': {e}"))?;
            config.store = Some(store.to_string());
        }
    }

    Ok(config)
}
