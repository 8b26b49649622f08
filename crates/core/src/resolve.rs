//! Runtime configuration resolution
//!
//! Merges command-line flags, the store environment variable and the
//! persisted configuration file into one [`RuntimeConfig`]. Precedence is
//! applied per field: flag, then environment, then config file, then the
//! built-in default. Empty strings count as unset.

use std::path::PathBuf;

use crate::config::Config;
use crate::error::{Error, Result};

/// Environment variable consulted for the store location when no flag is given
pub const STORE_ENV: &str = "LLAMA_OBJECT_STORE";

/// Default bound on concurrent object store operations
pub const DEFAULT_STORE_CONCURRENCY: i64 = 8;

/// Values supplied on the command line
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub region: Option<String>,
    pub store: Option<String>,
    pub debug_provider: bool,
    pub trace_output: Option<PathBuf>,
    /// `None` selects [`DEFAULT_STORE_CONCURRENCY`]
    pub store_concurrency: Option<i64>,
}

/// The effective configuration for one process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// AWS region; `None` defers to the provider's default chain
    pub region: Option<String>,
    /// Object store location, never empty
    pub store: String,
    /// Log every provider request and response
    pub debug_provider: bool,
    pub trace_output: Option<PathBuf>,
    /// Concurrency bound for store operations; `<= 0` disables limiting
    pub store_concurrency: i64,
}

/// Resolve the runtime configuration from all sources
///
/// `env_store` is the value of [`STORE_ENV`], passed in so resolution stays
/// independent of the process environment.
pub fn resolve(file: &Config, env_store: Option<&str>, overrides: Overrides) -> Result<RuntimeConfig> {
    let region = first_set([overrides.region.as_deref(), file.region.as_deref()]);

    let store = first_set([overrides.store.as_deref(), env_store, file.store.as_deref()])
        .ok_or_else(|| {
            Error::Config(format!(
                "no object store configured: pass --store, set {STORE_ENV}, or run `llama config --store`"
            ))
        })?;

    let config = RuntimeConfig {
        region,
        store,
        debug_provider: overrides.debug_provider,
        trace_output: overrides.trace_output,
        store_concurrency: overrides
            .store_concurrency
            .unwrap_or(DEFAULT_STORE_CONCURRENCY),
    };
    tracing::debug!(?config, "resolved runtime configuration");
    Ok(config)
}

fn first_set<const N: usize>(sources: [Option<&str>; N]) -> Option<String> {
    sources
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|value| !value.is_empty())
        .map(str::to_string)
}
