//! get command - Fetch objects from the object store
//!
//! A single key is written to stdout. Several keys are fetched concurrently
//! into an output directory, one file per key.

use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use clap::{ArgMatches, Args, FromArgMatches};
use futures::future::join_all;

use llama_core::ObjectStore;

use super::Command;
use crate::exit_code::ExitCode;
use crate::output::{Formatter, ProgressBar};
use crate::runtime::Context;

/// Fetch objects from the object store
#[derive(Args, Debug)]
pub struct GetArgs {
    /// Keys to fetch
    #[arg(required = true, value_name = "KEY")]
    pub keys: Vec<String>,

    /// Directory to write objects into (default: stdout, single key only)
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,
}

pub struct GetCommand;

#[async_trait]
impl Command for GetCommand {
    fn name(&self) -> &'static str {
        "get"
    }

    fn synopsis(&self) -> &'static str {
        "Fetch objects from the object store"
    }

    fn configure(&self, cmd: clap::Command) -> clap::Command {
        GetArgs::augment_args(cmd)
    }

    async fn execute(&self, ctx: &Context, args: &ArgMatches) -> ExitCode {
        let formatter = Formatter::new(ctx.output().clone());

        let args = match GetArgs::from_arg_matches(args) {
            Ok(args) => args,
            Err(e) => {
                formatter.error(&e.to_string());
                return ExitCode::UsageError;
            }
        };

        let Some(output_dir) = args.output else {
            if args.keys.len() > 1 {
                formatter.error("Fetching more than one key requires --output");
                return ExitCode::UsageError;
            }
            return match ctx.runtime() {
                Ok(runtime) => to_stdout(runtime.store().as_ref(), &args.keys[0], &formatter).await,
                Err(e) => {
                    formatter.error(&e.to_string());
                    ExitCode::for_error(&e)
                }
            };
        };

        let mut targets = Vec::with_capacity(args.keys.len());
        for key in &args.keys {
            match output_path(&output_dir, key) {
                Some(path) => targets.push((key.as_str(), path)),
                None => {
                    formatter.error(&format!("Key '{key}' cannot be written under the output directory"));
                    return ExitCode::UsageError;
                }
            }
        }

        let runtime = match ctx.runtime() {
            Ok(runtime) => runtime,
            Err(e) => {
                formatter.error(&e.to_string());
                return ExitCode::for_error(&e);
            }
        };
        let store: &dyn ObjectStore = runtime.store().as_ref();

        let progress = ProgressBar::new(ctx.output(), targets.len() as u64, "fetching");
        let results = join_all(targets.iter().map(|(key, path)| {
            let progress = &progress;
            async move {
                let result = fetch(store, key, path).await;
                progress.inc();
                result
            }
        }))
        .await;
        progress.finish_and_clear();

        let mut exit_code = ExitCode::Success;
        for ((key, path), result) in targets.iter().zip(results) {
            match result {
                Ok(size) => formatter.success(&format!(
                    "{key} -> {} ({})",
                    path.display(),
                    humansize::format_size(size, humansize::BINARY)
                )),
                Err(e) => {
                    formatter.error(&format!("Failed to get {key}: {e}"));
                    if exit_code == ExitCode::Success {
                        exit_code = ExitCode::for_error(&e);
                    }
                }
            }
        }
        exit_code
    }
}

async fn to_stdout(store: &dyn ObjectStore, key: &str, formatter: &Formatter) -> ExitCode {
    match store.get(key).await {
        Ok(data) => {
            // Write directly to stdout (not through formatter to preserve binary data)
            let mut stdout = io::stdout().lock();
            if let Err(e) = stdout.write_all(&data).and_then(|()| stdout.flush()) {
                formatter.error(&format!("Failed to write to stdout: {e}"));
                return ExitCode::GeneralError;
            }
            ExitCode::Success
        }
        Err(e) => {
            formatter.error(&format!("Failed to get {key}: {e}"));
            ExitCode::for_error(&e)
        }
    }
}

async fn fetch(store: &dyn ObjectStore, key: &str, path: &Path) -> llama_core::Result<u64> {
    let data = store.get(key).await?;
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, &data).await?;
    Ok(data.len() as u64)
}

/// Where a key lands under the output directory, if it stays inside it
fn output_path(dir: &Path, key: &str) -> Option<PathBuf> {
    let relative = Path::new(key.trim_start_matches('/'));
    let inside = relative.components().next().is_some()
        && relative
            .components()
            .all(|component| matches!(component, Component::Normal(_)));
    inside.then(|| dir.join(relative))
}

#[cfg(test)]
mod tests {
    use super::*;
    use llama_core::{Error, LocalStore};
    use tempfile::TempDir;

    #[test]
    fn test_output_path() {
        let dir = Path::new("/out");
        assert_eq!(output_path(dir, "a/b.txt"), Some(PathBuf::from("/out/a/b.txt")));
        assert_eq!(output_path(dir, "/a"), Some(PathBuf::from("/out/a")));
        assert_eq!(output_path(dir, "../escape"), None);
        assert_eq!(output_path(dir, ""), None);
    }

    #[tokio::test]
    async fn test_fetch_writes_nested_file() {
        let dir = TempDir::new().unwrap();
        let store = LocalStore::open(dir.path().join("store")).unwrap();
        store.put("jobs/out.bin", vec![1, 2, 3]).await.unwrap();

        let target = dir.path().join("out").join("jobs/out.bin");
        let size = fetch(&store, "jobs/out.bin", &target).await.unwrap();

        assert_eq!(size, 3);
        assert_eq!(std::fs::read(&target).unwrap(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_fetch_missing_key_creates_nothing() {
        let dir = TempDir::new().unwrap();
        let store = LocalStore::open(dir.path().join("store")).unwrap();

        let target = dir.path().join("out").join("missing");
        let result = fetch(&store, "missing", &target).await;

        assert!(matches!(result, Err(Error::NotFound(_))));
        assert!(!target.exists());
    }

    #[tokio::test]
    async fn test_to_stdout_missing_key_is_not_found() {
        let dir = TempDir::new().unwrap();
        let store = LocalStore::open(dir.path()).unwrap();

        let code = to_stdout(&store, "missing", &Formatter::default()).await;
        assert_eq!(code, ExitCode::NotFound);
    }
}
