//! store command - Upload local files to the object store
//!
//! Uploads run as a pipeline no wider than the store's concurrency limit, so a
//! file is only read into memory once its upload can proceed.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use clap::{ArgMatches, Args, FromArgMatches};
use futures::stream::{self, StreamExt};
use serde::Serialize;

use llama_core::{ObjectStore, Result};

use super::Command;
use crate::exit_code::ExitCode;
use crate::output::{Formatter, ProgressBar};
use crate::runtime::Context;

/// Upload files to the object store
#[derive(Args, Debug)]
pub struct StoreArgs {
    /// Files to upload
    #[arg(required = true, value_name = "FILE")]
    pub files: Vec<PathBuf>,

    /// Key prefix for the uploaded objects
    #[arg(long, default_value = "")]
    pub prefix: String,
}

#[derive(Debug, Serialize)]
struct StoredObject {
    key: String,
    size_bytes: u64,
    size_human: String,
}

#[derive(Debug, Serialize)]
struct StoreOutput {
    objects: Vec<StoredObject>,
}

impl fmt::Display for StoreOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, object) in self.objects.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{} ({})", object.key, object.size_human)?;
        }
        Ok(())
    }
}

pub struct StoreCommand;

#[async_trait]
impl Command for StoreCommand {
    fn name(&self) -> &'static str {
        "store"
    }

    fn synopsis(&self) -> &'static str {
        "Upload local files to the object store"
    }

    fn configure(&self, cmd: clap::Command) -> clap::Command {
        StoreArgs::augment_args(cmd)
    }

    async fn execute(&self, ctx: &Context, args: &ArgMatches) -> ExitCode {
        let formatter = Formatter::new(ctx.output().clone());

        let args = match StoreArgs::from_arg_matches(args) {
            Ok(args) => args,
            Err(e) => {
                formatter.error(&e.to_string());
                return ExitCode::UsageError;
            }
        };

        let runtime = match ctx.runtime() {
            Ok(runtime) => runtime,
            Err(e) => {
                formatter.error(&e.to_string());
                return ExitCode::for_error(&e);
            }
        };

        let uploads = match plan_uploads(&args.prefix, &args.files) {
            Ok(uploads) => uploads,
            Err(message) => {
                formatter.error(&message);
                return ExitCode::UsageError;
            }
        };

        let store: &dyn ObjectStore = runtime.store().as_ref();
        let progress = ProgressBar::new(ctx.output(), uploads.len() as u64, "storing");
        let results = upload_all(store, &uploads, &progress).await;
        progress.finish_and_clear();

        let mut exit_code = ExitCode::Success;
        let mut objects = Vec::with_capacity(results.len());
        for ((file, _), result) in uploads.iter().zip(results) {
            match result {
                Ok(object) => objects.push(object),
                Err(e) => {
                    tracing::warn!(file = %file.display(), error = %e, "upload failed");
                    formatter.error(&format!("Failed to store {}: {e}", file.display()));
                    if exit_code == ExitCode::Success {
                        exit_code = ExitCode::for_error(&e);
                    }
                }
            }
        }

        if !objects.is_empty() || formatter.is_json() {
            formatter.output(&StoreOutput { objects });
        }
        exit_code
    }
}

/// Upload every file, in order, with no more reads in flight than the store admits
async fn upload_all(
    store: &dyn ObjectStore,
    uploads: &[(&Path, String)],
    progress: &ProgressBar,
) -> Vec<Result<StoredObject>> {
    let width = store.concurrency_limit().unwrap_or(uploads.len()).max(1);
    let pending: Vec<_> = uploads
        .iter()
        .map(|(file, key)| async move {
            let result = upload(store, file, key).await;
            progress.inc();
            result
        })
        .collect();
    stream::iter(pending)
        .buffered(width)
        .collect()
        .await
}

async fn upload(store: &dyn ObjectStore, file: &Path, key: &str) -> Result<StoredObject> {
    let data = tokio::fs::read(file).await?;
    let size = data.len() as u64;
    store.put(key, data).await?;
    tracing::debug!(key, size, "stored object");

    Ok(StoredObject {
        key: key.to_string(),
        size_bytes: size,
        size_human: humansize::format_size(size, humansize::BINARY),
    })
}

/// Pair each file with its object key; two files may not share a key
fn plan_uploads<'a>(
    prefix: &str,
    files: &'a [PathBuf],
) -> std::result::Result<Vec<(&'a Path, String)>, String> {
    let mut seen = HashSet::new();
    files
        .iter()
        .map(|file| {
            let key = object_key(prefix, file)?;
            if !seen.insert(key.clone()) {
                return Err(format!(
                    "'{}' maps to object key '{key}', which another file already uses",
                    file.display()
                ));
            }
            Ok((file.as_path(), key))
        })
        .collect()
}

/// Key for an uploaded file: the prefix joined with the file name
fn object_key(prefix: &str, file: &Path) -> std::result::Result<String, String> {
    let name = file
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| format!("Cannot derive an object key from '{}'", file.display()))?;

    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        Ok(name.to_string())
    } else {
        Ok(format!("{prefix}/{name}"))
    }
}
