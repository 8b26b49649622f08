//! Local filesystem object store
//!
//! Stores each object as a file under a root directory. Used for `file://`
//! store locations, for development without cloud credentials and in tests.

use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::traits::ObjectStore;

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Object store backed by a local directory
#[derive(Debug)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    /// Open a store rooted at `root`, creating the directory if needed
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        tracing::debug!(root = %root.display(), "opened local object store");
        Ok(Self { root })
    }

    /// Root directory of the store
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a key to a path inside the root, rejecting keys that escape it
    fn object_path(&self, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key);
        let valid = !key.is_empty()
            && relative
                .components()
                .all(|component| matches!(component, Component::Normal(_)));
        if !valid {
            return Err(Error::InvalidPath(format!("invalid object key '{key}'")));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ObjectStore for LocalStore {
    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let path = self.object_path(key)?;
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::NotFound(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn put(&self, key: &str, data: Vec<u8>) -> Result<()> {
        let path = self.object_path(key)?;
        let parent = path.parent().unwrap_or(&self.root);
        tokio::fs::create_dir_all(parent).await?;

        // Write beside the target and rename so readers never see a partial object.
        let temp = parent.join(format!(
            ".tmp-{}-{}",
            std::process::id(),
            TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        tokio::fs::write(&temp, &data).await?;
        if let Err(e) = tokio::fs::rename(&temp, &path).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(e.into());
        }

        tracing::trace!(key, bytes = data.len(), "stored object");
        Ok(())
    }

    fn concurrency_limit(&self) -> Option<usize> {
        None
    }
}
