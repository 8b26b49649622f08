//! ObjectStore trait definition
//!
//! This trait defines the key/value interface every storage backend exposes.
//! It allows commands to be decoupled from the specific backend in use.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;

/// Trait for durable key/value blob storage
///
/// Implemented by the S3 adapter, the local filesystem store and the
/// concurrency limiter, and can be mocked for testing.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch the object stored under `key`
    ///
    /// Returns `Error::NotFound` if no such object exists.
    async fn get(&self, key: &str) -> Result<Vec<u8>>;

    /// Store `data` under `key`, replacing any previous object
    async fn put(&self, key: &str, data: Vec<u8>) -> Result<()>;

    /// Maximum number of operations this store lets run at once
    ///
    /// `None` means the store imposes no limit of its own.
    fn concurrency_limit(&self) -> Option<usize>;
}

#[async_trait]
impl<T: ObjectStore + ?Sized> ObjectStore for Arc<T> {
    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        (**self).get(key).await
    }

    async fn put(&self, key: &str, data: Vec<u8>) -> Result<()> {
        (**self).put(key, data).await
    }

    fn concurrency_limit(&self) -> Option<usize> {
        (**self).concurrency_limit()
    }
}
