//! Object store construction
//!
//! Chooses a backend from the store location's scheme and applies the
//! configured concurrency bound.

use std::sync::Arc;

use llama_core::{limit_concurrency, LocalStore, ObjectStore, Result, StoreLocation};

use crate::client::S3Store;
use crate::session::Session;

/// Build the process's object store
///
/// `concurrency` bounds in-flight operations; zero or less leaves the
/// backend unwrapped.
pub fn open_store(session: &Session, location: &str, concurrency: i64) -> Result<Arc<dyn ObjectStore>> {
    let location = StoreLocation::parse(location)?;
    let store: Arc<dyn ObjectStore> = match &location {
        StoreLocation::S3 { bucket, prefix } => {
            Arc::new(S3Store::from_session(session, bucket, prefix)?)
        }
        StoreLocation::Local(root) => Arc::new(LocalStore::open(root.clone())?),
    };

    tracing::info!(%location, concurrency, "object store ready");
    Ok(limit_concurrency(store, concurrency))
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_config::{BehaviorVersion, Region, SdkConfig};
    use llama_core::Error;
    use tempfile::TempDir;

    fn session() -> Session {
        let config = SdkConfig::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("us-west-2"))
            .build();
        Session::from_sdk_config(config, false)
    }

    fn file_uri(dir: &TempDir) -> String {
        format!("file://{}", dir.path().join("store").display())
    }

    #[test]
    fn test_non_positive_concurrency_is_unwrapped() {
        let dir = TempDir::new().unwrap();
        for concurrency in [0, -5] {
            let store = open_store(&session(), &file_uri(&dir), concurrency).unwrap();
            assert_eq!(store.concurrency_limit(), None);
        }
    }

    #[test]
    fn test_positive_concurrency_is_limited() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&session(), &file_uri(&dir), 4).unwrap();
        assert_eq!(store.concurrency_limit(), Some(4));
    }

    #[test]
    fn test_s3_location() {
        let store = open_store(&session(), "s3://bucket/llama", 8).unwrap();
        assert_eq!(store.concurrency_limit(), Some(8));
    }

    #[test]
    fn test_unsupported_scheme() {
        let result = open_store(&session(), "gs://bucket/path", 8);
        assert!(matches!(result, Err(Error::UnsupportedScheme(_))));
    }

    #[tokio::test]
    async fn test_local_store_round_trip_through_limiter() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&session(), &file_uri(&dir), 2).unwrap();

        store.put("inputs/a", b"hello".to_vec()).await.unwrap();
        assert_eq!(store.get("inputs/a").await.unwrap(), b"hello");
        assert!(matches!(store.get("inputs/b").await, Err(Error::NotFound(_))));
    }
}
