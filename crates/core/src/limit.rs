//! Concurrency limiting decorator for object stores
//!
//! [`LimitedStore`] wraps any [`ObjectStore`] and admits at most N operations
//! into the wrapped store at once. Waiting callers are admitted in FIFO order,
//! so no caller starves. Results and errors pass through unchanged.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Semaphore, SemaphorePermit};

use crate::error::{Error, Result};
use crate::traits::ObjectStore;

/// An object store with a ceiling on in-flight operations
#[derive(Debug)]
pub struct LimitedStore<S> {
    inner: S,
    permits: Semaphore,
    limit: usize,
}

impl<S: ObjectStore> LimitedStore<S> {
    /// Wrap `inner`, allowing at most `limit` concurrent operations
    ///
    /// `limit` is raised to 1 and capped at [`Semaphore::MAX_PERMITS`].
    pub fn new(inner: S, limit: usize) -> Self {
        let limit = limit.clamp(1, Semaphore::MAX_PERMITS);
        Self {
            inner,
            permits: Semaphore::new(limit),
            limit,
        }
    }

    /// Number of operations that could start right now without waiting
    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }

    // The permit is released on drop: after the inner call returns, errors,
    // panics, or when the calling future is cancelled.
    async fn acquire(&self) -> Result<SemaphorePermit<'_>> {
        self.permits
            .acquire()
            .await
            .map_err(|_| Error::General("object store limiter closed".into()))
    }
}

#[async_trait]
impl<S: ObjectStore> ObjectStore for LimitedStore<S> {
    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let _permit = self.acquire().await?;
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, data: Vec<u8>) -> Result<()> {
        let _permit = self.acquire().await?;
        self.inner.put(key, data).await
    }

    fn concurrency_limit(&self) -> Option<usize> {
        Some(self.limit)
    }
}

/// Apply a concurrency bound to a shared store
///
/// A bound of zero or less returns `store` untouched.
pub fn limit_concurrency(store: Arc<dyn ObjectStore>, limit: i64) -> Arc<dyn ObjectStore> {
    match usize::try_from(limit) {
        Ok(limit) if limit > 0 => {
            tracing::debug!(limit, "limiting object store concurrency");
            Arc::new(LimitedStore::new(store, limit))
        }
        _ => store,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use futures::future::join_all;
    use mockall::mock;

    mock! {
        Store {}

        #[async_trait]
        impl ObjectStore for Store {
            async fn get(&self, key: &str) -> Result<Vec<u8>>;
            async fn put(&self, key: &str, data: Vec<u8>) -> Result<()>;
            fn concurrency_limit(&self) -> Option<usize>;
        }
    }

    /// Records how many calls are inside the store at once
    #[derive(Default)]
    struct TrackingStore {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        completed: AtomicUsize,
    }

    impl TrackingStore {
        async fn enter(&self) {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.completed.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl ObjectStore for TrackingStore {
        async fn get(&self, key: &str) -> Result<Vec<u8>> {
            self.enter().await;
            Ok(key.as_bytes().to_vec())
        }

        async fn put(&self, _key: &str, _data: Vec<u8>) -> Result<()> {
            self.enter().await;
            Ok(())
        }

        fn concurrency_limit(&self) -> Option<usize> {
            None
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_never_exceeds_limit_and_all_complete() {
        let tracker = Arc::new(TrackingStore::default());
        let store = LimitedStore::new(Arc::clone(&tracker), 4);

        let keys: Vec<String> = (0..10).map(|i| format!("k{i}")).collect();
        let results = join_all(keys.iter().map(|key| store.put(key, vec![0; 16]))).await;

        assert!(results.iter().all(|r| r.is_ok()));
        assert_eq!(tracker.completed.load(Ordering::SeqCst), 10);
        assert!(tracker.peak.load(Ordering::SeqCst) <= 4);
        assert_eq!(store.available_permits(), 4);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_many_spawned_callers_share_one_limiter() {
        let tracker = Arc::new(TrackingStore::default());
        let store: Arc<dyn ObjectStore> = Arc::clone(&tracker) as Arc<dyn ObjectStore>;
        let store = limit_concurrency(store, 3);

        let tasks: Vec<_> = (0..64)
            .map(|i| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.get(&format!("k{i}")).await })
            })
            .collect();
        for task in join_all(tasks).await {
            assert!(task.unwrap().is_ok());
        }

        assert_eq!(tracker.completed.load(Ordering::SeqCst), 64);
        assert!(tracker.peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn test_errors_forwarded_and_permits_released() {
        let mut inner = MockStore::new();
        inner
            .expect_get()
            .times(10)
            .returning(|key| Err(Error::NotFound(key.to_string())));
        inner
            .expect_put()
            .times(1)
            .returning(|_, _| Err(Error::Network("connection reset".into())));
        let store = LimitedStore::new(inner, 2);

        let results = join_all((0..10).map(|i| store.get(if i % 2 == 0 { "even" } else { "odd" }))).await;
        for (i, result) in results.into_iter().enumerate() {
            let expected = if i % 2 == 0 { "even" } else { "odd" };
            match result {
                Err(Error::NotFound(key)) => assert_eq!(key, expected),
                other => panic!("expected NotFound, got {other:?}"),
            }
        }

        match store.put("k", Vec::new()).await {
            Err(Error::Network(msg)) => assert_eq!(msg, "connection reset"),
            other => panic!("expected Network, got {other:?}"),
        }
        assert_eq!(store.available_permits(), 2);
    }

    #[tokio::test]
    async fn test_cancelled_call_releases_permit() {
        let tracker = Arc::new(TrackingStore::default());
        let store = LimitedStore::new(Arc::clone(&tracker), 1);

        let cancelled = tokio::time::timeout(Duration::from_millis(1), store.get("slow")).await;
        assert!(cancelled.is_err());
        assert_eq!(store.available_permits(), 1);

        assert_eq!(store.get("next").await.unwrap(), b"next");
    }

    #[tokio::test]
    async fn test_forwards_successful_results() {
        let mut inner = MockStore::new();
        inner
            .expect_get()
            .withf(|key| key == "obj")
            .returning(|_| Ok(b"contents".to_vec()));
        inner
            .expect_put()
            .withf(|key, data| key == "obj" && data == b"contents")
            .returning(|_, _| Ok(()));
        let store = LimitedStore::new(inner, 1);

        store.put("obj", b"contents".to_vec()).await.unwrap();
        assert_eq!(store.get("obj").await.unwrap(), b"contents");
    }

    #[test]
    fn test_non_positive_limit_returns_store_unwrapped() {
        for limit in [0, -1, i64::MIN] {
            let store: Arc<dyn ObjectStore> = Arc::new(TrackingStore::default());
            let returned = limit_concurrency(Arc::clone(&store), limit);
            assert!(Arc::ptr_eq(&store, &returned), "limit {limit}");
            assert_eq!(returned.concurrency_limit(), None);
        }
    }

    #[test]
    fn test_positive_limit_wraps_store() {
        let store: Arc<dyn ObjectStore> = Arc::new(TrackingStore::default());
        let returned = limit_concurrency(store, 8);
        assert_eq!(returned.concurrency_limit(), Some(8));
    }
}
