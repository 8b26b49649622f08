//! S3 object store implementation
//!
//! Wraps aws-sdk-s3 and implements the ObjectStore trait from llama-core.

use async_trait::async_trait;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::ByteStream;

use llama_core::{Error, ObjectStore, Result};

use crate::session::Session;
use crate::wire::WireLogger;

/// Error codes that mean the caller's credentials were refused
const AUTH_ERROR_CODES: &[&str] = &[
    "AccessDenied",
    "InvalidAccessKeyId",
    "SignatureDoesNotMatch",
    "ExpiredToken",
];

/// Object store over a bucket and key prefix in S3
pub struct S3Store {
    inner: aws_sdk_s3::Client,
    bucket: String,
    prefix: String,
}

impl S3Store {
    /// Create a store for `bucket`/`prefix` from the shared session
    pub fn from_session(session: &Session, bucket: &str, prefix: &str) -> Result<Self> {
        if session.region().is_none() {
            return Err(Error::Config(
                "no AWS region configured: pass --region or set one with `llama config --region`"
                    .into(),
            ));
        }

        let mut builder = aws_sdk_s3::config::Builder::from(session.sdk_config());
        if session.debug_requests() {
            builder = builder.interceptor(WireLogger);
        }
        let client = aws_sdk_s3::Client::from_conf(builder.build());

        tracing::debug!(bucket, prefix, region = session.region(), "created S3 store");
        Ok(Self {
            inner: client,
            bucket: bucket.to_string(),
            prefix: prefix.trim_matches('/').to_string(),
        })
    }

    /// Bucket this store reads and writes
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Full S3 key for a store key
    pub fn object_key(&self, key: &str) -> String {
        let key = key.trim_start_matches('/');
        if self.prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}/{}", self.prefix, key)
        }
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let response = self
            .inner
            .get_object()
            .bucket(&self.bucket)
            .key(self.object_key(key))
            .send()
            .await
            .map_err(|e| match e.as_service_error() {
                Some(err) if err.is_no_such_key() => Error::NotFound(key.to_string()),
                _ => classify(e),
            })?;

        let data = response
            .body
            .collect()
            .await
            .map_err(|e| Error::Network(e.to_string()))?
            .into_bytes()
            .to_vec();

        Ok(data)
    }

    async fn put(&self, key: &str, data: Vec<u8>) -> Result<()> {
        self.inner
            .put_object()
            .bucket(&self.bucket)
            .key(self.object_key(key))
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(classify)?;

        Ok(())
    }

    fn concurrency_limit(&self) -> Option<usize> {
        None
    }
}

/// Map an SDK failure onto the llama error kinds
fn classify<E, R>(err: SdkError<E, R>) -> Error
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    match err.code() {
        Some(code) if AUTH_ERROR_CODES.contains(&code) => {
            Error::Auth(DisplayErrorContext(&err).to_string())
        }
        _ => Error::Network(DisplayErrorContext(&err).to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_config::{BehaviorVersion, Region, SdkConfig};

    fn session(region: Option<&str>) -> Session {
        let config = SdkConfig::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(region.map(|r| Region::new(r.to_string())))
            .build();
        Session::from_sdk_config(config, false)
    }

    #[test]
    fn test_object_key_with_prefix() {
        let store = S3Store::from_session(&session(Some("us-east-1")), "bucket", "/llama/").unwrap();
        assert_eq!(store.object_key("abc"), "llama/abc");
        assert_eq!(store.object_key("/abc"), "llama/abc");
        assert_eq!(store.bucket(), "bucket");
    }

    #[test]
    fn test_object_key_without_prefix() {
        let store = S3Store::from_session(&session(Some("us-east-1")), "bucket", "").unwrap();
        assert_eq!(store.object_key("a/b"), "a/b");
        assert_eq!(store.concurrency_limit(), None);
    }

    #[test]
    fn test_requires_region() {
        let result = S3Store::from_session(&session(None), "bucket", "");
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
