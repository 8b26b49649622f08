//! Store location parsing
//!
//! A store location is a URI whose scheme selects the backend:
//! `s3://BUCKET/PREFIX` for S3 and `file:///ABSOLUTE/PATH` for a local directory.

use std::fmt;
use std::path::PathBuf;

use url::Url;

use crate::error::{Error, Result};

/// A parsed object store location
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    /// Objects under `prefix` in an S3 bucket
    S3 { bucket: String, prefix: String },
    /// Objects under a local directory
    Local(PathBuf),
}

impl StoreLocation {
    /// Parse a store location URI
    pub fn parse(uri: &str) -> Result<Self> {
        let uri = uri.trim();
        if uri.is_empty() {
            return Err(Error::Config("store location cannot be empty".into()));
        }

        let url = Url::parse(uri)?;
        match url.scheme() {
            "s3" => {
                let bucket = url.host_str().unwrap_or_default();
                if bucket.is_empty() {
                    return Err(Error::InvalidPath(format!(
                        "'{uri}': expected s3://BUCKET/PATH"
                    )));
                }
                let prefix = urlencoding::decode(url.path()).map_err(|e| {
                    Error::InvalidPath(format!("'{uri}': prefix is not valid UTF-8: {e}"))
                })?;
                Ok(Self::S3 {
                    bucket: bucket.to_string(),
                    prefix: prefix.trim_matches('/').to_string(),
                })
            }
            "file" => url
                .to_file_path()
                .map(Self::Local)
                .map_err(|()| Error::InvalidPath(format!("'{uri}': expected file:///PATH"))),
            other => Err(Error::UnsupportedScheme(other.to_string())),
        }
    }
}

impl fmt::Display for StoreLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::S3 { bucket, prefix } if prefix.is_empty() => write!(f, "s3://{bucket}"),
            Self::S3 { bucket, prefix } => write!(f, "s3://{bucket}/{prefix}"),
            Self::Local(path) => write!(f, "file://{}", path.display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_s3_with_prefix() {
        let location = StoreLocation::parse("s3://my-bucket/llama/objects/").unwrap();
        assert_eq!(
            location,
            StoreLocation::S3 {
                bucket: "my-bucket".into(),
                prefix: "llama/objects".into(),
            }
        );
        assert_eq!(location.to_string(), "s3://my-bucket/llama/objects");
    }

    #[test]
    fn test_parse_s3_bucket_only() {
        let location = StoreLocation::parse("s3://my-bucket").unwrap();
        assert_eq!(
            location,
            StoreLocation::S3 {
                bucket: "my-bucket".into(),
                prefix: String::new(),
            }
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_parse_file() {
        let location = StoreLocation::parse("file:///var/lib/llama").unwrap();
        assert_eq!(location, StoreLocation::Local(PathBuf::from("/var/lib/llama")));
    }

    #[test]
    fn test_parse_s3_prefix_is_decoded() {
        let location = StoreLocation::parse("s3://bucket/my jobs/naïve").unwrap();
        assert_eq!(
            location,
            StoreLocation::S3 {
                bucket: "bucket".into(),
                prefix: "my jobs/naïve".into(),
            }
        );

        let location = StoreLocation::parse("s3://bucket/my%20jobs/na%C3%AFve/").unwrap();
        assert_eq!(
            location,
            StoreLocation::S3 {
                bucket: "bucket".into(),
                prefix: "my jobs/naïve".into(),
            }
        );
    }

    #[test]
    fn test_parse_s3_prefix_invalid_utf8() {
        assert!(matches!(
            StoreLocation::parse("s3://bucket/bad%FF"),
            Err(Error::InvalidPath(_))
        ));
    }

    #[test]
    fn test_parse_s3_without_bucket() {
        assert!(matches!(
            StoreLocation::parse("s3:///path"),
            Err(Error::InvalidPath(_))
        ));
    }

    #[test]
    fn test_parse_unsupported_scheme() {
        match StoreLocation::parse("gs://bucket/path") {
            Err(Error::UnsupportedScheme(scheme)) => assert_eq!(scheme, "gs"),
            other => panic!("expected unsupported scheme, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_malformed() {
        assert!(matches!(
            StoreLocation::parse("not a uri"),
            Err(Error::InvalidUrl(_))
        ));
        assert!(matches!(StoreLocation::parse(""), Err(Error::Config(_))));
    }
}
