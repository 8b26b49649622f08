//! AWS session construction
//!
//! A [`Session`] is the loaded AWS shared configuration (region, credentials
//! chain, retry defaults) plus llama's provider-level debug switch. Every S3
//! client in the process is built from the one session.

use aws_config::{BehaviorVersion, Region, SdkConfig};

use llama_core::{Error, Result};

/// Loaded AWS configuration shared by all clients
#[derive(Debug, Clone)]
pub struct Session {
    config: SdkConfig,
    debug_requests: bool,
}

impl Session {
    /// Load the AWS configuration
    ///
    /// An explicit `region` overrides the SDK's default region chain.
    /// With `debug_requests`, clients built from this session log every
    /// request and response.
    pub async fn new(region: Option<&str>, debug_requests: bool) -> Result<Self> {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = region {
            validate_region(region)?;
            loader = loader.region(Region::new(region.to_string()));
        }

        let config = loader.load().await;
        tracing::debug!(
            region = ?config.region(),
            debug_requests,
            "AWS session loaded"
        );

        Ok(Self {
            config,
            debug_requests,
        })
    }

    /// Wrap an already loaded configuration
    pub fn from_sdk_config(config: SdkConfig, debug_requests: bool) -> Self {
        Self {
            config,
            debug_requests,
        }
    }

    /// The resolved region, if any source provided one
    pub fn region(&self) -> Option<&str> {
        self.config.region().map(AsRef::as_ref)
    }

    /// Whether provider requests and responses are logged
    pub fn debug_requests(&self) -> bool {
        self.debug_requests
    }

    /// The underlying SDK configuration
    pub fn sdk_config(&self) -> &SdkConfig {
        &self.config
    }
}

fn validate_region(region: &str) -> Result<()> {
    if region.is_empty() {
        return Err(Error::Session("region cannot be empty".into()));
    }
    if !region
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-')
    {
        return Err(Error::Session(format!("invalid region '{region}'")));
    }
    Ok(())
}
