//! llama-core: Core library for the llama CLI
//!
//! This crate provides the SDK-independent pieces of llama, including:
//! - Configuration file management and runtime configuration resolution
//! - Store location parsing
//! - ObjectStore trait, a local filesystem backend and a concurrency limiter
//!
//! This crate is designed to be independent of any specific cloud SDK,
//! allowing for easy testing with substitute stores.

pub mod config;
pub mod error;
pub mod limit;
pub mod local;
pub mod location;
pub mod resolve;
pub mod traits;

pub use config::{Config, ConfigManager};
pub use error::{Error, Result};
pub use limit::{limit_concurrency, LimitedStore};
pub use local::LocalStore;
pub use location::StoreLocation;
pub use resolve::{resolve, Overrides, RuntimeConfig};
pub use traits::ObjectStore;
