//! llama-s3: AWS adapter for the llama CLI
//!
//! This crate provides the AWS session, the S3 implementation of the
//! ObjectStore trait, and the store factory. It is the only crate that
//! directly depends on the AWS SDK.

pub mod client;
pub mod factory;
pub mod session;
mod wire;

pub use client::S3Store;
pub use factory::open_store;
pub use session::Session;
