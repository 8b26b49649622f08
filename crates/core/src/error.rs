//! Error types for llama-core
//!
//! Provides a unified error type that can be converted to appropriate exit codes.

use thiserror::Error;

/// Result type alias for llama-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for llama-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file or resolution error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid object key or store path
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Store location uses a scheme with no backend
    #[error("Unsupported store scheme: {0}")]
    UnsupportedScheme(String),

    /// Cloud session could not be established
    #[error("Session error: {0}")]
    Session(String),

    /// The runtime context was read before it was attached
    #[error("Runtime context has not been attached")]
    RuntimeNotAttached,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// URL parsing error
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Authentication error
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Object not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Network error (retryable)
    #[error("Network error: {0}")]
    Network(String),

    /// General error
    #[error("{0}")]
    General(String),
}

impl Error {
    /// Get the appropriate exit code for this error
    pub const fn exit_code(&self) -> i32 {
        match self {
            Error::InvalidPath(_) => 2, // UsageError
            Error::Config(_) => 2,      // UsageError
            Error::Network(_) => 3,     // NetworkError
            Error::Auth(_) => 4,        // AuthError
            Error::NotFound(_) => 5,    // NotFound
            _ => 1,                     // GeneralError
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_exit_codes() {
        assert_eq!(Error::InvalidPath("test".into()).exit_code(), 2);
        assert_eq!(Error::Config("test".into()).exit_code(), 2);
        assert_eq!(Error::Network("test".into()).exit_code(), 3);
        assert_eq!(Error::Auth("test".into()).exit_code(), 4);
        assert_eq!(Error::NotFound("test".into()).exit_code(), 5);
        assert_eq!(Error::UnsupportedScheme("gs".into()).exit_code(), 1);
        assert_eq!(Error::RuntimeNotAttached.exit_code(), 1);
        assert_eq!(Error::General("test".into()).exit_code(), 1);
    }

    #[test]
    fn test_error_display() {
        let err = Error::UnsupportedScheme("gs".into());
        assert_eq!(err.to_string(), "Unsupported store scheme: gs");

        let err = Error::RuntimeNotAttached;
        assert_eq!(err.to_string(), "Runtime context has not been attached");
    }
}
