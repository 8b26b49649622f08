//! llama CLI library
//!
//! This module exports the CLI components for use in integration tests.

pub mod commands;
pub mod exit_code;
pub mod logging;
pub mod output;
pub mod runtime;
