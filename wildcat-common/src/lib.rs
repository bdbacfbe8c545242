//! # Wildcat Common Library
//!
//! Shared code for the wildcat decoder crates:
//! - Configuration loading (TOML file, environment, command line)
//! - Common error type
//! - Frame/duration arithmetic shared by buffer sizing and the CLI

pub mod config;
pub mod error;
pub mod time;

pub use config::DecoderConfig;
pub use error::{Error, Result};
