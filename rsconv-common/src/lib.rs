//! # rsconv Common Library
//!
//! Shared code for the rsconv tools including:
//! - Error and Result types
//! - Configuration loading (TOML bootstrap + environment overrides)
//! - Logging initialization

pub mod config;
pub mod error;
pub mod logging;

pub use config::{LoggingConfig, PatchConfig, TomlConfig};
pub use error::{Error, Result};
