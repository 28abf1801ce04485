//! Error model, configuration, and path resolution for the docs toolchain.
//!
//! This crate is the foundation depended on by all other toolchain crates.
//! It provides:
//! - [`ToolchainError`], the unified error type
//! - Configuration ([`ToolchainConfig`], config loading) and content path resolution

pub mod config;
pub mod error;
pub mod paths;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    CONFIG_ENV_VAR, CONFIG_FILE_NAME, ToolchainConfig, config_dir, load_config, load_config_from,
    resolve_config_path,
};
pub use error::{Result, ToolchainError};
pub use paths::{content_path, content_path_with};
