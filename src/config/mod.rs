//! Configuration module for the SMAA pipeline
//!
//! Provides the raw settings surface, its clamping resolver, and discovery of
//! `smaa.toml` files.

pub mod loader;
pub mod schema;

pub use loader::{
    find_config, find_config_from, load_config, merge_cli_overrides, CliOverrides, ConfigError,
};
pub use schema::*;
