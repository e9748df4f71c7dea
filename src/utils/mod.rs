//! Configuration utilities.

/// TOML configuration, credential resolution and the config manager.
pub mod toml_config;
