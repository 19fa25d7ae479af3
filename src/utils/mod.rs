//! Configuration utilities.

/// TOML configuration (`ares.toml`) loading and validation.
pub mod toml_config;
