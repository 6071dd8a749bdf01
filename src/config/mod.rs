//! Configuration loading and parsing.
//!
//! This module provides YAML-based configuration for the service.

mod error;
mod yaml;

pub use error::ConfigError;
pub use yaml::{
    AppRules, RuleOverrides, ServerConfig, ServiceConfig, StorageConfig, ValidationRules,
    YamlLoader,
};
