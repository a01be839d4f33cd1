//! Core data structures for llvm-build.
//!
//! This module holds the project configuration model loaded from YAML.

pub mod config;

pub use config::{
    BuildToolConfig, BuildToolKind, CompilerOptionConfig, OptionMap, Overrides, ProjectConfig,
    ToolchainConfig,
};
