//! llvm-build - configuration-driven CMake builds for LLVM
//!
//! This crate provides toolchain resolution, compiler flag and CMake define
//! composition, and a phased CMake driver with optional timing.

pub mod builder;
pub mod core;
pub mod ops;
pub mod util;

pub use builder::{
    cmake::CMakeBuilder, timed::TimedBuilder, toolchain::Toolchain, BuildPhase, Builder,
};
pub use core::config::ProjectConfig;
pub use util::errors::BuildError;
