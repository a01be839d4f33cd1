//! High-level operations.
//!
//! This module contains the implementation of the llvm-build driver.

pub mod llvm_build;
pub mod package;

pub use llvm_build::{
    assemble_builder, assemble_defines, assemble_toolchain, build, drive, BuildOptions,
};
pub use package::{archive_path, package, PackageOptions};
