//! Shared utilities

pub mod errors;
pub mod fs;
pub mod logging;
pub mod process;

pub use errors::BuildError;
