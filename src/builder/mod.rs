//! Toolchain resolution, CMake define assembly and the CMake driver.

pub mod cmake;
pub mod compiler;
pub mod defines;
pub mod timed;
pub mod toolchain;

use crate::util::errors::BuildError;

pub use cmake::{BuildState, BuildStepOptions, CMakeBuilder, CMakeGenerator, InstallStepOptions};
pub use compiler::{CompilerOption, CompilerOptionAggregate, CompilerOptions};
pub use defines::{
    BuildTypeDefineProvider, CMakeBuildType, CompilerOptionDefineProvider, CustomDefineProvider,
    DefineAggregate, DefineProvider, Defines, ToolchainDefineProvider,
};
pub use timed::TimedBuilder;
pub use toolchain::{resolve_toolchain, Toolchain, ToolchainKind};

/// The three phases every builder runs, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuildPhase {
    Configure,
    Build,
    Install,
}

impl BuildPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildPhase::Configure => "configure",
            BuildPhase::Build => "build",
            BuildPhase::Install => "install",
        }
    }

    /// Human-readable name used in timing messages.
    pub fn description(&self) -> &'static str {
        match self {
            BuildPhase::Configure => "Configuration",
            BuildPhase::Build => "Building",
            BuildPhase::Install => "Installation",
        }
    }
}

/// A project build driven in three sequential phases.
pub trait Builder {
    fn configure(&mut self) -> Result<(), BuildError>;

    fn build(&mut self) -> Result<(), BuildError>;

    fn install(&mut self) -> Result<(), BuildError>;
}
