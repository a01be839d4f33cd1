//! LLVM toolchain (clang, clang++, ld.lld, llvm-strip).

use std::path::Path;

use crate::util::errors::BuildError;

use super::{find_install_dir, ExeNaming, Toolchain, ToolchainKind, ToolchainPaths};

/// LLVM toolchain installation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlvmToolchain {
    paths: ToolchainPaths,
}

impl LlvmToolchain {
    /// Resolve an LLVM toolchain under `root_dir`.
    pub fn new(
        root_dir: &Path,
        bin_dir_name: Option<&str>,
        naming: ExeNaming,
    ) -> Result<Self, BuildError> {
        let paths = ToolchainPaths::resolve(ToolchainKind::Llvm, root_dir, bin_dir_name, naming)?;
        Ok(LlvmToolchain { paths })
    }

    /// Resolve the LLVM toolchain that `exe_path` (typically `clang`) belongs to.
    pub fn from_exe(exe_path: &Path, naming: ExeNaming) -> Result<Self, BuildError> {
        let (root_dir, bin_dir_name) = find_install_dir(exe_path)?;
        Self::new(&root_dir, bin_dir_name.as_deref(), naming)
    }
}

impl Toolchain for LlvmToolchain {
    fn kind(&self) -> ToolchainKind {
        ToolchainKind::Llvm
    }

    fn root_dir(&self) -> &Path {
        self.paths.root_dir()
    }

    fn cc(&self) -> &Path {
        self.paths.cc()
    }

    fn cxx(&self) -> &Path {
        self.paths.cxx()
    }

    fn ld(&self) -> &Path {
        self.paths.ld()
    }

    fn strip(&self) -> &Path {
        self.paths.strip()
    }

    fn target_prefix(&self) -> Option<&str> {
        self.paths.target_prefix()
    }

    fn version_suffix(&self) -> Option<&str> {
        self.paths.version_suffix()
    }
}
