//! GNU toolchain (gcc, g++, ld, strip).

use std::path::Path;

use crate::util::errors::BuildError;

use super::{find_install_dir, ExeNaming, Toolchain, ToolchainKind, ToolchainPaths};

/// GNU toolchain installation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GnuToolchain {
    paths: ToolchainPaths,
}

impl GnuToolchain {
    /// Resolve a GNU toolchain under `root_dir`.
    pub fn new(
        root_dir: &Path,
        bin_dir_name: Option<&str>,
        naming: ExeNaming,
    ) -> Result<Self, BuildError> {
        let paths = ToolchainPaths::resolve(ToolchainKind::Gnu, root_dir, bin_dir_name, naming)?;
        Ok(GnuToolchain { paths })
    }

    /// Resolve the GNU toolchain that `exe_path` (typically `gcc`) belongs to.
    pub fn from_exe(exe_path: &Path, naming: ExeNaming) -> Result<Self, BuildError> {
        let (root_dir, bin_dir_name) = find_install_dir(exe_path)?;
        Self::new(&root_dir, bin_dir_name.as_deref(), naming)
    }
}

impl Toolchain for GnuToolchain {
    fn kind(&self) -> ToolchainKind {
        ToolchainKind::Gnu
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

#[cfg(test)]
mod tests {
    use super::super::testing::fake_toolchain;
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_gnu_from_exe() {
        let tmp = TempDir::new().unwrap();
        let bin = tmp.path().join("bin");
        let naming = ExeNaming::new(Some("aarch64-linux-gnu".into()), None);
        fake_toolchain(&bin, ToolchainKind::Gnu, &naming);

        let tc = GnuToolchain::from_exe(&bin.join("aarch64-linux-gnu-gcc"), naming).unwrap();

        assert_eq!(tc.root_dir(), tmp.path());
        assert_eq!(tc.cxx(), bin.join("aarch64-linux-gnu-g++"));
        assert_eq!(tc.ld(), bin.join("aarch64-linux-gnu-ld"));
    }

    #[test]
    fn test_gnu_rejects_llvm_tree() {
        let tmp = TempDir::new().unwrap();
        fake_toolchain(&tmp.path().join("bin"), ToolchainKind::Llvm, &ExeNaming::default());

        let err = GnuToolchain::new(tmp.path(), Some("bin"), ExeNaming::default()).unwrap_err();
        assert!(matches!(err, BuildError::NotFound { .. }));
    }
}
