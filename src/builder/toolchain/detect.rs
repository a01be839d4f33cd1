//! Toolchain install-root detection.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use crate::util::errors::BuildError;
use crate::util::fs::check_file;
use crate::util::process::find_executable_in;

use super::{ExeNaming, ToolchainKind, BIN_DIR_NAME};

/// Split a compiler executable path into its install root and binary
/// directory name.
///
/// - `/opt/llvm/bin/clang` -> (`/opt/llvm`, `Some("bin")`)
/// - `/opt/llvm/clang` -> (`/opt/llvm`, `None`)
pub fn find_install_dir(exe_path: &Path) -> Result<(PathBuf, Option<String>), BuildError> {
    check_file(exe_path)?;

    let exe_path = std::path::absolute(exe_path)?;
    let exe_dir = exe_path
        .parent()
        .ok_or_else(|| BuildError::invalid_path(&exe_path, "executable has no parent directory"))?;

    if exe_dir.file_name().is_some_and(|name| name == BIN_DIR_NAME) {
        let root = exe_dir
            .parent()
            .ok_or_else(|| BuildError::invalid_path(exe_dir, "bin directory has no parent"))?;
        Ok((root.to_path_buf(), Some(BIN_DIR_NAME.to_string())))
    } else {
        Ok((exe_dir.to_path_buf(), None))
    }
}

/// Locate the install root of a toolchain from the compiler on `PATH`.
///
/// The GNU compiler honours the target prefix (`aarch64-linux-gnu-gcc`);
/// the LLVM lookup always uses plain `clang`. The compiler must live in a
/// `bin` directory.
pub fn detect_install_dir(kind: ToolchainKind, naming: &ExeNaming) -> Result<PathBuf, BuildError> {
    let search_path = std::env::var_os("PATH");
    detect_install_dir_in(kind, naming, search_path.as_deref())
}

/// Same as [`detect_install_dir`] with an explicit search list.
pub fn detect_install_dir_in(
    kind: ToolchainKind,
    naming: &ExeNaming,
    search_path: Option<&OsStr>,
) -> Result<PathBuf, BuildError> {
    let base = kind.base_names().cc;
    let compiler = match kind {
        ToolchainKind::Gnu => ExeNaming::new(naming.target_prefix.clone(), None).exe_name(base),
        ToolchainKind::Llvm => base.to_string(),
    };

    let found = find_executable_in(&compiler, search_path)
        .ok_or_else(|| BuildError::not_found("compiler on PATH", &compiler))?;
    let resolved = found.canonicalize()?;
    tracing::debug!("found {} at {}", compiler, resolved.display());

    match find_install_dir(&resolved)? {
        (root, Some(_)) => Ok(root),
        (_, None) => Err(BuildError::invalid_path(
            resolved,
            format!("expected {} to be located in a bin directory", compiler),
        )),
    }
}
