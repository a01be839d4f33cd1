//! Toolchain abstraction for POSIX-style compiler installations.
//!
//! A toolchain is a coherent set of C compiler, C++ compiler, linker and
//! strip executables living in one install directory. Executable names are
//! built as `{target_prefix-}{base_name}{-version_suffix}`, so
//! `arm-linux` + `gcc` + `13` resolves to `arm-linux-gcc-13`.
//!
//! Resolution validates all four executables up front and fails on the
//! first one missing.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::util::errors::BuildError;
use crate::util::fs::{check_dir, check_file};

mod detect;
mod gnu;
mod llvm;

pub use detect::{detect_install_dir, find_install_dir};
pub use gnu::GnuToolchain;
pub use llvm::LlvmToolchain;

/// Name of the conventional binary subdirectory of an install root.
pub const BIN_DIR_NAME: &str = "bin";

/// Vendor lineage of a toolchain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolchainKind {
    Gnu,
    Llvm,
}

impl ToolchainKind {
    /// Base executable names for this lineage.
    pub fn base_names(&self) -> BaseNames {
        match self {
            ToolchainKind::Gnu => BaseNames {
                cc: "gcc",
                cxx: "g++",
                ld: "ld",
                strip: "strip",
            },
            ToolchainKind::Llvm => BaseNames {
                cc: "clang",
                cxx: "clang++",
                ld: "ld.lld",
                strip: "llvm-strip",
            },
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolchainKind::Gnu => "gnu",
            ToolchainKind::Llvm => "llvm",
        }
    }
}

impl fmt::Display for ToolchainKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolchainKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gnu" | "gcc" => Ok(ToolchainKind::Gnu),
            "llvm" | "clang" => Ok(ToolchainKind::Llvm),
            _ => Err(format!(
                "unknown toolchain '{}'; expected 'gnu' or 'llvm'",
                s
            )),
        }
    }
}

/// Base names of the four executables a toolchain provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BaseNames {
    pub cc: &'static str,
    pub cxx: &'static str,
    pub ld: &'static str,
    pub strip: &'static str,
}

/// Naming convention applied to every base name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExeNaming {
    /// Cross-compilation prefix, e.g. `aarch64-linux-gnu`
    pub target_prefix: Option<String>,
    /// Version suffix, e.g. `13`
    pub version_suffix: Option<String>,
}

impl ExeNaming {
    pub fn new(target_prefix: Option<String>, version_suffix: Option<String>) -> Self {
        // Empty strings behave exactly like unset segments.
        ExeNaming {
            target_prefix: target_prefix.filter(|p| !p.is_empty()),
            version_suffix: version_suffix.filter(|s| !s.is_empty()),
        }
    }

    /// Build the executable file name for `base`.
    pub fn exe_name(&self, base: &str) -> String {
        let mut name = String::new();
        if let Some(ref prefix) = self.target_prefix {
            name.push_str(prefix);
            name.push('-');
        }
        name.push_str(base);
        if let Some(ref suffix) = self.version_suffix {
            name.push('-');
            name.push_str(suffix);
        }
        name
    }
}

/// Accessors every toolchain variant exposes.
pub trait Toolchain: fmt::Debug {
    /// Vendor lineage.
    fn kind(&self) -> ToolchainKind;

    /// Absolute install root.
    fn root_dir(&self) -> &Path;

    /// C compiler.
    fn cc(&self) -> &Path;

    /// C++ compiler.
    fn cxx(&self) -> &Path;

    /// Linker.
    fn ld(&self) -> &Path;

    /// Strip utility.
    fn strip(&self) -> &Path;

    fn target_prefix(&self) -> Option<&str>;

    fn version_suffix(&self) -> Option<&str>;
}

/// Resolved executables shared by all toolchain variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolchainPaths {
    kind: ToolchainKind,
    root_dir: PathBuf,
    naming: ExeNaming,
    cc: PathBuf,
    cxx: PathBuf,
    ld: PathBuf,
    strip: PathBuf,
}

impl ToolchainPaths {
    /// Locate and validate the four executables of `kind` under `root_dir`.
    ///
    /// With `bin_dir_name` set, executables are looked up in
    /// `root_dir/<bin_dir_name>`; otherwise directly in `root_dir`.
    pub fn resolve(
        kind: ToolchainKind,
        root_dir: &Path,
        bin_dir_name: Option<&str>,
        naming: ExeNaming,
    ) -> Result<Self, BuildError> {
        check_dir(root_dir)?;

        let root_dir = std::path::absolute(root_dir)?;
        let exe_dir = match bin_dir_name {
            Some(name) if !name.is_empty() => root_dir.join(name),
            _ => root_dir.clone(),
        };

        let names = kind.base_names();
        let cc = exe_dir.join(naming.exe_name(names.cc));
        let cxx = exe_dir.join(naming.exe_name(names.cxx));
        let ld = exe_dir.join(naming.exe_name(names.ld));
        let strip = exe_dir.join(naming.exe_name(names.strip));

        for exe in [&cc, &cxx, &ld, &strip] {
            check_file(exe).map_err(|e| match e {
                BuildError::NotFound { path, .. } => BuildError::not_found(
                    format!("{} toolchain executable", kind),
                    path,
                ),
                other => other,
            })?;
        }

        tracing::debug!(
            "resolved {} toolchain in {}: cc={}, cxx={}",
            kind,
            exe_dir.display(),
            cc.display(),
            cxx.display()
        );

        Ok(ToolchainPaths {
            kind,
            root_dir,
            naming,
            cc,
            cxx,
            ld,
            strip,
        })
    }
}

impl Toolchain for ToolchainPaths {
    fn kind(&self) -> ToolchainKind {
        self.kind
    }

    fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    fn cc(&self) -> &Path {
        &self.cc
    }

    fn cxx(&self) -> &Path {
        &self.cxx
    }

    fn ld(&self) -> &Path {
        &self.ld
    }

    fn strip(&self) -> &Path {
        &self.strip
    }

    fn target_prefix(&self) -> Option<&str> {
        self.naming.target_prefix.as_deref()
    }

    fn version_suffix(&self) -> Option<&str> {
        self.naming.version_suffix.as_deref()
    }
}

/// Resolve a toolchain of `kind` rooted at `root_dir`, using its `bin`
/// subdirectory.
pub fn resolve_toolchain(
    kind: ToolchainKind,
    root_dir: &Path,
    target_prefix: Option<&str>,
    version_suffix: Option<&str>,
) -> Result<Box<dyn Toolchain>, BuildError> {
    let naming = ExeNaming::new(
        target_prefix.map(str::to_string),
        version_suffix.map(str::to_string),
    );
    resolve_toolchain_in(kind, root_dir, Some(BIN_DIR_NAME), naming)
}

/// Resolve a toolchain with an explicit binary subdirectory.
pub fn resolve_toolchain_in(
    kind: ToolchainKind,
    root_dir: &Path,
    bin_dir_name: Option<&str>,
    naming: ExeNaming,
) -> Result<Box<dyn Toolchain>, BuildError> {
    let toolchain: Box<dyn Toolchain> = match kind {
        ToolchainKind::Gnu => Box::new(GnuToolchain::new(root_dir, bin_dir_name, naming)?),
        ToolchainKind::Llvm => Box::new(LlvmToolchain::new(root_dir, bin_dir_name, naming)?),
    };
    Ok(toolchain)
}
