//! CLI definitions using clap.

use std::path::PathBuf;

use clap::Parser;

use llvm_build::core::config::Overrides;
use llvm_build::util::logging::LogOptions;

/// Configure, build, install and package an LLVM project with CMake
#[derive(Parser)]
#[command(name = "llvm-build")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Project configuration file (YAML)
    #[arg(short, long)]
    pub config: PathBuf,

    /// Override the source directory
    #[arg(long)]
    pub src_dir: Option<PathBuf>,

    /// Override the build directory
    #[arg(long)]
    pub build_dir: Option<PathBuf>,

    /// Override the install directory
    #[arg(long)]
    pub install_dir: Option<PathBuf>,

    /// Override the toolchain install directory
    #[arg(long)]
    pub toolchain_install_dir: Option<PathBuf>,

    /// Also write logs to this file
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Suppress terminal log output
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Skip the install phase
    #[arg(long, conflicts_with = "package")]
    pub no_install: bool,

    /// Archive the install directory after installing
    #[arg(long)]
    pub package: bool,

    /// Compression filter passed to tar when packaging
    #[arg(long, env = "LLVM_BUILD_PACKAGE_FILTER", default_value = llvm_build::ops::package::DEFAULT_FILTER)]
    pub package_filter: String,
}

impl Cli {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            src_dir: self.src_dir.clone(),
            build_dir: self.build_dir.clone(),
            install_dir: self.install_dir.clone(),
            toolchain_install_dir: self.toolchain_install_dir.clone(),
        }
    }

    pub fn log_options(&self) -> LogOptions {
        LogOptions {
            verbose: self.verbose,
            quiet: self.quiet,
            log_file: self.log_file.clone(),
        }
    }
}
