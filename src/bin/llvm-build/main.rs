//! llvm-build CLI - configuration-driven CMake builds of LLVM projects

use anyhow::{Context, Result};
use clap::Parser;

use llvm_build::core::config::ProjectConfig;
use llvm_build::ops::{self, BuildOptions, PackageOptions};
use llvm_build::util::logging;

mod cli;

use cli::Cli;

fn main() {
    if let Err(e) = run() {
        tracing::error!("{:#}", e);
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    logging::init(&cli.log_options())?;

    let cwd = std::env::current_dir().context("failed to read the current directory")?;
    let config = ProjectConfig::load(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?
        .with_overrides(&cli.overrides(), &cwd);

    let opts = BuildOptions {
        install: !cli.no_install,
        package: cli.package,
        package_options: PackageOptions {
            filter: cli.package_filter.clone(),
            ..PackageOptions::default()
        },
    };

    ops::build(&config, &opts)
}
