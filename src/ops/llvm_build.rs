//! Implementation of a full project build: configure, build, install and
//! optionally package.

use anyhow::{Context, Result};
use tracing::Span;

use crate::builder::cmake::CMakeBuilder;
use crate::builder::defines::{
    BuildTypeDefineProvider, CompilerOptionDefineProvider, CustomDefineProvider, DefineAggregate,
    ToolchainDefineProvider,
};
use crate::builder::timed::TimedBuilder;
use crate::builder::toolchain::{
    detect_install_dir, resolve_toolchain_in, ExeNaming, Toolchain, ToolchainKind, BIN_DIR_NAME,
};
use crate::builder::Builder;
use crate::core::config::{ProjectConfig, ToolchainConfig};
use crate::ops::package::{package, PackageOptions};
use crate::util::errors::BuildError;

/// Options for a build run.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Run the install phase
    pub install: bool,

    /// Package the install directory afterwards
    pub package: bool,

    pub package_options: PackageOptions,
}

impl Default for BuildOptions {
    fn default() -> Self {
        BuildOptions {
            install: true,
            package: false,
            package_options: PackageOptions::default(),
        }
    }
}

/// Resolve the toolchain a project asks for.
///
/// Without an install directory the compiler is looked up on `PATH`.
pub fn assemble_toolchain(config: &ToolchainConfig) -> Result<Box<dyn Toolchain>, BuildError> {
    let target_prefix = match config.name {
        ToolchainKind::Gnu => Some(config.target_prefix.clone()),
        ToolchainKind::Llvm => {
            if !config.target_prefix.is_empty() {
                tracing::warn!(
                    "ignoring target prefix '{}' for the llvm toolchain",
                    config.target_prefix
                );
            }
            None
        }
    };
    let naming = ExeNaming::new(target_prefix, config.version_suffix.clone());

    let root_dir = match config.install_dir {
        Some(ref dir) => dir.clone(),
        None => detect_install_dir(config.name, &naming)?,
    };
    tracing::info!("Using {} toolchain in {}", config.name, root_dir.display());

    resolve_toolchain_in(config.name, &root_dir, Some(BIN_DIR_NAME), naming)
}

/// Register define providers in their fixed order: toolchain, compiler
/// options, build type, then custom defines.
pub fn assemble_defines(config: &ProjectConfig, toolchain: Box<dyn Toolchain>) -> DefineAggregate {
    let mut defines = DefineAggregate::new();
    defines.add_provider(ToolchainDefineProvider::new(toolchain));

    if let Some(ref option) = config.compiler_option {
        defines.add_provider(CompilerOptionDefineProvider::new(option.to_option()));
    }

    if let Some(build_type) = config.build_type {
        defines.add_provider(BuildTypeDefineProvider::new(build_type));
    }

    let custom = &config.build_tool.custom_configure_options;
    if !custom.is_empty() {
        defines.add_provider(custom.iter().collect::<CustomDefineProvider>());
    }

    defines
}

/// Build the CMake driver for a project.
pub fn assemble_builder(
    config: &ProjectConfig,
    toolchain: Box<dyn Toolchain>,
    span: Span,
) -> Result<CMakeBuilder, BuildError> {
    let tool = &config.build_tool;
    let mut builder = CMakeBuilder::new(&config.src_dir, &config.build_dir)
        .generator(tool.generator)
        .build_options(tool.build_step_options()?)
        .install_options(tool.install_step_options()?)
        .define_provider(assemble_defines(config, toolchain))
        .span(span);

    if let Some(ref cache) = tool.initial_cache {
        builder = builder.initial_cache(cache);
    }

    if let Some(ref dir) = config.install_dir {
        builder = builder.install_dir(dir);
    }

    Ok(builder)
}

/// Run configure, build and (unless disabled) install in order.
///
/// The first failing phase stops the sequence.
pub fn drive(builder: &mut impl Builder, install: bool) -> Result<(), BuildError> {
    builder.configure()?;
    builder.build()?;
    if install {
        builder.install()?;
    } else {
        tracing::info!("Skipping installation");
    }
    Ok(())
}

/// Build a project end to end.
pub fn build(config: &ProjectConfig, opts: &BuildOptions) -> Result<()> {
    let span = tracing::info_span!("project", name = %config.name);
    let _guard = span.enter();

    if !config.description.is_empty() {
        tracing::info!("{}", config.description);
    }

    let toolchain = assemble_toolchain(&config.toolchain).context("failed to resolve toolchain")?;
    let builder = assemble_builder(config, toolchain, span.clone())?;
    let mut builder = TimedBuilder::new(builder, span.clone());

    drive(&mut builder, opts.install)
        .with_context(|| format!("failed to build project `{}`", config.name))?;

    if opts.package {
        let archive = package(config, &opts.package_options).context("failed to package")?;
        tracing::info!("Created package {}", archive.display());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::defines::{DefineProvider, CMAKE_C_COMPILER, CMAKE_C_FLAGS};
    use crate::builder::toolchain::testing::fake_toolchain;
    use std::path::Path;
    use tempfile::TempDir;

    fn project(root: &Path, extra_tool: &str) -> ProjectConfig {
        let yaml = format!(
            r#"
name: llvm
srcDir: src
buildDir: build
installDir: install
compilerOption:
  cflags: ["-O2"]
buildTool:
  name: cmake
{extra_tool}
toolchain:
  name: llvm
  installDir: toolchain
"#
        );
        ProjectConfig::parse(&yaml, root).unwrap()
    }

    fn setup() -> TempDir {
        let tmp = TempDir::new().unwrap();
        fake_toolchain(
            &tmp.path().join("toolchain/bin"),
            ToolchainKind::Llvm,
            &ExeNaming::default(),
        );
        std::fs::create_dir_all(tmp.path().join("src")).unwrap();
        tmp
    }

    #[test]
    fn test_configure_args_end_to_end() {
        let tmp = setup();
        let config = project(tmp.path(), "");

        let toolchain = assemble_toolchain(&config.toolchain).unwrap();
        let builder = assemble_builder(&config, toolchain, Span::none()).unwrap();
        let args = builder.configure_args().unwrap();

        let clang = tmp.path().join("toolchain/bin/clang");
        let cc_arg = format!("-D{}={}", CMAKE_C_COMPILER, clang.display());
        let flags_arg = format!("-D{}=-O2", CMAKE_C_FLAGS);
        assert_eq!(args.iter().filter(|a| **a == cc_arg).count(), 1);
        assert_eq!(args.iter().filter(|a| **a == flags_arg).count(), 1);
    }

    #[test]
    fn test_provider_order_and_merging() {
        let tmp = setup();
        let config = project(
            tmp.path(),
            "  customConfigureOptions:\n    CMAKE_C_FLAGS: -g\n    LLVM_ENABLE_PROJECTS: clang",
        );

        let toolchain = assemble_toolchain(&config.toolchain).unwrap();
        let defines = assemble_defines(&config, toolchain).defines().unwrap();

        let keys: Vec<_> = defines.iter().map(|(k, _)| k).collect();
        assert_eq!(keys[0], "CMAKE_C_COMPILER");
        assert_eq!(keys[1], "CMAKE_CXX_COMPILER");
        assert_eq!(defines.get(CMAKE_C_FLAGS), Some("-O2 -g"));
        assert_eq!(defines.get("LLVM_ENABLE_PROJECTS"), Some("clang"));
    }

    #[test]
    fn test_build_type_provider_registered() {
        let tmp = setup();
        let mut config = project(tmp.path(), "");
        config.build_type = Some(crate::builder::defines::CMakeBuildType::Debug);

        let toolchain = assemble_toolchain(&config.toolchain).unwrap();
        let defines = assemble_defines(&config, toolchain).defines().unwrap();
        assert_eq!(defines.get("CMAKE_BUILD_TYPE"), Some("Debug"));
    }

    #[test]
    fn test_llvm_ignores_target_prefix() {
        let tmp = setup();
        let mut config = project(tmp.path(), "");
        config.toolchain.target_prefix = "aarch64-linux-gnu".to_string();

        let toolchain = assemble_toolchain(&config.toolchain).unwrap();
        assert_eq!(toolchain.cc(), tmp.path().join("toolchain/bin/clang"));
    }

    #[test]
    fn test_missing_toolchain_install_dir() {
        let tmp = setup();
        let config = project(tmp.path(), "").with_overrides(
            &crate::core::config::Overrides {
                toolchain_install_dir: Some(tmp.path().join("missing")),
                ..Default::default()
            },
            tmp.path(),
        );

        assert!(matches!(
            assemble_toolchain(&config.toolchain),
            Err(BuildError::NotFound { .. })
        ));
    }

    /// Fails configure and records whether later phases ran.
    #[derive(Default)]
    struct FailingConfigure {
        built: bool,
        installed: bool,
    }

    impl Builder for FailingConfigure {
        fn configure(&mut self) -> Result<(), BuildError> {
            Err(BuildError::ConfigurationFailed {
                code: Some(1),
                output: String::new(),
            })
        }

        fn build(&mut self) -> Result<(), BuildError> {
            self.built = true;
            Ok(())
        }

        fn install(&mut self) -> Result<(), BuildError> {
            self.installed = true;
            Ok(())
        }
    }

    #[test]
    fn test_configure_failure_stops_sequence() {
        let mut builder = FailingConfigure::default();
        let err = drive(&mut builder, true).unwrap_err();

        assert!(matches!(err, BuildError::ConfigurationFailed { code: Some(1), .. }));
        assert!(!builder.built);
        assert!(!builder.installed);
    }

    #[cfg(unix)]
    #[test]
    fn test_drive_with_fake_cmake() {
        use crate::builder::cmake::testing::{fake_cmake, recorded_calls};

        let tmp = setup();
        let tools = tmp.path().join("tools");
        let cmake = fake_cmake(&tools, 0);
        let config = project(tmp.path(), "  customBuildOptions:\n    targets: clang");

        let toolchain = assemble_toolchain(&config.toolchain).unwrap();
        let builder = assemble_builder(&config, toolchain, Span::none())
            .unwrap()
            .cmake_path(&cmake);
        let mut builder = TimedBuilder::new(builder, Span::none());

        drive(&mut builder, false).unwrap();

        let calls = recorded_calls(&tools);
        assert_eq!(calls.len(), 2);
        assert!(calls[1].ends_with("--target clang"));
        assert_eq!(builder.timings().len(), 2);
        assert!(!tmp.path().join("install").exists());
    }
}
