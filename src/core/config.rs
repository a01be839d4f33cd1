//! Project configuration file parsing and schema.
//!
//! A project file is YAML:
//!
//! ```yaml
//! name: llvm
//! description: LLVM with clang and lld
//! srcDir: ../llvm-project/llvm
//! buildDir: ../build/llvm
//! installDir: ../install/llvm
//! packagePathPrefix: ../dist/llvm-19
//! buildType: Release
//! compilerOption:
//!   cflags: ["-O2"]
//!   ldflags: ["-fuse-ld=lld"]
//! buildTool:
//!   name: cmake
//!   generator: Ninja
//!   customConfigureOptions:
//!     LLVM_ENABLE_PROJECTS: clang;lld
//!     initialCache: caches/release.cmake
//!   customBuildOptions:
//!     parallel: 16
//! toolchain:
//!   name: llvm
//!   installDir: /usr/lib/llvm-19
//! ```
//!
//! Relative paths are resolved against the directory holding the file.
//! A loaded configuration is never mutated; command-line overrides produce a
//! new value through [`ProjectConfig::with_overrides`].

use std::fmt;
use std::path::{Path, PathBuf};

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};

use crate::builder::cmake::{BuildStepOptions, CMakeGenerator, InstallStepOptions};
use crate::builder::compiler::CompilerOption;
use crate::builder::defines::CMakeBuildType;
use crate::builder::toolchain::ToolchainKind;
use crate::util::errors::BuildError;
use crate::util::fs::{check_file, resolve_against};

/// Reserved configure option naming an initial cache script.
pub const INITIAL_CACHE_KEY: &str = "initialCache";

/// Complete project configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProjectConfig {
    pub name: String,

    #[serde(default)]
    pub description: String,

    pub src_dir: PathBuf,

    pub build_dir: PathBuf,

    #[serde(default)]
    pub install_dir: Option<PathBuf>,

    /// Archive path without the `.tar.xz` extension
    #[serde(default)]
    pub package_path_prefix: Option<PathBuf>,

    #[serde(default)]
    pub build_type: Option<CMakeBuildType>,

    #[serde(default)]
    pub compiler_option: Option<CompilerOptionConfig>,

    pub build_tool: BuildToolConfig,

    pub toolchain: ToolchainConfig,

    /// Directory relative paths were resolved against
    #[serde(skip)]
    pub root_dir: PathBuf,
}

/// Compiler and linker flags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompilerOptionConfig {
    pub cflags: Vec<String>,
    pub cxxflags: Vec<String>,
    pub ldflags: Vec<String>,
}

impl CompilerOptionConfig {
    pub fn to_option(&self) -> CompilerOption {
        CompilerOption::from_flags(&self.cflags, &self.cxxflags, &self.ldflags)
    }
}

/// Supported build tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildToolKind {
    Cmake,
}

/// Build tool selection and its custom options.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BuildToolConfig {
    pub name: BuildToolKind,

    #[serde(default)]
    pub generator: CMakeGenerator,

    /// Extra `-D` defines, in file order
    #[serde(default)]
    pub custom_configure_options: OptionMap,

    #[serde(default)]
    pub custom_build_options: OptionMap,

    #[serde(default)]
    pub custom_install_options: OptionMap,

    /// Taken from `customConfigureOptions.initialCache` at load time
    #[serde(skip)]
    pub initial_cache: Option<PathBuf>,
}

impl BuildToolConfig {
    /// Interpret `customBuildOptions`.
    pub fn build_step_options(&self) -> Result<BuildStepOptions, BuildError> {
        let mut options = BuildStepOptions::default();
        for (key, value) in self.custom_build_options.iter() {
            match key {
                "targets" => {
                    options.targets = value
                        .split([';', ' '])
                        .filter(|t| !t.is_empty())
                        .map(str::to_string)
                        .collect();
                }
                "parallel" => {
                    let jobs = value.parse::<u32>().ok().filter(|&j| j > 0).ok_or_else(|| {
                        BuildError::ConfigValidation(format!(
                            "customBuildOptions.parallel must be a positive integer, got '{}'",
                            value
                        ))
                    })?;
                    options.parallel = Some(jobs);
                }
                "config" => options.config = Some(value.to_string()),
                other => {
                    return Err(BuildError::ConfigValidation(format!(
                        "unknown customBuildOptions key '{}'; expected targets, parallel or config",
                        other
                    )))
                }
            }
        }
        Ok(options)
    }

    /// Interpret `customInstallOptions`.
    pub fn install_step_options(&self) -> Result<InstallStepOptions, BuildError> {
        let mut options = InstallStepOptions::default();
        for (key, value) in self.custom_install_options.iter() {
            match key {
                "component" => options.component = Some(value.to_string()),
                "config" => options.config = Some(value.to_string()),
                "strip" => options.strip = parse_bool(value).ok_or_else(|| {
                    BuildError::ConfigValidation(format!(
                        "customInstallOptions.strip must be a boolean, got '{}'",
                        value
                    ))
                })?,
                other => {
                    return Err(BuildError::ConfigValidation(format!(
                        "unknown customInstallOptions key '{}'; expected component, config or strip",
                        other
                    )))
                }
            }
        }
        Ok(options)
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "true" | "on" | "yes" | "1" => Some(true),
        "false" | "off" | "no" | "0" => Some(false),
        _ => None,
    }
}

/// Toolchain selection.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ToolchainConfig {
    pub name: ToolchainKind,

    /// Install root; detected from `PATH` when absent
    #[serde(default)]
    pub install_dir: Option<PathBuf>,

    #[serde(default)]
    pub target_prefix: String,

    #[serde(default)]
    pub version_suffix: Option<String>,
}

/// Command-line values that replace configuration fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    pub src_dir: Option<PathBuf>,
    pub build_dir: Option<PathBuf>,
    pub install_dir: Option<PathBuf>,
    pub toolchain_install_dir: Option<PathBuf>,
}

impl ProjectConfig {
    /// Load and validate a project file.
    pub fn load(path: &Path) -> Result<Self, BuildError> {
        check_file(path)?;
        let contents = std::fs::read_to_string(path)?;
        let path = std::path::absolute(path)?;
        let root = path.parent().unwrap_or_else(|| Path::new("/"));

        Self::parse(&contents, root).map_err(|e| match e {
            BuildError::ConfigValidation(msg) => {
                BuildError::ConfigValidation(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })
    }

    /// Parse a project file whose relative paths are rooted at `root_dir`.
    pub fn parse(contents: &str, root_dir: &Path) -> Result<Self, BuildError> {
        let config: ProjectConfig = serde_yaml::from_str(contents)
            .map_err(|e| BuildError::ConfigValidation(e.to_string()))?;
        config.resolve(root_dir)
    }

    fn resolve(self, root_dir: &Path) -> Result<Self, BuildError> {
        if self.name.trim().is_empty() {
            return Err(BuildError::ConfigValidation(
                "project name must not be empty".to_string(),
            ));
        }

        let resolve = |p: &Path| resolve_against(root_dir, p);

        let mut custom_configure_options = self.build_tool.custom_configure_options;
        let initial_cache = match custom_configure_options.remove(INITIAL_CACHE_KEY) {
            Some(cache) => {
                let cache = resolve(Path::new(&cache));
                check_file(&cache)?;
                Some(cache)
            }
            None => None,
        };

        let build_tool = BuildToolConfig {
            custom_configure_options,
            initial_cache,
            ..self.build_tool
        };
        build_tool.build_step_options()?;
        build_tool.install_step_options()?;

        Ok(ProjectConfig {
            src_dir: resolve(&self.src_dir),
            build_dir: resolve(&self.build_dir),
            install_dir: self.install_dir.as_deref().map(resolve),
            package_path_prefix: self.package_path_prefix.as_deref().map(resolve),
            toolchain: ToolchainConfig {
                install_dir: self.toolchain.install_dir.as_deref().map(resolve),
                ..self.toolchain
            },
            build_tool,
            root_dir: root_dir.to_path_buf(),
            ..self
        })
    }

    /// Return a copy with command-line overrides applied.
    ///
    /// Relative override paths are resolved against `cwd`.
    pub fn with_overrides(&self, overrides: &Overrides, cwd: &Path) -> Self {
        let pick = |value: &Option<PathBuf>, current: &PathBuf| {
            value
                .as_deref()
                .map(|p| resolve_against(cwd, p))
                .unwrap_or_else(|| current.clone())
        };
        let pick_opt = |value: &Option<PathBuf>, current: &Option<PathBuf>| {
            value
                .as_deref()
                .map(|p| resolve_against(cwd, p))
                .or_else(|| current.clone())
        };

        ProjectConfig {
            src_dir: pick(&overrides.src_dir, &self.src_dir),
            build_dir: pick(&overrides.build_dir, &self.build_dir),
            install_dir: pick_opt(&overrides.install_dir, &self.install_dir),
            toolchain: ToolchainConfig {
                install_dir: pick_opt(&overrides.toolchain_install_dir, &self.toolchain.install_dir),
                ..self.toolchain.clone()
            },
            ..self.clone()
        }
    }
}

/// String-to-string mapping that keeps the order of the source document.
///
/// Booleans and integers are accepted and kept in their textual form. A repeated key keeps its first position and last value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptionMap(Vec<(String, String)>);

impl OptionMap {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = value,
            None => self.0.push((key, value)),
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        let index = self.0.iter().position(|(k, _)| k == key)?;
        Some(self.0.remove(index).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// Textual form of a scalar option value.
///
/// Strings, booleans and integers keep their written form. Floats are
/// rejected: `10.10` would come back as `10.1`, so the value must be quoted.
fn scalar_text(key: &str, value: serde_yaml::Value) -> Result<String, String> {
    match value {
        serde_yaml::Value::String(s) => Ok(s),
        serde_yaml::Value::Bool(b) => Ok(b.to_string()),
        serde_yaml::Value::Number(n) if n.is_i64() || n.is_u64() => Ok(n.to_string()),
        serde_yaml::Value::Number(n) => Err(format!(
            "option '{}' has the unquoted number {}; quote it to keep its exact text",
            key, n
        )),
        serde_yaml::Value::Null => Err(format!("option '{}' has no value", key)),
        _ => Err(format!("option '{}' must be a scalar value", key)),
    }
}

impl<'de> Deserialize<'de> for OptionMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct OptionMapVisitor;

        impl<'de> Visitor<'de> for OptionMapVisitor {
            type Value = OptionMap;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a mapping of option names to scalar values")
            }

            fn visit_unit<E: serde::de::Error>(self) -> Result<OptionMap, E> {
                Ok(OptionMap::default())
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<OptionMap, A::Error> {
                let mut map = OptionMap::default();
                while let Some((key, value)) =
                    access.next_entry::<String, serde_yaml::Value>()?
                {
                    let text = scalar_text(&key, value)
                        .map_err(<A::Error as serde::de::Error>::custom)?;
                    map.insert(key, text);
                }
                Ok(map)
            }
        }

        deserializer.deserialize_any(OptionMapVisitor)
    }
}
