//! CMake `-D` define providers and their aggregation.
//!
//! Each provider turns one structured input (a toolchain, a set of compiler
//! flags, a build type, or user-supplied key/value pairs) into [`Defines`].
//! [`DefineAggregate`] merges several providers in registration order. A key
//! produced by more than one provider is concatenated rather than
//! overwritten: flag variables are joined with a space, every other variable
//! with `;` (CMake's list separator).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::builder::compiler::CompilerOptions;
use crate::builder::toolchain::Toolchain;
use crate::util::errors::BuildError;
use crate::util::fs::check_file;

pub const CMAKE_C_COMPILER: &str = "CMAKE_C_COMPILER";
pub const CMAKE_CXX_COMPILER: &str = "CMAKE_CXX_COMPILER";
pub const CMAKE_C_FLAGS: &str = "CMAKE_C_FLAGS";
pub const CMAKE_CXX_FLAGS: &str = "CMAKE_CXX_FLAGS";
pub const CMAKE_EXE_LINKER_FLAGS: &str = "CMAKE_EXE_LINKER_FLAGS";
pub const CMAKE_MODULE_LINKER_FLAGS: &str = "CMAKE_MODULE_LINKER_FLAGS";
pub const CMAKE_SHARED_LINKER_FLAGS: &str = "CMAKE_SHARED_LINKER_FLAGS";
pub const CMAKE_BUILD_TYPE: &str = "CMAKE_BUILD_TYPE";

/// Variables whose values are whitespace-separated flag strings.
pub const FLAG_VARIABLES: [&str; 5] = [
    CMAKE_C_FLAGS,
    CMAKE_CXX_FLAGS,
    CMAKE_EXE_LINKER_FLAGS,
    CMAKE_MODULE_LINKER_FLAGS,
    CMAKE_SHARED_LINKER_FLAGS,
];

/// Connector used when two providers define the same variable.
pub fn connector_for(key: &str) -> char {
    if FLAG_VARIABLES.contains(&key) {
        ' '
    } else {
        ';'
    }
}

/// Insertion-ordered CMake variable assignments.
///
/// Inserting an existing key replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Defines {
    entries: Vec<(String, String)>,
}

impl Defines {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key` to `value`, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => Some(std::mem::replace(existing, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Render as `-DKEY=VALUE` command-line tokens.
    pub fn to_args(&self) -> Vec<String> {
        self.iter()
            .map(|(key, value)| format!("-D{}={}", key, value))
            .collect()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Defines {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut defines = Defines::new();
        for (key, value) in iter {
            defines.insert(key, value);
        }
        defines
    }
}

impl IntoIterator for Defines {
    type Item = (String, String);
    type IntoIter = std::vec::IntoIter<(String, String)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Source of CMake defines.
pub trait DefineProvider: fmt::Debug {
    fn defines(&self) -> Result<Defines, BuildError>;
}

/// Defines `CMAKE_C_COMPILER` and `CMAKE_CXX_COMPILER` from a toolchain.
#[derive(Debug)]
pub struct ToolchainDefineProvider {
    toolchain: Box<dyn Toolchain>,
}

impl ToolchainDefineProvider {
    pub fn new(toolchain: Box<dyn Toolchain>) -> Self {
        ToolchainDefineProvider { toolchain }
    }
}

impl DefineProvider for ToolchainDefineProvider {
    fn defines(&self) -> Result<Defines, BuildError> {
        // The compilers may have disappeared since the toolchain was resolved.
        check_file(self.toolchain.cc())?;
        check_file(self.toolchain.cxx())?;

        let mut defines = Defines::new();
        defines.insert(CMAKE_C_COMPILER, self.toolchain.cc().to_string_lossy());
        defines.insert(CMAKE_CXX_COMPILER, self.toolchain.cxx().to_string_lossy());
        Ok(defines)
    }
}

/// Defines the C, C++ and linker flag variables from compiler options.
///
/// The executable, module and shared linker variables all receive the same
/// linker flags.
#[derive(Debug)]
pub struct CompilerOptionDefineProvider {
    options: Box<dyn CompilerOptions>,
}

impl CompilerOptionDefineProvider {
    pub fn new(options: impl CompilerOptions + 'static) -> Self {
        CompilerOptionDefineProvider {
            options: Box::new(options),
        }
    }
}

impl DefineProvider for CompilerOptionDefineProvider {
    fn defines(&self) -> Result<Defines, BuildError> {
        let cflags = self.options.cflags().join(" ");
        let cxxflags = self.options.cxxflags().join(" ");
        let ldflags = self.options.ldflags().join(" ");

        let mut defines = Defines::new();
        defines.insert(CMAKE_C_FLAGS, cflags);
        defines.insert(CMAKE_CXX_FLAGS, cxxflags);
        defines.insert(CMAKE_EXE_LINKER_FLAGS, ldflags.clone());
        defines.insert(CMAKE_MODULE_LINKER_FLAGS, ldflags.clone());
        defines.insert(CMAKE_SHARED_LINKER_FLAGS, ldflags);
        Ok(defines)
    }
}

/// CMake build configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CMakeBuildType {
    Debug,
    #[default]
    Release,
    RelWithDebInfo,
    MinSizeRel,
}

impl CMakeBuildType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CMakeBuildType::Debug => "Debug",
            CMakeBuildType::Release => "Release",
            CMakeBuildType::RelWithDebInfo => "RelWithDebInfo",
            CMakeBuildType::MinSizeRel => "MinSizeRel",
        }
    }
}

impl fmt::Display for CMakeBuildType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CMakeBuildType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "debug" => Ok(CMakeBuildType::Debug),
            "release" => Ok(CMakeBuildType::Release),
            "relwithdebinfo" => Ok(CMakeBuildType::RelWithDebInfo),
            "minsizerel" => Ok(CMakeBuildType::MinSizeRel),
            _ => Err(format!(
                "invalid build type '{}'; expected Debug, Release, RelWithDebInfo or MinSizeRel",
                s
            )),
        }
    }
}

/// Defines `CMAKE_BUILD_TYPE`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuildTypeDefineProvider {
    build_type: CMakeBuildType,
}

impl BuildTypeDefineProvider {
    pub fn new(build_type: CMakeBuildType) -> Self {
        BuildTypeDefineProvider { build_type }
    }
}

impl DefineProvider for BuildTypeDefineProvider {
    fn defines(&self) -> Result<Defines, BuildError> {
        let mut defines = Defines::new();
        defines.insert(CMAKE_BUILD_TYPE, self.build_type.as_str());
        Ok(defines)
    }
}

/// Arbitrary user-supplied defines. A repeated key keeps the last value.
#[derive(Debug, Clone, Default)]
pub struct CustomDefineProvider {
    defines: Defines,
}

impl CustomDefineProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_define(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.defines.insert(key, value);
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for CustomDefineProvider {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        CustomDefineProvider {
            defines: iter.into_iter().collect(),
        }
    }
}

impl DefineProvider for CustomDefineProvider {
    fn defines(&self) -> Result<Defines, BuildError> {
        Ok(self.defines.clone())
    }
}

/// Merges the defines of several providers.
#[derive(Debug, Default)]
pub struct DefineAggregate {
    providers: Vec<Box<dyn DefineProvider>>,
}

impl DefineAggregate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider after the existing ones.
    pub fn add_provider(&mut self, provider: impl DefineProvider + 'static) {
        self.providers.push(Box::new(provider));
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl DefineProvider for DefineAggregate {
    fn defines(&self) -> Result<Defines, BuildError> {
        let mut merged = Defines::new();
        for provider in &self.providers {
            for (key, value) in provider.defines()? {
                let combined = match merged.get(&key) {
                    Some(existing) => format!("{}{}{}", existing, connector_for(&key), value),
                    None => value,
                };
                merged.insert(key, combined);
            }
        }
        Ok(merged)
    }
}
