//! CMake driver: configure, build and install as external processes.
//!
//! The builder owns no build logic. It validates directories, assembles
//! argument lists and runs CMake synchronously. Each phase writes a shell
//! transcript (`cmake_<phase>.sh`) and a combined stdout/stderr log
//! (`cmake_<phase>.log`) into the build directory.

use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::process::ExitStatus;

use serde::{Deserialize, Serialize};
use tracing::Span;

use crate::builder::defines::DefineProvider;
use crate::builder::{BuildPhase, Builder};
use crate::util::errors::{output_tail, BuildError, OUTPUT_TAIL_LINES};
use crate::util::fs::{check_dir, check_file, ensure_dir};
use crate::util::process::{find_cmake, ProcessBuilder};

/// CMake generator selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CMakeGenerator {
    /// Whatever CMake picks for the platform; no `-G` flag is passed.
    Default,
    #[default]
    Ninja,
}

impl CMakeGenerator {
    /// Value for `-G`, or `None` for the platform default.
    pub fn as_arg(&self) -> Option<&'static str> {
        match self {
            CMakeGenerator::Default => None,
            CMakeGenerator::Ninja => Some("Ninja"),
        }
    }
}

/// Progress of a [`CMakeBuilder`]. Phases only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BuildState {
    Unconfigured,
    Configured,
    Built,
    Installed,
}

impl fmt::Display for BuildState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BuildState::Unconfigured => "unconfigured",
            BuildState::Configured => "configured",
            BuildState::Built => "built",
            BuildState::Installed => "installed",
        };
        f.write_str(s)
    }
}

/// Options for `cmake --build`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildStepOptions {
    /// Targets to build; all when empty
    pub targets: Vec<String>,
    /// Parallel job count
    pub parallel: Option<u32>,
    /// Configuration for multi-config generators
    pub config: Option<String>,
}

/// Options for `cmake --install`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallStepOptions {
    pub component: Option<String>,
    pub config: Option<String>,
    pub strip: bool,
}

/// CMake build driver.
#[derive(Debug)]
pub struct CMakeBuilder {
    source_dir: PathBuf,
    build_dir: PathBuf,
    install_dir: Option<PathBuf>,
    generator: CMakeGenerator,
    cmake_path: Option<PathBuf>,
    initial_cache: Option<PathBuf>,
    define_provider: Option<Box<dyn DefineProvider>>,
    build_options: BuildStepOptions,
    install_options: InstallStepOptions,
    state: BuildState,
    span: Span,
}

impl CMakeBuilder {
    /// Create a builder for `source_dir`, building into `build_dir`.
    pub fn new(source_dir: impl Into<PathBuf>, build_dir: impl Into<PathBuf>) -> Self {
        CMakeBuilder {
            source_dir: source_dir.into(),
            build_dir: build_dir.into(),
            install_dir: None,
            generator: CMakeGenerator::default(),
            cmake_path: None,
            initial_cache: None,
            define_provider: None,
            build_options: BuildStepOptions::default(),
            install_options: InstallStepOptions::default(),
            state: BuildState::Unconfigured,
            span: Span::none(),
        }
    }

    /// Set the install prefix.
    pub fn install_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.install_dir = Some(dir.into());
        self
    }

    pub fn generator(mut self, generator: CMakeGenerator) -> Self {
        self.generator = generator;
        self
    }

    /// Use this CMake instead of searching `PATH`.
    pub fn cmake_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.cmake_path = Some(path.into());
        self
    }

    /// Pre-load the cache from a script (`-C`).
    pub fn initial_cache(mut self, path: impl Into<PathBuf>) -> Self {
        self.initial_cache = Some(path.into());
        self
    }

    pub fn define_provider(mut self, provider: impl DefineProvider + 'static) -> Self {
        self.define_provider = Some(Box::new(provider));
        self
    }

    pub fn build_options(mut self, options: BuildStepOptions) -> Self {
        self.build_options = options;
        self
    }

    pub fn install_options(mut self, options: InstallStepOptions) -> Self {
        self.install_options = options;
        self
    }

    /// Log inside `span`.
    pub fn span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn state(&self) -> BuildState {
        self.state
    }

    /// Path of the transcript written for `phase`.
    pub fn transcript_path(&self, phase: BuildPhase) -> PathBuf {
        self.build_dir.join(format!("cmake_{}.sh", phase.as_str()))
    }

    /// Path of the output log written for `phase`.
    pub fn log_path(&self, phase: BuildPhase) -> PathBuf {
        self.build_dir.join(format!("cmake_{}.log", phase.as_str()))
    }

    /// Locate CMake, preferring the explicitly configured path.
    pub fn find_cmake(&self) -> Result<PathBuf, BuildError> {
        match self.cmake_path {
            Some(ref path) => {
                if !path.is_file() {
                    return Err(BuildError::not_found("cmake", path));
                }
                Ok(std::path::absolute(path)?)
            }
            None => find_cmake().ok_or_else(|| BuildError::not_found("cmake", "cmake (PATH)")),
        }
    }

    /// Arguments of the configure step, excluding the CMake executable.
    pub fn configure_args(&self) -> Result<Vec<String>, BuildError> {
        let mut args = vec![
            "-S".to_string(),
            self.source_dir.display().to_string(),
            "-B".to_string(),
            self.build_dir.display().to_string(),
        ];

        if let Some(generator) = self.generator.as_arg() {
            args.push("-G".to_string());
            args.push(generator.to_string());
        }

        if let Some(ref cache) = self.initial_cache {
            check_file(cache)?;
            args.push("-C".to_string());
            args.push(cache.display().to_string());
        }

        if let Some(ref provider) = self.define_provider {
            args.extend(provider.defines()?.to_args());
        }

        Ok(args)
    }

    /// Arguments of the build step, excluding the CMake executable.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = vec!["--build".to_string(), self.build_dir.display().to_string()];

        if let Some(jobs) = self.build_options.parallel {
            args.push("--parallel".to_string());
            args.push(jobs.to_string());
        }

        if let Some(ref config) = self.build_options.config {
            args.push("--config".to_string());
            args.push(config.clone());
        }

        if !self.build_options.targets.is_empty() {
            args.push("--target".to_string());
            args.extend(self.build_options.targets.iter().cloned());
        }

        args
    }

    /// Arguments of the install step, excluding the CMake executable.
    pub fn install_args(&self) -> Vec<String> {
        let mut args = vec!["--install".to_string(), self.build_dir.display().to_string()];

        if let Some(ref dir) = self.install_dir {
            args.push("--prefix".to_string());
            args.push(dir.display().to_string());
        }

        if let Some(ref config) = self.install_options.config {
            args.push("--config".to_string());
            args.push(config.clone());
        }

        if let Some(ref component) = self.install_options.component {
            args.push("--component".to_string());
            args.push(component.clone());
        }

        if self.install_options.strip {
            args.push("--strip".to_string());
        }

        args
    }

    fn expect_state(&self, phase: BuildPhase, expected: BuildState) -> Result<(), BuildError> {
        if self.state != expected {
            return Err(BuildError::InvalidState {
                phase: phase.as_str(),
                state: self.state.to_string(),
            });
        }
        Ok(())
    }

    /// Record the transcript, run the command and map a failure to the
    /// phase's error.
    fn run_phase(&self, phase: BuildPhase, cmd: ProcessBuilder) -> Result<(), BuildError> {
        cmd.write_transcript(&self.transcript_path(phase))?;

        let log = self.log_path(phase);
        let status = cmd.exec_logged(&log)?;
        if status.success() {
            return Ok(());
        }

        let output = fs::read_to_string(&log)
            .map(|s| output_tail(&s, OUTPUT_TAIL_LINES))
            .unwrap_or_default();
        tracing::error!(
            "{} failed; full output in {}",
            phase.as_str(),
            log.display()
        );
        Err(phase_failure(phase, status, output))
    }
}

fn phase_failure(phase: BuildPhase, status: ExitStatus, output: String) -> BuildError {
    let code = status.code();
    match phase {
        BuildPhase::Configure => BuildError::ConfigurationFailed { code, output },
        BuildPhase::Build => BuildError::BuildFailed { code, output },
        BuildPhase::Install => BuildError::InstallFailed { code, output },
    }
}

impl Builder for CMakeBuilder {
    fn configure(&mut self) -> Result<(), BuildError> {
        let span = self.span.clone();
        let _guard = span.enter();
        self.expect_state(BuildPhase::Configure, BuildState::Unconfigured)?;
        tracing::info!("Start configuration");

        check_dir(&self.source_dir)?;
        ensure_dir(&self.build_dir)?;
        let cmake = self.find_cmake()?;

        let cmd = ProcessBuilder::new(cmake).args(self.configure_args()?);
        tracing::info!("Configuration command is:\n{}", cmd.display_multiline());

        self.run_phase(BuildPhase::Configure, cmd)?;
        self.state = BuildState::Configured;
        Ok(())
    }

    fn build(&mut self) -> Result<(), BuildError> {
        let span = self.span.clone();
        let _guard = span.enter();
        self.expect_state(BuildPhase::Build, BuildState::Configured)?;
        tracing::info!("Start building");

        let cmake = self.find_cmake()?;
        let cmd = ProcessBuilder::new(cmake).args(self.build_args());
        tracing::debug!("Build command is: {}", cmd.display_command());

        self.run_phase(BuildPhase::Build, cmd)?;
        self.state = BuildState::Built;
        Ok(())
    }

    fn install(&mut self) -> Result<(), BuildError> {
        let span = self.span.clone();
        let _guard = span.enter();
        self.expect_state(BuildPhase::Install, BuildState::Built)?;
        tracing::info!("Start installation");

        check_dir(&self.build_dir)?;
        if let Some(ref dir) = self.install_dir {
            ensure_dir(dir)?;
        }
        let cmake = self.find_cmake()?;
        let cmd = ProcessBuilder::new(cmake).args(self.install_args());
        tracing::debug!("Install command is: {}", cmd.display_command());

        self.run_phase(BuildPhase::Install, cmd)?;
        self.state = BuildState::Installed;
        Ok(())
    }
}

/// Fake `cmake` executables for builder tests.
#[cfg(all(test, unix))]
pub(crate) mod testing {
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};

    /// Write a script that appends its arguments to `calls.txt` next to it
    /// and exits with `exit_code`.
    pub fn fake_cmake(dir: &Path, exit_code: i32) -> PathBuf {
        fs::create_dir_all(dir).unwrap();
        let path = dir.join("cmake");
        let script = format!(
            "#!/bin/sh\necho \"$@\" >> \"$(dirname \"$0\")/calls.txt\"\necho \"fake cmake output\"\nexit {}\n",
            exit_code
        );
        fs::write(&path, script).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    /// Lines recorded by a fake cmake in `dir`.
    pub fn recorded_calls(dir: &Path) -> Vec<String> {
        fs::read_to_string(dir.join("calls.txt"))
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }
}
