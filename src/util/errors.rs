//! Error types shared by the toolchain, define and builder layers.

use std::path::PathBuf;

use thiserror::Error;

/// Number of trailing log lines kept in a process failure.
pub const OUTPUT_TAIL_LINES: usize = 40;

/// Error raised while resolving a toolchain or driving CMake.
#[derive(Debug, Error)]
pub enum BuildError {
    /// A required file, directory or executable does not exist.
    #[error("{what} not found: {}", .path.display())]
    NotFound { what: String, path: PathBuf },

    /// A path exists but is of the wrong kind.
    #[error("invalid path {}: {reason}", .path.display())]
    InvalidPath { path: PathBuf, reason: String },

    #[error("CMake configuration failed{}\n{output}", exit_suffix(.code))]
    ConfigurationFailed { code: Option<i32>, output: String },

    #[error("CMake build failed{}\n{output}", exit_suffix(.code))]
    BuildFailed { code: Option<i32>, output: String },

    #[error("CMake installation failed{}\n{output}", exit_suffix(.code))]
    InstallFailed { code: Option<i32>, output: String },

    #[error("packaging failed{}\n{output}", exit_suffix(.code))]
    PackageFailed { code: Option<i32>, output: String },

    /// The project configuration is malformed or incomplete.
    #[error("invalid project configuration: {0}")]
    ConfigValidation(String),

    /// A builder phase was requested out of order.
    #[error("cannot {phase}: builder is {state}")]
    InvalidState { phase: &'static str, state: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn exit_suffix(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!(" with exit code {}", code),
        None => " (terminated by signal)".to_string(),
    }
}

impl BuildError {
    pub fn not_found(what: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        BuildError::NotFound {
            what: what.into(),
            path: path.into(),
        }
    }

    pub fn invalid_path(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        BuildError::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Exit code of the failed external process, if this is a process failure.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            BuildError::ConfigurationFailed { code, .. }
            | BuildError::BuildFailed { code, .. }
            | BuildError::InstallFailed { code, .. }
            | BuildError::PackageFailed { code, .. } => *code,
            _ => None,
        }
    }
}

/// Keep only the last `max_lines` lines of captured process output.
pub fn output_tail(output: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = output.lines().collect();
    let start = lines.len().saturating_sub(max_lines);
    lines[start..].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message() {
        let err = BuildError::not_found("executable", "/opt/llvm/bin/clang");
        assert_eq!(err.to_string(), "executable not found: /opt/llvm/bin/clang");
    }

    #[test]
    fn test_process_failure_message() {
        let err = BuildError::ConfigurationFailed {
            code: Some(2),
            output: "CMake Error".to_string(),
        };
        assert_eq!(err.exit_code(), Some(2));
        let msg = err.to_string();
        assert!(msg.contains("exit code 2"));
        assert!(msg.contains("CMake Error"));
    }

    #[test]
    fn test_output_tail() {
        let output = "a\nb\nc\nd";
        assert_eq!(output_tail(output, 2), "c\nd");
        assert_eq!(output_tail(output, 10), output);
        assert_eq!(output_tail("", 3), "");
    }
}
