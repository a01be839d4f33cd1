//! Subprocess execution utilities.

use std::ffi::{OsStr, OsString};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Output, Stdio};

use crate::util::errors::BuildError;
use crate::util::fs::rotate_file;

/// Indentation of continuation lines in rendered commands.
const INDENT: usize = 4;

/// Builder for subprocess execution.
///
/// Arguments are kept as `OsString`s and reach the child process unchanged;
/// only the rendered command text is lossy.
#[derive(Debug, Clone)]
pub struct ProcessBuilder {
    program: PathBuf,
    args: Vec<OsString>,
}

impl ProcessBuilder {
    /// Create a new process builder for the given program.
    pub fn new(program: impl AsRef<Path>) -> Self {
        ProcessBuilder {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
        }
    }

    /// Add a single argument.
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|s| s.as_ref().to_os_string()));
        self
    }

    fn build_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd
    }

    /// Execute the command, capturing stdout and stderr.
    pub fn exec(&self) -> Result<Output, BuildError> {
        let mut cmd = self.build_command();
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        Ok(cmd.output()?)
    }

    /// Execute the command with stdout and stderr redirected into `log_file`.
    ///
    /// A previous log at the same path is rotated and compressed first.
    pub fn exec_logged(&self, log_file: &Path) -> Result<ExitStatus, BuildError> {
        rotate_file(log_file, true)?;
        let stdout = fs::File::create(log_file)?;
        let stderr = stdout.try_clone()?;

        let mut cmd = self.build_command();
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::from(stdout));
        cmd.stderr(Stdio::from(stderr));

        tracing::debug!("logging output of `{}` to {}", self.program.display(), log_file.display());
        Ok(cmd.status()?)
    }

    fn quoted_parts(&self) -> impl Iterator<Item = String> + '_ {
        std::iter::once(self.program.as_os_str())
            .chain(self.args.iter().map(OsString::as_os_str))
            .map(|part| quote_arg(&part.to_string_lossy()))
    }

    /// Display the command on one line.
    pub fn display_command(&self) -> String {
        self.quoted_parts().collect::<Vec<_>>().join(" ")
    }

    /// Display the command with one argument per continuation line.
    pub fn display_multiline(&self) -> String {
        let separator = format!(" \\\n{}", " ".repeat(INDENT));
        self.quoted_parts().collect::<Vec<_>>().join(&separator)
    }

    /// Write a shell transcript of this command, rotating any earlier one.
    pub fn write_transcript(&self, path: &Path) -> Result<(), BuildError> {
        rotate_file(path, false)?;
        let mut file = fs::File::create(path)?;
        writeln!(file, "#!/bin/sh")?;
        writeln!(file, "{}", self.display_multiline())?;
        Ok(())
    }
}

/// Characters that never need shell quoting.
fn is_shell_safe(c: char) -> bool {
    c.is_ascii_alphanumeric()
        || matches!(c, '_' | '@' | '%' | '+' | '=' | ':' | ',' | '.' | '/' | '-')
}

/// Single-quote an argument unless every character is shell-safe.
fn quote_arg(arg: &str) -> String {
    if arg.is_empty() {
        return "''".to_string();
    }
    if arg.chars().all(is_shell_safe) {
        return arg.to_string();
    }
    format!("'{}'", arg.replace('\'', r"'\''"))
}

/// Find an executable in PATH.
pub fn find_executable(name: &str) -> Option<PathBuf> {
    which::which(name).ok()
}

/// Find an executable in an explicit `PATH`-style search list.
pub fn find_executable_in(name: &str, search_path: Option<&OsStr>) -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    which::which_in(name, search_path, cwd).ok()
}

/// Find CMake.
pub fn find_cmake() -> Option<PathBuf> {
    find_executable("cmake")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    #[cfg(unix)]
    fn test_process_builder() {
        let output = ProcessBuilder::new("echo").arg("hello").exec().unwrap();

        assert!(output.status.success());
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("hello"));
    }

    #[test]
    #[cfg(unix)]
    fn test_exec_logged_captures_both_streams() {
        let tmp = TempDir::new().unwrap();
        let log = tmp.path().join("phase.log");

        let status = ProcessBuilder::new("sh")
            .args(["-c", "echo out; echo err 1>&2; exit 3"])
            .exec_logged(&log)
            .unwrap();

        assert_eq!(status.code(), Some(3));
        let contents = fs::read_to_string(&log).unwrap();
        assert!(contents.contains("out"));
        assert!(contents.contains("err"));
    }

    #[test]
    fn test_display_command() {
        let pb = ProcessBuilder::new("cmake").args(["-S", "/src", "-DCMAKE_C_FLAGS=-O2 -g"]);

        assert_eq!(pb.display_command(), "cmake -S /src '-DCMAKE_C_FLAGS=-O2 -g'");
    }

    #[test]
    fn test_display_multiline() {
        let pb = ProcessBuilder::new("cmake").args(["--build", "/build"]);

        assert_eq!(pb.display_multiline(), "cmake \\\n    --build \\\n    /build");
        assert_eq!(ProcessBuilder::new("ninja").display_multiline(), "ninja");
    }

    #[test]
    fn test_write_transcript() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("cmake_build.sh");

        ProcessBuilder::new("cmake")
            .args(["--build", "/build"])
            .write_transcript(&path)
            .unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("#!/bin/sh\n"));
        assert!(contents.contains("cmake \\\n    --build"));
    }

    #[test]
    fn test_quote_arg() {
        assert_eq!(quote_arg("plain"), "plain");
        assert_eq!(quote_arg(""), "''");
        assert_eq!(quote_arg("a b"), "'a b'");
        assert_eq!(quote_arg("X86;ARM"), "'X86;ARM'");
        assert_eq!(quote_arg("it's"), r"'it'\''s'");
        assert_eq!(quote_arg("-DX=a>b"), "'-DX=a>b'");
        assert_eq!(quote_arg(r"c\d"), r"'c\d'");
        assert_eq!(quote_arg("~/x"), "'~/x'");
        assert_eq!(
            quote_arg("-DCMAKE_INSTALL_PREFIX=/opt/llvm-19.1"),
            "-DCMAKE_INSTALL_PREFIX=/opt/llvm-19.1"
        );
    }

    #[test]
    #[cfg(unix)]
    fn test_transcript_replays_same_argv() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("replay.sh");
        let args = vec![
            "[%s]\n".to_string(),
            format!("-DX=a>{}", tmp.path().join("b").display()),
            r"-DY=c\d".to_string(),
            format!("$(touch {})", tmp.path().join("c").display()),
            "`id`".to_string(),
            "a;b (c) {d} [e] ?*! #f ~g <h".to_string(),
            "it's".to_string(),
            String::new(),
        ];

        ProcessBuilder::new("printf")
            .args(&args)
            .write_transcript(&path)
            .unwrap();

        let output = ProcessBuilder::new("sh").arg(&path).exec().unwrap();
        assert!(output.status.success());

        let expected: String = args[1..].iter().map(|a| format!("[{}]\n", a)).collect();
        assert_eq!(String::from_utf8_lossy(&output.stdout), expected);
        assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 1);
    }
}
