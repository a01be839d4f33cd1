//! Packaging of an install directory into a compressed tarball.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::config::ProjectConfig;
use crate::util::errors::{output_tail, BuildError, OUTPUT_TAIL_LINES};
use crate::util::fs::check_dir;
use crate::util::process::{find_executable, ProcessBuilder};

/// Compression filter handed to `tar -I`.
pub const DEFAULT_FILTER: &str = "xz -9 -T0";

/// Extension appended to the package path prefix.
pub const ARCHIVE_EXTENSION: &str = ".tar.xz";

/// Options for packaging.
#[derive(Debug, Clone)]
pub struct PackageOptions {
    pub filter: String,

    /// Explicit `tar` executable; looked up on `PATH` otherwise
    pub tar_path: Option<PathBuf>,
}

impl Default for PackageOptions {
    fn default() -> Self {
        PackageOptions {
            filter: DEFAULT_FILTER.to_string(),
            tar_path: None,
        }
    }
}

/// Archive path for a package path prefix.
pub fn archive_path(prefix: &Path) -> PathBuf {
    let mut path = prefix.as_os_str().to_os_string();
    path.push(ARCHIVE_EXTENSION);
    PathBuf::from(path)
}

/// Transcript path recorded next to an archive.
pub fn transcript_path(archive: &Path) -> PathBuf {
    let mut path = archive.as_os_str().to_os_string();
    path.push(".sh");
    PathBuf::from(path)
}

/// Top-level entries of the install directory, sorted by name.
fn archive_entries(install_dir: &Path) -> Result<Vec<OsString>, BuildError> {
    let mut entries = fs::read_dir(install_dir)?
        .map(|entry| entry.map(|e| e.file_name()))
        .collect::<Result<Vec<_>, _>>()?;
    entries.sort();
    Ok(entries)
}

/// Archive the install directory of `config` to
/// `<packagePathPrefix>.tar.xz`, returning the archive path.
pub fn package(config: &ProjectConfig, opts: &PackageOptions) -> Result<PathBuf, BuildError> {
    let prefix = config.package_path_prefix.as_deref().ok_or_else(|| {
        BuildError::ConfigValidation("packaging requires packagePathPrefix".to_string())
    })?;
    let install_dir = config.install_dir.as_deref().ok_or_else(|| {
        BuildError::ConfigValidation("packaging requires installDir".to_string())
    })?;
    check_dir(install_dir)?;

    let entries = archive_entries(install_dir)?;
    if entries.is_empty() {
        return Err(BuildError::PackageFailed {
            code: None,
            output: format!("install directory {} is empty", install_dir.display()),
        });
    }

    let tar = match opts.tar_path {
        Some(ref path) => path.clone(),
        None => find_executable("tar").ok_or_else(|| BuildError::not_found("tar", "tar (PATH)"))?,
    };
    let filter_program = opts.filter.split_whitespace().next().ok_or_else(|| {
        BuildError::ConfigValidation("compression filter must not be empty".to_string())
    })?;
    if find_executable(filter_program).is_none() {
        return Err(BuildError::not_found(
            "compression program",
            format!("{} (PATH)", filter_program),
        ));
    }

    let archive = archive_path(prefix);
    if let Some(parent) = archive.parent() {
        fs::create_dir_all(parent)?;
    }

    let cmd = ProcessBuilder::new(tar)
        .arg("-C")
        .arg(install_dir)
        .arg("-c")
        .arg("-I")
        .arg(&opts.filter)
        .arg("-f")
        .arg(&archive)
        .arg("--")
        .args(&entries);
    tracing::info!("Packaging {} entries into {}", entries.len(), archive.display());
    tracing::info!("Package command is:\n{}", cmd.display_multiline());
    cmd.write_transcript(&transcript_path(&archive))?;

    let output = cmd.exec()?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(BuildError::PackageFailed {
            code: output.status.code(),
            output: output_tail(&stderr, OUTPUT_TAIL_LINES),
        });
    }

    Ok(archive)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config(root: &Path) -> ProjectConfig {
        let yaml = r#"
name: llvm
srcDir: src
buildDir: build
installDir: install
packagePathPrefix: dist/llvm-19.1
buildTool:
  name: cmake
toolchain:
  name: llvm
"#;
        ProjectConfig::parse(yaml, root).unwrap()
    }

    #[test]
    fn test_archive_path_keeps_dots() {
        assert_eq!(
            archive_path(Path::new("/dist/llvm-19.1")),
            PathBuf::from("/dist/llvm-19.1.tar.xz")
        );
    }

    #[test]
    fn test_requires_prefix() {
        let tmp = TempDir::new().unwrap();
        let mut config = config(tmp.path());
        config.package_path_prefix = None;

        assert!(matches!(
            package(&config, &PackageOptions::default()),
            Err(BuildError::ConfigValidation(_))
        ));
    }

    #[test]
    fn test_missing_install_dir() {
        let tmp = TempDir::new().unwrap();
        assert!(matches!(
            package(&config(tmp.path()), &PackageOptions::default()),
            Err(BuildError::NotFound { .. })
        ));
    }

    #[test]
    fn test_empty_install_dir() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("install")).unwrap();

        assert!(matches!(
            package(&config(tmp.path()), &PackageOptions::default()),
            Err(BuildError::PackageFailed { code: None, .. })
        ));
    }

    #[cfg(unix)]
    fn fake_tar(dir: &Path, exit_code: i32) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        fs::create_dir_all(dir).unwrap();
        let path = dir.join("tar");
        let script = format!(
            "#!/bin/sh\necho \"$@\" > \"$(dirname \"$0\")/args.txt\"\necho \"tar: broken\" >&2\nexit {}\n",
            exit_code
        );
        fs::write(&path, script).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[test]
    fn test_package_command_line() {
        let tmp = TempDir::new().unwrap();
        let install = tmp.path().join("install");
        fs::create_dir_all(install.join("lib")).unwrap();
        fs::create_dir_all(install.join("bin")).unwrap();
        fs::write(install.join("README"), "").unwrap();

        let tools = tmp.path().join("tools");
        let opts = PackageOptions {
            filter: "sh".to_string(),
            tar_path: Some(fake_tar(&tools, 0)),
        };

        let archive = package(&config(tmp.path()), &opts).unwrap();

        assert_eq!(archive, tmp.path().join("dist/llvm-19.1.tar.xz"));
        assert!(tmp.path().join("dist").is_dir());
        let args = fs::read_to_string(tools.join("args.txt")).unwrap();
        assert_eq!(
            args.trim_end(),
            format!(
                "-C {} -c -I sh -f {} -- README bin lib",
                install.display(),
                archive.display()
            )
        );

        let transcript = fs::read_to_string(transcript_path(&archive)).unwrap();
        assert_eq!(transcript_path(&archive), tmp.path().join("dist/llvm-19.1.tar.xz.sh"));
        assert!(transcript.starts_with("#!/bin/sh\n"));
        assert!(transcript.contains("-I \\\n    sh \\\n    -f"));
        assert!(transcript.ends_with("-- \\\n    README \\\n    bin \\\n    lib\n"));
    }

    #[cfg(unix)]
    #[test]
    fn test_dash_entries_follow_separator() {
        let tmp = TempDir::new().unwrap();
        let install = tmp.path().join("install");
        fs::create_dir_all(&install).unwrap();
        fs::write(install.join("--remove-files"), "").unwrap();
        fs::write(install.join("lib"), "").unwrap();

        let tools = tmp.path().join("tools");
        let opts = PackageOptions {
            filter: "sh".to_string(),
            tar_path: Some(fake_tar(&tools, 0)),
        };
        package(&config(tmp.path()), &opts).unwrap();

        let args = fs::read_to_string(tools.join("args.txt")).unwrap();
        assert!(args.trim_end().ends_with(" -- --remove-files lib"));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_non_utf8_entry_passed_unchanged() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let tmp = TempDir::new().unwrap();
        let install = tmp.path().join("install");
        fs::create_dir_all(&install).unwrap();
        fs::write(install.join(OsStr::from_bytes(b"lib\xff")), "").unwrap();

        let tools = tmp.path().join("tools");
        let opts = PackageOptions {
            filter: "sh".to_string(),
            tar_path: Some(fake_tar(&tools, 0)),
        };
        package(&config(tmp.path()), &opts).unwrap();

        let args = fs::read(tools.join("args.txt")).unwrap();
        assert!(args.ends_with(b" -- lib\xff\n"));
    }

    #[cfg(unix)]
    #[test]
    fn test_tar_failure() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("install/bin")).unwrap();

        let opts = PackageOptions {
            filter: "sh".to_string(),
            tar_path: Some(fake_tar(&tmp.path().join("tools"), 2)),
        };

        match package(&config(tmp.path()), &opts) {
            Err(BuildError::PackageFailed { code, output }) => {
                assert_eq!(code, Some(2));
                assert!(output.contains("tar: broken"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
