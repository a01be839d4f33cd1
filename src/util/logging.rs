//! Tracing subscriber setup for the command-line driver.

use std::fs::{self, File};
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Where and how much to log.
#[derive(Debug, Clone, Default)]
pub struct LogOptions {
    /// Log at debug level
    pub verbose: bool,

    /// Suppress terminal output; the log file still receives records
    pub quiet: bool,

    /// Additional plain-text log file
    pub log_file: Option<PathBuf>,
}

impl LogOptions {
    pub fn filter(&self) -> EnvFilter {
        if self.verbose {
            EnvFilter::new("llvm_build=debug")
        } else {
            EnvFilter::new("llvm_build=info")
        }
    }
}

/// Install the global subscriber.
///
/// An existing log file is truncated.
pub fn init(opts: &LogOptions) -> Result<()> {
    let stderr_layer = (!opts.quiet).then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .without_time()
    });

    let file_layer = match opts.log_file {
        Some(ref path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
            let file = File::create(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            Some(
                fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false)
                    .with_target(false),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(opts.filter())
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .context("failed to install the log subscriber")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_levels() {
        let opts = LogOptions::default();
        assert_eq!(opts.filter().to_string(), "llvm_build=info");

        let opts = LogOptions {
            verbose: true,
            ..LogOptions::default()
        };
        assert_eq!(opts.filter().to_string(), "llvm_build=debug");
    }
}
