use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::prelude::*;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("invalid log filter '{value}'")]
    EnvFilter {
        value: String,
        #[source]
        source: ParseError,
    },
    #[error("cannot open log file {}", path.display())]
    LogFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot install log subscriber: {0}")]
    Subscriber(#[from] TryInitError),
}

/// Pick the log filter: `--verbose` wins, then the configured level, then "info".
pub fn resolve_level(verbose: bool, configured: Option<&str>) -> String {
    if verbose {
        "debug".to_string()
    } else {
        configured.unwrap_or("info").to_string()
    }
}

/// Build the filter, preferring `RUST_LOG` over `level`.
pub fn build_filter(level: &str) -> Result<EnvFilter, TelemetryError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(level).map_err(|source| TelemetryError::EnvFilter {
            value: level.to_string(),
            source,
        }),
    }
}

/// Open `path` for appending, creating it and its directory when missing.
pub fn open_log_file(path: &Path) -> Result<File, TelemetryError> {
    let log_file_error = |source| TelemetryError::LogFile {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(log_file_error)?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(log_file_error)
}

/// Install a compact stderr subscriber, plus a file copy when `log_file` is
/// set. Output stays off stdout so scored tables can be piped.
pub fn init(level: &str, log_file: Option<&Path>) -> Result<(), TelemetryError> {
    let env_filter = build_filter(level)?;

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .with_ansi(false);

    let file_layer = match log_file {
        Some(path) => Some(
            fmt::layer()
                .with_writer(Mutex::new(open_log_file(path)?))
                .with_target(false)
                .with_ansi(false),
        ),
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()?;
    Ok(())
}
