//! Logging infrastructure using `tracing` and `tracing-subscriber`.
//!
//! All pipeline stages log through `tracing`; this module installs the global
//! subscriber.
//!
//! # Log Levels
//!
//! - `error`: fatal pipeline failures
//! - `warn`: degraded values, taxonomy collisions, skipped features
//! - `info`: pipeline stage progress, summary counts
//! - `debug`: per-column and per-feature detail
//! - `trace`: row-level data (requires explicit `--log-data` flag for PHI safety)
//!
//! # Usage
//!
//! ```ignore
//! use icu_cli::logging::{init_logging, LogConfig};
//!
//! let config = LogConfig {
//!     log_data: false,
//!     ..LogConfig::default()
//! };
//! init_logging(&config)?;
//! ```

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tracing::level_filters::LevelFilter;
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, MakeWriter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

static LOG_DATA_ENABLED: AtomicBool = AtomicBool::new(false);

/// Placeholder used when row-level logging is disabled.
pub const REDACTED_VALUE: &str = "[REDACTED]";

/// Crates whose events follow the configured level; everything else stays at `warn`.
const WORKSPACE_TARGETS: [&str; 6] = [
    "icu_cli",
    "icu_common",
    "icu_ingest",
    "icu_model",
    "icu_select",
    "icu_transform",
];

/// Returns true if row-level logging is explicitly enabled.
pub fn log_data_enabled() -> bool {
    LOG_DATA_ENABLED.load(Ordering::Relaxed)
}

/// Returns the input value when PHI logging is enabled, otherwise a redacted token.
pub fn redact_value(value: &str) -> &str {
    if log_data_enabled() {
        value
    } else {
        REDACTED_VALUE
    }
}

/// Configuration for logging behavior.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Level applied to the workspace crates.
    pub level_filter: LevelFilter,
    /// Let `RUST_LOG` replace the computed filter when it is set.
    pub use_env_filter: bool,
    /// Whether to include timestamps in log output.
    pub with_timestamps: bool,
    /// Whether to include target (module path) in log output.
    pub with_target: bool,
    /// Whether to report span close events (JSON format only).
    pub with_spans: bool,
    /// Whether to use ANSI colors in output.
    pub with_ansi: bool,
    pub format: LogFormat,
    /// Optional log file path. When set, logs are written to the file.
    pub log_file: Option<PathBuf>,
    /// Whether row-level (PHI) values may be logged.
    pub log_data: bool,
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable pretty format with colors.
    #[default]
    Pretty,
    /// Compact single-line format.
    Compact,
    /// JSON format for machine parsing.
    Json,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level_filter: LevelFilter::WARN,
            use_env_filter: true,
            with_timestamps: false,
            with_target: false,
            with_spans: true,
            with_ansi: true,
            format: LogFormat::default(),
            log_file: None,
            log_data: false,
        }
    }
}

/// Initialize the global tracing subscriber with the given configuration.
///
/// This should be called once at application startup.
///
/// # Errors
///
/// Returns an error if the log file cannot be opened.
///
/// # Panics
///
/// Panics if a global subscriber is already installed.
pub fn init_logging(config: &LogConfig) -> io::Result<()> {
    if let Some(path) = &config.log_file {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        init_logging_with_writer(config, SharedFileWriter::new(file));
    } else {
        init_logging_with_writer(config, io::stderr);
    }
    Ok(())
}

/// Initialize logging with a custom writer (useful for testing).
pub fn init_logging_with_writer<W>(config: &LogConfig, writer: W)
where
    W: for<'writer> MakeWriter<'writer> + Send + Sync + 'static,
{
    LOG_DATA_ENABLED.store(config.log_data, Ordering::Release);
    let filter = build_env_filter(config.level_filter, config.use_env_filter);

    match config.format {
        LogFormat::Json => {
            let layer = fmt::layer()
                .json()
                .with_writer(writer)
                .with_target(config.with_target)
                .with_span_events(if config.with_spans {
                    fmt::format::FmtSpan::CLOSE
                } else {
                    fmt::format::FmtSpan::NONE
                });

            tracing_subscriber::registry()
                .with(filter)
                .with(layer)
                .init();
        }
        LogFormat::Compact => {
            let layer = fmt::layer()
                .compact()
                .with_writer(writer)
                .with_ansi(config.with_ansi)
                .with_target(config.with_target);

            if config.with_timestamps {
                tracing_subscriber::registry()
                    .with(filter)
                    .with(layer)
                    .init();
            } else {
                tracing_subscriber::registry()
                    .with(filter)
                    .with(layer.without_time())
                    .init();
            }
        }
        LogFormat::Pretty => {
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(config.with_ansi)
                .with_target(config.with_target);

            if config.with_timestamps {
                tracing_subscriber::registry()
                    .with(filter)
                    .with(layer)
                    .init();
            } else {
                tracing_subscriber::registry()
                    .with(filter)
                    .with(layer.without_time())
                    .init();
            }
        }
    }
}

#[derive(Clone)]
struct SharedFileWriter {
    file: Arc<Mutex<std::fs::File>>,
}

impl SharedFileWriter {
    fn new(file: std::fs::File) -> Self {
        Self {
            file: Arc::new(Mutex::new(file)),
        }
    }
}

struct SharedFileGuard {
    file: Arc<Mutex<std::fs::File>>,
}

impl Write for SharedFileGuard {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut guard = self
            .file
            .lock()
            .map_err(|_| io::Error::other("log file lock poisoned"))?;
        guard.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut guard = self
            .file
            .lock()
            .map_err(|_| io::Error::other("log file lock poisoned"))?;
        guard.flush()
    }
}

impl<'a> MakeWriter<'a> for SharedFileWriter {
    type Writer = SharedFileGuard;

    fn make_writer(&'a self) -> Self::Writer {
        SharedFileGuard {
            file: Arc::clone(&self.file),
        }
    }
}

/// Filter directives for the workspace crates at `level`.
fn default_directives(level: LevelFilter) -> String {
    let level = level.to_string().to_lowercase();
    let mut directives = vec!["warn".to_string()];
    directives.extend(
        WORKSPACE_TARGETS
            .iter()
            .map(|target| format!("{target}={level}")),
    );
    directives.join(",")
}

/// Build an `EnvFilter` for `level`, letting `RUST_LOG` override it when allowed.
fn build_env_filter(level: LevelFilter, use_env_filter: bool) -> EnvFilter {
    if use_env_filter && let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    EnvFilter::new(default_directives(level))
}
