//! Tracing setup and log file locations.
//!
//! Two sinks share one [`EnvFilter`]:
//!
//! - `~/.visadesk/logs/visadesk.log`, JSON lines, rotated daily
//! - stderr, compact text. Quiet (warnings only) unless `-v` is given, since
//!   stdout carries the alert output itself
//!
//! Verbosity maps `0 -> info`, `1 -> debug`, `2+ -> trace` for the visadesk
//! crates. `RUST_LOG` replaces the whole filter when set.
//!
//! ```no_run
//! use visadesk_core::logging;
//!
//! let _guard = logging::init_logging(None, 1).expect("logging init");
//! tracing::debug!(task_id = "64f1c2", "deriving alerts");
//! ```

use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer,
    filter::LevelFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::error::{Result, VisadeskError};

/// Log file name inside the log directory.
pub const LOG_FILE_NAME: &str = "visadesk.log";

/// Targets that receive the verbosity-derived level.
const CRATE_TARGETS: [&str; 4] = ["visadesk", "visadesk_core", "visadesk_alerts", "visadesk_api"];

/// Flushes the file writer when dropped. Hold it until exit.
pub struct LogGuard {
    _file_guard: WorkerGuard,
}

/// Level for the visadesk crates at a given `-v` count.
pub fn level_for_verbosity(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// Filter directives used when `RUST_LOG` is unset: the visadesk crates at
/// `level`, everything else at `warn`.
pub fn default_directives(level: LevelFilter) -> String {
    let level = level.to_string().to_lowercase();
    std::iter::once("warn".to_string())
        .chain(CRATE_TARGETS.iter().map(|t| format!("{t}={level}")))
        .collect::<Vec<_>>()
        .join(",")
}

/// Install the global subscriber.
///
/// `log_dir` defaults to `~/.visadesk/logs/` and is created if missing.
pub fn init_logging(log_dir: Option<PathBuf>, verbosity: u8) -> Result<LogGuard> {
    let log_dir = match log_dir {
        Some(dir) => dir,
        None => default_log_dir()?,
    };
    std::fs::create_dir_all(&log_dir).map_err(|e| VisadeskError::DirectoryCreation {
        path: log_dir.clone(),
        source: e,
    })?;

    let (file_writer, file_guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(&log_dir, LOG_FILE_NAME));

    let level = level_for_verbosity(verbosity);
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(level)));

    let file_layer = fmt::layer()
        .json()
        .with_writer(file_writer)
        .with_ansi(false)
        .with_span_events(FmtSpan::CLOSE)
        .with_current_span(true);

    let console_level = if verbosity == 0 {
        LevelFilter::WARN
    } else {
        LevelFilter::TRACE
    };
    let console_layer = fmt::layer()
        .compact()
        .with_writer(std::io::stderr)
        .with_target(verbosity > 0)
        .with_file(verbosity > 1)
        .with_line_number(verbosity > 1)
        .with_filter(console_level);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .init();

    tracing::debug!(log_dir = %log_dir.display(), verbosity, "logging initialized");

    Ok(LogGuard {
        _file_guard: file_guard,
    })
}

/// Base directory for visadesk state: `~/.visadesk/`.
pub fn visadesk_home() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|home| home.join(".visadesk"))
        .ok_or(VisadeskError::HomeDirUnknown)
}

/// `~/.visadesk/logs/`
pub fn default_log_dir() -> Result<PathBuf> {
    Ok(visadesk_home()?.join("logs"))
}

/// `~/.visadesk/logs/visadesk.log`
pub fn default_log_file() -> Result<PathBuf> {
    Ok(default_log_dir()?.join(LOG_FILE_NAME))
}
