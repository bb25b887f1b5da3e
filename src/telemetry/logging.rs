//! Logging configuration and initialization
//!
//! Structured logging with tracing: compact console output for development,
//! JSON for log aggregation, and an optional daily-rotated log file.

use std::path::PathBuf;

use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

pub use tracing_appender::non_blocking::WorkerGuard as LogGuard;

/// Filter directive variable, checked before `RUST_LOG`.
pub const LOG_ENV: &str = "SHADER_STACK_LOG";
/// Set to `json` for JSON console output.
pub const LOG_FORMAT_ENV: &str = "SHADER_STACK_LOG_FORMAT";

const LOG_FILE_PREFIX: &str = "shader-stack.log";

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("cannot create log directory {path}: {source}")]
    Directory {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("a global subscriber is already installed: {0}")]
    Subscriber(#[from] tracing_subscriber::util::TryInitError),
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Enable console output (default: true)
    pub console_enabled: bool,
    /// Enable file logging (default: false)
    pub file_enabled: bool,
    /// Directory for log files (default: `logs` in the working directory)
    pub file_dir: Option<PathBuf>,
    /// Use JSON format for console logs (default: false)
    pub json_format: bool,
    /// Filter used when no environment override is set (default: "info")
    pub default_level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            console_enabled: true,
            file_enabled: false,
            file_dir: None,
            json_format: false,
            default_level: "info".to_string(),
        }
    }
}

/// Whether a `SHADER_STACK_LOG_FORMAT` value asks for JSON.
fn json_requested(format: Option<&str>, default: bool) -> bool {
    format.map_or(default, |value| value.eq_ignore_ascii_case("json"))
}

/// Install the global subscriber.
///
/// The returned guard flushes the log file on drop and must live as long as
/// the program when file logging is enabled.
///
/// # Environment Variables
///
/// - `SHADER_STACK_LOG`: filter directives (e.g. "debug", "info,shader_stack=trace"),
///   falling back to `RUST_LOG`, then to `LogConfig::default_level`
/// - `SHADER_STACK_LOG_FORMAT`: set to "json" for JSON output
pub fn init_logging(config: &LogConfig) -> Result<Option<LogGuard>, LoggingError> {
    let env_filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_env("RUST_LOG"))
        .unwrap_or_else(|_| EnvFilter::new(&config.default_level));

    let format = std::env::var(LOG_FORMAT_ENV).ok();
    let use_json = json_requested(format.as_deref(), config.json_format);

    let mut file_guard = None;
    let file_layer = if config.file_enabled {
        let dir = config.file_dir.clone().unwrap_or_else(|| PathBuf::from("logs"));
        std::fs::create_dir_all(&dir).map_err(|source| LoggingError::Directory {
            path: dir.clone(),
            source,
        })?;
        let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::daily(&dir, LOG_FILE_PREFIX));
        file_guard = Some(guard);
        eprintln!("Logging to {}", dir.join(LOG_FILE_PREFIX).display());

        Some(
            fmt::layer()
                .with_writer(writer)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_ansi(false),
        )
    } else {
        None
    };

    let json_layer = (config.console_enabled && use_json).then(|| {
        fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
    });

    let console_layer = (config.console_enabled && !use_json).then(|| {
        fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .compact()
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(json_layer)
        .with(console_layer)
        .try_init()?;

    tracing::info!(
        target: "shader_stack",
        version = env!("CARGO_PKG_VERSION"),
        json_format = use_json,
        file_enabled = config.file_enabled,
        "Logging initialized"
    );

    Ok(file_guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_config_default() {
        let config = LogConfig::default();
        assert!(config.console_enabled);
        assert!(!config.file_enabled);
        assert!(!config.json_format);
        assert_eq!(config.default_level, "info");
    }

    #[test]
    fn test_json_format_override() {
        assert!(json_requested(Some("JSON"), false));
        assert!(!json_requested(Some("pretty"), true));
        assert!(json_requested(None, true));
        assert!(!json_requested(None, false));
    }
}
