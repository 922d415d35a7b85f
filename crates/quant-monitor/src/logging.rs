//! Logging setup.

use std::path::Path;
use std::str::FromStr;

use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter, Layer, Registry};

#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("Unknown log format '{0}' (expected pretty, compact or json)")]
    UnknownFormat(String),

    #[error("Invalid log level: {0}")]
    InvalidLevel(String),

    #[error("Logging already initialized: {0}")]
    AlreadyInitialized(String),
}

/// Stdout log layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Compact,
    Json,
}

impl FromStr for LogFormat {
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "compact" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            other => Err(LoggingError::UnknownFormat(other.to_string())),
        }
    }
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Install the global subscriber.
///
/// `RUST_LOG` takes precedence over `level`. With `file` set, records are
/// also written (without ANSI colour, JSON when `format` is json) to a file
/// rolled daily; keep the returned guard alive until exit so it flushes.
pub fn setup_logging(level: &str, format: LogFormat, file: Option<&Path>) -> Result<Option<WorkerGuard>, LoggingError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level).map_err(|e| LoggingError::InvalidLevel(e.to_string()))?,
    };

    let mut layers: Vec<BoxedLayer> = vec![match format {
        LogFormat::Pretty => fmt::layer().pretty().boxed(),
        LogFormat::Compact => fmt::layer().compact().boxed(),
        LogFormat::Json => fmt::layer().json().boxed(),
    }];

    let mut guard = None;
    if let Some(path) = file {
        let dir = path.parent().filter(|d| !d.as_os_str().is_empty()).unwrap_or(Path::new("."));
        let name = path.file_name().map(|n| n.to_os_string()).unwrap_or_else(|| "quantcore.log".into());
        let (writer, worker) = tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, name));
        let layer = fmt::layer().with_ansi(false).with_writer(writer);
        layers.push(match format {
            LogFormat::Json => layer.json().boxed(),
            _ => layer.compact().boxed(),
        });
        guard = Some(worker);
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))?;
    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_parsing() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!(" compact ".parse::<LogFormat>().unwrap(), LogFormat::Compact);
        assert!(matches!("xml".parse::<LogFormat>(), Err(LoggingError::UnknownFormat(_))));
    }

    #[test]
    fn test_file_logging_installs_once() {
        let dir = std::env::temp_dir().join(format!("quant-monitor-{}", std::process::id()));
        let guard = setup_logging("debug", LogFormat::Compact, Some(&dir.join("test.log"))).unwrap();
        assert!(guard.is_some());
        tracing::info!("file logging ready");

        // The global subscriber can only be set once per process
        assert!(matches!(
            setup_logging("info", LogFormat::Pretty, None),
            Err(LoggingError::AlreadyInitialized(_))
        ));
        drop(guard);
        let _ = std::fs::remove_dir_all(dir);
    }
}
