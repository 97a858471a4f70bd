//! Tracing setup: console output plus an optional non-blocking log file.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter directive for the configured level; `--verbose` forces debug.
pub fn filter_directive(level: &str, verbose: bool) -> String {
    if verbose {
        return "debug".to_string();
    }
    match level.trim().to_lowercase().as_str() {
        "critical" | "fatal" => "error".to_string(),
        "warning" => "warn".to_string(),
        "" => "info".to_string(),
        other => other.to_string(),
    }
}

/// Install the global subscriber.
///
/// `RUST_LOG` takes precedence over `level` unless `verbose` is set. The
/// returned guard flushes the file writer on drop and must live as long as
/// the process logs.
pub fn init(level: &str, log_file: Option<&str>, verbose: bool) -> Option<WorkerGuard> {
    let filter = if verbose {
        EnvFilter::new(filter_directive(level, true))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter_directive(level, false)))
    };

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let path = Path::new(path);
            let directory = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let file_name = path
                .file_name()
                .map(|name| name.to_os_string())
                .unwrap_or_else(|| "insightfinance.log".into());

            let appender = tracing_appender::rolling::never(directory, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .init();

    guard
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_directive_maps_level_names() {
        assert_eq!(filter_directive("INFO", false), "info");
        assert_eq!(filter_directive("WARNING", false), "warn");
        assert_eq!(filter_directive("CRITICAL", false), "error");
        assert_eq!(filter_directive("", false), "info");
    }

    #[test]
    fn test_verbose_forces_debug() {
        assert_eq!(filter_directive("ERROR", true), "debug");
    }
}
