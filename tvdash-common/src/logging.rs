//! Tracing subscriber bootstrap shared by tvdash binaries

use crate::config::LoggingConfig;
use crate::{Error, Result};
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Build the env filter
///
/// `RUST_LOG` wins when set. Otherwise `debug` forces the debug level, else the
/// configured level is used. `extra_directives` are appended (e.g. `tower_http=debug`).
pub fn build_filter(config: &LoggingConfig, debug: bool, extra_directives: &[&str]) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }

    let level = if debug { "debug" } else { config.level.as_str() };
    let mut filter_str = level.to_string();
    for directive in extra_directives {
        filter_str.push(',');
        filter_str.push_str(directive);
    }

    EnvFilter::try_new(&filter_str).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global tracing subscriber
///
/// Logs go to stderr, or are appended to `config.file` when set. A second call
/// (e.g. from tests) leaves the first subscriber in place.
pub fn init_tracing(config: &LoggingConfig, debug: bool, extra_directives: &[&str]) -> Result<()> {
    let filter = build_filter(config, debug, extra_directives);
    let registry = tracing_subscriber::registry().with(filter);

    match &config.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| {
                    Error::Config(format!("Failed to open log file {}: {}", path.display(), e))
                })?;
            let _ = registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(Mutex::new(file)),
                )
                .try_init();
        }
        None => {
            let _ = registry.with(tracing_subscriber::fmt::layer()).try_init();
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_filter_debug_flag_overrides_level() {
        if std::env::var("RUST_LOG").is_ok() {
            return;
        }
        let cfg = LoggingConfig {
            level: "warn".to_string(),
            file: None,
        };
        let filter = build_filter(&cfg, true, &["tower_http=debug"]);
        let rendered = filter.to_string();
        assert!(rendered.contains("debug"));
        assert!(rendered.contains("tower_http=debug"));
    }
}
