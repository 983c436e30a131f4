//! Tracing subscriber setup.
//!
//! Stdout is always on (plain or JSON).  With `PARLEY_LOG_DIR` set, a
//! daily-rolling `parley-server.log` is written there as well, through a
//! non-blocking writer whose guard must outlive the server.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, fmt, prelude::*};

use crate::config::Config;

const LOG_FILE_PREFIX: &str = "parley-server.log";

/// Resolve the filter: `RUST_LOG` wins, then `PARLEY_LOG`, then `info`.
fn env_filter(level: &str) -> EnvFilter {
    match EnvFilter::try_from_default_env() {
        Ok(f) => f,
        Err(_) => match level.parse::<EnvFilter>() {
            Ok(f) => f,
            Err(e) => {
                eprintln!(
                    "WARN: PARLEY_LOG='{level}' is not a valid tracing filter ({e}); \
                     falling back to 'info'"
                );
                EnvFilter::new("info")
            }
        },
    }
}

/// Install the global subscriber.  Returns the file writer guard, if any.
pub fn init(cfg: &Config) -> Option<WorkerGuard> {
    let stdout_layer = if cfg.log_json {
        fmt::layer().json().with_target(true).boxed()
    } else {
        fmt::layer().with_target(true).with_thread_ids(true).boxed()
    };

    let (file_layer, guard) = match &cfg.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_ansi(false).with_writer(writer).boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter(&cfg.log_level))
        .with(stdout_layer)
        .with(file_layer)
        .init();

    guard
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn invalid_level_falls_back_to_info() {
        // RUST_LOG takes precedence; only meaningful when it is unset.
        if std::env::var("RUST_LOG").is_err() {
            let filter = env_filter("parley_server=bogus");
            assert_eq!(filter.to_string(), "info");
        }
    }
}
