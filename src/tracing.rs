//! Log output for the `hilite` binary
//!
//! Two sinks share one registry:
//! - stderr, filtered by `RUST_LOG` or the level passed to [`init`], so that
//!   highlighted text on stdout is never interleaved with log lines
//! - `logs/hilite.log` under the config directory, rotated daily and always
//!   at debug level, which records dropped tokens and lane activity
//!
//! Useful filters: `RUST_LOG=hilite::session=trace` follows every task on
//! the lane, `RUST_LOG=hilite::projector=debug` shows rejected tokens.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Install both sinks. `default_level` is the stderr filter when `RUST_LOG`
/// is unset. If the log directory cannot be created only stderr is used.
pub fn init(default_level: &str) {
    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_line_number(true)
        .with_filter(console_filter);

    let file_layer = match crate::config_paths::ensure_logs_dir() {
        Ok(logs_dir) => {
            let file_appender = tracing_appender::rolling::daily(logs_dir, "hilite.log");
            Some(
                fmt::layer()
                    .with_writer(file_appender)
                    .with_ansi(false)
                    .with_target(true)
                    .with_line_number(true)
                    .with_thread_names(true)
                    .with_filter(EnvFilter::new("debug")),
            )
        }
        Err(e) => {
            eprintln!("Warning: Could not initialize file logging: {}", e);
            None
        }
    };

    // A host may already have installed a subscriber
    if let Err(e) = tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()
    {
        eprintln!("Warning: tracing already initialized: {}", e);
    }
}
