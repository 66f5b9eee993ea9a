//! Logging setup for the binary.
//!
//! Priority: `RUST_LOG` > `--debug` > `[logging] level` > `info`.
//! Output goes to stderr so `tail` output on stdout stays clean.

use tracing_subscriber::EnvFilter;

pub const DEFAULT_LOG_LEVEL: &str = "info";

pub fn filter(debug_flag: bool, config_level: Option<&str>) -> EnvFilter {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    filter_from(rust_log.as_deref(), debug_flag, config_level)
}

/// Picks the directives by priority. `rust_log` is the value of `RUST_LOG`,
/// if set.
pub fn filter_from(
    rust_log: Option<&str>,
    debug_flag: bool,
    config_level: Option<&str>,
) -> EnvFilter {
    let directives = match (rust_log, config_level) {
        (Some(env), _) => env,
        (None, _) if debug_flag => "debug",
        (None, Some(level)) => level,
        (None, None) => DEFAULT_LOG_LEVEL,
    };
    EnvFilter::new(directives)
}

pub fn init(debug_flag: bool, config_level: Option<&str>) {
    tracing_subscriber::fmt()
        .with_env_filter(filter(debug_flag, config_level))
        .with_writer(std::io::stderr)
        .with_target(true)
        .compact()
        .init();

    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "logging initialised");
}
