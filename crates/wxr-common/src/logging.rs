use tracing_subscriber::{fmt, EnvFilter};

/// Environment variable that overrides the configured log level.
pub const LOG_ENV: &str = "WXR_LOG";

/// Filter from `WXR_LOG` if set, else `default_level` (normally the config's
/// `runtime.log_level`). A directive that does not parse falls back to `info`.
pub fn log_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initialize structured logging with environment filter.
/// Set WXR_LOG=debug (or trace, info, warn, error) for verbosity control;
/// otherwise `default_level` applies.
pub fn init_logging(default_level: &str) {
    fmt()
        .with_env_filter(log_filter(default_level))
        .with_target(true)
        .with_thread_ids(true)
        .init();
    warn_if_unparsed(default_level);
}

/// Install a subscriber from inside the loaded runtime library.
///
/// The host application may already own a global subscriber, so this never
/// panics and quietly keeps the existing one.
pub fn try_init_logging(default_level: &str) {
    let installed = fmt()
        .with_env_filter(log_filter(default_level))
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok();
    if installed {
        warn_if_unparsed(default_level);
    }
}

fn warn_if_unparsed(default_level: &str) {
    if std::env::var_os(LOG_ENV).is_none() && EnvFilter::try_new(default_level).is_err() {
        tracing::warn!("invalid log level {:?}, using info", default_level);
    }
}
