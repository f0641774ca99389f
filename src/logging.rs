use log::{debug, error, info, log_enabled, warn, Level, LevelFilter};

/// Initializes the logger with the `env_logger` crate.
///
/// Honours `RUST_LOG`; calling it more than once is harmless.
pub fn init_logger() {
    let _ = env_logger::try_init();
}

/// Initializes `env_logger` with `level` as the default filter.
///
/// `RUST_LOG` directives still override the default for matching modules.
///
/// # Examples
/// ```rust,no_run
/// use rpi_components::logging::init_logger_with_level;
///
/// init_logger_with_level(log::LevelFilter::Debug);
/// log::debug!("radio bring-up starting");
/// ```
pub fn init_logger_with_level(level: LevelFilter) {
    let _ = env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp_millis()
        .try_init();
}

/// Map a `-v` repetition count onto a level filter
pub fn level_from_verbosity(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Logs an error message.
pub fn log_error(message: &str) {
    if log_enabled!(Level::Error) {
        error!("{message}");
    }
}

/// Logs a warning message.
pub fn log_warn(message: &str) {
    if log_enabled!(Level::Warn) {
        warn!("{message}");
    }
}

/// Logs an informational message.
pub fn log_info(message: &str) {
    if log_enabled!(Level::Info) {
        info!("{message}");
    }
}

/// Logs a debug message.
pub fn log_debug(message: &str) {
    if log_enabled!(Level::Debug) {
        debug!("{message}");
    }
}
