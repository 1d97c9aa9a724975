//! File-based logging initialization

use super::config::{DebugConfig, LOG_FILE_PREFIX};
use std::fs;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the logging system
///
/// Sets up:
/// - Daily log rotation under `config.log_dir`
/// - Optional stdout mirror (`DASHBOARD_LOG_STDOUT=1`)
/// - Non-blocking writes
/// - Panic hook integration for crash logging
///
/// The returned guards flush the file writer when dropped, so keep them alive
/// for the lifetime of the program. Returns an empty vec when the log
/// directory cannot be created.
pub fn init(config: &DebugConfig) -> Vec<WorkerGuard> {
    if let Err(e) = fs::create_dir_all(&config.log_dir) {
        eprintln!("Warning: Failed to create log directory: {}", e);
        return Vec::new();
    }

    let file_appender = tracing_appender::rolling::daily(&config.log_dir, LOG_FILE_PREFIX);
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);
    let mut guards = vec![file_guard];

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("dashboard=info,warn"));

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false);

    let stdout_layer = if config.log_to_stdout {
        let (non_blocking_stdout, stdout_guard) = tracing_appender::non_blocking(std::io::stdout());
        guards.push(stdout_guard);
        Some(fmt::layer().with_writer(non_blocking_stdout).with_target(false).compact())
    } else {
        None
    };

    let result = tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .try_init();

    if let Err(e) = result {
        eprintln!("Warning: Logging already initialized: {}", e);
        return guards;
    }

    tracing::info!(
        log_file = %config.log_file().display(),
        debug = config.is_debug_enabled(),
        log_level = %config.log_level,
        stdout = config.log_to_stdout,
        "Logging initialized"
    );

    setup_panic_hook();
    guards
}

/// Log panics with their location before handing over to the default hook.
fn setup_panic_hook() {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let payload = info.payload();
        let message = payload
            .downcast_ref::<&str>()
            .copied()
            .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
            .unwrap_or("<non-string panic payload>");
        let thread = std::thread::current();

        match info.location() {
            Some(location) => tracing::error!(
                thread = thread.name().unwrap_or("<unnamed>"),
                file = location.file(),
                line = location.line(),
                reason = message,
                "Dashboard client panicked"
            ),
            None => tracing::error!(
                thread = thread.name().unwrap_or("<unnamed>"),
                reason = message,
                "Dashboard client panicked"
            ),
        }

        previous(info);
    }));
}
