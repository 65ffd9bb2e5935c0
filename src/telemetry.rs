//! Tracing subscriber setup.

use tracing_subscriber::EnvFilter;

/// Installs a stderr subscriber at `level`, still overridable via `RUST_LOG`.
///
/// Thread names are included because the normal and current direction
/// passes run on separate threads. Calling this twice is harmless: the
/// second subscriber is simply not installed.
pub fn init_tracing(level: &str) {
    let default = format!("warn,grid_trace={level}");
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_names(true)
        .try_init();
}
