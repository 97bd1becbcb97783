use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

/// Initialize tracing/logging for the application.
///
/// `default_level` is one of `error`, `warn`, `info`, `debug`, `trace`;
/// anything else falls back to `info`. `RUST_LOG`, when set, wins.
pub fn init(default_level: &str) {
    let lvl = match default_level.to_lowercase().as_str() {
        "error" => tracing::Level::ERROR,
        "warn" | "warning" => tracing::Level::WARN,
        "debug" => tracing::Level::DEBUG,
        "trace" => tracing::Level::TRACE,
        _ => tracing::Level::INFO,
    };

    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(lvl).into())
        .from_env_lossy();

    // try_init so tests can call this repeatedly
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
