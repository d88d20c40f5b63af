use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

/// Map a configured level name to a tracing level. Unknown names fall back to `INFO`.
pub fn parse_level(level: &str) -> tracing::Level {
    match level.to_lowercase().as_str() {
        "error" => tracing::Level::ERROR,
        "warn" | "warning" => tracing::Level::WARN,
        "debug" => tracing::Level::DEBUG,
        "trace" => tracing::Level::TRACE,
        _ => tracing::Level::INFO,
    }
}

/// Initialize tracing/logging for the application.
///
/// `RUST_LOG` wins when set; otherwise `default_level` is used for every target.
pub fn init(default_level: &str) {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(parse_level(default_level)).into())
        .from_env_lossy();

    // try_init so tests and the CLI can call this more than once
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
