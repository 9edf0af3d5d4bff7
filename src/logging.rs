//! Structured logging setup, shared by the CLI driver.

use tracing_subscriber::{fmt, EnvFilter};

/// Default level when `RUST_LOG` is unset.
const DEFAULT_LOG_LEVEL: &str = "info";

/// Initializes `tracing` with an `EnvFilter` read from `RUST_LOG`, falling
/// back to [`DEFAULT_LOG_LEVEL`], a compact formatter, and no target names.
pub fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(DEFAULT_LOG_LEVEL))
        .unwrap();

    fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_level(true)
        .compact()
        .with_writer(std::io::stderr)
        .init();
}
