//! Global subscriber installation.

use bridge_traits::time::LogLevel;
use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};

#[test]
fn test_logging_initializes_once() {
    // One global subscriber per process: keep this the only test in the binary.
    let config = LoggingConfig::default()
        .with_format(LogFormat::Json)
        .with_level(LogLevel::Debug)
        .with_filter("core_runtime=debug");

    init_logging(config.clone()).expect("first initialization succeeds");
    tracing::info!(row = 2, source_id = "1AbC", "logging is live");

    assert!(matches!(
        init_logging(config),
        Err(core_runtime::Error::Config(_))
    ));
}
