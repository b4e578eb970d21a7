use std::fs;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Sets up console logging plus a daily-rotated JSON log file.
pub fn init_logging() {
    let _ = fs::create_dir_all("logs");

    let file_appender = tracing_appender::rolling::daily("logs", "ingest.log");
    let (non_blocking_writer, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer().json().with_writer(non_blocking_writer);
    let console_layer = fmt::layer().with_writer(std::io::stdout);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive("event_ingest=info".parse().unwrap()))
        .with(file_layer)
        .with(console_layer)
        .init();

    // The writer guard must outlive main so buffered logs get flushed.
    std::mem::forget(guard);
}
