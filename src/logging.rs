use std::fs;
use std::sync::OnceLock;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

use crate::config::LoggingConfig;
use crate::error::ConversionError;

/// File name inside `LoggingConfig::directory`.
pub const LOG_FILE_NAME: &str = "feed-conversion.log";

static FILE_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Install the global subscriber: a console layer, plus a JSON file layer
/// appending to `directory/feed-conversion.log` when a directory is set.
///
/// `RUST_LOG` wins over the configured level. Safe to call more than once;
/// later calls leave the first subscriber in place.
pub fn init_logging(config: &LoggingConfig) -> Result<(), ConversionError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let mut layers: Vec<BoxedLayer> = Vec::new();
    layers.push(if config.json {
        fmt::layer().json().with_target(true).boxed()
    } else {
        fmt::layer().with_target(true).boxed()
    });

    if let Some(directory) = &config.directory {
        fs::create_dir_all(directory)?;
        let appender = tracing_appender::rolling::never(directory, LOG_FILE_NAME);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        // The first guard flushes for the process lifetime.
        let _ = FILE_GUARD.set(guard);
        layers.push(
            fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(writer)
                .boxed(),
        );
    }

    if tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .is_err()
    {
        tracing::debug!("Global tracing subscriber already initialized");
    }
    Ok(())
}
