//! Tracing setup: console layer plus an optional JSON-lines file sink.

use std::io;
use std::path::Path;

use rover_config::Logging;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::cli::FILE_GUARD;

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Console output goes to stderr so stdout carries only command results.
pub fn init(json: bool, console_level: &str, file_cfg: &Logging) -> eyre::Result<()> {
    let console_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(console_level))
        .map_err(|e| eyre::eyre!("invalid log level {console_level:?}: {e}"))?;

    let mut layers: Vec<BoxedLayer> = Vec::new();
    if json {
        layers.push(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(io::stderr)
                .with_filter(console_filter)
                .boxed(),
        );
    } else {
        layers.push(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_target(false)
                .with_thread_names(true)
                .with_filter(console_filter)
                .boxed(),
        );
    }

    if let Some(path) = file_cfg.file.as_deref() {
        layers.push(file_layer(Path::new(path), file_cfg)?);
    }

    tracing_subscriber::registry()
        .with(layers)
        .try_init()
        .map_err(|e| eyre::eyre!("init logging: {e}"))
}

fn file_layer(path: &Path, cfg: &Logging) -> eyre::Result<BoxedLayer> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let name = path
        .file_name()
        .ok_or_else(|| eyre::eyre!("logging.file has no file name: {}", path.display()))?;
    std::fs::create_dir_all(dir)
        .map_err(|e| eyre::eyre!("create log dir {}: {e}", dir.display()))?;

    let appender = match cfg.rotation.as_deref().unwrap_or("never") {
        "daily" => tracing_appender::rolling::daily(dir, name),
        "hourly" => tracing_appender::rolling::hourly(dir, name),
        _ => tracing_appender::rolling::never(dir, name),
    };
    let (writer, guard) = tracing_appender::non_blocking(appender);
    if let Ok(mut slot) = FILE_GUARD.lock() {
        *slot = Some(guard);
    }

    let level = cfg.level.as_deref().unwrap_or("info");
    let filter =
        EnvFilter::try_new(level).map_err(|e| eyre::eyre!("invalid logging.level {level:?}: {e}"))?;
    Ok(tracing_subscriber::fmt::layer()
        .json()
        .with_ansi(false)
        .with_writer(writer)
        .with_filter(filter)
        .boxed())
}
