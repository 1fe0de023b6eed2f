use snafu::{ResultExt, Snafu};
use std::fs::OpenOptions;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_log::LogTracer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Registry};

/// Used when `RUST_LOG` is not set.
const DEFAULT_FILTER: &str = "esdrain=info,drain=info";

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("Could not init log file: {}", source))]
    InitLog { source: std::io::Error },

    #[snafu(display("Could not capture log records: {}", source))]
    LogTracerInit {
        source: tracing_log::log::SetLoggerError,
    },

    #[snafu(display("Could not install the tracing subscriber: {}", source))]
    SubscriberInit {
        source: tracing::subscriber::SetGlobalDefaultError,
    },
}

/// Install the global subscriber, writing bunyan formatted JSON records.
///
/// With a directory, records go to a daily rolling file, with a file path
/// they are appended to that file, and without path they go to stdout.
/// The returned guard flushes pending records when dropped, so it must be
/// kept alive for the duration of the program.
pub fn logger_init(path: Option<&Path>) -> Result<WorkerGuard, Error> {
    LogTracer::init().context(LogTracerInitSnafu)?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let app_name = concat!(env!("CARGO_PKG_NAME"), "-", env!("CARGO_PKG_VERSION")).to_string();

    let (non_blocking, guard) = match path {
        Some(path) if path.is_dir() => {
            let file_appender = tracing_appender::rolling::daily(path, "esdrain.log");
            tracing_appender::non_blocking(file_appender)
        }
        Some(path) => tracing_appender::non_blocking(
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .context(InitLogSnafu)?,
        ),
        None => tracing_appender::non_blocking(std::io::stdout()),
    };

    let bunyan_formatting_layer = BunyanFormattingLayer::new(app_name, non_blocking);
    let subscriber = Registry::default()
        .with(filter)
        .with(JsonStorageLayer)
        .with(bunyan_formatting_layer);
    tracing::subscriber::set_global_default(subscriber).context(SubscriberInitSnafu)?;

    Ok(guard)
}
