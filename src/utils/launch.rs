use futures::future::Future;
use snafu::{ResultExt, Snafu};
use std::path::Path;
use tokio::runtime;
use tracing::error;

use super::logger::{logger_init, Error as LoggerError};

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("Could not build the tokio runtime: {}", source))]
    Runtime { source: std::io::Error },

    #[snafu(display("Logger Error: {}", source))]
    Logger { source: LoggerError },

    #[snafu(display("Execution Error: {}", source))]
    Execution {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Run `future` to completion on a multi threaded runtime, with the logger
/// installed for the whole run.
///
/// Without `nb_threads`, the runtime uses one worker per core.
pub fn launch_with_runtime<F, E>(
    nb_threads: Option<usize>,
    log_path: Option<&Path>,
    future: F,
) -> Result<(), Error>
where
    F: Future<Output = Result<(), E>>,
    E: std::error::Error + Send + Sync + 'static,
{
    let runtime = runtime::Builder::new_multi_thread()
        .worker_threads(nb_threads.unwrap_or_else(num_cpus::get))
        .enable_all()
        .build()
        .context(RuntimeSnafu)?;

    // Dropping the guard flushes the log records, so it must outlive the run.
    let guard = logger_init(log_path).context(LoggerSnafu)?;
    let res = runtime.block_on(launch_async(future));
    drop(guard);
    res
}

/// Await `future`, and log its error before handing it back.
pub async fn launch_async<F, E>(future: F) -> Result<(), Error>
where
    F: Future<Output = Result<(), E>>,
    E: std::error::Error + Send + Sync + 'static,
{
    future.await.map_err(|err| {
        error!("{}", err);
        Error::Execution {
            source: Box::new(err),
        }
    })
}
