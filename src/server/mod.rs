//! Server wiring
//!
//! Opens the trace, starts the batch reader, serves HTTP, and coordinates
//! shutdown between the two.

use std::future::{Future, IntoFuture};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::api::{create_router, AppState};
use crate::batcher::BatcherConfig;
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::lifecycle::{supervise, BatchReader, Shutdown};
use crate::source::{open_input, EventSource};

/// Run until `signal` fires (or the HTTP server exits) and both units stop
pub async fn run<F>(config: Config, signal: F) -> AppResult<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let source = open_input(config.input.as_deref())?;
    let listener = TcpListener::bind(&config.addr).await?;
    serve(
        listener,
        source,
        config.batcher(),
        &config.assets,
        config.shutdown_timeout(),
        signal,
    )
    .await
}

/// Serve an already opened source on an already bound listener
pub async fn serve<S, F>(
    listener: TcpListener,
    source: S,
    batcher: BatcherConfig,
    assets: &Path,
    shutdown_timeout: Duration,
    signal: F,
) -> AppResult<()>
where
    S: EventSource + 'static,
    F: Future<Output = ()> + Send + 'static,
{
    let reader = BatchReader::start(source, batcher).map_err(AppError::Spawn)?;
    let app = create_router(Arc::new(AppState::new(reader.store())), assets);
    let shutdown = Shutdown::new();

    // Signal or server exit: stop ingestion and close the server
    tokio::spawn({
        let reader = reader.clone();
        let shutdown = shutdown.clone();
        async move {
            tokio::select! {
                _ = signal => {}
                _ = shutdown.wait() => {}
            }
            info!("shutting down");
            reader.stop();
            shutdown.trigger();
        }
    });

    let addr = listener.local_addr()?;
    let server = {
        let shutdown = shutdown.clone();
        async move {
            info!(%addr, "starting http server");
            let graceful = {
                let shutdown = shutdown.clone();
                async move { shutdown.wait().await }
            };
            let serving = axum::serve(listener, app)
                .with_graceful_shutdown(graceful)
                .into_future();
            tokio::pin!(serving);

            let result = tokio::select! {
                result = &mut serving => result,
                _ = async {
                    shutdown.wait().await;
                    tokio::time::sleep(shutdown_timeout).await;
                } => {
                    warn!(timeout = ?shutdown_timeout, "graceful shutdown timed out");
                    Ok(())
                }
            };

            debug!("stopped http server");
            shutdown.trigger();
            result.map_err(AppError::Server)
        }
    };

    supervise(server, reader.wait()).await
}
