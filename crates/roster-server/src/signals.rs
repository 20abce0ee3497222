//! Process shutdown signals.
//!
//! `SIGINT` (`Ctrl-C`) and, on Unix, `SIGTERM` both start a graceful
//! shutdown. The `SIGTERM` handler is installed when [`shutdown_signal`] is
//! called rather than when its future is first polled, so a container stop
//! racing the spawn is not lost.

use std::future::Future;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Resolve with the signal's name once `SIGINT` or `SIGTERM` arrives.
///
/// A signal whose handler cannot be installed is logged and never fires;
/// the other one still does.
pub fn shutdown_signal() -> impl Future<Output = &'static str> + Send {
    #[cfg(unix)]
    let terminate = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate());

    async move {
        let interrupt = async {
            match tokio::signal::ctrl_c().await {
                Ok(()) => "SIGINT",
                Err(e) => {
                    warn!(error = %e, "failed to listen for SIGINT");
                    std::future::pending().await
                }
            }
        };

        #[cfg(unix)]
        let terminate = async move {
            match terminate {
                Ok(mut stream) => {
                    stream.recv().await;
                    "SIGTERM"
                }
                Err(e) => {
                    warn!(error = %e, "failed to listen for SIGTERM");
                    std::future::pending().await
                }
            }
        };
        #[cfg(not(unix))]
        let terminate = std::future::pending::<&'static str>();

        tokio::select! {
            name = interrupt => name,
            name = terminate => name,
        }
    }
}

/// Cancel `shutdown` when `signal` resolves.
pub async fn cancel_on<F>(signal: F, shutdown: CancellationToken)
where
    F: Future<Output = &'static str>,
{
    let name = signal.await;
    info!(signal = name, "shutdown signal received");
    shutdown.cancel();
}
