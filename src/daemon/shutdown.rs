use tokio::select;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Waits for a termination signal and cancels `cancelation`. Returns early if something else
/// already cancelled it.
///
/// On Windows detached processes can't detect signals sent to them, so `sitetime stop` kills them
/// instead and the last checkpoint is what remains saved.
pub async fn detect_shutdown(cancelation: CancellationToken) {
    select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received interrupt");
        },
        _ = terminate() => {
            info!("Received terminate signal");
        },
        _ = cancelation.cancelled() => (),
    };
    cancelation.cancel();
}

#[cfg(unix)]
async fn terminate() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut stream) => {
            stream.recv().await;
        }
        Err(e) => {
            tracing::error!("Can't listen for SIGTERM {e:?}");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    std::future::pending::<()>().await;
}
