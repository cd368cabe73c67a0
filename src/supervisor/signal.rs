//! Turns SIGINT/SIGTERM into a group failure so an operator stop takes the
//! same path as any other error.

use std::future::Future;

use tokio_util::sync::CancellationToken;
use tracing::info;

use super::error::SupervisorError;

/// Group task: fails with [`SupervisorError::Signal`] on SIGINT or SIGTERM,
/// returns `Ok` if the group is cancelled for some other reason first.
pub async fn watch_signals(token: CancellationToken) -> Result<(), SupervisorError> {
    let signal = shutdown_signal()?;
    relay(token, signal).await
}

#[cfg(unix)]
fn shutdown_signal() -> std::io::Result<impl Future<Output = &'static str>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    Ok(async move {
        tokio::select! {
            _ = sigint.recv() => "SIGINT",
            _ = sigterm.recv() => "SIGTERM",
        }
    })
}

#[cfg(not(unix))]
fn shutdown_signal() -> std::io::Result<impl Future<Output = &'static str>> {
    Ok(async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => "SIGINT",
            Err(_) => std::future::pending().await,
        }
    })
}

async fn relay(
    token: CancellationToken,
    signal: impl Future<Output = &'static str>,
) -> Result<(), SupervisorError> {
    tokio::select! {
        biased;
        _ = token.cancelled() => Ok(()),
        name = signal => {
            info!(signal = name, "received signal");
            Err(SupervisorError::Signal(name.to_string()))
        }
    }
}
