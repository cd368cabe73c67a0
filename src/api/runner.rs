use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder;
use hyper_util::service::TowerToHyperService;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::supervisor::SupervisorError;

/// How long in-flight requests get after shutdown is requested.
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

/// A named HTTP service and where it listens.
#[derive(Debug, Clone)]
pub struct ServiceDescriptor {
    pub name: String,
    pub addr: String,
    pub router: Router,
}

impl ServiceDescriptor {
    pub fn new(name: impl Into<String>, addr: impl Into<String>, router: Router) -> Self {
        Self {
            name: name.into(),
            addr: addr.into(),
            router,
        }
    }
}

/// Serves one [`ServiceDescriptor`] until the group token is cancelled, then
/// shuts down gracefully within the deadline or closes every connection.
#[derive(Debug)]
pub struct GracefulRunner {
    service: ServiceDescriptor,
    shutdown_timeout: Duration,
}

impl GracefulRunner {
    pub fn new(service: ServiceDescriptor) -> Self {
        Self {
            service,
            shutdown_timeout: SHUTDOWN_TIMEOUT,
        }
    }

    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    pub async fn bind(self) -> Result<BoundServer, SupervisorError> {
        let ServiceDescriptor { name, addr, router } = self.service;

        let listener = match TcpListener::bind(&addr).await {
            Ok(listener) => listener,
            Err(source) => return Err(SupervisorError::Bind { name, addr, source }),
        };

        Ok(BoundServer {
            name,
            listener,
            router,
            shutdown_timeout: self.shutdown_timeout,
        })
    }

    /// Group task: bind, then serve until cancelled.
    pub async fn run(self, token: CancellationToken) -> Result<(), SupervisorError> {
        self.bind().await?.serve(token).await
    }
}

#[derive(Debug)]
pub struct BoundServer {
    name: String,
    listener: TcpListener,
    router: Router,
    shutdown_timeout: Duration,
}

impl BoundServer {
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Only failures that happen before `token` is cancelled are errors.
    /// Once shutdown has been requested the result is always `Ok`, forced
    /// close included. Every connection is closed by the time this returns.
    pub async fn serve(self, token: CancellationToken) -> Result<(), SupervisorError> {
        let BoundServer {
            name,
            listener,
            router,
            shutdown_timeout,
        } = self;

        let local = listener.local_addr()?;
        info!(addr = %local, "{} server started", name);

        let mut connections = JoinSet::new();
        let accept_error = loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break None,
                accepted = listener.accept() => match accepted {
                    Ok((stream, remote)) => {
                        debug!(server = %name, remote = %remote, "connection accepted");
                        connections.spawn(serve_connection(stream, router.clone(), token.clone()));
                    }
                    Err(e) if is_connection_error(&e) => {
                        debug!(server = %name, error = %e, "accept failed for one connection");
                    }
                    Err(e) => break Some(e),
                },
                Some(_) = connections.join_next(), if !connections.is_empty() => {}
            }
        };
        drop(listener);

        if let Some(source) = accept_error {
            connections.abort_all();
            while connections.join_next().await.is_some() {}
            return Err(SupervisorError::Serve { name, source });
        }

        info!("graceful shutdown of the {} server", name);
        let drained = tokio::time::timeout(shutdown_timeout, async {
            while connections.join_next().await.is_some() {}
        })
        .await;

        match drained {
            Ok(()) => debug!(server = %name, "server stopped"),
            Err(_) => {
                info!("{} server did not shut down gracefully, forcing close", name);
                // Aborting a connection task drops its socket.
                connections.abort_all();
                while connections.join_next().await.is_some() {}
            }
        }

        Ok(())
    }
}

/// Serves HTTP/1 and HTTP/2 on one accepted socket. Once `token` is
/// cancelled the connection finishes its in-flight requests and closes.
async fn serve_connection(stream: TcpStream, router: Router, token: CancellationToken) {
    let builder = Builder::new(TokioExecutor::new());
    let connection = builder
        .serve_connection_with_upgrades(TokioIo::new(stream), TowerToHyperService::new(router));
    tokio::pin!(connection);

    let result = tokio::select! {
        result = connection.as_mut() => result,
        _ = token.cancelled() => {
            connection.as_mut().graceful_shutdown();
            connection.await
        }
    };

    if let Err(e) = result {
        debug!(error = %e, "connection closed with error");
    }
}

/// Errors that only concern the connection being accepted.
fn is_connection_error(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        std::io::ErrorKind::ConnectionRefused
            | std::io::ErrorKind::ConnectionAborted
            | std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::Interrupted
    )
}
