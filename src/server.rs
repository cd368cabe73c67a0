use std::sync::Arc;

use tracing::info;

use crate::api::{self, EventBufferServer, GracefulRunner, ServiceDescriptor};
use crate::background::PruneWorker;
use crate::config::AppConfig;
use crate::storage::EventStore;
use crate::supervisor::{watch_signals, SupervisorError, TaskGroup};

/// Runs every service until a signal arrives or one of them fails.
pub async fn run(config: &AppConfig) -> Result<(), SupervisorError> {
    run_with(config, TaskGroup::new()).await
}

/// Like [`run`], on a caller-supplied group. Cancelling the group's token is
/// a clean shutdown and yields `Ok(())`.
pub async fn run_with(config: &AppConfig, mut group: TaskGroup) -> Result<(), SupervisorError> {
    config.validate()?;

    let store = Arc::new(EventStore::open(&config.state_file).map_err(SupervisorError::OpenState)?);
    info!(path = %store.path().display(), events = store.len(), "State opened");

    let events = EventBufferServer::new(store.clone()).map_err(SupervisorError::StartServer)?;

    // No server accepts traffic until stale events are gone.
    let pruner = PruneWorker::new(
        store.clone(),
        config.retention_period,
        config.prune_frequency,
    );
    let removed = pruner.prune_now().map_err(SupervisorError::InitialPrune)?;
    info!(removed, "Initial prune done");

    group.spawn("signals", watch_signals);

    let services = [
        ServiceDescriptor::new("api", config.api_addr(), events.router()),
        ServiceDescriptor::new("metrics", config.metrics_listen_addr(), api::metrics::router()),
        ServiceDescriptor::new(
            "internal",
            config.internal_listen_addr(),
            api::internal::router(store.clone()),
        ),
    ];
    for service in services {
        let name = service.name.clone();
        let runner = GracefulRunner::new(service);
        group.spawn(name, move |token| runner.run(token));
    }

    group.spawn("pruner", move |token| async move { pruner.run(token).await });

    group.wait().await
}
