use thiserror::Error;

use crate::config::ConfigError;
use crate::storage::error::StorageError;

#[derive(Error, Debug)]
pub enum SupervisorError {
    #[error("received signal {0}")]
    Signal(String),

    #[error("could not listen for {name} requests on {addr}: {source}")]
    Bind {
        name: String,
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{name} server failed: {source}")]
    Serve {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("task {name} panicked")]
    TaskPanicked { name: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("could not open state: {0}")]
    OpenState(#[source] StorageError),

    #[error("could not start server: {0}")]
    StartServer(#[source] StorageError),

    #[error("could not prune stale events: {0}")]
    InitialPrune(#[source] StorageError),
}
