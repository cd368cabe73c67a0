pub mod handler;
pub mod types;

use axum::extract::Request;
use axum::routing::post;
use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::Level;

use crate::storage::{EventStore, StorageError};

/// The primary event-buffer API.
#[derive(Debug, Clone)]
pub struct EventBufferServer {
    store: Arc<EventStore>,
}

impl EventBufferServer {
    pub fn new(store: Arc<EventStore>) -> Result<Self, StorageError> {
        store.check()?;
        Ok(Self { store })
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route(
                "/events",
                post(handler::append_handler).get(handler::range_handler),
            )
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request| {
                tracing::span!(
                    Level::INFO,
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }))
            .with_state(self.store.clone())
    }
}
