//! Internal/admin surface: `GET /dump` returns a consistent snapshot of the store.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use bytes::Bytes;

use crate::background::metrics::DUMPS;
use crate::storage::{EventStore, StorageError};

/// Anything that can produce an encoded point-in-time copy of itself.
pub trait SnapshotSource: Send + Sync {
    fn snapshot(&self) -> Result<Bytes, StorageError>;
}

impl SnapshotSource for EventStore {
    fn snapshot(&self) -> Result<Bytes, StorageError> {
        EventStore::snapshot(self)
    }
}

pub fn router(source: Arc<dyn SnapshotSource>) -> Router {
    Router::new()
        .route("/dump", get(dump_handler))
        .with_state(source)
}

async fn dump_handler(State(source): State<Arc<dyn SnapshotSource>>) -> Response {
    // Serialising a large store is CPU-bound; keep it off the reactor.
    let result = tokio::task::spawn_blocking(move || source.snapshot()).await;

    let err = match result {
        Ok(Ok(body)) => {
            DUMPS.inc();
            return ([(header::CONTENT_TYPE, "application/binary")], body).into_response();
        }
        Ok(Err(e)) => e.to_string(),
        Err(e) => e.to_string(),
    };

    tracing::error!(error = %err, "could not write dump");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        format!("could not write dump: {}", err),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tempfile::TempDir;
    use tower::ServiceExt;

    use crate::storage::snapshot;

    struct BrokenSource;

    impl SnapshotSource for BrokenSource {
        fn snapshot(&self) -> Result<Bytes, StorageError> {
            Err(StorageError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "read tx failed",
            )))
        }
    }

    fn get_dump() -> Request<Body> {
        Request::get("/dump").body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_dump_returns_binary_snapshot() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(EventStore::open(dir.path().join("state")).unwrap());
        store.append(b"one".to_vec()).unwrap();
        store.append(b"two".to_vec()).unwrap();
        let store_snapshot = store.snapshot().unwrap();

        let response = router(store).oneshot(get_dump()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/binary"
        );

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(body, store_snapshot);
        let state = snapshot::decode(&body).unwrap();
        assert_eq!(state.events.len(), 2);
        assert_eq!(state.last_id, 2);
    }

    #[tokio::test]
    async fn test_dump_failure_is_server_error() {
        let response = router(Arc::new(BrokenSource)).oneshot(get_dump()).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = String::from_utf8(body.to_vec()).unwrap();
        assert!(body.starts_with("could not write dump: "));
        assert!(body.contains("read tx failed"));
    }

    #[tokio::test]
    async fn test_dump_rejects_other_methods() {
        let response = router(Arc::new(BrokenSource))
            .oneshot(Request::post("/dump").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
