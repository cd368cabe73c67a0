use axum::extract::{Query, State};
use axum::Json;
use base64::Engine;
use std::sync::Arc;

use crate::api::error::ApiError;
use crate::api::rest::types::*;
use crate::background::metrics::EVENTS_APPENDED;
use crate::storage::EventStore;

pub async fn append_handler(
    State(store): State<Arc<EventStore>>,
    Json(params): Json<AppendParams>,
) -> Result<Json<AppendResponse>, ApiError> {
    let payload = base64::engine::general_purpose::STANDARD
        .decode(&params.payload)
        .map_err(|_| ApiError::InvalidRequest("Invalid base64 payload".to_string()))?;

    // Appending persists the state file before returning.
    let id = tokio::task::spawn_blocking(move || store.append(payload))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))??;
    EVENTS_APPENDED.inc();

    Ok(Json(AppendResponse { id }))
}

pub async fn range_handler(
    State(store): State<Arc<EventStore>>,
    Query(params): Query<RangeParams>,
) -> Result<Json<RangeResponse>, ApiError> {
    if params.limit == 0 {
        return Err(ApiError::InvalidRequest("limit must be positive".to_string()));
    }

    let (events, has_more) = store.range(params.after, params.limit.min(MAX_LIMIT));
    let events = events
        .into_iter()
        .map(|event| EventItem {
            id: event.id,
            timestamp: event.timestamp,
            payload: base64::engine::general_purpose::STANDARD.encode(&event.payload),
        })
        .collect();

    Ok(Json(RangeResponse { events, has_more }))
}
