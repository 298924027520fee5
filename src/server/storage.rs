use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::header,
    response::IntoResponse,
    routing::get,
};

use crate::ingest::content_type_for;
use crate::server::AppState;
use crate::server::response::{ApiError, ApiResponse};

pub fn storage_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/objects", get(list_objects))
        .route("/objects/{*name}", axum::routing::delete(delete_object))
}

/// GET /files/{*object} - Serve a bucket object to the browser. This is the
/// public-read surface the portal's play and thumbnail URLs point at.
pub async fn serve_object(
    State(state): State<Arc<AppState>>,
    Path(object): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let data = state.blobs.get(&object).await?;

    // The store keeps raw bytes only; the content type is re-derived from the
    // object name with the same resolver used at ingest time.
    let content_type = content_type_for(&object);

    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::CACHE_CONTROL, "public, max-age=3600"),
        ],
        data,
    ))
}

/// GET /objects - List every object in the bucket
pub async fn list_objects(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let objects = state.blobs.list().await?;

    Ok(Json(ApiResponse::success(objects)))
}

/// DELETE /objects/{*name} - Remove a single object
pub async fn delete_object(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    if !state.blobs.delete(&name).await? {
        return Err(ApiError::not_found("Object not found"));
    }

    tracing::info!("Deleted object {name}");

    Ok(Json(ApiResponse::success("Object deleted successfully")))
}
