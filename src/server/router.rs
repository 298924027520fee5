use std::sync::Arc;
use std::time::Instant;

use axum::extract::{DefaultBodyLimit, Request};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::{Router, routing::get};

use super::auth::auth_router;
use super::categories::categories_router;
use super::games::games_router;
use super::portal::portal_router;
use super::storage::{serve_object, storage_router};
use super::students::students_router;
use crate::blob::BlobStorage;
use crate::store::Store;

pub struct AppState {
    pub store: Arc<dyn Store>,
    pub blobs: BlobStorage,
    /// Public base URL for external access. Used when building play URLs.
    pub public_base_url: Option<String>,
}

impl AppState {
    /// Prefix under which bucket objects are reachable by browsers.
    #[must_use]
    pub fn files_base(&self) -> String {
        match &self.public_base_url {
            Some(base) => format!("{}/files", base.trim_end_matches('/')),
            None => "/files".to_string(),
        }
    }
}

async fn health() -> &'static str {
    "OK"
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let response = next.run(request).await;

    let latency = start.elapsed();
    let status = response.status();

    tracing::info!(
        "{} {} {} {}ms",
        method,
        uri.path(),
        status.as_u16(),
        latency.as_millis()
    );

    response
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/auth", auth_router())
        .nest("/api/games", games_router())
        .nest("/api/games-categories", categories_router())
        .nest("/api/game-center", portal_router())
        .nest("/api/students", students_router())
        .nest("/api/storage", storage_router())
        // Bucket contents are public-read so uploaded games load in a browser.
        .route("/files/{*object}", get(serve_object))
        // Uploads can be large zip bundles; the size check in the upload
        // handler is the real limit, this just keeps axum out of the way.
        .layer(DefaultBodyLimit::max(crate::server::games::MAX_UPLOAD_SIZE + 1024 * 1024))
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}
