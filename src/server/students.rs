use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::get,
};

use crate::server::AppState;
use crate::server::dto::{PageParams, PlayHistoryPage, StudentProfileResponse};
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt, StoreResultExt};

pub fn students_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/{id}/profile", get(profile))
        .route("/{id}/play-history", get(play_history))
}

/// GET /{id}/profile - Student profile with play aggregates
pub async fn profile(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .store
        .get_user(id)
        .api_err("Failed to look up user")?
        .or_not_found("Student not found")?;

    Ok(Json(ApiResponse::success(StudentProfileResponse {
        id: user.id,
        username: user.username,
        email: user.email,
        created_at: user.created_at,
        total_score: user.total_score,
        games_played: user.games_played,
    })))
}

/// GET /{id}/play-history?page=&size= - Paged play history joined with game
/// titles and thumbnails, newest first.
pub async fn play_history(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Query(params): Query<PageParams>,
) -> Result<impl IntoResponse, ApiError> {
    let store = state.store.as_ref();

    store
        .get_user(id)
        .api_err("Failed to look up user")?
        .or_not_found("Student not found")?;

    let page = params.page.max(0);
    let size = params.size.clamp(1, 100);

    let total_items = store
        .count_user_history(id)
        .api_err("Failed to count play history")?;
    let mut content = store
        .list_user_history_page(id, page * size, size)
        .api_err("Failed to list play history")?;

    let files_base = state.files_base();
    for entry in &mut content {
        if let Some(thumb) = entry.game_thumbnail.take() {
            entry.game_thumbnail = Some(if thumb.starts_with("http") {
                thumb
            } else {
                format!("{files_base}/{thumb}")
            });
        }
    }

    Ok(Json(ApiResponse::success(PlayHistoryPage {
        content,
        current_page: page,
        total_items,
        total_pages: (total_items + size - 1) / size,
    })))
}
