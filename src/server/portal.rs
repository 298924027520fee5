use std::sync::Arc;

use axum::{Json, Router, extract::State, response::IntoResponse, routing::get};

use crate::server::AppState;
use crate::server::dto::CategoryWithGames;
use crate::server::games::game_preview;
use crate::server::response::{ApiError, ApiResponse, StoreResultExt};

pub fn portal_router() -> Router<Arc<AppState>> {
    Router::new().route("/game-categories", get(game_center))
}

/// GET /game-categories - The game-center landing view: every active
/// category with its games inlined as previews.
pub async fn game_center(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let store = state.store.as_ref();
    let files_base = state.files_base();

    let categories = store
        .list_active_categories()
        .api_err("Failed to list categories")?;

    let mut sections = Vec::with_capacity(categories.len());
    for category in categories {
        let games = store
            .list_games_by_category(category.id)
            .api_err("Failed to list games")?;

        sections.push(CategoryWithGames {
            id: category.id,
            name: category.name,
            icon: category.icon,
            description: category.description,
            games: games
                .into_iter()
                .map(|g| game_preview(g, &files_base))
                .collect(),
        });
    }

    Ok(Json(ApiResponse::success(sections)))
}
