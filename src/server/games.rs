use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;
use uuid::Uuid;

use crate::ingest::{file_extension, ingest_upload};
use crate::server::AppState;
use crate::server::dto::{
    CategorySimple, CommentRequest, GamePreview, GameResponse, HistoryParams, LikeResponse,
    TrackPlayParams, UsernameParam,
};
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt, StoreResultExt};
use crate::store::Store;
use crate::types::{Comment, Game, GameLike, PlayHistory, Role, User};

pub fn games_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_games))
        .route("/upload", post(upload_game))
        .route("/categories", get(list_categories))
        .route("/history", get(play_history))
        .route("/{id}", get(get_game).put(update_game).delete(delete_game))
        .route("/{id}/like", post(like_game))
        .route("/{id}/like/status", get(like_status))
        .route("/{id}/comments", get(list_comments).post(add_comment))
        .route("/{id}/play", post(track_play))
}

pub const MAX_UPLOAD_SIZE: usize = 100 * 1024 * 1024;

#[derive(Default)]
struct UploadForm {
    file: Option<(String, Vec<u8>)>,
    title: Option<String>,
    desc: Option<String>,
    category_id: Option<i64>,
    thumbnail_url: Option<String>,
    thumbnail: Option<(String, Vec<u8>)>,
    username: Option<String>,
}

async fn parse_upload_form(multipart: &mut Multipart) -> Result<UploadForm, ApiError> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Failed to read multipart: {e}")))?
    {
        match field.name() {
            Some("file") => {
                let file_name = field.file_name().unwrap_or("upload.html").to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Failed to read file: {e}")))?;
                if data.len() > MAX_UPLOAD_SIZE {
                    return Err(ApiError::payload_too_large(format!(
                        "File size ({} bytes) exceeds maximum allowed size ({MAX_UPLOAD_SIZE} bytes)",
                        data.len()
                    )));
                }
                form.file = Some((file_name, data.to_vec()));
            }
            Some("thumbnail") => {
                let file_name = field.file_name().unwrap_or("thumbnail.png").to_string();
                let data = field.bytes().await.map_err(|e| {
                    ApiError::bad_request(format!("Failed to read thumbnail: {e}"))
                })?;
                form.thumbnail = Some((file_name, data.to_vec()));
            }
            Some("title") => form.title = Some(read_text_field(field, "title").await?),
            Some("desc") => form.desc = Some(read_text_field(field, "desc").await?),
            Some("categoryId") => {
                let text = read_text_field(field, "categoryId").await?;
                if !text.is_empty() {
                    form.category_id = Some(text.parse().map_err(|_| {
                        ApiError::bad_request("categoryId must be a number")
                    })?);
                }
            }
            Some("thumbnailUrl") => {
                form.thumbnail_url = Some(read_text_field(field, "thumbnailUrl").await?);
            }
            Some("username") => form.username = Some(read_text_field(field, "username").await?),
            _ => {}
        }
    }

    Ok(form)
}

async fn read_text_field(
    field: axum::extract::multipart::Field<'_>,
    name: &'static str,
) -> Result<String, ApiError> {
    field
        .text()
        .await
        .map_err(|e| ApiError::bad_request(format!("Failed to read {name}: {e}")))
}

/// Resolves the acting user and requires the admin role.
fn require_admin(store: &dyn Store, username: &str, action: &str) -> Result<User, ApiError> {
    let user = store
        .get_user_by_username(username)
        .api_err("Failed to look up user")?;

    match user {
        Some(user) if user.role == Role::Admin => Ok(user),
        _ => Err(ApiError::forbidden(format!("Only admins can {action} games"))),
    }
}

/// Stores a thumbnail file under the game's upload folder, or falls back to a
/// caller-provided URL. Returns the thumbnail reference to persist, if any.
async fn store_thumbnail(
    state: &AppState,
    folder: &str,
    thumbnail: Option<(String, Vec<u8>)>,
    thumbnail_url: Option<String>,
) -> Result<Option<String>, ApiError> {
    if let Some((file_name, data)) = thumbnail {
        if !data.is_empty() {
            let ext = file_extension(&file_name).unwrap_or("png");
            let object = format!("{folder}/thumbnail.{ext}");

            state
                .blobs
                .put(&object, &data)
                .await
                .map_err(|e| ApiError::internal(format!("Failed to store thumbnail: {e}")))?;

            return Ok(Some(object));
        }
    }

    Ok(thumbnail_url.filter(|url| !url.is_empty()))
}

/// A missing or unknown category id silently yields no category; it is not an
/// error on this path.
fn resolve_category(store: &dyn Store, category_id: Option<i64>) -> Result<Option<i64>, ApiError> {
    match category_id {
        Some(id) => Ok(store
            .get_category(id)
            .api_err("Failed to look up category")?
            .map(|c| c.id)),
        None => Ok(None),
    }
}

/// POST /upload - ingest an uploaded game (single HTML file or zip bundle)
/// into the bucket and persist the Game record.
pub async fn upload_game(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let form = parse_upload_form(&mut multipart).await?;

    let (file_name, file_data) = form
        .file
        .ok_or_else(|| ApiError::bad_request("File field is required"))?;
    let title = form
        .title
        .ok_or_else(|| ApiError::bad_request("Title field is required"))?;
    let desc = form
        .desc
        .ok_or_else(|| ApiError::bad_request("Desc field is required"))?;

    let store = state.store.as_ref();

    // Every object belonging to this upload lives under a fresh folder so
    // uploads can never collide in the bucket.
    let folder = Uuid::new_v4().to_string();

    let thumbnail_url =
        store_thumbnail(&state, &folder, form.thumbnail, form.thumbnail_url).await?;

    // Ingestion is pure and in-memory; bucket writes only start once an entry
    // point is confirmed. A failure here leaves at most an orphaned thumbnail.
    let bundle =
        ingest_upload(&file_name, &file_data).map_err(|e| ApiError::bad_request(e.to_string()))?;

    for entry in &bundle.entries {
        let object = format!("{folder}/{}", entry.path);
        state
            .blobs
            .put(&object, &entry.data)
            .await
            .map_err(|e| ApiError::internal(format!("Failed to store object: {e}")))?;
    }

    let category_id = resolve_category(store, form.category_id)?;

    let mut game = Game {
        id: 0,
        title,
        description: Some(desc),
        object_name: format!("{folder}/{}", bundle.entry_point),
        thumbnail_url,
        category_id,
        created_by: form.username,
        date_added: Utc::now(),
        likes: 0,
        views: 0,
    };
    game.id = store.create_game(&game).api_err("Failed to create game")?;

    tracing::info!("Uploaded game {} ({} objects)", game.id, bundle.entries.len());

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(GameResponse::new(
            game,
            &state.files_base(),
        ))),
    ))
}

/// PUT /{id} - Update a game (admin only)
pub async fn update_game(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let form = parse_upload_form(&mut multipart).await?;
    let store = state.store.as_ref();

    let username = form
        .username
        .ok_or_else(|| ApiError::bad_request("Username field is required"))?;
    require_admin(store, &username, "update")?;

    let mut game = store
        .get_game(id)
        .api_err("Failed to get game")?
        .or_not_found("Game not found")?;

    game.title = form
        .title
        .ok_or_else(|| ApiError::bad_request("Title field is required"))?;
    game.description = Some(
        form.desc
            .ok_or_else(|| ApiError::bad_request("Desc field is required"))?,
    );

    // Thumbnail replacement reuses the game's existing upload folder.
    let folder = game
        .object_name
        .split('/')
        .next()
        .unwrap_or_default()
        .to_string();
    if let Some(thumbnail) = store_thumbnail(&state, &folder, form.thumbnail, form.thumbnail_url)
        .await?
    {
        game.thumbnail_url = Some(thumbnail);
    }

    if let Some(category_id) = resolve_category(store, form.category_id)? {
        game.category_id = Some(category_id);
    }

    store.update_game(&game).api_err("Failed to update game")?;

    Ok(Json(ApiResponse::success(GameResponse::new(
        game,
        &state.files_base(),
    ))))
}

/// DELETE /{id} - Delete a game (admin only). Dependent comments, likes, and
/// play history cascade; bucket objects are left behind.
pub async fn delete_game(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Query(params): Query<UsernameParam>,
) -> Result<impl IntoResponse, ApiError> {
    let store = state.store.as_ref();
    require_admin(store, &params.username, "delete")?;

    if !store.delete_game(id).api_err("Failed to delete game")? {
        return Err(ApiError::not_found("Game not found"));
    }

    Ok(Json(ApiResponse::success("Game deleted successfully")))
}

/// GET / - List all games
pub async fn list_games(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let games = state.store.list_games().api_err("Failed to list games")?;

    let files_base = state.files_base();
    let games: Vec<GameResponse> = games
        .into_iter()
        .map(|g| GameResponse::new(g, &files_base))
        .collect();

    Ok(Json(ApiResponse::success(games)))
}

/// GET /categories - Active categories in their simple portal shape
pub async fn list_categories(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let categories = state
        .store
        .list_active_categories()
        .api_err("Failed to list categories")?;

    let categories: Vec<CategorySimple> = categories
        .into_iter()
        .map(|c| CategorySimple {
            id: c.id,
            name: c.name,
            description: c.description,
            icon: c.icon,
        })
        .collect();

    Ok(Json(ApiResponse::success(categories)))
}

/// GET /{id} - Game detail; every fetch counts as a view
pub async fn get_game(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let store = state.store.as_ref();

    let mut game = store
        .get_game(id)
        .api_err("Failed to get game")?
        .or_not_found("Game not found")?;

    store
        .increment_game_views(id)
        .api_err("Failed to count view")?;
    game.views += 1;

    Ok(Json(ApiResponse::success(GameResponse::new(
        game,
        &state.files_base(),
    ))))
}

/// POST /{id}/like - Toggle a like. The unique (game, user) constraint in the
/// store is the backstop for concurrent toggles; losing that race surfaces as
/// an idempotent "already liked" response.
pub async fn like_game(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Query(params): Query<UsernameParam>,
) -> Result<impl IntoResponse, ApiError> {
    let store = state.store.as_ref();

    let game = store
        .get_game(id)
        .api_err("Failed to get game")?
        .or_not_found("Game not found")?;
    let user = store
        .get_user_by_username(&params.username)
        .api_err("Failed to look up user")?
        .or_not_found("User not found")?;

    if store
        .like_exists(game.id, user.id)
        .api_err("Failed to check like")?
    {
        store
            .delete_like(game.id, user.id)
            .api_err("Failed to remove like")?;
        store
            .adjust_game_likes(game.id, -1)
            .api_err("Failed to update like count")?;

        return Ok(Json(ApiResponse::success(LikeResponse {
            success: true,
            message: "Game unliked successfully".to_string(),
            total_likes: current_likes(store, game.id)?,
            is_liked: false,
        })));
    }

    let like = GameLike {
        id: 0,
        game_id: game.id,
        user_id: user.id,
        liked_at: Utc::now(),
    };

    match store.create_like(&like) {
        Ok(_) => {
            store
                .adjust_game_likes(game.id, 1)
                .api_err("Failed to update like count")?;

            Ok(Json(ApiResponse::success(LikeResponse {
                success: true,
                message: "Game liked successfully".to_string(),
                total_likes: current_likes(store, game.id)?,
                is_liked: true,
            })))
        }
        // Concurrent toggle raced us past the existence check.
        Err(crate::error::Error::AlreadyExists) => Ok(Json(ApiResponse::success(LikeResponse {
            success: true,
            message: "Game already liked".to_string(),
            total_likes: current_likes(store, game.id)?,
            is_liked: true,
        }))),
        Err(_) => Err(ApiError::internal("Failed to record like")),
    }
}

fn current_likes(store: &dyn Store, game_id: i64) -> Result<i64, ApiError> {
    Ok(store
        .get_game(game_id)
        .api_err("Failed to get game")?
        .map(|g| g.likes)
        .unwrap_or_default())
}

/// GET /{id}/like/status - Whether the named user has liked the game.
/// Missing game or user reads as false rather than an error.
pub async fn like_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Query(params): Query<UsernameParam>,
) -> Result<impl IntoResponse, ApiError> {
    let store = state.store.as_ref();

    let game = store.get_game(id).api_err("Failed to get game")?;
    let user = store
        .get_user_by_username(&params.username)
        .api_err("Failed to look up user")?;

    let liked = match (game, user) {
        (Some(game), Some(user)) => store
            .like_exists(game.id, user.id)
            .api_err("Failed to check like")?,
        _ => false,
    };

    Ok(Json(ApiResponse::success(liked)))
}

/// GET /{id}/comments - Newest first, with author usernames
pub async fn list_comments(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let comments = state
        .store
        .list_game_comments(id)
        .api_err("Failed to list comments")?;

    Ok(Json(ApiResponse::success(comments)))
}

/// POST /{id}/comments - Add a comment, optionally as a one-level reply.
/// A supplied parent must be an existing comment on the same game.
pub async fn add_comment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<CommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let store = state.store.as_ref();

    let game = store
        .get_game(id)
        .api_err("Failed to get game")?
        .or_not_found("Game not found")?;
    let user = store
        .get_user_by_username(&req.username)
        .api_err("Failed to look up user")?
        .or_not_found("User not found")?;

    if let Some(parent_id) = req.parent_comment_id {
        let parent = store
            .get_comment(parent_id)
            .api_err("Failed to look up parent comment")?
            .ok_or_else(|| ApiError::bad_request("Parent comment not found"))?;
        if parent.game_id != game.id {
            return Err(ApiError::bad_request(
                "Parent comment does not belong to this game",
            ));
        }
    }

    let mut comment = Comment {
        id: 0,
        game_id: game.id,
        user_id: user.id,
        content: req.content,
        date_posted: Utc::now(),
        parent_comment_id: req.parent_comment_id,
    };
    comment.id = store
        .create_comment(&comment)
        .api_err("Failed to create comment")?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(comment))))
}

/// POST /{id}/play - Record a play and bump the player's aggregates
pub async fn track_play(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Query(params): Query<TrackPlayParams>,
) -> Result<impl IntoResponse, ApiError> {
    let store = state.store.as_ref();

    let game = store
        .get_game(id)
        .api_err("Failed to get game")?
        .or_not_found("Game not found")?;
    let user = store
        .get_user_by_username(&params.user_id)
        .api_err("Failed to look up user")?
        .or_not_found("User not found")?;

    let history = PlayHistory {
        id: 0,
        game_id: game.id,
        user_id: user.id,
        score: params.score,
        duration: params.duration,
        played_at: Utc::now(),
    };
    store
        .create_play_history(&history)
        .api_err("Failed to record play")?;
    store
        .record_user_play(user.id, params.score)
        .api_err("Failed to update user stats")?;

    tracing::info!(
        "User {} played game {} with score {}",
        user.username,
        game.id,
        params.score
    );

    Ok(Json(ApiResponse::success(())))
}

/// GET /history?userId= - A user's raw play history, newest first
pub async fn play_history(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HistoryParams>,
) -> Result<impl IntoResponse, ApiError> {
    let history = state
        .store
        .list_user_history(params.user_id)
        .api_err("Failed to list play history")?;

    Ok(Json(ApiResponse::success(history)))
}

// Keeps GamePreview construction in one place for the portal module.
pub(super) fn game_preview(game: Game, files_base: &str) -> GamePreview {
    let thumbnail_url = game.thumbnail_url.map(|t| {
        if t.starts_with("http") {
            t
        } else {
            format!("{files_base}/{t}")
        }
    });

    GamePreview {
        id: game.id,
        title: game.title,
        description: game.description,
        thumbnail_url,
    }
}
