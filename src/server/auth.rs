use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;

use crate::auth::{hash_password, verify_password};
use crate::server::AppState;
use crate::server::dto::{AuthResponse, LeaderboardEntry, LoginRequest, RegisterRequest};
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt, StoreResultExt};
use crate::types::{Role, User};

pub fn auth_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/leaderboard", get(leaderboard))
        .route("/user/{username}", get(user_profile))
}

/// POST /register - Create a student account
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let store = state.store.as_ref();

    if req.username.trim().is_empty() {
        return Err(ApiError::bad_request("Username is required"));
    }
    if req.password.is_empty() {
        return Err(ApiError::bad_request("Password is required"));
    }

    if store
        .username_exists(&req.username)
        .api_err("Failed to check username")?
    {
        return Err(ApiError::conflict("Username already exists"));
    }

    let password_hash = hash_password(&req.password)
        .map_err(|_| ApiError::internal("Failed to hash password"))?;

    let mut user = User {
        id: 0,
        username: req.username,
        password_hash,
        email: req.email,
        role: Role::Student,
        created_at: Utc::now(),
        total_score: 0,
        games_played: 0,
    };
    user.id = store.create_user(&user).api_err("Failed to create user")?;

    tracing::info!("Registered user {}", user.username);

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(AuthResponse {
            id: user.id,
            username: user.username,
            message: "Registration successful".to_string(),
            role: user.role,
        })),
    ))
}

/// POST /login - Verify credentials. The response never reveals whether the
/// username or the password was the wrong half.
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .store
        .get_user_by_username(&req.username)
        .api_err("Failed to look up user")?
        .ok_or_else(|| ApiError::unauthorized("Invalid username or password"))?;

    let valid = verify_password(&req.password, &user.password_hash)
        .map_err(|_| ApiError::internal("Failed to verify password"))?;
    if !valid {
        return Err(ApiError::unauthorized("Invalid username or password"));
    }

    Ok(Json(ApiResponse::success(AuthResponse {
        id: user.id,
        username: user.username,
        message: "Login successful".to_string(),
        role: user.role,
    })))
}

/// GET /leaderboard - Top ten users by total score
pub async fn leaderboard(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let users = state
        .store
        .top_users_by_score(10)
        .api_err("Failed to load leaderboard")?;

    let entries: Vec<LeaderboardEntry> = users
        .into_iter()
        .map(|u| LeaderboardEntry {
            id: u.id,
            username: u.username,
            total_score: u.total_score,
            games_played: u.games_played,
        })
        .collect();

    Ok(Json(ApiResponse::success(entries)))
}

/// GET /user/{username} - Public profile lookup
pub async fn user_profile(
    State(state): State<Arc<AppState>>,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .store
        .get_user_by_username(&username)
        .api_err("Failed to look up user")?
        .or_not_found("User not found")?;

    Ok(Json(ApiResponse::success(user)))
}
