use serde::{Deserialize, Serialize};

use crate::types::{Game, Role};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub id: i64,
    pub username: String,
    pub message: String,
    pub role: Role,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub id: i64,
    pub username: String,
    pub total_score: i64,
    pub games_played: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentRequest {
    pub username: String,
    pub content: String,
    #[serde(default)]
    pub parent_comment_id: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeResponse {
    pub success: bool,
    pub message: String,
    pub total_likes: i64,
    pub is_liked: bool,
}

#[derive(Debug, Deserialize)]
pub struct CategoryRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
}

/// Category shape for portal listings (no soft-delete internals).
#[derive(Debug, Serialize)]
pub struct CategorySimple {
    pub id: i64,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GamePreview {
    pub id: i64,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CategoryWithGames {
    pub id: i64,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub games: Vec<GamePreview>,
}

/// A game plus the browser-facing URLs derived from its bucket paths.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameResponse {
    #[serde(flatten)]
    pub game: Game,
    pub play_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_full_url: Option<String>,
}

impl GameResponse {
    /// `files_base` is the public prefix under which bucket objects are
    /// served, e.g. "/files" or "https://host/files".
    #[must_use]
    pub fn new(game: Game, files_base: &str) -> Self {
        let play_url = format!("{files_base}/{}", game.object_name);
        let thumbnail_full_url = game.thumbnail_url.as_ref().map(|t| {
            if t.starts_with("http") {
                t.clone()
            } else {
                format!("{files_base}/{t}")
            }
        });

        Self {
            game,
            play_url,
            thumbnail_full_url,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentProfileResponse {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub total_score: i64,
    pub games_played: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayHistoryPage {
    pub content: Vec<crate::types::PlayHistoryWithGame>,
    pub current_page: i64,
    pub total_items: i64,
    pub total_pages: i64,
}

#[derive(Debug, Deserialize)]
pub struct UsernameParam {
    pub username: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackPlayParams {
    /// Carries the player's username (historical field name).
    pub user_id: String,
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub duration: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryParams {
    pub user_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct PageParams {
    #[serde(default)]
    pub page: i64,
    #[serde(default = "default_page_size")]
    pub size: i64,
}

fn default_page_size() -> i64 {
    10
}
