mod schema;
mod sqlite;

pub use sqlite::SqliteStore;

use crate::error::Result;
use crate::types::*;

/// Store defines the database interface.
pub trait Store: Send + Sync {
    fn initialize(&self) -> Result<()>;

    // User operations
    fn create_user(&self, user: &User) -> Result<i64>;
    fn get_user(&self, id: i64) -> Result<Option<User>>;
    fn get_user_by_username(&self, username: &str) -> Result<Option<User>>;
    fn username_exists(&self, username: &str) -> Result<bool>;
    fn top_users_by_score(&self, limit: i64) -> Result<Vec<User>>;
    fn record_user_play(&self, id: i64, score: i64) -> Result<()>;

    // Category operations
    fn create_category(&self, category: &GameCategory) -> Result<i64>;
    fn get_category(&self, id: i64) -> Result<Option<GameCategory>>;
    fn get_active_category(&self, id: i64) -> Result<Option<GameCategory>>;
    fn list_active_categories(&self) -> Result<Vec<GameCategory>>;
    fn active_category_name_exists(&self, name: &str) -> Result<bool>;
    fn category_name_exists(&self, name: &str) -> Result<bool>;
    fn count_categories(&self) -> Result<i64>;
    fn update_category(&self, category: &GameCategory) -> Result<()>;
    fn deactivate_category(&self, id: i64) -> Result<()>;

    // Game operations
    fn create_game(&self, game: &Game) -> Result<i64>;
    fn get_game(&self, id: i64) -> Result<Option<Game>>;
    fn list_games(&self) -> Result<Vec<Game>>;
    fn list_games_by_category(&self, category_id: i64) -> Result<Vec<Game>>;
    fn update_game(&self, game: &Game) -> Result<()>;
    fn delete_game(&self, id: i64) -> Result<bool>;
    fn increment_game_views(&self, id: i64) -> Result<()>;
    fn adjust_game_likes(&self, id: i64, delta: i64) -> Result<()>;

    // Like operations (one row per (game, user) pair)
    fn create_like(&self, like: &GameLike) -> Result<i64>;
    fn delete_like(&self, game_id: i64, user_id: i64) -> Result<bool>;
    fn like_exists(&self, game_id: i64, user_id: i64) -> Result<bool>;

    // Comment operations
    fn create_comment(&self, comment: &Comment) -> Result<i64>;
    fn get_comment(&self, id: i64) -> Result<Option<Comment>>;
    fn list_game_comments(&self, game_id: i64) -> Result<Vec<CommentWithAuthor>>;

    // Play history operations
    fn create_play_history(&self, history: &PlayHistory) -> Result<i64>;
    fn list_user_history(&self, user_id: i64) -> Result<Vec<PlayHistory>>;
    fn list_user_history_page(
        &self,
        user_id: i64,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<PlayHistoryWithGame>>;
    fn count_user_history(&self, user_id: i64) -> Result<i64>;
}
