use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};

use super::Store;
use super::schema::SCHEMA;
use crate::error::{Error, Result};
use crate::types::*;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Handle SQLite's default datetime format: "YYYY-MM-DD HH:MM:SS"
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            tracing::error!("Invalid datetime in database: '{}' - {}", s, e);
            Utc::now()
        })
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

/// Maps a unique-constraint violation to `Error::AlreadyExists` so callers can
/// treat a lost insert race as an idempotent outcome.
fn map_constraint(e: rusqlite::Error) -> Error {
    match &e {
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            Error::AlreadyExists
        }
        _ => Error::Database(e),
    }
}

fn row_to_user(row: &Row) -> rusqlite::Result<User> {
    let role: String = row.get(4)?;
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        password_hash: row.get(2)?,
        email: row.get(3)?,
        role: Role::parse(&role).unwrap_or(Role::Student),
        created_at: parse_datetime(&row.get::<_, String>(5)?),
        total_score: row.get(6)?,
        games_played: row.get(7)?,
    })
}

fn row_to_category(row: &Row) -> rusqlite::Result<GameCategory> {
    Ok(GameCategory {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        icon: row.get(3)?,
        is_active: row.get(4)?,
    })
}

fn row_to_game(row: &Row) -> rusqlite::Result<Game> {
    Ok(Game {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        object_name: row.get(3)?,
        thumbnail_url: row.get(4)?,
        category_id: row.get(5)?,
        created_by: row.get(6)?,
        date_added: parse_datetime(&row.get::<_, String>(7)?),
        likes: row.get(8)?,
        views: row.get(9)?,
    })
}

const USER_COLS: &str = "id, username, password_hash, email, role, created_at, total_score, games_played";
const CATEGORY_COLS: &str = "id, name, description, icon, is_active";
const GAME_COLS: &str =
    "id, title, description, object_name, thumbnail_url, category_id, created_by, date_added, likes, views";

impl Store for SqliteStore {
    fn initialize(&self) -> Result<()> {
        self.conn().execute_batch(SCHEMA)?;
        Ok(())
    }

    // User operations

    fn create_user(&self, user: &User) -> Result<i64> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO users (username, password_hash, email, role, created_at, total_score, games_played)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                user.username,
                user.password_hash,
                user.email,
                user.role.as_str(),
                format_datetime(&user.created_at),
                user.total_score,
                user.games_played,
            ],
        )
        .map_err(map_constraint)?;
        Ok(conn.last_insert_rowid())
    }

    fn get_user(&self, id: i64) -> Result<Option<User>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {USER_COLS} FROM users WHERE id = ?1"),
            params![id],
            row_to_user,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {USER_COLS} FROM users WHERE username = ?1"),
            params![username],
            row_to_user,
        )
        .optional()
        .map_err(Error::from)
    }

    fn username_exists(&self, username: &str) -> Result<bool> {
        let conn = self.conn();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM users WHERE username = ?1",
            params![username],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn top_users_by_score(&self, limit: i64) -> Result<Vec<User>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {USER_COLS} FROM users ORDER BY total_score DESC, id ASC LIMIT ?1"
        ))?;

        let rows = stmt.query_map(params![limit], row_to_user)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn record_user_play(&self, id: i64, score: i64) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE users SET total_score = total_score + ?1, games_played = games_played + 1
             WHERE id = ?2",
            params![score, id],
        )?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    // Category operations

    fn create_category(&self, category: &GameCategory) -> Result<i64> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO game_categories (name, description, icon, is_active)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                category.name,
                category.description,
                category.icon,
                category.is_active,
            ],
        )
        .map_err(map_constraint)?;
        Ok(conn.last_insert_rowid())
    }

    fn get_category(&self, id: i64) -> Result<Option<GameCategory>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {CATEGORY_COLS} FROM game_categories WHERE id = ?1"),
            params![id],
            row_to_category,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_active_category(&self, id: i64) -> Result<Option<GameCategory>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {CATEGORY_COLS} FROM game_categories WHERE id = ?1 AND is_active = 1"),
            params![id],
            row_to_category,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_active_categories(&self) -> Result<Vec<GameCategory>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {CATEGORY_COLS} FROM game_categories WHERE is_active = 1 ORDER BY id"
        ))?;

        let rows = stmt.query_map([], row_to_category)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn active_category_name_exists(&self, name: &str) -> Result<bool> {
        let conn = self.conn();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM game_categories WHERE name = ?1 AND is_active = 1",
            params![name],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn category_name_exists(&self, name: &str) -> Result<bool> {
        let conn = self.conn();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM game_categories WHERE name = ?1",
            params![name],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn count_categories(&self) -> Result<i64> {
        let conn = self.conn();
        conn.query_row("SELECT COUNT(*) FROM game_categories", [], |row| row.get(0))
            .map_err(Error::from)
    }

    fn update_category(&self, category: &GameCategory) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE game_categories SET name = ?1, description = ?2, icon = ?3 WHERE id = ?4",
            params![
                category.name,
                category.description,
                category.icon,
                category.id,
            ],
        )?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn deactivate_category(&self, id: i64) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE game_categories SET is_active = 0 WHERE id = ?1",
            params![id],
        )?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    // Game operations

    fn create_game(&self, game: &Game) -> Result<i64> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO games (title, description, object_name, thumbnail_url, category_id, created_by, date_added, likes, views)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                game.title,
                game.description,
                game.object_name,
                game.thumbnail_url,
                game.category_id,
                game.created_by,
                format_datetime(&game.date_added),
                game.likes,
                game.views,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn get_game(&self, id: i64) -> Result<Option<Game>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {GAME_COLS} FROM games WHERE id = ?1"),
            params![id],
            row_to_game,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_games(&self) -> Result<Vec<Game>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!("SELECT {GAME_COLS} FROM games ORDER BY id"))?;

        let rows = stmt.query_map([], row_to_game)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn list_games_by_category(&self, category_id: i64) -> Result<Vec<Game>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {GAME_COLS} FROM games WHERE category_id = ?1 ORDER BY id"
        ))?;

        let rows = stmt.query_map(params![category_id], row_to_game)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn update_game(&self, game: &Game) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE games SET title = ?1, description = ?2, thumbnail_url = ?3, category_id = ?4
             WHERE id = ?5",
            params![
                game.title,
                game.description,
                game.thumbnail_url,
                game.category_id,
                game.id,
            ],
        )?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn delete_game(&self, id: i64) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM games WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    fn increment_game_views(&self, id: i64) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE games SET views = views + 1 WHERE id = ?1",
            params![id],
        )?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn adjust_game_likes(&self, id: i64, delta: i64) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE games SET likes = MAX(likes + ?1, 0) WHERE id = ?2",
            params![delta, id],
        )?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    // Like operations

    fn create_like(&self, like: &GameLike) -> Result<i64> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO game_likes (game_id, user_id, liked_at) VALUES (?1, ?2, ?3)",
            params![like.game_id, like.user_id, format_datetime(&like.liked_at)],
        )
        .map_err(map_constraint)?;
        Ok(conn.last_insert_rowid())
    }

    fn delete_like(&self, game_id: i64, user_id: i64) -> Result<bool> {
        let rows = self.conn().execute(
            "DELETE FROM game_likes WHERE game_id = ?1 AND user_id = ?2",
            params![game_id, user_id],
        )?;
        Ok(rows > 0)
    }

    fn like_exists(&self, game_id: i64, user_id: i64) -> Result<bool> {
        let conn = self.conn();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM game_likes WHERE game_id = ?1 AND user_id = ?2",
            params![game_id, user_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    // Comment operations

    fn create_comment(&self, comment: &Comment) -> Result<i64> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO comments (game_id, user_id, content, date_posted, parent_comment_id)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                comment.game_id,
                comment.user_id,
                comment.content,
                format_datetime(&comment.date_posted),
                comment.parent_comment_id,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn get_comment(&self, id: i64) -> Result<Option<Comment>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, game_id, user_id, content, date_posted, parent_comment_id
             FROM comments WHERE id = ?1",
            params![id],
            |row| {
                Ok(Comment {
                    id: row.get(0)?,
                    game_id: row.get(1)?,
                    user_id: row.get(2)?,
                    content: row.get(3)?,
                    date_posted: parse_datetime(&row.get::<_, String>(4)?),
                    parent_comment_id: row.get(5)?,
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_game_comments(&self, game_id: i64) -> Result<Vec<CommentWithAuthor>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT c.id, c.game_id, u.username, c.content, c.date_posted, c.parent_comment_id
             FROM comments c JOIN users u ON u.id = c.user_id
             WHERE c.game_id = ?1
             ORDER BY c.date_posted DESC, c.id DESC",
        )?;

        let rows = stmt.query_map(params![game_id], |row| {
            Ok(CommentWithAuthor {
                id: row.get(0)?,
                game_id: row.get(1)?,
                username: row.get(2)?,
                content: row.get(3)?,
                date_posted: parse_datetime(&row.get::<_, String>(4)?),
                parent_comment_id: row.get(5)?,
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    // Play history operations

    fn create_play_history(&self, history: &PlayHistory) -> Result<i64> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO play_history (game_id, user_id, score, duration, played_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                history.game_id,
                history.user_id,
                history.score,
                history.duration,
                format_datetime(&history.played_at),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn list_user_history(&self, user_id: i64) -> Result<Vec<PlayHistory>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, game_id, user_id, score, duration, played_at
             FROM play_history WHERE user_id = ?1
             ORDER BY played_at DESC, id DESC",
        )?;

        let rows = stmt.query_map(params![user_id], |row| {
            Ok(PlayHistory {
                id: row.get(0)?,
                game_id: row.get(1)?,
                user_id: row.get(2)?,
                score: row.get(3)?,
                duration: row.get(4)?,
                played_at: parse_datetime(&row.get::<_, String>(5)?),
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn list_user_history_page(
        &self,
        user_id: i64,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<PlayHistoryWithGame>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT h.id, h.game_id, g.title, g.thumbnail_url, h.played_at, h.score, h.duration
             FROM play_history h JOIN games g ON g.id = h.game_id
             WHERE h.user_id = ?1
             ORDER BY h.played_at DESC, h.id DESC
             LIMIT ?2 OFFSET ?3",
        )?;

        let rows = stmt.query_map(params![user_id, limit, offset], |row| {
            Ok(PlayHistoryWithGame {
                id: row.get(0)?,
                game_id: row.get(1)?,
                game_title: row.get(2)?,
                game_thumbnail: row.get(3)?,
                played_at: parse_datetime(&row.get::<_, String>(4)?),
                score: row.get(5)?,
                duration: row.get(6)?,
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn count_user_history(&self, user_id: i64) -> Result<i64> {
        let conn = self.conn();
        conn.query_row(
            "SELECT COUNT(*) FROM play_history WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )
        .map_err(Error::from)
    }
}
