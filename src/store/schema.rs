pub const SCHEMA: &str = r#"
-- Game categories use a soft-delete flag; rows are never removed so that
-- historical games keep a valid category reference.
CREATE TABLE IF NOT EXISTS game_categories (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    description TEXT,
    icon TEXT,
    is_active INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,       -- argon2id PHC string with embedded salt
    email TEXT,
    role TEXT NOT NULL DEFAULT 'STUDENT',
    created_at TEXT DEFAULT (datetime('now')),

    -- Aggregates mutated only by play tracking
    total_score INTEGER NOT NULL DEFAULT 0,
    games_played INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS games (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    description TEXT,
    object_name TEXT NOT NULL,         -- entry-point path in the bucket
    thumbnail_url TEXT,                -- full URL or bucket path
    category_id INTEGER REFERENCES game_categories(id),
    created_by TEXT,                   -- free-text username of the uploader
    date_added TEXT DEFAULT (datetime('now')),
    likes INTEGER NOT NULL DEFAULT 0,
    views INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS comments (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    game_id INTEGER NOT NULL REFERENCES games(id) ON DELETE CASCADE,
    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    content TEXT NOT NULL,
    date_posted TEXT DEFAULT (datetime('now')),
    parent_comment_id INTEGER          -- NULL for top-level comments
);

-- The unique pair is the sole correctness backstop for the like toggle race.
CREATE TABLE IF NOT EXISTS game_likes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    game_id INTEGER NOT NULL REFERENCES games(id) ON DELETE CASCADE,
    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    liked_at TEXT DEFAULT (datetime('now')),

    UNIQUE(game_id, user_id)
);

-- Append-only
CREATE TABLE IF NOT EXISTS play_history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    game_id INTEGER NOT NULL REFERENCES games(id) ON DELETE CASCADE,
    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    score INTEGER NOT NULL DEFAULT 0,
    duration INTEGER NOT NULL DEFAULT 0,
    played_at TEXT DEFAULT (datetime('now'))
);

-- Create indexes
CREATE INDEX IF NOT EXISTS idx_games_category ON games(category_id);
CREATE INDEX IF NOT EXISTS idx_comments_game ON comments(game_id);
CREATE INDEX IF NOT EXISTS idx_likes_game ON game_likes(game_id);
CREATE INDEX IF NOT EXISTS idx_history_user ON play_history(user_id);
CREATE INDEX IF NOT EXISTS idx_history_game ON play_history(game_id);
CREATE INDEX IF NOT EXISTS idx_users_score ON users(total_score);
"#;
