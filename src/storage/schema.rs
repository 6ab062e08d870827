//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Social-Sync database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Key/value settings, including the sync watermark
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

-- Synced media items
CREATE TABLE IF NOT EXISTS posts (
    id TEXT PRIMARY KEY,
    caption TEXT,
    media_type TEXT,
    media_url TEXT,
    permalink TEXT,
    timestamp TEXT NOT NULL,
    like_count INTEGER NOT NULL DEFAULT 0,
    comments_count INTEGER NOT NULL DEFAULT 0,
    raw TEXT NOT NULL,
    synced_at TEXT NOT NULL
);

-- Comments and replies; replies have a parent_comment_id.
-- post_id is not a foreign key: comments on posts older than the
-- first sync have no post row.
CREATE TABLE IF NOT EXISTS comments (
    id TEXT PRIMARY KEY,
    post_id TEXT NOT NULL,
    parent_comment_id TEXT,
    text TEXT,
    timestamp TEXT NOT NULL,
    username TEXT NOT NULL,
    replied INTEGER NOT NULL DEFAULT 0,
    raw TEXT NOT NULL,
    synced_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_comments_post ON comments(post_id);
CREATE INDEX IF NOT EXISTS idx_comments_parent ON comments(parent_comment_id);

-- One row per sync run
CREATE TABLE IF NOT EXISTS sync_runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL,
    watermark_from TEXT,
    posts_written INTEGER NOT NULL DEFAULT 0,
    comments_written INTEGER NOT NULL DEFAULT 0,
    replies_written INTEGER NOT NULL DEFAULT 0,
    vectors_written INTEGER NOT NULL DEFAULT 0,
    failed_posts INTEGER NOT NULL DEFAULT 0,
    degraded_fetches INTEGER NOT NULL DEFAULT 0,
    error_message TEXT
);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
