//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::model::{format_timestamp, WriteSet};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{
    CommentRow, PostRow, RunRecord, RunStats, RunStatus, WriteCounts, WATERMARK_KEY,
};
use crate::SyncError;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OpenFlags, OptionalExtension, Row};
use std::path::Path;

const UPSERT_POST_SQL: &str = "
    INSERT INTO posts (id, caption, media_type, media_url, permalink, timestamp,
                       like_count, comments_count, raw, synced_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
    ON CONFLICT(id) DO UPDATE SET
        caption = excluded.caption,
        media_type = excluded.media_type,
        media_url = excluded.media_url,
        permalink = excluded.permalink,
        timestamp = excluded.timestamp,
        like_count = excluded.like_count,
        comments_count = excluded.comments_count,
        raw = excluded.raw,
        synced_at = excluded.synced_at";

// `replied` is left alone on conflict: the responder owns it after insert.
const UPSERT_COMMENT_SQL: &str = "
    INSERT INTO comments (id, post_id, parent_comment_id, text, timestamp,
                          username, replied, raw, synced_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
    ON CONFLICT(id) DO UPDATE SET
        post_id = excluded.post_id,
        parent_comment_id = excluded.parent_comment_id,
        text = excluded.text,
        timestamp = excluded.timestamp,
        username = excluded.username,
        raw = excluded.raw,
        synced_at = excluded.synced_at";

const RUN_COLUMNS: &str = "id, started_at, finished_at, config_hash, status, watermark_from,
     posts_written, comments_written, replies_written, vectors_written,
     failed_posts, degraded_fetches, error_message";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(SyncError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, SyncError> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Opens an existing database without creating or migrating it
    ///
    /// Any write through the returned handle fails with a read-only error.
    pub fn open_read_only(path: &Path) -> Result<Self, SyncError> {
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> Result<Self, SyncError> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn count(&self, sql: &str) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(sql, [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

fn parse_stored_time(key: &str, value: &str) -> StorageResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| StorageError::CorruptValue {
            key: key.to_string(),
            value: value.to_string(),
        })
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(4)?)
            .unwrap_or(RunStatus::Running),
        watermark_from: row.get(5)?,
        stats: RunStats {
            posts_written: row.get::<_, i64>(6)? as usize,
            comments_written: row.get::<_, i64>(7)? as usize,
            replies_written: row.get::<_, i64>(8)? as usize,
            vectors_written: row.get::<_, i64>(9)? as usize,
            failed_posts: row.get::<_, i64>(10)? as usize,
            degraded_fetches: row.get::<_, i64>(11)? as usize,
        },
        error_message: row.get(12)?,
    })
}

impl Storage for SqliteStorage {
    // ===== Watermark =====

    fn get_watermark(&self) -> StorageResult<Option<DateTime<Utc>>> {
        let value: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM metadata WHERE key = ?1",
                params![WATERMARK_KEY],
                |row| row.get(0),
            )
            .optional()?;

        value
            .map(|v| parse_stored_time(WATERMARK_KEY, &v))
            .transpose()
    }

    fn set_watermark(&mut self, at: DateTime<Utc>) -> StorageResult<DateTime<Utc>> {
        let stored = match self.get_watermark()? {
            Some(current) if current >= at => current,
            _ => at,
        };

        self.conn.execute(
            "INSERT INTO metadata (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![WATERMARK_KEY, stored.to_rfc3339()],
        )?;

        Ok(stored)
    }

    // ===== Entities =====

    fn apply_write_set(&mut self, write_set: &WriteSet) -> StorageResult<WriteCounts> {
        let synced_at = Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;
        let mut counts = WriteCounts::default();

        {
            let mut stmt = tx.prepare_cached(UPSERT_POST_SQL)?;
            for post in write_set.posts() {
                stmt.execute(params![
                    post.id,
                    post.caption,
                    post.media_type,
                    post.media_url,
                    post.permalink,
                    format_timestamp(&post.timestamp),
                    post.like_count as i64,
                    post.comments_count as i64,
                    serde_json::to_string(&post.raw)?,
                    synced_at,
                ])?;
                counts.posts += 1;
            }

            let mut stmt = tx.prepare_cached(UPSERT_COMMENT_SQL)?;
            for comment in write_set.comments() {
                stmt.execute(params![
                    comment.id,
                    comment.post_id,
                    None::<String>,
                    comment.text,
                    format_timestamp(&comment.timestamp),
                    comment.username,
                    comment.replied,
                    serde_json::to_string(&comment.raw)?,
                    synced_at,
                ])?;
                counts.comments += 1;
            }

            for reply in write_set.replies() {
                stmt.execute(params![
                    reply.id,
                    reply.post_id,
                    reply.parent_comment_id,
                    reply.text,
                    format_timestamp(&reply.timestamp),
                    reply.username,
                    reply.replied,
                    serde_json::to_string(&reply.raw)?,
                    synced_at,
                ])?;
                counts.replies += 1;
            }
        }

        tx.commit()?;
        Ok(counts)
    }

    fn get_post(&self, id: &str) -> StorageResult<Option<PostRow>> {
        let post = self
            .conn
            .query_row(
                "SELECT id, caption, media_type, timestamp, like_count, comments_count
                 FROM posts WHERE id = ?1",
                params![id],
                |row| {
                    Ok(PostRow {
                        id: row.get(0)?,
                        caption: row.get(1)?,
                        media_type: row.get(2)?,
                        timestamp: row.get(3)?,
                        like_count: row.get::<_, i64>(4)? as u64,
                        comments_count: row.get::<_, i64>(5)? as u64,
                    })
                },
            )
            .optional()?;

        Ok(post)
    }

    fn get_comment(&self, id: &str) -> StorageResult<Option<CommentRow>> {
        let comment = self
            .conn
            .query_row(
                "SELECT id, post_id, parent_comment_id, text, timestamp, username, replied
                 FROM comments WHERE id = ?1",
                params![id],
                |row| {
                    Ok(CommentRow {
                        id: row.get(0)?,
                        post_id: row.get(1)?,
                        parent_comment_id: row.get(2)?,
                        text: row.get(3)?,
                        timestamp: row.get(4)?,
                        username: row.get(5)?,
                        replied: row.get(6)?,
                    })
                },
            )
            .optional()?;

        Ok(comment)
    }

    fn count_posts(&self) -> StorageResult<u64> {
        self.count("SELECT COUNT(*) FROM posts")
    }

    fn count_comments(&self) -> StorageResult<u64> {
        self.count("SELECT COUNT(*) FROM comments WHERE parent_comment_id IS NULL")
    }

    fn count_replies(&self) -> StorageResult<u64> {
        self.count("SELECT COUNT(*) FROM comments WHERE parent_comment_id IS NOT NULL")
    }

    // ===== Run History =====

    fn create_run(
        &mut self,
        config_hash: &str,
        watermark_from: Option<DateTime<Utc>>,
    ) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO sync_runs (started_at, config_hash, status, watermark_from)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                now,
                config_hash,
                RunStatus::Running.to_db_string(),
                watermark_from.map(|w| w.to_rfc3339()),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn complete_run(&mut self, run_id: i64, stats: &RunStats) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE sync_runs SET status = ?1, finished_at = ?2,
                 posts_written = ?3, comments_written = ?4, replies_written = ?5,
                 vectors_written = ?6, failed_posts = ?7, degraded_fetches = ?8
             WHERE id = ?9",
            params![
                RunStatus::Completed.to_db_string(),
                now,
                stats.posts_written as i64,
                stats.comments_written as i64,
                stats.replies_written as i64,
                stats.vectors_written as i64,
                stats.failed_posts as i64,
                stats.degraded_fetches as i64,
                run_id,
            ],
        )?;

        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn fail_run(&mut self, run_id: i64, message: &str) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE sync_runs SET status = ?1, finished_at = ?2, error_message = ?3
             WHERE id = ?4",
            params![RunStatus::Failed.to_db_string(), now, message, run_id],
        )?;

        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        let sql = format!("SELECT {} FROM sync_runs WHERE id = ?1", RUN_COLUMNS);
        self.conn
            .query_row(&sql, params![run_id], run_from_row)
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let sql = format!(
            "SELECT {} FROM sync_runs ORDER BY id DESC LIMIT 1",
            RUN_COLUMNS
        );
        let run = self.conn.query_row(&sql, [], run_from_row).optional()?;
        Ok(run)
    }
}
