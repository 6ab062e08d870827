//! Sync status from the relational store
//!
//! This module reads the watermark, row counts and the latest run record
//! for the `--status` report.

use crate::storage::{RunRecord, RunStatus, Storage};
use crate::SyncError;
use chrono::{DateTime, Utc};
use std::fmt;

/// Snapshot of what has been synced so far
#[derive(Debug, Clone)]
pub struct SyncStatus {
    /// Last successful sync; `None` before the first one
    pub watermark: Option<DateTime<Utc>>,
    pub posts: u64,
    pub comments: u64,
    pub replies: u64,
    pub latest_run: Option<RunRecord>,
}

/// Loads the sync status from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
///
/// # Returns
///
/// * `Ok(SyncStatus)` - Successfully loaded status
/// * `Err(SyncError)` - Failed to query storage
pub fn load_status(storage: &dyn Storage) -> Result<SyncStatus, SyncError> {
    Ok(SyncStatus {
        watermark: storage.get_watermark()?,
        posts: storage.count_posts()?,
        comments: storage.count_comments()?,
        replies: storage.count_replies()?,
        latest_run: storage.get_latest_run()?,
    })
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Sync Status ===\n")?;

        match self.watermark {
            Some(w) => writeln!(f, "Watermark: {}", w.to_rfc3339())?,
            None => writeln!(f, "Watermark: never synced")?,
        }
        writeln!(f)?;

        writeln!(f, "Stored Rows:")?;
        writeln!(f, "  Posts: {}", self.posts)?;
        writeln!(f, "  Comments: {}", self.comments)?;
        writeln!(f, "  Replies: {}", self.replies)?;
        writeln!(f)?;

        let Some(run) = &self.latest_run else {
            return writeln!(f, "Last Run: none");
        };

        writeln!(f, "Last Run (#{}):", run.id)?;
        writeln!(f, "  Status: {}", run.status.to_db_string())?;
        writeln!(f, "  Started: {}", run.started_at)?;
        if let Some(finished) = &run.finished_at {
            writeln!(f, "  Finished: {}", finished)?;
        }
        writeln!(f, "  Config hash: {}", run.config_hash)?;

        match run.status {
            RunStatus::Completed => {
                let stats = &run.stats;
                writeln!(
                    f,
                    "  Written: {} posts, {} comments, {} replies, {} vectors",
                    stats.posts_written,
                    stats.comments_written,
                    stats.replies_written,
                    stats.vectors_written
                )?;
                if stats.failed_posts > 0 || stats.degraded_fetches > 0 {
                    writeln!(
                        f,
                        "  Failed posts: {}, incomplete fetches: {}",
                        stats.failed_posts, stats.degraded_fetches
                    )?;
                }
            }
            RunStatus::Failed => {
                writeln!(
                    f,
                    "  Error: {}",
                    run.error_message.as_deref().unwrap_or("unknown")
                )?;
            }
            RunStatus::Running => {}
        }

        Ok(())
    }
}

/// Prints the status report to stdout
pub fn print_status(status: &SyncStatus) {
    print!("{}", status);
}
