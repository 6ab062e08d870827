//! Entity definitions for the post → comment → reply hierarchy
//!
//! Entities are built from raw API payloads by the functions in
//! `model::parse`; the raw payload travels along so the relational row can
//! keep the full source record.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use std::fmt;

/// Username recorded when the API omits one
pub const UNKNOWN_USER: &str = "unknown_user";

/// The three kinds of entity the crawler syncs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Post,
    Comment,
    Reply,
}

impl EntityKind {
    /// Returns the string stored in `metadata.type`
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Post => "post",
            Self::Comment => "comment",
            Self::Reply => "reply",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A media item
#[derive(Debug, Clone, PartialEq)]
pub struct Post {
    pub id: String,
    pub caption: Option<String>,
    pub media_type: Option<String>,
    pub media_url: Option<String>,
    pub permalink: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub like_count: u64,
    pub comments_count: u64,
    pub raw: Value,
}

/// A top-level comment on a post
#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    pub id: String,
    pub post_id: String,
    pub text: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub username: String,
    /// Owned by the downstream responder; always false when created here
    pub replied: bool,
    /// Ids of replies listed inline by the comments endpoint
    pub reply_ids: Vec<String>,
    pub raw: Value,
}

/// A reply to a comment
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub id: String,
    /// Denormalized ancestor post
    pub post_id: String,
    pub parent_comment_id: String,
    pub text: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub username: String,
    pub replied: bool,
    pub raw: Value,
}

/// Returns true if an entity timestamp is strictly after the watermark
pub fn is_new(timestamp: DateTime<Utc>, watermark: DateTime<Utc>) -> bool {
    timestamp > watermark
}

/// Formats a timestamp the way it is written to both stores
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Secs, true)
}
