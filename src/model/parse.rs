//! Safe parsing of raw API payloads into typed entities
//!
//! `id` and `timestamp` are required on every entity. Everything else is
//! optional: counts default to zero and a missing username becomes
//! [`UNKNOWN_USER`]. Ids are accepted as JSON strings or numbers.

use crate::model::entities::{Comment, EntityKind, Post, Reply, UNKNOWN_USER};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;
use thiserror::Error;

/// Errors raised when a payload lacks a required field
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("{kind} record has no id")]
    MissingId { kind: EntityKind },

    #[error("{kind} {id} has no timestamp")]
    MissingTimestamp { kind: EntityKind, id: String },

    #[error("{kind} {id} has an unparseable timestamp '{value}'")]
    InvalidTimestamp {
        kind: EntityKind,
        id: String,
        value: String,
    },
}

/// Parses a timestamp in any of the formats the API or the store produce
///
/// Accepts RFC 3339 (`2023-01-01T00:00:00Z`), the Graph API offset form
/// without a colon (`2023-01-01T00:00:00+0000`), and naive timestamps,
/// which are read as UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();

    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }

    if let Ok(ts) = DateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Some(ts.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Parses a media item
pub fn parse_post(raw: &Value) -> Result<Post, ParseError> {
    let id = required_id(raw, EntityKind::Post)?;
    let timestamp = required_timestamp(raw, EntityKind::Post, &id)?;

    Ok(Post {
        caption: optional_str(raw, "caption"),
        media_type: optional_str(raw, "media_type"),
        media_url: optional_str(raw, "media_url"),
        permalink: optional_str(raw, "permalink"),
        like_count: optional_count(raw, "like_count"),
        comments_count: optional_count(raw, "comments_count"),
        timestamp,
        id,
        raw: raw.clone(),
    })
}

/// Parses a comment from the comments listing of `post_id`
///
/// Reply references listed inline under `replies.data` are collected as
/// ids only; the listing does not carry them with full fidelity.
pub fn parse_comment(raw: &Value, post_id: &str) -> Result<Comment, ParseError> {
    let id = required_id(raw, EntityKind::Comment)?;
    let timestamp = required_timestamp(raw, EntityKind::Comment, &id)?;

    let reply_ids = raw
        .get("replies")
        .and_then(|r| r.get("data"))
        .and_then(|d| d.as_array())
        .map(|refs| refs.iter().filter_map(|r| id_value(r.get("id"))).collect())
        .unwrap_or_default();

    Ok(Comment {
        post_id: post_id.to_string(),
        text: optional_str(raw, "text"),
        username: optional_str(raw, "username").unwrap_or_else(|| UNKNOWN_USER.to_string()),
        replied: false,
        reply_ids,
        timestamp,
        id,
        raw: raw.clone(),
    })
}

/// Parses a reply fetched by id under `parent_comment_id`
pub fn parse_reply(
    raw: &Value,
    post_id: &str,
    parent_comment_id: &str,
) -> Result<Reply, ParseError> {
    let id = required_id(raw, EntityKind::Reply)?;
    let timestamp = required_timestamp(raw, EntityKind::Reply, &id)?;

    Ok(Reply {
        post_id: post_id.to_string(),
        parent_comment_id: parent_comment_id.to_string(),
        text: optional_str(raw, "text"),
        username: optional_str(raw, "username").unwrap_or_else(|| UNKNOWN_USER.to_string()),
        replied: false,
        timestamp,
        id,
        raw: raw.clone(),
    })
}

/// Reads an id given either as a non-empty string or as a number
pub fn id_value(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn required_id(raw: &Value, kind: EntityKind) -> Result<String, ParseError> {
    id_value(raw.get("id")).ok_or(ParseError::MissingId { kind })
}

fn required_timestamp(
    raw: &Value,
    kind: EntityKind,
    id: &str,
) -> Result<DateTime<Utc>, ParseError> {
    let value = raw
        .get("timestamp")
        .and_then(|t| t.as_str())
        .ok_or_else(|| ParseError::MissingTimestamp {
            kind,
            id: id.to_string(),
        })?;

    parse_timestamp(value).ok_or_else(|| ParseError::InvalidTimestamp {
        kind,
        id: id.to_string(),
        value: value.to_string(),
    })
}

fn optional_str(raw: &Value, key: &str) -> Option<String> {
    raw.get(key).and_then(|v| v.as_str()).map(str::to_string)
}

fn optional_count(raw: &Value, key: &str) -> u64 {
    raw.get(key).and_then(|v| v.as_u64()).unwrap_or(0)
}
