//! Vector index records
//!
//! An [`EmbeddableRecord`] is rebuilt every run for newly seen entities and
//! only ever persisted through the vector index. It serializes directly to
//! the `{id, values, metadata}` shape the index expects, with
//! `metadata.type` naming the entity kind.

use crate::model::entities::{format_timestamp, Comment, EntityKind, Post, Reply};
use serde::Serialize;

/// One `{id, vector, metadata}` unit submitted to the vector index
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbeddableRecord {
    pub id: String,
    #[serde(rename = "values")]
    pub vector: Vec<f32>,
    pub metadata: RecordMetadata,
}

impl EmbeddableRecord {
    pub fn for_post(post: &Post, text: String, vector: Vec<f32>) -> Self {
        Self {
            id: post.id.clone(),
            vector,
            metadata: RecordMetadata::Post {
                timestamp: format_timestamp(&post.timestamp),
                likes: post.like_count,
                comments: post.comments_count,
                text,
            },
        }
    }

    pub fn for_comment(comment: &Comment, text: String, vector: Vec<f32>) -> Self {
        Self {
            id: comment.id.clone(),
            vector,
            metadata: RecordMetadata::Comment {
                timestamp: format_timestamp(&comment.timestamp),
                post_id: comment.post_id.clone(),
                username: comment.username.clone(),
                text,
            },
        }
    }

    pub fn for_reply(reply: &Reply, text: String, vector: Vec<f32>) -> Self {
        Self {
            id: reply.id.clone(),
            vector,
            metadata: RecordMetadata::Reply {
                timestamp: format_timestamp(&reply.timestamp),
                post_id: reply.post_id.clone(),
                parent_comment_id: reply.parent_comment_id.clone(),
                username: reply.username.clone(),
                text,
            },
        }
    }
}

/// Type-specific metadata; `text` is always the normalized form
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RecordMetadata {
    Post {
        timestamp: String,
        likes: u64,
        comments: u64,
        text: String,
    },
    Comment {
        timestamp: String,
        post_id: String,
        username: String,
        text: String,
    },
    Reply {
        timestamp: String,
        post_id: String,
        parent_comment_id: String,
        username: String,
        text: String,
    },
}

impl RecordMetadata {
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Post { .. } => EntityKind::Post,
            Self::Comment { .. } => EntityKind::Comment,
            Self::Reply { .. } => EntityKind::Reply,
        }
    }

    pub fn text(&self) -> &str {
        match self {
            Self::Post { text, .. } | Self::Comment { text, .. } | Self::Reply { text, .. } => text,
        }
    }
}
