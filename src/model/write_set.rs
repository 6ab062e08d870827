//! The per-run write-set
//!
//! Everything a run will write is staged here first and applied together
//! once the crawl and all embeddings have succeeded. Each collection is
//! keyed by entity id: staging the same id twice keeps the first position
//! and the last value.

use crate::model::entities::{Comment, Post, Reply};
use crate::model::record::EmbeddableRecord;
use std::collections::HashMap;

/// Insertion-ordered collection with last-write-wins on duplicate ids
#[derive(Debug, Clone)]
pub struct Keyed<T> {
    items: Vec<T>,
    positions: HashMap<String, usize>,
}

impl<T> Keyed<T> {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            positions: HashMap::new(),
        }
    }

    /// Stages `item` under `id`, replacing any earlier value
    pub fn upsert(&mut self, id: &str, item: T) {
        match self.positions.get(id) {
            Some(&pos) => self.items[pos] = item,
            None => {
                self.positions.insert(id.to_string(), self.items.len());
                self.items.push(item);
            }
        }
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T> Default for Keyed<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Relational upserts and vector records produced by one run
#[derive(Debug, Clone, Default)]
pub struct WriteSet {
    posts: Keyed<Post>,
    comments: Keyed<Comment>,
    replies: Keyed<Reply>,
    vectors: Keyed<EmbeddableRecord>,
}

impl WriteSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage_post(&mut self, post: Post) {
        let id = post.id.clone();
        self.posts.upsert(&id, post);
    }

    pub fn stage_comment(&mut self, comment: Comment) {
        let id = comment.id.clone();
        self.comments.upsert(&id, comment);
    }

    pub fn stage_reply(&mut self, reply: Reply) {
        let id = reply.id.clone();
        self.replies.upsert(&id, reply);
    }

    pub fn stage_vector(&mut self, record: EmbeddableRecord) {
        let id = record.id.clone();
        self.vectors.upsert(&id, record);
    }

    pub fn posts(&self) -> &[Post] {
        self.posts.as_slice()
    }

    pub fn comments(&self) -> &[Comment] {
        self.comments.as_slice()
    }

    pub fn replies(&self) -> &[Reply] {
        self.replies.as_slice()
    }

    pub fn vectors(&self) -> &[EmbeddableRecord] {
        self.vectors.as_slice()
    }

    /// Number of relational rows staged
    pub fn entity_count(&self) -> usize {
        self.posts.len() + self.comments.len() + self.replies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entity_count() == 0 && self.vectors.is_empty()
    }
}
