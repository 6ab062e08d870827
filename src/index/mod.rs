//! Vector index abstraction
//!
//! Defines the [`VectorIndex`] trait the run coordinator writes through,
//! and [`PineconeIndex`], an HTTP implementation for a Pinecone-compatible
//! service. The similarity metric is always cosine.

mod pinecone;

pub use pinecone::PineconeIndex;

use crate::model::EmbeddableRecord;
use async_trait::async_trait;
use thiserror::Error;

/// Similarity metric used for the index
pub const METRIC: &str = "cosine";

/// Errors from the vector index
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("vector index request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("vector index returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("invalid vector index response: {0}")]
    InvalidResponse(String),

    #[error("record {id} has {actual} dimensions, index expects {expected}")]
    Dimension {
        id: String,
        expected: usize,
        actual: usize,
    },
}

/// Summary statistics reported by an index
#[derive(Debug, Clone, PartialEq)]
pub struct IndexStats {
    pub dimension: Option<usize>,
    pub total_vector_count: u64,
}

/// Batch-upsert target for embeddable records
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Dimensionality every record must match
    fn dimension(&self) -> usize;

    /// Upserts a batch of records and returns how many were written
    ///
    /// An empty batch is a no-op.
    async fn upsert(&self, records: &[EmbeddableRecord]) -> Result<usize, IndexError>;

    /// Reports index statistics
    async fn describe(&self) -> Result<IndexStats, IndexError>;
}

/// Rejects any record whose vector does not match `expected` dimensions
pub fn check_dimensions(records: &[EmbeddableRecord], expected: usize) -> Result<(), IndexError> {
    match records.iter().find(|r| r.vector.len() != expected) {
        Some(record) => Err(IndexError::Dimension {
            id: record.id.clone(),
            expected,
            actual: record.vector.len(),
        }),
        None => Ok(()),
    }
}
