//! Data model for synced content
//!
//! - [`Post`], [`Comment`] and [`Reply`]: the three entity kinds, built from
//!   raw payloads with the safe-parse functions in [`parse`]
//! - [`EmbeddableRecord`]: the unit submitted to the vector index
//! - [`WriteSet`]: everything one run writes, deduplicated by id

mod entities;
pub mod parse;
mod record;
mod write_set;

pub use entities::{format_timestamp, is_new, Comment, EntityKind, Post, Reply, UNKNOWN_USER};
pub use parse::{parse_comment, parse_post, parse_reply, parse_timestamp, ParseError};
pub use record::{EmbeddableRecord, RecordMetadata};
pub use write_set::{Keyed, WriteSet};
