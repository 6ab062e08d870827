//! Text normalization for embedding
//!
//! Captions and comments are turned into a canonical lowercase form with
//! emoji spelled out as tokens and URLs removed before they are embedded.

mod normalize;

pub use normalize::{normalize, EMOJI_DELIMITER};
