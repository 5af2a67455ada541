//! Topic matching: ranking documents by their overlap with a reference
//! text.

pub mod scorer;

pub use scorer::{TopicMatch, TopicScorer, TopicWordInfo, rank};
