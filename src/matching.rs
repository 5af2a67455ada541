//! Structural matching.
//!
//! # Components
//!
//! - [`types`] - match results ([`DocumentMatch`], [`WordMatch`], [`MatchKind`])
//! - [`lexical`] - word-level comparison
//! - [`structural`] - alignment of search-phrase trees onto documents

pub mod lexical;
pub mod structural;
pub mod types;

pub use lexical::{LexicalMatch, LexicalMatcher, cosine_similarity};
pub use structural::StructuralMatcher;
pub use types::{DocumentMatch, MatchKind, WordMatch};
