//! Coreference chains.
//!
//! Chains are kept as a side table owned by the document (chain id →
//! ordered mentions); tokens carry no back-pointers. The document builds a
//! token → mention lookup when it adopts the chains.
//!
//! # Terminology
//!
//! - **Mention**: a token range referring to a discourse entity
//!   ("Richard Hudson", "they", "the company")
//! - **Head**: the token of the mention whose syntactic head lies outside
//!   the mention; it is the token the matcher works with
//! - **Chain**: all mentions of one entity

use serde::{Deserialize, Serialize};

/// A mention as supplied by the front end: sentence number plus an
/// inclusive, sentence-local token range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParsedMention {
    /// Index of the sentence within the text.
    pub sentence: usize,
    /// First token of the mention (sentence-local).
    pub first: usize,
    /// Last token of the mention (sentence-local, inclusive).
    pub last: usize,
}

impl ParsedMention {
    /// Create a new mention.
    pub fn new(sentence: usize, first: usize, last: usize) -> Self {
        ParsedMention {
            sentence,
            first,
            last,
        }
    }
}

/// A chain as supplied by the front end.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedChain {
    /// The mentions, in any order.
    pub mentions: Vec<ParsedMention>,
}

impl ParsedChain {
    /// Create a chain from mentions.
    pub fn new(mentions: Vec<ParsedMention>) -> Self {
        ParsedChain { mentions }
    }
}

/// A mention with document-wide positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Mention {
    /// First token of the mention.
    pub first: usize,
    /// Last token of the mention (inclusive).
    pub last: usize,
    /// Head token of the mention.
    pub head: usize,
}

impl Mention {
    /// Check if this mention overlaps with another.
    pub fn overlaps(&self, other: &Mention) -> bool {
        self.first <= other.last && other.first <= self.last
    }
}

/// All mentions of one discourse entity, ordered by position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreferenceChain {
    /// Chain identifier, unique within its document.
    pub id: usize,
    /// The mentions, sorted by first token.
    pub mentions: Vec<Mention>,
}

impl CoreferenceChain {
    /// Create a chain; mentions are sorted by position.
    pub fn new(id: usize, mut mentions: Vec<Mention>) -> Self {
        mentions.sort_by_key(|m| (m.first, m.last));
        CoreferenceChain { id, mentions }
    }

    /// Number of mentions.
    pub fn len(&self) -> usize {
        self.mentions.len()
    }

    /// Whether the chain has no mentions.
    pub fn is_empty(&self) -> bool {
        self.mentions.is_empty()
    }

    /// Heads of all mentions other than the one headed by `head`.
    pub fn other_heads(&self, head: usize) -> impl Iterator<Item = usize> + '_ {
        self.mentions
            .iter()
            .map(|m| m.head)
            .filter(move |h| *h != head)
    }
}
