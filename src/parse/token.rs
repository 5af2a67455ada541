//! Token types produced by the external parsing front end.
//!
//! A [`Token`] is one node of a dependency tree. While it travels inside a
//! [`ParsedSentence`](crate::parse::sentence::ParsedSentence) its `index` and
//! `head` are sentence-local; once the sentence is adopted by a
//! [`Document`](crate::parse::document::Document) both are rewritten to
//! document-wide positions, which then stay stable for the document's
//! lifetime.
//!
//! # Examples
//!
//! ```
//! use sleuth::parse::token::Token;
//!
//! let token = Token::new(2, "dog", "dog", "NOUN")
//!     .with_tag("NN")
//!     .with_dependency("nsubj", Some(3));
//! assert_eq!(token.head, Some(3));
//! assert!(token.matchable);
//!
//! let det = Token::new(0, "The", "the", "DET");
//! assert!(!det.matchable);
//! ```

use serde::{Deserialize, Serialize};

/// Parts of speech that never take part in a match by themselves.
const UNMATCHABLE_POS: &[&str] = &[
    "PUNCT", "DET", "CCONJ", "SCONJ", "PART", "AUX", "SPACE", "SYM", "X", "PRON", "INTJ",
];

/// An inclusive range of token positions forming one lexical unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenSpan {
    /// First token of the unit.
    pub first: usize,
    /// Last token of the unit (inclusive).
    pub last: usize,
}

impl TokenSpan {
    /// Create a span; `first` and `last` are swapped if given in reverse.
    pub fn new(first: usize, last: usize) -> Self {
        TokenSpan {
            first: first.min(last),
            last: first.max(last),
        }
    }

    /// A span covering a single token.
    pub fn single(index: usize) -> Self {
        TokenSpan {
            first: index,
            last: index,
        }
    }

    /// Whether the span covers `index`.
    pub fn contains(&self, index: usize) -> bool {
        self.first <= index && index <= self.last
    }

    /// Number of tokens covered.
    pub fn len(&self) -> usize {
        self.last - self.first + 1
    }

    /// Spans always cover at least one token.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Shift both ends by `offset`.
    pub fn offset(&self, offset: usize) -> Self {
        TokenSpan {
            first: self.first + offset,
            last: self.last + offset,
        }
    }
}

/// A single parsed token.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Token {
    /// Position of the token (sentence-local before adoption, document-wide after).
    pub index: usize,

    /// Surface text.
    pub text: String,

    /// Lemma as produced by the front end.
    pub lemma: String,

    /// Coarse part of speech (Universal POS: NOUN, VERB, PROPN, ...).
    pub pos: String,

    /// Fine-grained tag (Penn Treebank: VBN, VBG, WDT, ...).
    pub tag: String,

    /// Dependency label towards `head`.
    pub dep: String,

    /// Head token; `None` for a sentence root.
    pub head: Option<usize>,

    /// Named-entity label, if the token is part of an entity.
    pub entity: Option<String>,

    /// Whether the token starts a new entity even if the previous token
    /// carries the same label.
    pub entity_begin: bool,

    /// Multi-word lexical unit headed by this token, if the front end
    /// recognised one.
    pub span: Option<TokenSpan>,

    /// Whether the token may be the target of a word match.
    pub matchable: bool,

    /// Whether the token is followed by whitespace in the original text.
    pub whitespace: bool,

    /// Word embedding, if the front end computed one.
    pub vector: Option<Vec<f32>>,
}

impl Token {
    /// Create a new token. Matchability defaults from the part of speech.
    pub fn new<S: Into<String>>(index: usize, text: S, lemma: S, pos: S) -> Self {
        let pos = pos.into();
        Token {
            index,
            text: text.into(),
            lemma: lemma.into(),
            matchable: default_matchable(&pos),
            pos,
            tag: String::new(),
            dep: String::new(),
            head: None,
            entity: None,
            entity_begin: false,
            span: None,
            whitespace: true,
            vector: None,
        }
    }

    /// Set the fine-grained tag.
    pub fn with_tag<S: Into<String>>(mut self, tag: S) -> Self {
        self.tag = tag.into();
        self
    }

    /// Set the dependency label and head.
    pub fn with_dependency<S: Into<String>>(mut self, dep: S, head: Option<usize>) -> Self {
        self.dep = dep.into();
        self.head = head;
        self
    }

    /// Set the entity label.
    pub fn with_entity<S: Into<String>>(mut self, label: S, begin: bool) -> Self {
        self.entity = Some(label.into());
        self.entity_begin = begin;
        self
    }

    /// Set the multi-word lexical unit this token heads.
    pub fn with_span(mut self, span: TokenSpan) -> Self {
        self.span = Some(span);
        self
    }

    /// Override matchability.
    pub fn with_matchable(mut self, matchable: bool) -> Self {
        self.matchable = matchable;
        self
    }

    /// Set whether whitespace follows the token.
    pub fn with_whitespace(mut self, whitespace: bool) -> Self {
        self.whitespace = whitespace;
        self
    }

    /// Attach a word embedding.
    pub fn with_vector(mut self, vector: Vec<f32>) -> Self {
        self.vector = Some(vector);
        self
    }

    /// Whether the token is a noun or proper noun.
    pub fn is_nominal(&self) -> bool {
        self.pos == "NOUN" || self.pos == "PROPN"
    }

    /// Lower-cased lemma.
    pub fn lower_lemma(&self) -> String {
        self.lemma.to_lowercase()
    }
}

/// Default matchability for a part of speech.
pub fn default_matchable(pos: &str) -> bool {
    !UNMATCHABLE_POS.contains(&pos)
}

/// Normalise a word or phrase into the key used for lexical equality:
/// lower-cased, with spaces and hyphens removed, so that "take over",
/// "take-over" and "takeover" coincide.
pub fn lexical_key(word: &str) -> String {
    word.chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}
