//! Sentences: a parsed tree of tokens from the front end, and its
//! document-owned counterpart.

use serde::{Deserialize, Serialize};

use crate::parse::token::Token;

/// A sentence as handed over by the parsing front end. Token indices and
/// heads are sentence-local.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedSentence {
    /// Original sentence text, if known.
    pub text: Option<String>,

    /// Tokens in order; `tokens[i].index == i`.
    pub tokens: Vec<Token>,
}

impl ParsedSentence {
    /// Create a sentence from tokens.
    pub fn new(tokens: Vec<Token>) -> Self {
        ParsedSentence { text: None, tokens }
    }

    /// Set the sentence text.
    pub fn with_text<S: Into<String>>(mut self, text: S) -> Self {
        self.text = Some(text.into());
        self
    }

    /// The sentence text: the supplied text, or the token texts joined
    /// according to their whitespace flags.
    pub fn display_text(&self) -> String {
        match &self.text {
            Some(text) => text.clone(),
            None => join_tokens(&self.tokens),
        }
    }
}

/// A sentence owned by a document: a contiguous range of document tokens.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sentence {
    /// Position of the sentence within its document.
    pub index: usize,

    /// First document token of the sentence.
    pub start: usize,

    /// One past the last document token of the sentence.
    pub end: usize,

    /// Sentence text.
    pub text: String,
}

impl Sentence {
    /// Whether the sentence contains the document token `index`.
    pub fn contains(&self, index: usize) -> bool {
        self.start <= index && index < self.end
    }

    /// Number of tokens in the sentence.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Whether the sentence has no tokens.
    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }
}

/// Join token texts, honouring each token's trailing-whitespace flag.
pub(crate) fn join_tokens(tokens: &[Token]) -> String {
    let mut text = String::new();
    for (i, token) in tokens.iter().enumerate() {
        text.push_str(&token.text);
        if token.whitespace && i + 1 < tokens.len() {
            text.push(' ');
        }
    }
    text
}
