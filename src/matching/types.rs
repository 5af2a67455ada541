//! Match result types.
//!
//! Results are owned snapshots: they copy every string they report and
//! never borrow from the registry, so removing a document does not affect
//! matches already handed out.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::phrase::compiler::SearchPhraseHandle;

/// Why a search-phrase word was paired with a document word. Variants are
/// listed in order of preference.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchKind {
    /// Identical lexical form.
    Direct,
    /// A wildcard accepted the word's entity label or word class.
    Entity,
    /// Synonym or narrower (optionally broader) concept in the ontology.
    Ontology,
    /// Identical lexical form, reached through a coreferent mention.
    Coreference,
    /// Word embeddings above the configured threshold.
    Similarity,
}

impl MatchKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchKind::Direct => "direct",
            MatchKind::Entity => "entity",
            MatchKind::Ontology => "ontology",
            MatchKind::Coreference => "coreference",
            MatchKind::Similarity => "similarity",
        }
    }
}

impl fmt::Display for MatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One search-phrase word paired with one document word.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WordMatch {
    /// Position of the word in the parsed search phrase.
    pub search_phrase_token_index: usize,

    /// The phrase word as reported: lexical form or wildcard.
    pub search_phrase_word: String,

    /// Document token that supplied the lexical value.
    pub document_token_index: usize,

    /// First token of the matched span (entity or multi-word unit).
    pub first_document_token_index: usize,

    /// Last token of the matched span (inclusive).
    pub last_document_token_index: usize,

    /// Document token occupying the phrase word's position in the
    /// structure. Differs from `document_token_index` when the value was
    /// supplied by a coreferent mention.
    pub structurally_matched_document_token_index: usize,

    /// Lower-cased lexical form of the matched span.
    pub document_word: String,

    /// Surface text of the matched span.
    pub document_phrase: String,

    #[serde(rename = "match_type")]
    pub match_kind: MatchKind,

    pub negated: bool,

    pub uncertain: bool,

    /// 1.0 for exact, entity and ontology matches; the cosine similarity
    /// for embedding matches.
    pub similarity_measure: f32,

    pub involves_coreference: bool,

    /// Canonical lower-cased form; the name of the entity when the word is
    /// coreferent with a named mention.
    pub extracted_word: String,

    /// Ontology steps between the two words (0 unless `match_kind` is
    /// ontology).
    pub depth: usize,

    /// Human-readable reason for the pairing.
    pub explanation: String,
}

/// One alignment of a search phrase onto a document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DocumentMatch {
    pub search_phrase_handle: SearchPhraseHandle,

    pub search_phrase_label: String,

    pub search_phrase_text: String,

    pub document_label: String,

    /// Document token matched by the phrase root.
    pub index_within_document: usize,

    /// Text of every sentence touched by a matched token.
    pub sentences_within_document: String,

    pub negated: bool,

    pub uncertain: bool,

    pub involves_coreference: bool,

    /// Product of the word similarity measures.
    pub overall_similarity_measure: f32,

    /// Ordered by search-phrase token index; never empty.
    pub word_matches: Vec<WordMatch>,
}

impl DocumentMatch {
    /// The word match for a search-phrase token index.
    pub fn word_match(&self, search_phrase_token_index: usize) -> Option<&WordMatch> {
        self.word_matches
            .iter()
            .find(|w| w.search_phrase_token_index == search_phrase_token_index)
    }

    /// Structural identity: two matches with the same key pair the same
    /// words the same way.
    pub(crate) fn structural_key(&self) -> (SearchPhraseHandle, String, Vec<(usize, usize, usize)>) {
        (
            self.search_phrase_handle,
            self.document_label.clone(),
            self.word_matches
                .iter()
                .map(|w| {
                    (
                        w.search_phrase_token_index,
                        w.structurally_matched_document_token_index,
                        w.document_token_index,
                    )
                })
                .collect(),
        )
    }

    /// Result order: document label, position, phrase registration order,
    /// then the matched document tokens and the tokens they were reached
    /// through.
    pub(crate) fn order_key(&self) -> (&str, usize, SearchPhraseHandle, Vec<(usize, usize)>) {
        (
            self.document_label.as_str(),
            self.index_within_document,
            self.search_phrase_handle,
            self.word_matches
                .iter()
                .map(|w| {
                    (
                        w.document_token_index,
                        w.structurally_matched_document_token_index,
                    )
                })
                .collect(),
        )
    }
}

/// Sort matches into result order and merge structurally identical ones,
/// keeping the most similar.
pub(crate) fn normalize(matches: Vec<DocumentMatch>) -> Vec<DocumentMatch> {
    let mut best: BTreeMap<_, DocumentMatch> = BTreeMap::new();
    for candidate in matches {
        let key = candidate.structural_key();
        match best.get(&key) {
            Some(existing)
                if existing.overall_similarity_measure >= candidate.overall_similarity_measure => {}
            _ => {
                best.insert(key, candidate);
            }
        }
    }
    let mut matches: Vec<DocumentMatch> = best.into_values().collect();
    matches.sort_by(|a, b| a.order_key().cmp(&b.order_key()));
    matches
}
