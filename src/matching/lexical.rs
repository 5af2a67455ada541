//! Word-level comparison.
//!
//! [`LexicalMatcher::compare`] decides whether one document token can stand
//! for one search-phrase token, trying the match kinds in order of
//! preference: wildcard, direct, ontology, embedding similarity.

use crate::config::MatchingConfig;
use crate::index::IndexedDocument;
use crate::matching::types::MatchKind;
use crate::ontology::{Ontology, OntologyRelation};
use crate::parse::token::TokenSpan;
use crate::phrase::compiler::{PhraseToken, Wildcard};

/// A successful word comparison.
#[derive(Clone, Debug, PartialEq)]
pub struct LexicalMatch {
    pub kind: MatchKind,
    pub similarity: f32,
    /// Ontology steps (0 unless `kind` is ontology).
    pub depth: usize,
    /// Document tokens covered by the match.
    pub span: TokenSpan,
    /// Lower-cased form of the covered tokens.
    pub document_word: String,
    pub explanation: String,
}

/// Compares phrase tokens with document tokens.
#[derive(Clone, Copy, Debug)]
pub struct LexicalMatcher<'a> {
    ontology: Option<&'a Ontology>,
    config: &'a MatchingConfig,
}

impl<'a> LexicalMatcher<'a> {
    pub fn new(ontology: Option<&'a Ontology>, config: &'a MatchingConfig) -> Self {
        LexicalMatcher { ontology, config }
    }

    /// Compare `phrase_token` with the document token at `index`.
    pub fn compare(
        &self,
        phrase_token: &PhraseToken,
        document: &IndexedDocument,
        index: usize,
    ) -> Option<LexicalMatch> {
        let graph = document.graph();
        if !graph.is_matchable(index) {
            return None;
        }
        let token = document.document().token(index);
        let word = graph.word(index);
        let display = phrase_token.display_word();

        if let Some(wildcard) = &phrase_token.wildcard {
            let (span, explanation) = match wildcard {
                Wildcard::Entity(label) => {
                    if token.entity.as_deref() != Some(label.as_str()) {
                        return None;
                    }
                    (
                        word.entity_phrase_span.unwrap_or(word.lexical_span),
                        format!("Has an entity label matching {display}."),
                    )
                }
                Wildcard::Noun if token.is_nominal() => (
                    word.entity_phrase_span.unwrap_or(word.lexical_span),
                    format!("Is a noun matching {display}."),
                ),
                Wildcard::Generic if token.is_nominal() => (
                    word.entity_phrase_span.unwrap_or(word.lexical_span),
                    format!("Matches the generic pronoun {display}."),
                ),
                _ => return None,
            };
            return Some(LexicalMatch {
                kind: MatchKind::Entity,
                similarity: 1.0,
                depth: 0,
                span,
                document_word: document.document().span_text(span).to_lowercase(),
                explanation,
            });
        }

        let exact = |kind: MatchKind, depth: usize, explanation: String| LexicalMatch {
            kind,
            similarity: 1.0,
            depth,
            span: word.lexical_span,
            document_word: word.lexical_form.clone(),
            explanation,
        };

        if phrase_token.key == word.lexical_key
            || phrase_token.key == word.text_key
            || phrase_token.text_key == word.text_key
        {
            return Some(exact(
                MatchKind::Direct,
                0,
                format!("Matches {display} directly."),
            ));
        }

        if let Some(ontology) = self.ontology {
            let relation = ontology
                .relation(
                    &word.lexical_form,
                    &phrase_token.word,
                    self.config.ontology_max_depth,
                    self.config.symmetric_ontology,
                )
                .or_else(|| {
                    ontology.relation(
                        &token.text,
                        &phrase_token.word,
                        self.config.ontology_max_depth,
                        self.config.symmetric_ontology,
                    )
                });
            if let Some(relation) = relation {
                return Some(exact(
                    MatchKind::Ontology,
                    relation.depth(),
                    ontology_explanation(relation, &display),
                ));
            }
        }

        let threshold = self.config.similarity_threshold?;
        if phrase_token.is_root() && !self.config.embedding_on_root_words {
            return None;
        }
        let similarity = cosine_similarity(phrase_token.vector.as_deref()?, token.vector.as_deref()?);
        if similarity < threshold {
            return None;
        }
        Some(LexicalMatch {
            kind: MatchKind::Similarity,
            similarity,
            depth: 0,
            span: word.lexical_span,
            document_word: word.lexical_form.clone(),
            explanation: format!(
                "Has a word embedding that is {:.0}% similar to {display}.",
                similarity * 100.0
            ),
        })
    }
}

fn ontology_explanation(relation: OntologyRelation, display: &str) -> String {
    match relation {
        OntologyRelation::Synonym => format!("Is a synonym of {display} in the ontology."),
        OntologyRelation::Hyponym(depth) => {
            let name = match depth {
                1 => "child",
                2 => "grandchild",
                3 => "great-grandchild",
                _ => "descendant",
            };
            format!("Is a {name} of {display} in the ontology.")
        }
        OntologyRelation::Hypernym(depth) => {
            let name = match depth {
                1 => "parent",
                2 => "grandparent",
                3 => "great-grandparent",
                _ => "ancestor",
            };
            format!("Is a {name} of {display} in the ontology.")
        }
    }
}

/// Cosine similarity of two embeddings; 0.0 for mismatched lengths or zero
/// vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot_product / (norm_a * norm_b)
    }
}
