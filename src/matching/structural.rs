//! Structural alignment of a search phrase onto a document.
//!
//! Starting at every anchor the index proposes for the phrase root, the
//! matcher walks the phrase tree top-down. Each phrase child must be
//! reachable from its parent's document token over a semantic relation with
//! an accepted role, and each phrase word must match its document token
//! lexically, either directly or through a coreferent mention. Every
//! combination of child alignments yields a separate [`DocumentMatch`].

use log::trace;

use crate::config::MatchingConfig;
use crate::index::IndexedDocument;
use crate::matching::lexical::{LexicalMatch, LexicalMatcher};
use crate::matching::types::{DocumentMatch, MatchKind, WordMatch, normalize};
use crate::ontology::Ontology;
use crate::parse::document::Document;
use crate::parse::token::TokenSpan;
use crate::phrase::compiler::{SearchPhrase, SearchPhraseHandle};

/// One phrase word placed in the document.
#[derive(Clone, Debug)]
struct Placement {
    /// Position in [`SearchPhrase::tokens`].
    position: usize,
    /// Token in the structural position.
    structural: usize,
    /// Token that supplied the lexical match.
    lexical: usize,
    lexical_match: LexicalMatch,
    involves_coreference: bool,
    /// The relation that reached this word was uncertain.
    edge_uncertain: bool,
}

type Alignment = Vec<Placement>;

/// Aligns search phrases onto analysed documents.
#[derive(Clone, Copy, Debug)]
pub struct StructuralMatcher<'a> {
    lexical: LexicalMatcher<'a>,
    ontology: Option<&'a Ontology>,
    config: &'a MatchingConfig,
}

impl<'a> StructuralMatcher<'a> {
    pub fn new(ontology: Option<&'a Ontology>, config: &'a MatchingConfig) -> Self {
        StructuralMatcher {
            lexical: LexicalMatcher::new(ontology, config),
            ontology,
            config,
        }
    }

    /// All matches of `phrase` in `document`, deduplicated and in result
    /// order.
    pub fn match_document(
        &self,
        handle: SearchPhraseHandle,
        phrase: &SearchPhrase,
        document: &IndexedDocument,
    ) -> Vec<DocumentMatch> {
        let anchors = document.anchors(phrase, self.ontology, self.config);
        let mut matches = Vec::new();
        for anchor in anchors {
            let alignments = self.align(phrase, document, phrase.root_position(), anchor, false);
            trace!(
                "'{}' at {}:{} yields {} alignments",
                phrase.label(),
                document.label(),
                anchor,
                alignments.len()
            );
            matches.extend(
                alignments
                    .into_iter()
                    .map(|alignment| build_match(handle, phrase, document, alignment)),
            );
        }
        normalize(matches)
    }

    /// Ways the phrase word at `position` can be supplied when it occupies
    /// `structural`: the token itself, or failing that each coreferent
    /// mention head and the heads coordinated with it.
    fn word_alternatives(
        &self,
        phrase: &SearchPhrase,
        document: &IndexedDocument,
        position: usize,
        structural: usize,
    ) -> Vec<(usize, LexicalMatch, bool)> {
        let token = &phrase.tokens()[position];
        if let Some(lexical_match) = self.lexical.compare(token, document, structural) {
            return vec![(structural, lexical_match, false)];
        }

        let mut candidates = Vec::new();
        for head in document.document().coreferent_heads(structural) {
            push_unique(&mut candidates, head);
            for conjunct in conjuncts(document.document(), head) {
                push_unique(&mut candidates, conjunct);
            }
        }
        candidates
            .into_iter()
            .filter(|&candidate| candidate != structural)
            .filter_map(|candidate| {
                self.lexical
                    .compare(token, document, candidate)
                    .map(|mut lexical_match| {
                        if lexical_match.kind == MatchKind::Direct {
                            lexical_match.kind = MatchKind::Coreference;
                        }
                        (candidate, lexical_match, true)
                    })
            })
            .collect()
    }

    fn align(
        &self,
        phrase: &SearchPhrase,
        document: &IndexedDocument,
        position: usize,
        structural: usize,
        edge_uncertain: bool,
    ) -> Vec<Alignment> {
        let cap = self.config.max_alignments_per_anchor.max(1);
        let phrase_token = &phrase.tokens()[position];
        let mut results = Vec::new();

        for (lexical, lexical_match, involves_coreference) in
            self.word_alternatives(phrase, document, position, structural)
        {
            let mut partials: Vec<Alignment> = vec![vec![Placement {
                position,
                structural,
                lexical,
                lexical_match,
                involves_coreference,
                edge_uncertain,
            }]];

            // Relations may start at the structural token, the lexical
            // token or any mention coreferent with either.
            let mut heads = vec![structural];
            push_unique(&mut heads, lexical);
            for head in document.document().coreferent_heads(structural) {
                push_unique(&mut heads, head);
            }
            for head in document.document().coreferent_heads(lexical) {
                push_unique(&mut heads, head);
            }

            for &child in &phrase_token.children {
                let accepted = phrase.tokens()[child].accepted_roles;
                let mut child_alignments: Vec<Alignment> = Vec::new();
                for &head in &heads {
                    for edge in document.graph().children(head) {
                        if !accepted.contains(&edge.role) {
                            continue;
                        }
                        for alignment in
                            self.align(phrase, document, child, edge.child, edge.uncertain)
                        {
                            if !child_alignments.iter().any(|a| same_tokens(a, &alignment)) {
                                child_alignments.push(alignment);
                            }
                        }
                    }
                }

                let mut next = Vec::new();
                'combine: for partial in &partials {
                    for child_alignment in &child_alignments {
                        if next.len() >= cap {
                            break 'combine;
                        }
                        let overlaps = child_alignment
                            .iter()
                            .any(|c| partial.iter().any(|p| p.structural == c.structural));
                        if overlaps {
                            continue;
                        }
                        let mut combined = partial.clone();
                        combined.extend(child_alignment.iter().cloned());
                        next.push(combined);
                    }
                }
                partials = next;
                if partials.is_empty() {
                    break;
                }
            }

            results.extend(partials);
            if results.len() >= cap {
                results.truncate(cap);
                break;
            }
        }
        results
    }
}

fn push_unique(values: &mut Vec<usize>, value: usize) {
    if !values.contains(&value) {
        values.push(value);
    }
}

fn same_tokens(a: &Alignment, b: &Alignment) -> bool {
    a.len() == b.len()
        && a.iter().zip(b.iter()).all(|(x, y)| {
            x.position == y.position && x.structural == y.structural && x.lexical == y.lexical
        })
}

/// Tokens coordinated with `head`, transitively.
fn conjuncts(document: &Document, head: usize) -> Vec<usize> {
    let mut found = Vec::new();
    let mut stack = vec![head];
    while let Some(current) = stack.pop() {
        for &child in document.children(current) {
            if document.token(child).dep == "conj" && !found.contains(&child) {
                found.push(child);
                stack.push(child);
            }
        }
    }
    found.sort_unstable();
    found
}

/// Name of the entity a token refers to: its own name, or the first named
/// mention of its coreference chain.
fn extracted_word(document: &IndexedDocument, lexical: usize, document_word: &str) -> String {
    let doc = document.document();
    let graph = document.graph();
    let is_named = |index: usize| {
        let token = doc.token(index);
        token.entity.is_some() || token.pos == "PROPN"
    };
    if is_named(lexical) {
        return document_word.to_string();
    }
    let Some(chain) = doc.chain_of(lexical) else {
        return document_word.to_string();
    };
    chain
        .mentions
        .iter()
        .find(|mention| is_named(mention.head))
        .map(|mention| {
            let span = graph.word(mention.head).entity_phrase_span.unwrap_or_else(|| {
                let mut first = mention.first;
                while first < mention.last && doc.token(first).dep == "det" {
                    first += 1;
                }
                TokenSpan::new(first, mention.last)
            });
            doc.span_text(span).to_lowercase()
        })
        .unwrap_or_else(|| document_word.to_string())
}

fn build_match(
    handle: SearchPhraseHandle,
    phrase: &SearchPhrase,
    document: &IndexedDocument,
    mut alignment: Alignment,
) -> DocumentMatch {
    let graph = document.graph();
    let doc = document.document();
    alignment.sort_by_key(|p| phrase.tokens()[p.position].index);

    let negated = alignment.iter().any(|p| graph.is_negated(p.structural));
    let uncertain = alignment
        .iter()
        .any(|p| p.edge_uncertain || graph.is_uncertain(p.structural));
    let involves_coreference = alignment.iter().any(|p| p.involves_coreference);

    let root = phrase.root_position();
    let index_within_document = alignment
        .iter()
        .find(|p| p.position == root)
        .map(|p| p.lexical)
        .unwrap_or_default();

    let first = alignment
        .iter()
        .flat_map(|p| [p.structural, p.lexical_match.span.first])
        .min()
        .unwrap_or_default();
    let last = alignment
        .iter()
        .flat_map(|p| [p.structural, p.lexical_match.span.last])
        .max()
        .unwrap_or_default();

    let overall_similarity_measure = alignment
        .iter()
        .map(|p| p.lexical_match.similarity)
        .product();

    let word_matches = alignment
        .into_iter()
        .map(|p| {
            let phrase_token = &phrase.tokens()[p.position];
            let LexicalMatch {
                kind,
                similarity,
                depth,
                span,
                document_word,
                explanation,
            } = p.lexical_match;
            WordMatch {
                search_phrase_token_index: phrase_token.index,
                search_phrase_word: phrase_token.word.clone(),
                document_token_index: p.lexical,
                first_document_token_index: span.first,
                last_document_token_index: span.last,
                structurally_matched_document_token_index: p.structural,
                extracted_word: extracted_word(document, p.lexical, &document_word),
                document_phrase: doc.span_text(span),
                document_word,
                match_kind: kind,
                negated,
                uncertain,
                similarity_measure: similarity,
                involves_coreference: p.involves_coreference,
                depth,
                explanation,
            }
        })
        .collect();

    DocumentMatch {
        search_phrase_handle: handle,
        search_phrase_label: phrase.label().to_string(),
        search_phrase_text: phrase.text().to_string(),
        document_label: document.label().to_string(),
        index_within_document,
        sentences_within_document: doc.sentences_text(first, last),
        negated,
        uncertain,
        involves_coreference,
        overall_similarity_measure,
        word_matches,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::coreference::{ParsedChain, ParsedMention};
    use crate::parse::document::ParsedText;
    use crate::parse::sentence::ParsedSentence;
    use crate::parse::token::Token;
    use crate::phrase::compiler::PhraseCompiler;

    type Row<'a> = (&'a str, &'a str, &'a str, &'a str, &'a str, Option<usize>);

    fn sentence(rows: &[Row]) -> ParsedSentence {
        ParsedSentence::new(
            rows.iter()
                .enumerate()
                .map(|(i, (text, lemma, pos, tag, dep, head))| {
                    Token::new(i, *text, *lemma, *pos)
                        .with_tag(*tag)
                        .with_dependency(*dep, *head)
                })
                .collect(),
        )
    }

    fn big_dog_chases_cat() -> SearchPhrase {
        PhraseCompiler::new()
            .compile(
                &ParsedText::new(vec![sentence(&[
                    ("A", "a", "DET", "DT", "det", Some(2)),
                    ("big", "big", "ADJ", "JJ", "amod", Some(2)),
                    ("dog", "dog", "NOUN", "NN", "nsubj", Some(3)),
                    ("chases", "chase", "VERB", "VBZ", "ROOT", None),
                    ("a", "a", "DET", "DT", "det", Some(5)),
                    ("cat", "cat", "NOUN", "NN", "dobj", Some(3)),
                ])]),
                None,
            )
            .unwrap()
    }

    fn run(parsed: ParsedText) -> Vec<DocumentMatch> {
        let document = IndexedDocument::analyze("doc", &parsed).unwrap();
        let config = MatchingConfig::default();
        StructuralMatcher::new(None, &config).match_document(
            SearchPhraseHandle(0),
            &big_dog_chases_cat(),
            &document,
        )
    }

    #[test]
    fn test_passive_sentence_matches() {
        let matches = run(ParsedText::new(vec![sentence(&[
            ("The", "the", "DET", "DT", "det", Some(1)),
            ("cat", "cat", "NOUN", "NN", "nsubjpass", Some(3)),
            ("was", "be", "AUX", "VBD", "auxpass", Some(3)),
            ("chased", "chase", "VERB", "VBN", "ROOT", None),
            ("by", "by", "ADP", "IN", "agent", Some(3)),
            ("the", "the", "DET", "DT", "det", Some(7)),
            ("big", "big", "ADJ", "JJ", "amod", Some(7)),
            ("dog", "dog", "NOUN", "NN", "pobj", Some(4)),
        ])]));

        assert_eq!(matches.len(), 1);
        let m = &matches[0];
        assert_eq!(m.index_within_document, 3);
        assert!(!m.negated);
        assert!(!m.uncertain);
        let indices: Vec<_> = m.word_matches.iter().map(|w| w.document_token_index).collect();
        assert_eq!(indices, vec![6, 7, 3, 1]);
        assert!(m.word_matches.iter().all(|w| w.match_kind == MatchKind::Direct));
        assert_eq!(m.overall_similarity_measure, 1.0);
    }

    #[test]
    fn test_roles_are_not_swapped() {
        let matches = run(ParsedText::new(vec![sentence(&[
            ("The", "the", "DET", "DT", "det", Some(1)),
            ("cat", "cat", "NOUN", "NN", "nsubj", Some(2)),
            ("chased", "chase", "VERB", "VBD", "ROOT", None),
            ("the", "the", "DET", "DT", "det", Some(5)),
            ("big", "big", "ADJ", "JJ", "amod", Some(5)),
            ("dog", "dog", "NOUN", "NN", "dobj", Some(2)),
        ])]));
        assert!(matches.is_empty());
    }

    #[test]
    fn test_coreferent_pronoun_supplies_subject() {
        let parsed = ParsedText::new(vec![
            sentence(&[
                ("There", "there", "PRON", "EX", "expl", Some(1)),
                ("was", "be", "VERB", "VBD", "ROOT", None),
                ("a", "a", "DET", "DT", "det", Some(4)),
                ("big", "big", "ADJ", "JJ", "amod", Some(4)),
                ("dog", "dog", "NOUN", "NN", "attr", Some(1)),
            ]),
            sentence(&[
                ("It", "it", "PRON", "PRP", "nsubj", Some(1)),
                ("chased", "chase", "VERB", "VBD", "ROOT", None),
                ("a", "a", "DET", "DT", "det", Some(3)),
                ("cat", "cat", "NOUN", "NN", "dobj", Some(1)),
            ]),
        ])
        .with_chain(ParsedChain::new(vec![
            ParsedMention::new(0, 2, 4),
            ParsedMention::new(1, 0, 0),
        ]));

        let matches = run(parsed);
        assert_eq!(matches.len(), 1);
        let m = &matches[0];
        assert!(m.involves_coreference);
        assert_eq!(m.index_within_document, 6);

        let dog = m.word_match(2).unwrap();
        assert_eq!(dog.document_token_index, 4);
        assert_eq!(dog.structurally_matched_document_token_index, 5);
        assert_eq!(dog.match_kind, MatchKind::Coreference);
        assert!(dog.involves_coreference);

        let big = m.word_match(1).unwrap();
        assert_eq!(big.document_token_index, 3);
        assert_eq!(m.sentences_within_document, "There was a big dog It chased a cat");
    }

    #[test]
    fn test_negation_marks_every_word() {
        let matches = run(ParsedText::new(vec![sentence(&[
            ("The", "the", "DET", "DT", "det", Some(2)),
            ("big", "big", "ADJ", "JJ", "amod", Some(2)),
            ("dog", "dog", "NOUN", "NN", "nsubj", Some(5)),
            ("did", "do", "AUX", "VBD", "aux", Some(5)),
            ("not", "not", "PART", "RB", "neg", Some(5)),
            ("chase", "chase", "VERB", "VB", "ROOT", None),
            ("the", "the", "DET", "DT", "det", Some(7)),
            ("cat", "cat", "NOUN", "NN", "dobj", Some(5)),
        ])]));
        assert_eq!(matches.len(), 1);
        assert!(matches[0].negated);
        assert!(matches[0].word_matches.iter().all(|w| w.negated));
    }

    #[test]
    fn test_conjuncts() {
        let document = Document::from_parsed(&ParsedText::new(vec![sentence(&[
            ("dogs", "dog", "NOUN", "NNS", "ROOT", None),
            (",", ",", "PUNCT", ",", "punct", Some(0)),
            ("cats", "cat", "NOUN", "NNS", "conj", Some(0)),
            ("and", "and", "CCONJ", "CC", "cc", Some(2)),
            ("mice", "mouse", "NOUN", "NNS", "conj", Some(2)),
        ])]))
        .unwrap();
        assert_eq!(conjuncts(&document, 0), vec![2, 4]);
    }
}
