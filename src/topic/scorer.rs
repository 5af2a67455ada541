//! Topic relevance scoring.
//!
//! A reference text is broken into scoring units per sentence: every
//! matchable word, and every semantic relation between two matchable words.
//! Each unit is weighted by how close it lies to the head of its sentence.
//! A document earns a unit when one of its tokens (or a pair of related
//! tokens) matches it with the lexical machinery used for structural
//! matching; the earned score shrinks with every ontology or coreference
//! step taken. Per reference sentence only the best window of
//! `window_size` document tokens counts, each unit at most once. The
//! document score is the sum over reference sentences, divided by the
//! number of matchable reference words.

use std::collections::BTreeMap;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::config::{MatchingConfig, TopicMatchConfig};
use crate::index::IndexedDocument;
use crate::matching::lexical::LexicalMatcher;
use crate::matching::types::MatchKind;
use crate::ontology::Ontology;
use crate::phrase::compiler::PhraseToken;
use crate::semantics::role::Role;

/// A document token that contributed to a topic match.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TopicWordInfo {
    pub document_token_index: usize,
    /// Position of the matched word in the reference text.
    pub reference_token_index: usize,
    pub reference_word: String,
    #[serde(rename = "match_type")]
    pub match_kind: MatchKind,
    /// Whether the token was matched as part of a relation.
    pub relation: bool,
}

/// How well one document matches a reference text.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TopicMatch {
    pub document_label: String,
    /// Non-negative; comparable only within one scoring run.
    pub score: f32,
    /// Sentence holding the start of the best-scoring window.
    pub sentence_index: usize,
    pub start_token_index: usize,
    pub end_token_index: usize,
    /// Text of the sentences covered by the best-scoring window.
    pub sentences_text: String,
    /// Contributing tokens of the best-scoring window, in document order.
    pub word_infos: Vec<TopicWordInfo>,
}

/// Sort topic matches by descending score, then ascending label, and apply
/// the result limit.
pub fn rank(mut matches: Vec<TopicMatch>, max_results: Option<usize>) -> Vec<TopicMatch> {
    matches.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.document_label.cmp(&b.document_label))
    });
    if let Some(limit) = max_results {
        matches.truncate(limit);
    }
    matches
}

#[derive(Clone, Debug)]
enum UnitKind {
    Word(usize),
    Relation {
        head: usize,
        child: usize,
        roles: &'static [Role],
    },
}

#[derive(Clone, Debug)]
struct Unit {
    kind: UnitKind,
    weight: f32,
}

/// A document token standing for one reference word.
#[derive(Clone, Debug)]
struct WordHit {
    position: usize,
    kind: MatchKind,
    /// Decay and similarity combined.
    factor: f32,
}

/// A unit earned somewhere in the document.
#[derive(Clone, Debug)]
struct UnitHit {
    unit: usize,
    first: usize,
    last: usize,
    score: f32,
    infos: Vec<TopicWordInfo>,
}

/// The best window of one reference sentence.
#[derive(Clone, Debug, Default)]
struct Window {
    score: f32,
    first: usize,
    last: usize,
    infos: Vec<TopicWordInfo>,
}

/// Scores documents against one analysed reference text.
pub struct TopicScorer<'a> {
    reference: &'a IndexedDocument,
    lexical: LexicalMatcher<'a>,
    ontology: Option<&'a Ontology>,
    matching: &'a MatchingConfig,
    config: &'a TopicMatchConfig,
    /// Scoring units per reference sentence.
    sentences: Vec<Vec<Unit>>,
    /// Reference words as comparable tokens, by reference position.
    words: AHashMap<usize, PhraseToken>,
}

impl<'a> TopicScorer<'a> {
    pub fn new(
        reference: &'a IndexedDocument,
        ontology: Option<&'a Ontology>,
        matching: &'a MatchingConfig,
        config: &'a TopicMatchConfig,
    ) -> Self {
        let doc = reference.document();
        let graph = reference.graph();
        let mut words = AHashMap::new();
        let mut sentences = Vec::with_capacity(doc.sentences().len());

        for sentence in doc.sentences() {
            let mut units = Vec::new();
            for index in sentence.start..sentence.end {
                if !graph.is_matchable(index) {
                    continue;
                }
                words.insert(index, reference_token(reference, index));
                units.push(Unit {
                    kind: UnitKind::Word(index),
                    weight: config.word_weight * config.distance_decay.powi(doc.depth(index) as i32),
                });
            }
            for head in sentence.start..sentence.end {
                if !graph.is_matchable(head) {
                    continue;
                }
                let mut seen = Vec::new();
                for edge in graph.children(head) {
                    if !graph.is_matchable(edge.child) || seen.contains(&edge.child) {
                        continue;
                    }
                    seen.push(edge.child);
                    let depth = doc.depth(head).min(doc.depth(edge.child));
                    units.push(Unit {
                        kind: UnitKind::Relation {
                            head,
                            child: edge.child,
                            roles: edge.role.equivalents(),
                        },
                        weight: config.relation_weight * config.distance_decay.powi(depth as i32),
                    });
                }
            }
            sentences.push(units);
        }

        TopicScorer {
            reference,
            lexical: LexicalMatcher::new(ontology, matching),
            ontology,
            matching,
            config,
            sentences,
            words,
        }
    }

    /// Number of matchable reference words.
    pub fn reference_word_count(&self) -> usize {
        self.words.len()
    }

    /// Score one document; `None` if it shares nothing with the reference.
    pub fn score(&self, document: &IndexedDocument) -> Option<TopicMatch> {
        if self.words.is_empty() {
            return None;
        }
        let mut hits_by_word: AHashMap<usize, Vec<WordHit>> = AHashMap::new();
        for (&index, token) in &self.words {
            let hits = self.word_hits(token, document);
            if !hits.is_empty() {
                hits_by_word.insert(index, hits);
            }
        }
        if hits_by_word.is_empty() {
            return None;
        }

        let mut total = 0.0;
        let mut best: Option<Window> = None;
        for units in &self.sentences {
            let hits = self.unit_hits(units, &hits_by_word, document);
            let Some(window) = best_window(&hits, self.config.window_size) else {
                continue;
            };
            total += window.score;
            if best.as_ref().is_none_or(|b| window.score > b.score) {
                best = Some(window);
            }
        }

        let window = best?;
        let score = total / self.words.len() as f32;
        if score <= 0.0 {
            return None;
        }
        let doc = document.document();
        Some(TopicMatch {
            document_label: document.label().to_string(),
            score,
            sentence_index: doc.sentence_of(window.first).index,
            start_token_index: window.first,
            end_token_index: window.last,
            sentences_text: doc.sentences_text(window.first, window.last),
            word_infos: window.infos,
        })
    }

    /// Document tokens that stand for a reference word, each with its best
    /// factor.
    fn word_hits(&self, token: &PhraseToken, document: &IndexedDocument) -> Vec<WordHit> {
        let mut hits = Vec::new();
        for position in document.candidates(token, self.ontology, self.matching) {
            let direct = self
                .lexical
                .compare(token, document, position)
                .map(|m| (m.kind, self.decay(m.depth) * m.similarity));
            let best = direct.or_else(|| {
                document
                    .document()
                    .coreferent_heads(position)
                    .into_iter()
                    .filter_map(|head| self.lexical.compare(token, document, head))
                    .map(|m| {
                        let kind = if m.kind == MatchKind::Direct {
                            MatchKind::Coreference
                        } else {
                            m.kind
                        };
                        (kind, self.decay(m.depth + 1) * m.similarity)
                    })
                    .max_by(|a, b| a.1.total_cmp(&b.1))
            });
            if let Some((kind, factor)) = best {
                hits.push(WordHit {
                    position,
                    kind,
                    factor,
                });
            }
        }
        hits
    }

    fn unit_hits(
        &self,
        units: &[Unit],
        hits_by_word: &AHashMap<usize, Vec<WordHit>>,
        document: &IndexedDocument,
    ) -> Vec<UnitHit> {
        let graph = document.graph();
        let mut unit_hits = Vec::new();
        for (unit_index, unit) in units.iter().enumerate() {
            match &unit.kind {
                UnitKind::Word(index) => {
                    for hit in hits_by_word.get(index).into_iter().flatten() {
                        unit_hits.push(UnitHit {
                            unit: unit_index,
                            first: hit.position,
                            last: hit.position,
                            score: unit.weight * hit.factor,
                            infos: vec![self.info(*index, hit, false)],
                        });
                    }
                }
                UnitKind::Relation { head, child, roles } => {
                    let (Some(head_hits), Some(child_hits)) =
                        (hits_by_word.get(head), hits_by_word.get(child))
                    else {
                        continue;
                    };
                    for head_hit in head_hits {
                        for edge in graph.children(head_hit.position) {
                            if !roles.contains(&edge.role) {
                                continue;
                            }
                            let Some(child_hit) =
                                child_hits.iter().find(|h| h.position == edge.child)
                            else {
                                continue;
                            };
                            unit_hits.push(UnitHit {
                                unit: unit_index,
                                first: head_hit.position.min(child_hit.position),
                                last: head_hit.position.max(child_hit.position),
                                score: unit.weight * head_hit.factor * child_hit.factor,
                                infos: vec![
                                    self.info(*head, head_hit, true),
                                    self.info(*child, child_hit, true),
                                ],
                            });
                        }
                    }
                }
            }
        }
        unit_hits
    }

    fn info(&self, reference_index: usize, hit: &WordHit, relation: bool) -> TopicWordInfo {
        TopicWordInfo {
            document_token_index: hit.position,
            reference_token_index: reference_index,
            reference_word: self.reference.graph().word(reference_index).lexical_form.clone(),
            match_kind: hit.kind,
            relation,
        }
    }

    fn decay(&self, steps: usize) -> f32 {
        self.config.depth_decay.powi(steps as i32)
    }
}

/// A reference word in the shape the lexical matcher compares. Reference
/// words are never roots, so embedding matches apply to all of them.
fn reference_token(reference: &IndexedDocument, index: usize) -> PhraseToken {
    let word = reference.graph().word(index);
    PhraseToken {
        index,
        word: word.lexical_form.clone(),
        key: word.lexical_key.clone(),
        text_key: word.text_key.clone(),
        wildcard: None,
        parent: Some(index),
        role: None,
        accepted_roles: &[],
        children: Vec::new(),
        vector: reference.document().token(index).vector.clone(),
    }
}

/// The window of `size` tokens whose hits score highest, each unit counted
/// once at its best.
fn best_window(hits: &[UnitHit], size: usize) -> Option<Window> {
    let size = size.max(1);
    let mut starts: Vec<usize> = hits.iter().map(|h| h.first).collect();
    starts.sort_unstable();
    starts.dedup();

    let mut best: Option<Window> = None;
    for start in starts {
        let mut chosen: BTreeMap<usize, &UnitHit> = BTreeMap::new();
        for hit in hits {
            if hit.first < start || hit.last - start >= size {
                continue;
            }
            let slot = chosen.entry(hit.unit).or_insert(hit);
            if hit.score > slot.score {
                *slot = hit;
            }
        }
        let score: f32 = chosen.values().map(|h| h.score).sum();
        if best.as_ref().is_some_and(|b| b.score >= score) {
            continue;
        }
        let last = chosen.values().map(|h| h.last).max().unwrap_or(start);
        let mut infos: Vec<TopicWordInfo> = Vec::new();
        for hit in chosen.values() {
            for info in &hit.infos {
                match infos
                    .iter_mut()
                    .find(|i| i.document_token_index == info.document_token_index)
                {
                    Some(existing) => existing.relation |= info.relation,
                    None => infos.push(info.clone()),
                }
            }
        }
        infos.sort_by_key(|i| i.document_token_index);
        best = Some(Window {
            score,
            first: start,
            last,
            infos,
        });
    }
    best
}
