//! Per-document inverted index.
//!
//! Every registered document is analysed once into an [`IndexedDocument`]:
//! the validated [`Document`], its [`SemanticGraph`] and a [`DocumentIndex`]
//! mapping lexical keys and entity labels to token positions. Matching asks
//! the index for anchor candidates instead of trying every token.

use std::collections::BTreeSet;

use ahash::AHashMap;

use crate::config::MatchingConfig;
use crate::error::Result;
use crate::ontology::Ontology;
use crate::parse::document::{Document, ParsedText};
use crate::parse::token::lexical_key;
use crate::phrase::compiler::{PhraseToken, SearchPhrase, Wildcard};
use crate::semantics::analyzer::{AnalysisMode, SemanticAnalyzer, SemanticGraph};

/// Token positions of one document by lexical key and entity label.
#[derive(Debug, Clone, Default)]
pub struct DocumentIndex {
    keys: AHashMap<String, Vec<usize>>,
    entities: AHashMap<String, Vec<usize>>,
    nominals: Vec<usize>,
    matchable: Vec<usize>,
}

impl DocumentIndex {
    /// Index every matchable token of an analysed document.
    pub fn build(document: &Document, graph: &SemanticGraph) -> Self {
        let mut index = DocumentIndex::default();
        for token in document.tokens() {
            let word = graph.word(token.index);
            if !word.matchable {
                continue;
            }
            index.add_key(&word.lexical_key, token.index);
            if word.text_key != word.lexical_key {
                index.add_key(&word.text_key, token.index);
            }
            if let Some(label) = &token.entity {
                index
                    .entities
                    .entry(label.clone())
                    .or_default()
                    .push(token.index);
            }
            if token.is_nominal() {
                index.nominals.push(token.index);
            }
            index.matchable.push(token.index);
        }
        index
    }

    fn add_key(&mut self, key: &str, position: usize) {
        if key.is_empty() {
            return;
        }
        let positions = self.keys.entry(key.to_string()).or_default();
        if positions.last() != Some(&position) {
            positions.push(position);
        }
    }

    /// Positions of tokens with the given lexical key.
    pub fn positions(&self, key: &str) -> &[usize] {
        self.keys.get(key).map(Vec::as_slice).unwrap_or_default()
    }

    /// Positions of tokens with the given entity label.
    pub fn entity_positions(&self, label: &str) -> &[usize] {
        self.entities
            .get(label)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Positions of nouns and proper nouns.
    pub fn nominals(&self) -> &[usize] {
        &self.nominals
    }

    /// Positions of all matchable tokens.
    pub fn matchable(&self) -> &[usize] {
        &self.matchable
    }

    /// All indexed lexical keys.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.keys.keys().map(String::as_str)
    }
}

/// Lexical keys a document token may carry to match a phrase token
/// lexically: its own keys plus the keys of ontology-related words.
pub(crate) fn expanded_keys(
    token: &PhraseToken,
    ontology: Option<&Ontology>,
    config: &MatchingConfig,
) -> Vec<String> {
    let mut keys = vec![token.key.clone()];
    if token.text_key != token.key {
        keys.push(token.text_key.clone());
    }
    if let Some(ontology) = ontology {
        for (word, _) in
            ontology.matching_words(&token.word, config.ontology_max_depth, config.symmetric_ontology)
        {
            let key = lexical_key(&word);
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
    }
    keys
}

/// A document analysed and indexed for matching.
#[derive(Debug, Clone)]
pub struct IndexedDocument {
    label: String,
    document: Document,
    graph: SemanticGraph,
    index: DocumentIndex,
}

impl IndexedDocument {
    /// Validate, analyse and index a parsed text.
    pub fn analyze<S: Into<String>>(label: S, parsed: &ParsedText) -> Result<Self> {
        let document = Document::from_parsed(parsed)?;
        let graph = SemanticAnalyzer::new(AnalysisMode::Document).analyze(&document);
        let index = DocumentIndex::build(&document, &graph);
        Ok(IndexedDocument {
            label: label.into(),
            document,
            graph,
            index,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn graph(&self) -> &SemanticGraph {
        &self.graph
    }

    pub fn index(&self) -> &DocumentIndex {
        &self.index
    }

    /// Tokens at which the root of `phrase` may be aligned, in document
    /// order.
    pub fn anchors(
        &self,
        phrase: &SearchPhrase,
        ontology: Option<&Ontology>,
        config: &MatchingConfig,
    ) -> Vec<usize> {
        self.candidates(phrase.root(), ontology, config)
    }

    /// Tokens that may stand for `token`, in document order: tokens that
    /// may match it lexically, plus the heads of mentions coreferent with
    /// them.
    pub fn candidates(
        &self,
        token: &PhraseToken,
        ontology: Option<&Ontology>,
        config: &MatchingConfig,
    ) -> Vec<usize> {
        let mut lexical = BTreeSet::new();
        match &token.wildcard {
            Some(Wildcard::Entity(label)) => {
                lexical.extend(self.index.entity_positions(label).iter().copied())
            }
            Some(Wildcard::Noun) | Some(Wildcard::Generic) => {
                lexical.extend(self.index.nominals().iter().copied())
            }
            None => {
                for key in expanded_keys(token, ontology, config) {
                    lexical.extend(self.index.positions(&key).iter().copied());
                }
                if config.similarity_threshold.is_some()
                    && (!token.is_root() || config.embedding_on_root_words)
                {
                    lexical.extend(self.index.matchable().iter().copied());
                }
            }
        }

        let mut candidates = lexical.clone();
        for &position in &lexical {
            candidates.extend(self.document.coreferent_heads(position));
        }
        candidates.into_iter().collect()
    }
}
