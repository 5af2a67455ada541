//! Search-phrase compiler.
//!
//! Turns a parsed pattern sentence into a [`SearchPhrase`]: a tree of
//! [`PhraseToken`]s over canonical semantic roles with exactly one root.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SleuthError};
use crate::parse::document::{Document, ParsedText};
use crate::parse::token::lexical_key;
use crate::semantics::analyzer::{AnalysisMode, SemanticAnalyzer, SemanticGraph};
use crate::semantics::role::Role;

lazy_static! {
    /// `ENTITYPERSON` or `ENTITY<PERSON>`.
    static ref WILDCARD: Regex =
        Regex::new(r"^ENTITY(?:<([A-Z_]+)>|([A-Z_]+))$").expect("wildcard pattern should be valid");
}

/// Entity types a wildcard may name (OntoNotes).
pub const ENTITY_TYPES: &[&str] = &[
    "PERSON",
    "NORP",
    "FAC",
    "ORG",
    "GPE",
    "LOC",
    "PRODUCT",
    "EVENT",
    "WORK_OF_ART",
    "LAW",
    "LANGUAGE",
    "DATE",
    "TIME",
    "PERCENT",
    "MONEY",
    "QUANTITY",
    "ORDINAL",
    "CARDINAL",
];

/// Pronouns that stand for any noun in a pattern.
pub const GENERIC_PRONOUNS: &[&str] = &[
    "something",
    "someone",
    "somebody",
    "anything",
    "anyone",
    "anybody",
];

/// Identifies a registered search phrase. Handles increase in
/// registration order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SearchPhraseHandle(pub u64);

/// What a wildcard token accepts.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Wildcard {
    /// Any token carrying this entity label.
    Entity(String),
    /// Any noun or proper noun (`ENTITYNOUN`).
    Noun,
    /// Any noun or proper noun, written as a generic pronoun.
    Generic,
}

/// One compiled search-phrase token.
#[derive(Clone, Debug)]
pub struct PhraseToken {
    /// Position of the token in the parsed pattern.
    pub index: usize,
    /// Word reported in matches: the lexical form, or the wildcard as
    /// written (`ENTITYPERSON`).
    pub word: String,
    /// Lexical key of `word`.
    pub key: String,
    /// Lexical key of the surface text.
    pub text_key: String,
    pub wildcard: Option<Wildcard>,
    /// Position in [`SearchPhrase::tokens`] of the parent, `None` for the root.
    pub parent: Option<usize>,
    /// Role of the relation from the parent.
    pub role: Option<Role>,
    /// Document roles that satisfy `role`.
    pub accepted_roles: &'static [Role],
    /// Positions in [`SearchPhrase::tokens`] of the children.
    pub children: Vec<usize>,
    pub vector: Option<Vec<f32>>,
}

impl PhraseToken {
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Word used in explanations.
    pub fn display_word(&self) -> String {
        self.word.to_uppercase()
    }
}

/// A compiled, immutable search phrase.
#[derive(Clone, Debug)]
pub struct SearchPhrase {
    label: String,
    text: String,
    tokens: Vec<PhraseToken>,
    root: usize,
}

impl SearchPhrase {
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The pattern text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Compiled tokens in pattern order.
    pub fn tokens(&self) -> &[PhraseToken] {
        &self.tokens
    }

    /// The token that anchors matching.
    pub fn root(&self) -> &PhraseToken {
        &self.tokens[self.root]
    }

    pub fn root_position(&self) -> usize {
        self.root
    }

    /// Every non-wildcard token; a document must contain a word equivalent
    /// to each of them to match.
    pub fn lexical_tokens(&self) -> impl Iterator<Item = &PhraseToken> {
        self.tokens.iter().filter(|t| t.wildcard.is_none())
    }
}

/// Compiles parsed patterns into [`SearchPhrase`]s.
#[derive(Debug, Clone, Copy)]
pub struct PhraseCompiler {
    analyzer: SemanticAnalyzer,
}

impl Default for PhraseCompiler {
    fn default() -> Self {
        Self::new()
    }
}

impl PhraseCompiler {
    pub fn new() -> Self {
        PhraseCompiler {
            analyzer: SemanticAnalyzer::new(AnalysisMode::SearchPhrase),
        }
    }

    /// Compile a parsed pattern. The label defaults to the pattern text.
    pub fn compile(&self, parsed: &ParsedText, label: Option<&str>) -> Result<SearchPhrase> {
        let document = Document::from_parsed(parsed)?;
        let graph = self.analyzer.analyze(&document);
        let text = parsed.display_text();

        // Positions of phrase tokens by document index.
        let mut position_of = vec![None; document.len()];
        let mut tokens = Vec::new();
        for token in document.tokens() {
            let wildcard = wildcard_of(token.text.as_str(), &token.lemma)?;
            if wildcard.is_none() && !graph.is_matchable(token.index) {
                continue;
            }
            let word = match &wildcard {
                Some(Wildcard::Entity(_)) | Some(Wildcard::Noun) => token.text.clone(),
                _ => graph.word(token.index).lexical_form.clone(),
            };
            position_of[token.index] = Some(tokens.len());
            tokens.push(PhraseToken {
                index: token.index,
                key: lexical_key(&word),
                text_key: graph.word(token.index).text_key.clone(),
                word,
                wildcard,
                parent: None,
                role: None,
                accepted_roles: &[],
                children: Vec::new(),
                vector: token.vector.clone(),
            });
        }

        if tokens.is_empty() {
            return Err(SleuthError::invalid_pattern(format!(
                "'{text}' contains no matchable words"
            )));
        }

        let root = find_root(&graph, &tokens, &position_of, &text)?;
        build_tree(&graph, &mut tokens, &position_of, root);

        if let Some((_, orphan)) = tokens
            .iter()
            .enumerate()
            .find(|(position, token)| *position != root && token.parent.is_none())
        {
            return Err(SleuthError::invalid_pattern(format!(
                "'{}' in '{text}' is not connected to the root",
                orphan.word
            )));
        }

        Ok(SearchPhrase {
            label: label.map(str::to_string).unwrap_or_else(|| text.clone()),
            text,
            tokens,
            root,
        })
    }
}

fn wildcard_of(text: &str, lemma: &str) -> Result<Option<Wildcard>> {
    if let Some(captures) = WILDCARD.captures(text) {
        let label = captures
            .get(1)
            .or_else(|| captures.get(2))
            .map(|m| m.as_str())
            .unwrap_or_default();
        if label == "NOUN" {
            return Ok(Some(Wildcard::Noun));
        }
        if !ENTITY_TYPES.contains(&label) {
            return Err(SleuthError::invalid_pattern(format!(
                "unknown entity type in wildcard '{text}'"
            )));
        }
        return Ok(Some(Wildcard::Entity(label.to_string())));
    }
    if GENERIC_PRONOUNS.contains(&lemma.to_lowercase().as_str()) {
        return Ok(Some(Wildcard::Generic));
    }
    Ok(None)
}

fn find_root(
    graph: &SemanticGraph,
    tokens: &[PhraseToken],
    position_of: &[Option<usize>],
    text: &str,
) -> Result<usize> {
    let roots: Vec<usize> = tokens
        .iter()
        .enumerate()
        .filter(|(_, token)| {
            !graph
                .parents(token.index)
                .iter()
                .any(|edge| position_of[edge.head].is_some())
        })
        .map(|(position, _)| position)
        .collect();

    match roots.as_slice() {
        [root] => Ok(*root),
        [] => Err(SleuthError::invalid_pattern(format!(
            "'{text}' has no root word"
        ))),
        _ => Err(SleuthError::invalid_pattern(format!(
            "'{text}' has {} independent roots ({})",
            roots.len(),
            roots
                .iter()
                .map(|&r| tokens[r].word.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        ))),
    }
}

/// Breadth-first from the root; a token reached from several heads keeps
/// the first.
fn build_tree(
    graph: &SemanticGraph,
    tokens: &mut [PhraseToken],
    position_of: &[Option<usize>],
    root: usize,
) {
    let mut visited = vec![false; tokens.len()];
    visited[root] = true;
    let mut queue = std::collections::VecDeque::from([root]);
    while let Some(position) = queue.pop_front() {
        let head_index = tokens[position].index;
        for edge in graph.children(head_index) {
            let Some(child) = position_of[edge.child] else {
                continue;
            };
            if visited[child] {
                continue;
            }
            visited[child] = true;
            tokens[child].parent = Some(position);
            tokens[child].role = Some(edge.role);
            tokens[child].accepted_roles = edge.role.equivalents();
            tokens[position].children.push(child);
            queue.push_back(child);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::sentence::ParsedSentence;
    use crate::parse::token::Token;

    type Row<'a> = (&'a str, &'a str, &'a str, &'a str, &'a str, Option<usize>);

    fn parsed(rows: &[Row]) -> ParsedText {
        ParsedText::new(vec![ParsedSentence::new(
            rows.iter()
                .enumerate()
                .map(|(i, (text, lemma, pos, tag, dep, head))| {
                    Token::new(i, *text, *lemma, *pos)
                        .with_tag(*tag)
                        .with_dependency(*dep, *head)
                })
                .collect(),
        )])
    }

    fn big_dog_chases_cat() -> ParsedText {
        parsed(&[
            ("A", "a", "DET", "DT", "det", Some(2)),
            ("big", "big", "ADJ", "JJ", "amod", Some(2)),
            ("dog", "dog", "NOUN", "NN", "nsubj", Some(3)),
            ("chases", "chase", "VERB", "VBZ", "ROOT", None),
            ("a", "a", "DET", "DT", "det", Some(5)),
            ("cat", "cat", "NOUN", "NN", "dobj", Some(3)),
        ])
    }

    #[test]
    fn test_compile_tree() {
        let phrase = PhraseCompiler::new()
            .compile(&big_dog_chases_cat(), None)
            .unwrap();
        assert_eq!(phrase.label(), "A big dog chases a cat");
        assert_eq!(phrase.tokens().len(), 4);

        let root = phrase.root();
        assert_eq!(root.word, "chase");
        assert_eq!(root.index, 3);

        let dog = &phrase.tokens()[1];
        assert_eq!(dog.role, Some(Role::Subject));
        assert_eq!(phrase.tokens()[dog.parent.unwrap()].word, "chase");
        let big = &phrase.tokens()[0];
        assert_eq!(big.role, Some(Role::Modifier));
        assert_eq!(phrase.tokens()[3].role, Some(Role::Object));
    }

    #[test]
    fn test_wildcards() {
        let phrase = PhraseCompiler::new()
            .compile(
                &parsed(&[
                    ("An", "an", "DET", "DT", "det", Some(1)),
                    ("ENTITYPERSON", "ENTITYPERSON", "PROPN", "NNP", "nsubj", Some(2)),
                    ("visits", "visit", "VERB", "VBZ", "ROOT", None),
                    ("ENTITY<GPE>", "ENTITY<GPE>", "PROPN", "NNP", "dobj", Some(2)),
                    ("for", "for", "ADP", "IN", "prep", Some(2)),
                    ("something", "something", "PRON", "NN", "pobj", Some(4)),
                ]),
                Some("visits"),
            )
            .unwrap();
        assert_eq!(phrase.label(), "visits");
        let tokens = phrase.tokens();
        assert_eq!(tokens[0].wildcard, Some(Wildcard::Entity("PERSON".into())));
        assert_eq!(tokens[0].display_word(), "ENTITYPERSON");
        assert_eq!(tokens[2].wildcard, Some(Wildcard::Entity("GPE".into())));
        assert_eq!(tokens[4].wildcard, Some(Wildcard::Generic));
        assert_eq!(phrase.lexical_tokens().count(), 2);
    }

    #[test]
    fn test_unknown_entity_type() {
        let result = PhraseCompiler::new().compile(
            &parsed(&[
                ("ENTITYSPACESHIP", "ENTITYSPACESHIP", "PROPN", "NNP", "nsubj", Some(1)),
                ("flies", "fly", "VERB", "VBZ", "ROOT", None),
            ]),
            None,
        );
        assert!(matches!(result, Err(SleuthError::InvalidPattern(_))));
    }

    #[test]
    fn test_coordination_gives_multiple_roots() {
        let result = PhraseCompiler::new().compile(
            &parsed(&[
                ("dogs", "dog", "NOUN", "NNS", "ROOT", None),
                ("and", "and", "CCONJ", "CC", "cc", Some(0)),
                ("cats", "cat", "NOUN", "NNS", "conj", Some(0)),
            ]),
            None,
        );
        match result {
            Err(SleuthError::InvalidPattern(message)) => assert!(message.contains("2 independent roots")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_no_matchable_words() {
        let result = PhraseCompiler::new().compile(
            &parsed(&[
                ("the", "the", "DET", "DT", "ROOT", None),
            ]),
            None,
        );
        assert!(matches!(result, Err(SleuthError::InvalidPattern(_))));
    }
}
