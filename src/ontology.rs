//! Ontology: a concept graph of words and phrases.
//!
//! Words are grouped into synonym classes; classes are linked by directed
//! is-a edges to broader classes. Lexical comparison uses the graph to
//! accept a document word that is a synonym or a narrower concept of a
//! search-phrase word within a bounded number of steps.
//!
//! Words are keyed by [`lexical_key`], so "take over", "take-over" and
//! "takeover" are one entry.
//!
//! # Source format
//!
//! Either a plain array of synonym groups:
//!
//! ```json
//! [["take over", "acquire", "buy"], ["dog", "hound"]]
//! ```
//!
//! or an object with explicit is-a relations:
//!
//! ```json
//! {
//!   "entries": [
//!     {"word": "dog", "is_a": ["animal"], "synonyms": ["hound"]},
//!     {"word": "puppy", "is_a": ["dog"]}
//!   ],
//!   "synonym_groups": [["take over", "acquire"]]
//! }
//! ```
//!
//! # Examples
//!
//! ```
//! use sleuth::ontology::{OntologyBuilder, OntologyRelation};
//!
//! let ontology = OntologyBuilder::new()
//!     .is_a("dog", "animal")
//!     .is_a("puppy", "dog")
//!     .synonyms(&["dog", "hound"])
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(ontology.is_a("puppy", "animal", 4), Some(2));
//! assert_eq!(ontology.relation("hound", "dog", 4, false), Some(OntologyRelation::Synonym));
//! assert_eq!(ontology.relation("animal", "dog", 4, false), None);
//! ```

use std::collections::VecDeque;
use std::path::Path;

use ahash::{AHashMap, AHashSet};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SleuthError};
use crate::parse::token::lexical_key;

/// One word with its broader concepts and synonyms.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OntologyEntry {
    pub word: String,
    #[serde(default)]
    pub is_a: Vec<String>,
    #[serde(default)]
    pub synonyms: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct OntologySource {
    entries: Vec<OntologyEntry>,
    synonym_groups: Vec<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OntologyFile {
    Groups(Vec<Vec<String>>),
    Full(OntologySource),
}

/// How a document word relates to a search-phrase word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OntologyRelation {
    /// Same synonym class.
    Synonym,
    /// The document word is narrower, `depth` is-a steps below.
    Hyponym(usize),
    /// The document word is broader, `depth` is-a steps above. Only
    /// reported when symmetric matching is requested.
    Hypernym(usize),
}

impl OntologyRelation {
    /// Number of is-a steps (0 for synonyms).
    pub fn depth(&self) -> usize {
        match self {
            OntologyRelation::Synonym => 0,
            OntologyRelation::Hyponym(depth) | OntologyRelation::Hypernym(depth) => *depth,
        }
    }
}

/// A synonym class.
#[derive(Debug, Clone, Default)]
struct Concept {
    words: Vec<String>,
    parents: Vec<usize>,
    children: Vec<usize>,
}

/// Immutable concept graph.
#[derive(Debug, Clone, Default)]
pub struct Ontology {
    concepts: Vec<Concept>,
    keys: AHashMap<String, usize>,
}

impl Ontology {
    /// Load an ontology from a JSON file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            SleuthError::ontology(format!(
                "Failed to read ontology file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json_str(&content)
    }

    /// Parse an ontology from JSON.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let file: OntologyFile = serde_json::from_str(json)
            .map_err(|e| SleuthError::ontology(format!("Failed to parse ontology JSON: {e}")))?;
        let source = match file {
            OntologyFile::Groups(synonym_groups) => OntologySource {
                entries: Vec::new(),
                synonym_groups,
            },
            OntologyFile::Full(source) => source,
        };

        let mut builder = OntologyBuilder::new();
        for entry in source.entries {
            builder = builder.entry(entry);
        }
        for group in source.synonym_groups {
            builder = builder.synonym_group(group);
        }
        builder.build()
    }

    /// Number of distinct words.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Whether the ontology knows the word.
    pub fn contains(&self, word: &str) -> bool {
        self.keys.contains_key(&lexical_key(word))
    }

    fn concept_of(&self, word: &str) -> Option<usize> {
        self.keys.get(&lexical_key(word)).copied()
    }

    /// Number of is-a steps from `word` up to `ancestor`, if reachable
    /// within `max_depth` steps. Synonyms are not ancestors of each other.
    pub fn is_a(&self, word: &str, ancestor: &str, max_depth: usize) -> Option<usize> {
        let from = self.concept_of(word)?;
        let to = self.concept_of(ancestor)?;
        if from == to {
            return None;
        }
        self.distance(from, to, max_depth, |c| &c.parents)
    }

    /// Other words of the synonym class of `word`.
    pub fn synonyms(&self, word: &str) -> Vec<String> {
        let key = lexical_key(word);
        self.concept_of(word)
            .map(|c| {
                self.concepts[c]
                    .words
                    .iter()
                    .filter(|w| lexical_key(w) != key)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// How `document_word` relates to `phrase_word`, preferring the closest
    /// relation.
    pub fn relation(
        &self,
        document_word: &str,
        phrase_word: &str,
        max_depth: usize,
        symmetric: bool,
    ) -> Option<OntologyRelation> {
        let document_concept = self.concept_of(document_word)?;
        let phrase_concept = self.concept_of(phrase_word)?;
        if document_concept == phrase_concept {
            return Some(OntologyRelation::Synonym);
        }
        if let Some(depth) =
            self.distance(document_concept, phrase_concept, max_depth, |c| &c.parents)
        {
            return Some(OntologyRelation::Hyponym(depth));
        }
        if symmetric
            && let Some(depth) =
                self.distance(phrase_concept, document_concept, max_depth, |c| &c.parents)
        {
            return Some(OntologyRelation::Hypernym(depth));
        }
        None
    }

    /// Every word a document may contain to match `phrase_word`, with its
    /// relation. The phrase word itself is not included.
    pub fn matching_words(
        &self,
        phrase_word: &str,
        max_depth: usize,
        symmetric: bool,
    ) -> Vec<(String, OntologyRelation)> {
        let Some(start) = self.concept_of(phrase_word) else {
            return Vec::new();
        };
        let key = lexical_key(phrase_word);
        let mut words = Vec::new();

        for word in &self.concepts[start].words {
            if lexical_key(word) != key {
                words.push((word.clone(), OntologyRelation::Synonym));
            }
        }
        for (concept, depth) in self.reachable(start, max_depth, |c| &c.children) {
            for word in &self.concepts[concept].words {
                words.push((word.clone(), OntologyRelation::Hyponym(depth)));
            }
        }
        if symmetric {
            for (concept, depth) in self.reachable(start, max_depth, |c| &c.parents) {
                for word in &self.concepts[concept].words {
                    words.push((word.clone(), OntologyRelation::Hypernym(depth)));
                }
            }
        }
        words
    }

    fn distance(
        &self,
        from: usize,
        to: usize,
        max_depth: usize,
        next: impl Fn(&Concept) -> &Vec<usize>,
    ) -> Option<usize> {
        self.reachable(from, max_depth, next)
            .into_iter()
            .find(|(concept, _)| *concept == to)
            .map(|(_, depth)| depth)
    }

    /// Breadth-first walk; each concept is reported once at its shallowest
    /// depth, the start concept excluded.
    fn reachable(
        &self,
        start: usize,
        max_depth: usize,
        next: impl Fn(&Concept) -> &Vec<usize>,
    ) -> Vec<(usize, usize)> {
        let mut seen = AHashSet::new();
        seen.insert(start);
        let mut queue = VecDeque::from([(start, 0)]);
        let mut found = Vec::new();
        while let Some((concept, depth)) = queue.pop_front() {
            if depth == max_depth {
                continue;
            }
            for &neighbour in next(&self.concepts[concept]) {
                if seen.insert(neighbour) {
                    found.push((neighbour, depth + 1));
                    queue.push_back((neighbour, depth + 1));
                }
            }
        }
        found
    }
}

/// Incremental construction of an [`Ontology`].
#[derive(Debug, Clone, Default)]
pub struct OntologyBuilder {
    words: Vec<String>,
    keys: AHashMap<String, usize>,
    synonym_pairs: Vec<(usize, usize)>,
    is_a_pairs: Vec<(usize, usize)>,
}

impl OntologyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn word_id(&mut self, word: &str) -> usize {
        let key = lexical_key(word);
        if let Some(&id) = self.keys.get(&key) {
            return id;
        }
        let id = self.words.len();
        self.words.push(word.trim().to_lowercase());
        self.keys.insert(key, id);
        id
    }

    /// Declare a word, e.g. one with no relations.
    pub fn word(mut self, word: &str) -> Self {
        self.word_id(word);
        self
    }

    /// Declare that `word` is a narrower concept than `broader`.
    pub fn is_a(mut self, word: &str, broader: &str) -> Self {
        let child = self.word_id(word);
        let parent = self.word_id(broader);
        self.is_a_pairs.push((child, parent));
        self
    }

    /// Declare a group of synonyms.
    pub fn synonyms(self, group: &[&str]) -> Self {
        self.synonym_group(group.iter().map(|w| w.to_string()).collect())
    }

    fn synonym_group(mut self, group: Vec<String>) -> Self {
        let ids: Vec<usize> = group.iter().map(|w| self.word_id(w)).collect();
        if let Some((&first, rest)) = ids.split_first() {
            for &other in rest {
                self.synonym_pairs.push((first, other));
            }
        }
        self
    }

    /// Add an entry in the file format.
    pub fn entry(mut self, entry: OntologyEntry) -> Self {
        self.word_id(&entry.word);
        for broader in &entry.is_a {
            self = self.is_a(&entry.word, broader);
        }
        let mut group = vec![entry.word];
        group.extend(entry.synonyms);
        self.synonym_group(group)
    }

    /// Build the ontology. Fails if a word is declared a narrower concept
    /// of itself, directly, through synonyms or through a cycle.
    pub fn build(self) -> Result<Ontology> {
        for word in &self.words {
            if word.is_empty() {
                return Err(SleuthError::ontology("ontology contains an empty word"));
            }
        }

        let mut classes = UnionFind::new(self.words.len());
        for &(a, b) in &self.synonym_pairs {
            classes.union(a, b);
        }

        let mut concept_of_root = AHashMap::new();
        let mut concepts: Vec<Concept> = Vec::new();
        let mut concept_of_word = Vec::with_capacity(self.words.len());
        for (id, word) in self.words.iter().enumerate() {
            let root = classes.find(id);
            let concept = *concept_of_root.entry(root).or_insert_with(|| {
                concepts.push(Concept::default());
                concepts.len() - 1
            });
            concepts[concept].words.push(word.clone());
            concept_of_word.push(concept);
        }

        for &(child, parent) in &self.is_a_pairs {
            let (child, parent) = (concept_of_word[child], concept_of_word[parent]);
            if child == parent {
                return Err(SleuthError::ontology(format!(
                    "'{}' is declared a narrower concept of its own synonym class",
                    concepts[child].words[0]
                )));
            }
            if !concepts[child].parents.contains(&parent) {
                concepts[child].parents.push(parent);
                concepts[parent].children.push(child);
            }
        }

        let keys = self
            .keys
            .into_iter()
            .map(|(key, id)| (key, concept_of_word[id]))
            .collect();
        let ontology = Ontology { concepts, keys };
        ontology.check_acyclic()?;
        Ok(ontology)
    }
}

impl Ontology {
    fn check_acyclic(&self) -> Result<()> {
        // 0 = unvisited, 1 = on stack, 2 = done
        let mut state = vec![0u8; self.concepts.len()];
        for start in 0..self.concepts.len() {
            if state[start] != 0 {
                continue;
            }
            let mut stack = vec![(start, 0usize)];
            state[start] = 1;
            while let Some(top) = stack.last_mut() {
                let (concept, next) = *top;
                top.1 += 1;
                if let Some(&parent) = self.concepts[concept].parents.get(next) {
                    match state[parent] {
                        0 => {
                            state[parent] = 1;
                            stack.push((parent, 0));
                        }
                        1 => {
                            return Err(SleuthError::ontology(format!(
                                "cyclic is-a relation involving '{}'",
                                self.concepts[parent].words[0]
                            )));
                        }
                        _ => {}
                    }
                } else {
                    state[concept] = 2;
                    stack.pop();
                }
            }
        }
        Ok(())
    }
}

struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new(len: usize) -> Self {
        UnionFind {
            parent: (0..len).collect(),
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let (a, b) = (self.find(a), self.find(b));
        if a != b {
            self.parent[b.max(a)] = a.min(b);
        }
    }
}
