//! The public entry point.
//!
//! A [`Manager`] owns the registered search phrases, the document
//! registry, the optional ontology and a worker pool. Document analysis and
//! per-document matching run on the pool; the registry is the only shared
//! mutable state.
//!
//! # Examples
//!
//! ```
//! use sleuth::config::ManagerConfig;
//! use sleuth::manager::Manager;
//! use sleuth::parse::conll::read_document;
//!
//! let manager = Manager::new(ManagerConfig::default().with_worker_threads(2)).unwrap();
//!
//! let pattern = read_document(
//!     "1\tdogs\tdog\tNOUN\tNNS\t_\t2\tnsubj\t_\t_\n\
//!      2\tbark\tbark\tVERB\tVBP\t_\t0\tROOT\t_\t_\n",
//! )
//! .unwrap();
//! manager.register_search_phrase(&pattern, None).unwrap();
//!
//! let document = read_document(
//!     "1\tThe\tthe\tDET\tDT\t_\t2\tdet\t_\t_\n\
//!      2\tdog\tdog\tNOUN\tNN\t_\t3\tnsubj\t_\t_\n\
//!      3\tbarked\tbark\tVERB\tVBD\t_\t0\tROOT\t_\t_\n",
//! )
//! .unwrap();
//! manager.register_document(&document, Some("walk")).unwrap();
//!
//! let matches = manager.match_documents(None, None).unwrap();
//! assert_eq!(matches.len(), 1);
//! assert_eq!(matches[0].document_label, "walk");
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;

use crossbeam_channel::{Receiver, bounded};
use log::{debug, info};
use parking_lot::RwLock;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::config::{ManagerConfig, MatchingConfig};
use crate::error::{Result, SleuthError};
use crate::index::{IndexedDocument, expanded_keys};
use crate::matching::structural::StructuralMatcher;
use crate::matching::types::{DocumentMatch, normalize};
use crate::ontology::Ontology;
use crate::parse::document::ParsedText;
use crate::phrase::compiler::{PhraseCompiler, SearchPhrase, SearchPhraseHandle};
use crate::registry::{DocumentHandle, DocumentRegistry, Snapshot};
use crate::topic::scorer::{TopicMatch, TopicScorer, rank};

/// Capacity of the channel behind a [`MatchStream`].
const STREAM_CAPACITY: usize = 64;

type PhraseList = Vec<(SearchPhraseHandle, Arc<SearchPhrase>)>;

/// Cooperative cancellation for batch operations. Clones share one flag.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Matches produced by a background worker, one document at a time, in
/// the same order [`Manager::match_documents`] returns them. Dropping the
/// stream stops the worker before its next document.
pub struct MatchStream {
    receiver: Option<Receiver<DocumentMatch>>,
    worker: Option<thread::JoinHandle<()>>,
}

impl Iterator for MatchStream {
    type Item = DocumentMatch;

    fn next(&mut self) -> Option<Self::Item> {
        self.receiver.as_ref()?.recv().ok()
    }
}

impl Drop for MatchStream {
    fn drop(&mut self) {
        // Disconnect first so a worker blocked on a full channel returns.
        self.receiver.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

/// Structural and topic matching over a registry of parsed documents.
pub struct Manager {
    config: ManagerConfig,
    ontology: Option<Arc<Ontology>>,
    compiler: PhraseCompiler,
    phrases: RwLock<BTreeMap<SearchPhraseHandle, Arc<SearchPhrase>>>,
    next_phrase: AtomicU64,
    registry: DocumentRegistry,
    thread_pool: Arc<ThreadPool>,
}

impl Manager {
    /// Create a manager without an ontology.
    pub fn new(config: ManagerConfig) -> Result<Self> {
        Self::build(config, None)
    }

    /// Create a manager that generalises words through `ontology`.
    pub fn with_ontology(config: ManagerConfig, ontology: Ontology) -> Result<Self> {
        Self::build(config, Some(Arc::new(ontology)))
    }

    fn build(config: ManagerConfig, ontology: Option<Arc<Ontology>>) -> Result<Self> {
        let thread_pool_size = config.worker_threads.unwrap_or_else(num_cpus::get).max(1);

        let thread_pool = ThreadPoolBuilder::new()
            .num_threads(thread_pool_size)
            .thread_name(|i| format!("sleuth-worker-{i}"))
            .build()
            .map_err(|e| SleuthError::thread_pool(format!("Failed to create thread pool: {e}")))?;

        info!(
            "manager started with {} workers, ontology of {} words",
            thread_pool_size,
            ontology.as_ref().map_or(0, |o| o.len())
        );

        Ok(Manager {
            config,
            ontology,
            compiler: PhraseCompiler::new(),
            phrases: RwLock::new(BTreeMap::new()),
            next_phrase: AtomicU64::new(0),
            registry: DocumentRegistry::new(),
            thread_pool: Arc::new(thread_pool),
        })
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    pub fn ontology(&self) -> Option<&Ontology> {
        self.ontology.as_deref()
    }

    // ---- search phrases ----

    /// Compile and register a search phrase. The label defaults to the
    /// pattern text; several phrases may share a label.
    pub fn register_search_phrase(
        &self,
        pattern: &ParsedText,
        label: Option<&str>,
    ) -> Result<SearchPhraseHandle> {
        let phrase = self.compiler.compile(pattern, label)?;
        let handle = SearchPhraseHandle(self.next_phrase.fetch_add(1, Ordering::SeqCst));
        debug!(
            "registered search phrase {} '{}' ({} words)",
            handle.0,
            phrase.label(),
            phrase.tokens().len()
        );
        self.phrases.write().insert(handle, Arc::new(phrase));
        Ok(handle)
    }

    pub fn search_phrase(&self, handle: SearchPhraseHandle) -> Option<Arc<SearchPhrase>> {
        self.phrases.read().get(&handle).cloned()
    }

    /// Distinct search-phrase labels in ascending order.
    pub fn search_phrase_labels(&self) -> Vec<String> {
        let mut labels: Vec<String> = self
            .phrases
            .read()
            .values()
            .map(|p| p.label().to_string())
            .collect();
        labels.sort();
        labels.dedup();
        labels
    }

    /// Remove every phrase with the label, returning how many were removed.
    pub fn remove_search_phrases_with_label(&self, label: &str) -> usize {
        let mut phrases = self.phrases.write();
        let before = phrases.len();
        phrases.retain(|_, phrase| phrase.label() != label);
        let removed = before - phrases.len();
        debug!("removed {removed} search phrases labelled '{label}'");
        removed
    }

    pub fn remove_all_search_phrases(&self) {
        self.phrases.write().clear();
        debug!("removed all search phrases");
    }

    // ---- documents ----

    /// Analyse and register a document, replacing any document with the
    /// same label. A missing label is replaced by a generated one.
    pub fn register_document(
        &self,
        parsed: &ParsedText,
        label: Option<&str>,
    ) -> Result<DocumentHandle> {
        let label = label.map_or_else(generate_label, str::to_string);
        let document = IndexedDocument::analyze(label, parsed)?;
        let handle = self.registry.insert(document);
        debug!("registered document '{}' as {}", handle.label, handle.id);
        Ok(handle)
    }

    /// Analyse a batch on the worker pool and register it under one write
    /// lock. Nothing is registered if any document is invalid.
    pub fn register_documents(
        &self,
        batch: Vec<(ParsedText, Option<String>)>,
    ) -> Result<Vec<DocumentHandle>> {
        let documents = self.thread_pool.install(|| {
            batch
                .into_par_iter()
                .map(|(parsed, label)| {
                    IndexedDocument::analyze(label.unwrap_or_else(generate_label), &parsed)
                })
                .collect::<Result<Vec<_>>>()
        })?;
        let handles = self.registry.insert_all(documents);
        debug!("registered {} documents", handles.len());
        Ok(handles)
    }

    /// Register a document produced by [`Manager::serialize_document`].
    pub fn register_serialized_document(
        &self,
        serialized: &str,
        label: Option<&str>,
    ) -> Result<DocumentHandle> {
        let parsed: ParsedText = serde_json::from_str(serialized)?;
        self.register_document(&parsed, label)
    }

    /// The parsed form of a registered document as JSON.
    pub fn serialize_document(&self, label: &str) -> Result<String> {
        let document = self
            .registry
            .get(label)
            .ok_or_else(|| SleuthError::unknown_document(label))?;
        Ok(serde_json::to_string(&document.document().to_parsed())?)
    }

    /// Remove a document; unknown labels are ignored.
    pub fn remove_document(&self, label: &str) -> bool {
        let removed = self.registry.remove(label);
        if removed {
            debug!("removed document '{label}'");
        }
        removed
    }

    pub fn remove_all_documents(&self) {
        let count = self.registry.clear();
        info!("removed all {count} documents");
    }

    /// Registered labels in ascending order.
    pub fn document_labels(&self) -> Vec<String> {
        self.registry.labels()
    }

    pub fn document_count(&self) -> usize {
        self.registry.len()
    }

    // ---- structural matching ----

    /// Match search phrases against registered documents. `None` selects
    /// every phrase or document. Results are ordered by document label,
    /// position, phrase registration order.
    pub fn match_documents(
        &self,
        handles: Option<&[SearchPhraseHandle]>,
        labels: Option<&[&str]>,
    ) -> Result<Vec<DocumentMatch>> {
        self.match_documents_with_cancellation(handles, labels, &CancellationToken::new())
    }

    /// [`Manager::match_documents`], abandoned with
    /// [`SleuthError::Cancelled`] once `token` is cancelled.
    pub fn match_documents_with_cancellation(
        &self,
        handles: Option<&[SearchPhraseHandle]>,
        labels: Option<&[&str]>,
        token: &CancellationToken,
    ) -> Result<Vec<DocumentMatch>> {
        let phrases = self.selected_phrases(handles)?;
        let snapshot = self.registry.snapshot(labels)?;
        let tasks = plan(&phrases, &snapshot, self.ontology.as_deref(), &self.config.matching);
        let matcher = StructuralMatcher::new(self.ontology.as_deref(), &self.config.matching);

        let matches: Vec<DocumentMatch> = self.thread_pool.install(|| {
            tasks
                .par_iter()
                .flat_map_iter(|(position, document)| {
                    if token.is_cancelled() {
                        return Vec::new();
                    }
                    let (handle, phrase) = &phrases[*position];
                    matcher.match_document(*handle, phrase, document)
                })
                .collect()
        });
        if token.is_cancelled() {
            return Err(SleuthError::cancelled("structural matching"));
        }
        Ok(normalize(matches))
    }

    /// Stream matches from a background worker instead of collecting them.
    pub fn match_stream(
        &self,
        handles: Option<&[SearchPhraseHandle]>,
        labels: Option<&[&str]>,
    ) -> Result<MatchStream> {
        let phrases = self.selected_phrases(handles)?;
        let snapshot = self.registry.snapshot(labels)?;
        let ontology = self.ontology.clone();
        let config = self.config.matching.clone();
        let (sender, receiver) = bounded(STREAM_CAPACITY);

        let worker = thread::Builder::new()
            .name("sleuth-match-stream".to_string())
            .spawn(move || {
                let matcher = StructuralMatcher::new(ontology.as_deref(), &config);
                let tasks = plan(&phrases, &snapshot, ontology.as_deref(), &config);
                let mut index = 0;
                while index < tasks.len() {
                    // One document's matches at a time, in result order.
                    let document = Arc::clone(&tasks[index].1);
                    let mut matches = Vec::new();
                    while index < tasks.len() && Arc::ptr_eq(&tasks[index].1, &document) {
                        let (handle, phrase) = &phrases[tasks[index].0];
                        matches.extend(matcher.match_document(*handle, phrase, &document));
                        index += 1;
                    }
                    for document_match in normalize(matches) {
                        if sender.send(document_match).is_err() {
                            return;
                        }
                    }
                }
            })
            .map_err(|e| SleuthError::thread_pool(format!("Failed to spawn stream worker: {e}")))?;

        Ok(MatchStream {
            receiver: Some(receiver),
            worker: Some(worker),
        })
    }

    /// Match the registered phrases against a document without registering
    /// it. The matches carry an empty document label.
    pub fn match_parsed_document(&self, parsed: &ParsedText) -> Result<Vec<DocumentMatch>> {
        let document = IndexedDocument::analyze(String::new(), parsed)?;
        let phrases = self.selected_phrases(None)?;
        let matcher = StructuralMatcher::new(self.ontology.as_deref(), &self.config.matching);
        let matches = phrases
            .iter()
            .flat_map(|(handle, phrase)| matcher.match_document(*handle, phrase, &document))
            .collect();
        Ok(normalize(matches))
    }

    // ---- topic matching ----

    /// Rank documents by their overlap with a reference text.
    pub fn topic_match_documents_against(
        &self,
        reference: &ParsedText,
        labels: Option<&[&str]>,
    ) -> Result<Vec<TopicMatch>> {
        self.topic_match_documents_against_with_cancellation(
            reference,
            labels,
            &CancellationToken::new(),
        )
    }

    /// [`Manager::topic_match_documents_against`], abandoned with
    /// [`SleuthError::Cancelled`] once `token` is cancelled.
    pub fn topic_match_documents_against_with_cancellation(
        &self,
        reference: &ParsedText,
        labels: Option<&[&str]>,
        token: &CancellationToken,
    ) -> Result<Vec<TopicMatch>> {
        let reference = IndexedDocument::analyze("reference", reference)?;
        let snapshot = self.registry.snapshot(labels)?;
        let scorer = TopicScorer::new(
            &reference,
            self.ontology.as_deref(),
            &self.config.matching,
            &self.config.topic,
        );
        let documents: Vec<&Arc<IndexedDocument>> = snapshot.documents().collect();

        let matches: Vec<TopicMatch> = self.thread_pool.install(|| {
            documents
                .par_iter()
                .filter_map(|document| {
                    if token.is_cancelled() {
                        return None;
                    }
                    scorer.score(document)
                })
                .collect()
        });
        if token.is_cancelled() {
            return Err(SleuthError::cancelled("topic matching"));
        }
        debug!(
            "topic matching scored {} of {} documents",
            matches.len(),
            snapshot.len()
        );
        Ok(rank(matches, self.config.topic.max_results))
    }

    fn selected_phrases(&self, handles: Option<&[SearchPhraseHandle]>) -> Result<PhraseList> {
        let phrases = self.phrases.read();
        match handles {
            None => Ok(phrases
                .iter()
                .map(|(handle, phrase)| (*handle, Arc::clone(phrase)))
                .collect()),
            Some(handles) => {
                let mut selected = BTreeMap::new();
                for handle in handles {
                    let phrase = phrases
                        .get(handle)
                        .ok_or_else(|| SleuthError::UnknownSearchPhrase(handle.0))?;
                    selected.insert(*handle, Arc::clone(phrase));
                }
                Ok(selected.into_iter().collect())
            }
        }
    }
}

fn generate_label() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// (phrase, document) pairs worth matching, grouped by document in label
/// order. Documents lacking a word some lexical phrase word needs are
/// skipped, unless embedding similarity may stand in for missing words.
fn plan(
    phrases: &PhraseList,
    snapshot: &Snapshot,
    ontology: Option<&Ontology>,
    config: &MatchingConfig,
) -> Vec<(usize, Arc<IndexedDocument>)> {
    let mut candidates: Vec<Vec<Arc<IndexedDocument>>> = Vec::with_capacity(phrases.len());
    for (_, phrase) in phrases {
        let required: Vec<Vec<String>> = if config.similarity_threshold.is_some() {
            Vec::new()
        } else {
            phrase
                .lexical_tokens()
                .map(|token| expanded_keys(token, ontology, config))
                .collect()
        };
        candidates.push(snapshot.containing_all(&required));
    }

    let mut tasks = Vec::new();
    for document in snapshot.documents() {
        for (position, selected) in candidates.iter().enumerate() {
            if selected.iter().any(|d| Arc::ptr_eq(d, document)) {
                tasks.push((position, Arc::clone(document)));
            }
        }
    }
    tasks
}
