//! Document registry.
//!
//! Registered documents live in an arena keyed by generated
//! [`DocumentId`]s, with a label index and corpus-wide posting lists beside
//! it, all behind one `parking_lot::RwLock`. Mutations take the write lock
//! for the duration of the structural update; matching takes a
//! [`Snapshot`] under the read lock and works on `Arc`s afterwards, so a
//! concurrent removal never affects a match in progress.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use ahash::AHashMap;
use log::warn;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SleuthError};
use crate::index::{DocumentIndex, IndexedDocument};

/// Stable identifier of a registered document. A re-registered label gets
/// a fresh identifier.
pub type DocumentId = u64;

/// Returned by document registration.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentHandle {
    pub id: DocumentId,
    pub label: String,
}

/// Corpus-wide posting lists: lexical key → documents containing it.
#[derive(Clone, Debug, Default)]
pub struct Postings {
    keys: AHashMap<String, BTreeSet<DocumentId>>,
}

impl Postings {
    fn insert(&mut self, id: DocumentId, index: &DocumentIndex) {
        for key in index.keys() {
            self.keys.entry(key.to_string()).or_default().insert(id);
        }
    }

    fn remove(&mut self, id: DocumentId, index: &DocumentIndex) {
        for key in index.keys() {
            if let Some(documents) = self.keys.get_mut(key) {
                documents.remove(&id);
                if documents.is_empty() {
                    self.keys.remove(key);
                }
            }
        }
    }

    /// Documents containing at least one of `keys`.
    pub fn containing_any(&self, keys: &[String]) -> BTreeSet<DocumentId> {
        keys.iter()
            .filter_map(|key| self.keys.get(key))
            .flatten()
            .copied()
            .collect()
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[derive(Debug, Default)]
struct RegistryInner {
    next_id: DocumentId,
    documents: HashMap<DocumentId, Arc<IndexedDocument>>,
    labels: BTreeMap<String, DocumentId>,
    /// Copied on write while a snapshot holds it.
    postings: Arc<Postings>,
}

impl RegistryInner {
    fn insert(&mut self, document: IndexedDocument) -> DocumentHandle {
        let label = document.label().to_string();
        self.remove(&label);

        let id = self.next_id;
        self.next_id += 1;
        Arc::make_mut(&mut self.postings).insert(id, document.index());
        self.documents.insert(id, Arc::new(document));
        self.labels.insert(label.clone(), id);
        DocumentHandle { id, label }
    }

    fn remove(&mut self, label: &str) -> bool {
        let Some(id) = self.labels.remove(label) else {
            return false;
        };
        if let Some(document) = self.documents.remove(&id) {
            Arc::make_mut(&mut self.postings).remove(id, document.index());
        }
        true
    }
}

/// The shared document store.
#[derive(Debug, Default)]
pub struct DocumentRegistry {
    inner: RwLock<RegistryInner>,
}

impl DocumentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a document, replacing any document with the same label.
    pub fn insert(&self, document: IndexedDocument) -> DocumentHandle {
        self.inner.write().insert(document)
    }

    /// Publish a batch under one write lock. Later documents replace
    /// earlier ones with the same label.
    pub fn insert_all(&self, documents: Vec<IndexedDocument>) -> Vec<DocumentHandle> {
        let mut inner = self.inner.write();
        documents
            .into_iter()
            .map(|document| inner.insert(document))
            .collect()
    }

    /// Remove a document. Returns false if the label is unknown.
    pub fn remove(&self, label: &str) -> bool {
        self.inner.write().remove(label)
    }

    /// Remove every document, returning how many there were.
    pub fn clear(&self) -> usize {
        let mut inner = self.inner.write();
        let count = inner.documents.len();
        inner.documents.clear();
        inner.labels.clear();
        inner.postings = Arc::new(Postings::default());
        count
    }

    pub fn get(&self, label: &str) -> Option<Arc<IndexedDocument>> {
        let inner = self.inner.read();
        inner
            .labels
            .get(label)
            .and_then(|id| inner.documents.get(id))
            .cloned()
    }

    /// Labels in ascending order.
    pub fn labels(&self) -> Vec<String> {
        self.inner.read().labels.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().documents.is_empty()
    }

    /// The documents named by `labels` (all documents if `None`), in label
    /// order. Fails if a label is not registered.
    pub fn snapshot(&self, labels: Option<&[&str]>) -> Result<Snapshot> {
        let inner = self.inner.read();
        let ids: Vec<DocumentId> = match labels {
            None => inner.labels.values().copied().collect(),
            Some(labels) => {
                let mut selected = BTreeMap::new();
                for label in labels {
                    let Some(&id) = inner.labels.get(*label) else {
                        warn!("document filter names unknown document '{label}'");
                        return Err(SleuthError::unknown_document(*label));
                    };
                    selected.insert(*label, id);
                }
                selected.into_values().collect()
            }
        };
        let entries = ids
            .into_iter()
            .filter_map(|id| inner.documents.get(&id).map(|d| (id, Arc::clone(d))))
            .collect();
        Ok(Snapshot {
            entries,
            postings: Arc::clone(&inner.postings),
        })
    }
}

/// A consistent view of some registered documents.
#[derive(Clone, Debug)]
pub struct Snapshot {
    entries: Vec<(DocumentId, Arc<IndexedDocument>)>,
    postings: Arc<Postings>,
}

impl Snapshot {
    /// The documents in label order.
    pub fn documents(&self) -> impl Iterator<Item = &Arc<IndexedDocument>> {
        self.entries.iter().map(|(_, document)| document)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Documents containing, for every group of `required`, at least one
    /// key of the group. No groups selects every document.
    pub fn containing_all(&self, required: &[Vec<String>]) -> Vec<Arc<IndexedDocument>> {
        let mut allowed: Option<BTreeSet<DocumentId>> = None;
        for group in required {
            let found = self.postings.containing_any(group);
            allowed = Some(match allowed {
                None => found,
                Some(previous) => previous.intersection(&found).copied().collect(),
            });
        }
        self.entries
            .iter()
            .filter(|(id, _)| allowed.as_ref().is_none_or(|a| a.contains(id)))
            .map(|(_, document)| Arc::clone(document))
            .collect()
    }
}
