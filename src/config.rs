//! Configuration for the matching engine.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Top-level configuration for a [`Manager`](crate::manager::Manager).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Size of the worker pool used for document analysis and matching.
    /// If None, uses the number of CPU cores.
    pub worker_threads: Option<usize>,

    /// Structural matching options.
    pub matching: MatchingConfig,

    /// Topic matching options.
    pub topic: TopicMatchConfig,
}

impl ManagerConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Set the worker pool size.
    pub fn with_worker_threads(mut self, threads: usize) -> Self {
        self.worker_threads = Some(threads);
        self
    }

    /// Replace the structural matching options.
    pub fn with_matching(mut self, matching: MatchingConfig) -> Self {
        self.matching = matching;
        self
    }

    /// Replace the topic matching options.
    pub fn with_topic(mut self, topic: TopicMatchConfig) -> Self {
        self.topic = topic;
        self
    }
}

/// Options controlling lexical comparison and structural alignment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    /// Maximum number of is-a steps followed in the ontology.
    pub ontology_max_depth: usize,

    /// Whether a document word that is a broader concept than the phrase
    /// word also matches.
    pub symmetric_ontology: bool,

    /// Minimum cosine similarity for an embedding-based match.
    /// If None, embedding matching is disabled.
    pub similarity_threshold: Option<f32>,

    /// Whether phrase roots may match on embedding similarity alone.
    pub embedding_on_root_words: bool,

    /// Upper bound on the alignments produced at a single anchor.
    pub max_alignments_per_anchor: usize,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            ontology_max_depth: 4,
            symmetric_ontology: false,
            similarity_threshold: None,
            embedding_on_root_words: false,
            max_alignments_per_anchor: 64,
        }
    }
}

impl MatchingConfig {
    /// Set the maximum ontology depth.
    pub fn with_ontology_max_depth(mut self, depth: usize) -> Self {
        self.ontology_max_depth = depth;
        self
    }

    /// Allow broader document concepts to match.
    pub fn with_symmetric_ontology(mut self, symmetric: bool) -> Self {
        self.symmetric_ontology = symmetric;
        self
    }

    /// Enable embedding matching above the given cosine similarity.
    pub fn with_similarity_threshold(mut self, threshold: f32) -> Self {
        self.similarity_threshold = Some(threshold.clamp(0.0, 1.0));
        self
    }

    /// Allow roots to match on embedding similarity.
    pub fn with_embedding_on_root_words(mut self, enabled: bool) -> Self {
        self.embedding_on_root_words = enabled;
        self
    }
}

/// Weights and decay factors used by the topic relevance scorer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TopicMatchConfig {
    /// Base score of a single reference word found in a document.
    pub word_weight: f32,

    /// Base score of a reference relation (head, role, dependent) found in
    /// a document.
    pub relation_weight: f32,

    /// Multiplier applied per ontology or coreference step.
    pub depth_decay: f32,

    /// Multiplier applied per tree step between a reference word and the
    /// head of its sentence.
    pub distance_decay: f32,

    /// Width in tokens of the document window a reference sentence is
    /// scored against.
    pub window_size: usize,

    /// Maximum number of topic matches returned. If None, all documents
    /// with a non-zero score are returned.
    pub max_results: Option<usize>,
}

impl Default for TopicMatchConfig {
    fn default() -> Self {
        Self {
            word_weight: 10.0,
            relation_weight: 40.0,
            depth_decay: 0.8,
            distance_decay: 0.9,
            window_size: 30,
            max_results: None,
        }
    }
}

impl TopicMatchConfig {
    /// Set the window size.
    pub fn with_window_size(mut self, window_size: usize) -> Self {
        self.window_size = window_size.max(1);
        self
    }

    /// Limit the number of returned topic matches.
    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = Some(max_results);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_takes_defaults() {
        let config = ManagerConfig::from_json_str(
            r#"{"worker_threads": 2, "matching": {"ontology_max_depth": 1}}"#,
        )
        .unwrap();

        assert_eq!(config.worker_threads, Some(2));
        assert_eq!(config.matching.ontology_max_depth, 1);
        assert_eq!(config.matching.max_alignments_per_anchor, 64);
        assert_eq!(config.topic.window_size, 30);
    }

    #[test]
    fn test_builders() {
        let matching = MatchingConfig::default().with_similarity_threshold(1.5);
        assert_eq!(matching.similarity_threshold, Some(1.0));

        let topic = TopicMatchConfig::default().with_window_size(0);
        assert_eq!(topic.window_size, 1);
    }
}
