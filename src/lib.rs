//! # Sleuth
//!
//! Structural semantic matching of search phrases against dependency-parsed
//! documents.
//!
//! ## Features
//!
//! - Search phrases are example sentences; their grammatical relations form
//!   the query
//! - Active/passive, relative clause, coordination and control alternations
//! - Entity-type wildcards (`ENTITYPERSON`, `ENTITY<ORG>`)
//! - Coreference substitution with extracted entity names
//! - Ontology-based generalisation and optional embedding similarity
//! - Negation and uncertainty flags on every match
//! - Topic matching: ranking documents by overlap with a reference text
//! - Parallel document analysis and matching
//!
//! Tokenization, tagging, parsing, entity recognition and coreference
//! resolution happen outside the crate; see [`parse`] for the input format.

pub mod config;
pub mod error;
pub mod index;
pub mod manager;
pub mod matching;
pub mod ontology;
pub mod parse;
pub mod phrase;
pub mod registry;
pub mod semantics;
pub mod topic;

pub mod prelude {
    pub use crate::config::{ManagerConfig, MatchingConfig, TopicMatchConfig};
    pub use crate::error::{Result, SleuthError};
    pub use crate::manager::{CancellationToken, Manager, MatchStream};
    pub use crate::matching::{DocumentMatch, MatchKind, WordMatch};
    pub use crate::ontology::{Ontology, OntologyBuilder};
    pub use crate::parse::{ParsedChain, ParsedMention, ParsedSentence, ParsedText, Token};
    pub use crate::phrase::SearchPhraseHandle;
    pub use crate::registry::DocumentHandle;
    pub use crate::topic::{TopicMatch, TopicWordInfo};
}

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
