//! Semantic normalisation.
//!
//! Dependency trees differ for sentences that say the same thing: passive
//! voice, relative clauses, coordination, participles and nominalisations
//! all rearrange the tree. This module rewrites a parsed [`Document`]
//! into a graph of canonical [`Role`] relations so that matching compares
//! meaning rather than syntax.
//!
//! [`Document`]: crate::parse::Document

pub(crate) mod alternation;
pub mod analyzer;
pub mod role;

pub use analyzer::{AnalysisMode, SemanticAnalyzer, SemanticEdge, SemanticGraph, WordSemantics};
pub use role::Role;
