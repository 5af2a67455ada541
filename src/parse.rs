//! Parsed-graph model.
//!
//! The engine does not tokenize, tag or parse text itself. An external
//! front end produces, per text, a dependency tree per sentence plus
//! coreference chains ([`ParsedText`]); this module holds those types and
//! turns them into a validated [`Document`] with document-wide token
//! positions.
//!
//! # Components
//!
//! - [`token`] - tokens, spans and lexical keys
//! - [`sentence`] - parsed and document-owned sentences
//! - [`coreference`] - coreference chains kept as a side table
//! - [`document`] - the document model
//! - [`conll`] - CoNLL-U reader for front ends that emit it

pub mod conll;
pub mod coreference;
pub mod document;
pub mod sentence;
pub mod token;

pub use coreference::{CoreferenceChain, Mention, ParsedChain, ParsedMention};
pub use document::{Document, ParsedText};
pub use sentence::{ParsedSentence, Sentence};
pub use token::{Token, TokenSpan};
