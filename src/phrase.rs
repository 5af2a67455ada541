//! Search phrases.
//!
//! A search phrase is an example sentence, parsed by the front end, whose
//! grammatical relations form the query. Tokens written `ENTITY<T>` or
//! `ENTITYT` are wildcards matching any word with entity label `T`.

pub mod compiler;

pub use compiler::{PhraseCompiler, PhraseToken, SearchPhrase, SearchPhraseHandle, Wildcard};
