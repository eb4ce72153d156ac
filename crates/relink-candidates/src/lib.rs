//! relink-candidates — Candidate retrieval for entity mentions.
//!
//! Maps mention surface forms to ranked knowledge base candidates through
//! exact lookup, a persistent fuzzy-match cache, token-sort similarity over
//! names and synonyms, and an optional NIL-linking oracle for mentions the
//! dictionaries cannot cover.

pub mod cache;
pub mod generator;
pub mod oracle;
pub mod similarity;

pub use cache::{CandidateCache, RawMatch};
pub use generator::{Candidate, CandidateGenerator, NIL_ID, ROOT_SURROGATE_ID};
pub use oracle::{HttpNilOracle, NilOracle, NilSuggestion};
