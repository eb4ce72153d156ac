//! relink-graph — Candidate relatedness and the ranker wire format.
//!
//! Decides which candidates of a document are related under the configured
//! link policy, assembles per-candidate link sets, serializes the
//! ENTITY/CANDIDATE lines consumed by the external ranking solver, and
//! estimates per-concept information content.

pub mod ic;
pub mod linker;
pub mod relations;
pub mod serializer;

pub use ic::{accumulate_term_counts, estimate, write_ic_file};
pub use linker::{build_document_links, related};
pub use relations::CorpusRelations;
pub use serializer::{write_candidates_file, DocumentEntry, EntityLine};
