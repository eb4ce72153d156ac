//! relink-common — Shared types, errors, and run configuration used across all relink crates.

pub mod config;
pub mod entity;
pub mod error;

// Re-export commonly used types
pub use config::{IcMode, LinkPolicy, RunConfig};
pub use entity::{AbbreviationMap, CorpusAnnotations, EntityType, Mention, MentionKind};
pub use error::{RelinkError, Result};
