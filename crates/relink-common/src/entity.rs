//! Mention and entity-type model shared by the linking stages.
//!
//! Mentions arrive from the upstream recognizer as per-document lists of
//! (true id, surface text, composite flag) tuples together with a map of
//! document-local abbreviation expansions. Both shapes are mirrored here.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Entity category a knowledge base covers.
///
/// The tag strings are written verbatim into the `predictedType` field of
/// the candidate files, so they are part of the ranker wire contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityType {
    Disease,
    Chemical,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Disease => "Disease",
            EntityType::Chemical => "Chemical",
        }
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a mention is a plain surface form, a coordinated composite
/// ("breast/ovarian cancer"), or one individual part of a decomposed
/// composite ("breast cancer").
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MentionKind {
    #[default]
    Plain,
    Composite,
    Individual,
}

/// One mention occurrence inside a document.
///
/// Duplicate texts within a document collapse to a single processed mention;
/// composite wholes are skipped once their individual parts exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mention {
    /// Surface form as recognized in the text.
    pub text: String,

    /// Gold identifier supplied by the annotation layer, when known.
    #[serde(default)]
    pub true_id: Option<String>,

    #[serde(default)]
    pub kind: MentionKind,
}

impl Mention {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            true_id: None,
            kind: MentionKind::Plain,
        }
    }

    pub fn with_true_id(text: impl Into<String>, true_id: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            true_id: Some(true_id.into()),
            kind: MentionKind::Plain,
        }
    }

    /// Gold identifier or the empty string, as the candidate-file header expects.
    pub fn true_id_str(&self) -> &str {
        self.true_id.as_deref().unwrap_or("")
    }
}

/// Document id -> ordered mention list. Ordered map so document ordinals are
/// stable across runs.
pub type CorpusAnnotations = BTreeMap<String, Vec<Mention>>;

/// Document id -> (abbreviation -> expansion).
pub type AbbreviationMap = HashMap<String, HashMap<String, String>>;
