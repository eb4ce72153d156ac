//! Run configuration for a linking batch.
//!
//! A run is parameterized by the target knowledge base, the similarity floor
//! below which lexical matches are discarded, the policy used to draw edges
//! in the per-document disambiguation graphs, and the information-content
//! mode. Known evaluation corpora carry presets for floor and policy;
//! explicit values always win over presets.

use crate::error::{RelinkError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// How edges are added to the per-document disambiguation graph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkPolicy {
    /// Hierarchy relations only (identity, direct edge, ancestry).
    #[default]
    Kb,
    /// Relations extracted from the target corpus only.
    Corpus,
    /// Hierarchy relations first, corpus relations as fallback.
    KbCorpus,
}

impl LinkPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkPolicy::Kb => "kb",
            LinkPolicy::Corpus => "corpus",
            LinkPolicy::KbCorpus => "kb_corpus",
        }
    }

    /// True when the policy consults the corpus-relation table at all.
    pub fn needs_corpus_relations(&self) -> bool {
        matches!(self, LinkPolicy::Corpus | LinkPolicy::KbCorpus)
    }
}

impl std::str::FromStr for LinkPolicy {
    type Err = RelinkError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "kb" => Ok(LinkPolicy::Kb),
            "corpus" => Ok(LinkPolicy::Corpus),
            "kb_corpus" => Ok(LinkPolicy::KbCorpus),
            other => Err(RelinkError::Config(format!(
                "invalid link policy '{other}' (expected kb, corpus or kb_corpus)"
            ))),
        }
    }
}

/// Which probability estimate feeds the information-content prior.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IcMode {
    /// Candidate occurrence frequency over the processed documents.
    Extrinsic,
    /// Descendant counts in the hierarchy graph.
    #[default]
    Intrinsic,
}

// ── Corpus presets ────────────────────────────────────────────────────────────

/// Similarity floor and link policy tuned per evaluation corpus.
#[derive(Debug, Clone, Copy)]
pub struct CorpusPreset {
    pub corpus: &'static str,
    pub min_score: f64,
    pub policy: LinkPolicy,
}

const CORPUS_PRESETS: &[CorpusPreset] = &[
    CorpusPreset { corpus: "bc5cdr_dis", min_score: 0.80, policy: LinkPolicy::KbCorpus },
    CorpusPreset { corpus: "bc5cdr_chem", min_score: 0.90, policy: LinkPolicy::KbCorpus },
    CorpusPreset { corpus: "ncbi_disease", min_score: 0.85, policy: LinkPolicy::Kb },
    CorpusPreset { corpus: "biored_dis", min_score: 0.90, policy: LinkPolicy::KbCorpus },
    CorpusPreset { corpus: "biored_chem", min_score: 0.90, policy: LinkPolicy::KbCorpus },
];

impl CorpusPreset {
    pub fn lookup(corpus: &str) -> Option<&'static CorpusPreset> {
        CORPUS_PRESETS.iter().find(|p| p.corpus == corpus)
    }
}

// ── Run configuration ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Identifier for this run; generated when absent.
    #[serde(default)]
    pub run_id: Option<String>,

    /// Target knowledge base identifier (medic, ctd_chem, mesh_dis, mesh_chem).
    pub kb: String,

    /// Keep concepts outside the KB's identifier-prefix range (e.g. OMIM
    /// entries in MEDIC).
    #[serde(default)]
    pub include_root_variants: bool,

    /// Evaluation corpus the documents come from; selects floor/policy presets.
    #[serde(default)]
    pub corpus: Option<String>,

    /// Explicit similarity floor, overrides any preset.
    #[serde(default)]
    pub min_score: Option<f64>,

    /// Explicit link policy, overrides any preset.
    #[serde(default)]
    pub policy: Option<LinkPolicy>,

    #[serde(default)]
    pub ic_mode: IcMode,

    /// Endpoint of the NIL-linking oracle; no NIL fallback when absent.
    #[serde(default)]
    pub oracle_url: Option<String>,

    /// Suggestions requested from the oracle per unmatched mention.
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Root of the on-disk layout (KB dictionaries, cache, run artifacts).
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

fn default_top_k() -> usize {
    1
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

const DEFAULT_MIN_SCORE: f64 = 0.85;

impl RunConfig {
    pub fn new(kb: impl Into<String>) -> Self {
        Self {
            run_id: None,
            kb: kb.into(),
            include_root_variants: false,
            corpus: None,
            min_score: None,
            policy: None,
            ic_mode: IcMode::default(),
            oracle_url: None,
            top_k: default_top_k(),
            data_dir: default_data_dir(),
        }
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| RelinkError::Config(e.to_string()))
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    /// Run identifier, generating a fresh one on first use if unset.
    pub fn run_id(&mut self) -> String {
        self.run_id
            .get_or_insert_with(|| uuid::Uuid::new_v4().simple().to_string())
            .clone()
    }

    /// Similarity floor: explicit value, else corpus preset, else 0.85.
    pub fn resolved_min_score(&self) -> f64 {
        self.min_score
            .or_else(|| self.preset().map(|p| p.min_score))
            .unwrap_or(DEFAULT_MIN_SCORE)
    }

    /// Link policy: explicit value, else corpus preset, else `kb`.
    pub fn resolved_policy(&self) -> LinkPolicy {
        self.policy
            .or_else(|| self.preset().map(|p| p.policy))
            .unwrap_or_default()
    }

    fn preset(&self) -> Option<&'static CorpusPreset> {
        self.corpus.as_deref().and_then(CorpusPreset::lookup)
    }

    // ── On-disk layout ────────────────────────────────────────────────────

    pub fn kb_dicts_dir(&self) -> PathBuf {
        self.data_dir.join("kbs").join("dicts")
    }

    pub fn cache_file(&self) -> PathBuf {
        self.data_dir.join("cache").join(format!("{}.json", self.kb))
    }

    pub fn relations_file(&self) -> Option<PathBuf> {
        self.corpus
            .as_ref()
            .map(|c| self.data_dir.join("relations").join(format!("{c}.json")))
    }

    pub fn run_dir(&self, run_id: &str) -> PathBuf {
        self.data_dir.join("runs").join(run_id)
    }

    pub fn candidates_dir(&self, run_id: &str) -> PathBuf {
        self.run_dir(run_id).join("candidates")
    }

    pub fn ic_file(&self, run_id: &str) -> PathBuf {
        self.run_dir(run_id).join("ic")
    }
}
