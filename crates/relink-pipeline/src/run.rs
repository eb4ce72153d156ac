//! End-to-end linking run.
//!
//! Orchestrates the full flow for a single run:
//!   1. Prepare the run directories, dropping candidate files of a previous
//!      run under the same id
//!   2. Open the per-KB candidate cache
//!   3. Per document (sorted order): expand composite mentions, skip
//!      empty/duplicate/composite texts, generate candidates, link related
//!      candidates across mentions, write the document's candidates file
//!   4. Estimate information content over every proposed concept and write
//!      the per-run `ic` file
//!   5. Flush the cache when it gained entries

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use ahash::{AHashMap, AHashSet};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::composite::expand_mentions;
use relink_candidates::{CandidateCache, CandidateGenerator, HttpNilOracle, NilOracle};
use relink_common::{AbbreviationMap, CorpusAnnotations, MentionKind, Result, RunConfig};
use relink_graph::{
    accumulate_term_counts, build_document_links, estimate, write_candidates_file, write_ic_file,
    CorpusRelations, DocumentEntry, EntityLine,
};
use relink_kb::KbModel;

// ── Result summary ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: String,
    pub kb: String,
    pub documents: usize,
    pub mentions: usize,
    pub files_written: usize,
    pub cache_updated: bool,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
}

// ── Pipeline orchestrator ─────────────────────────────────────────────────────

pub struct Pipeline<'m> {
    config: RunConfig,
    model: &'m KbModel,
    generator: CandidateGenerator<'m>,
    relations: Option<CorpusRelations>,
}

impl<'m> Pipeline<'m> {
    /// A corpus-relation table is only consulted by the `corpus` and
    /// `kb_corpus` policies; pass None for `kb`.
    pub fn new(
        config: RunConfig,
        model: &'m KbModel,
        relations: Option<CorpusRelations>,
        oracle: Option<Box<dyn NilOracle>>,
    ) -> Self {
        let mut generator = CandidateGenerator::new(model, config.resolved_min_score());
        if let Some(oracle) = oracle {
            generator = generator.with_oracle(oracle);
        }
        Self {
            config,
            model,
            generator,
            relations,
        }
    }

    /// Like [`Pipeline::new`], but with the NIL oracle the configuration
    /// names when `oracle_url` is set.
    pub fn from_config(
        config: RunConfig,
        model: &'m KbModel,
        relations: Option<CorpusRelations>,
    ) -> Result<Self> {
        let oracle: Option<Box<dyn NilOracle>> = match &config.oracle_url {
            Some(url) => Some(Box::new(HttpNilOracle::new(url.clone(), config.top_k)?)),
            None => None,
        };
        Ok(Self::new(config, model, relations, oracle))
    }

    /// Link every mention of every document and write the run artifacts:
    /// one candidates file per non-empty document plus the `ic` file.
    pub fn execute(
        &mut self,
        annotations: &CorpusAnnotations,
        abbreviations: &AbbreviationMap,
    ) -> Result<RunSummary> {
        let started_at = Utc::now();
        let t0 = std::time::Instant::now();

        let run_id = self.config.run_id();
        let policy = self.config.resolved_policy();
        let entity_type = self.model.source.entity_type();
        info!(
            run_id = %run_id,
            kb = %self.config.kb,
            policy = policy.as_str(),
            documents = annotations.len(),
            "Starting linking run"
        );

        let candidates_dir = self.config.candidates_dir(&run_id);
        prepare_candidates_dir(&candidates_dir)?;
        if let Some(cache_dir) = self.config.cache_file().parent() {
            fs::create_dir_all(cache_dir)?;
        }
        let mut cache = CandidateCache::open(self.config.cache_file())?;

        let no_abbreviations: HashMap<String, String> = HashMap::new();
        let mut counts: AHashMap<String, u64> = AHashMap::new();
        let mut mentions = 0usize;
        let mut files_written = 0usize;

        for (ordinal, (doc_id, doc_mentions)) in annotations.iter().enumerate() {
            let mut doc_mentions = doc_mentions.clone();
            expand_mentions(&mut doc_mentions);
            let doc_abbreviations = abbreviations.get(doc_id).unwrap_or(&no_abbreviations);

            let mut seen: AHashSet<&str> = AHashSet::new();
            let mut entries: Vec<DocumentEntry> = Vec::new();

            for mention in &doc_mentions {
                if mention.text.is_empty()
                    || mention.kind == MentionKind::Composite
                    || !seen.insert(mention.text.as_str())
                {
                    continue;
                }

                let (candidates, cache_gained) =
                    self.generator
                        .candidates_for(&mention.text, doc_abbreviations, &mut cache);
                if cache_gained {
                    debug!(doc = %doc_id, mention = %mention.text, "cached fresh dictionary search");
                }
                accumulate_term_counts(&mut counts, &candidates);
                mentions += 1;

                entries.push(DocumentEntry {
                    entity: EntityLine {
                        text: mention.text.clone(),
                        entity_type,
                        doc_ordinal: ordinal,
                        doc_id: doc_id.clone(),
                        true_id: mention.true_id_str().to_string(),
                    },
                    candidates,
                });
            }

            if entries.is_empty() {
                continue;
            }
            build_document_links(
                &mut entries,
                policy,
                self.relations.as_ref(),
                &self.model.hierarchy,
            );
            write_candidates_file(&candidates_dir.join(doc_id), &entries, entity_type)?;
            files_written += 1;
        }

        let ic = estimate(&counts, self.config.ic_mode, &self.model.hierarchy);
        write_ic_file(&self.config.ic_file(&run_id), &ic)?;

        let cache_updated = cache.flush_if_dirty()?;

        let summary = RunSummary {
            run_id,
            kb: self.config.kb.clone(),
            documents: annotations.len(),
            mentions,
            files_written,
            cache_updated,
            started_at,
            duration_ms: t0.elapsed().as_millis() as u64,
        };
        info!(
            run_id = %summary.run_id,
            mentions = summary.mentions,
            files_written = summary.files_written,
            cache_updated = summary.cache_updated,
            duration_ms = summary.duration_ms,
            "Linking run complete"
        );
        Ok(summary)
    }
}

/// Create the candidates directory and drop files left by a previous run
/// under the same id, so every run starts from a clean slate.
fn prepare_candidates_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)?;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            fs::remove_file(entry.path())?;
        }
    }
    Ok(())
}
