//! Candidate retrieval and materialization for a single knowledge base.

use crate::cache::{CandidateCache, RawMatch};
use crate::oracle::{normalize_id, NilOracle};
use crate::similarity::{rank, token_sort_ratio, TOP_MATCHES};
use relink_kb::KbModel;
use std::collections::{BTreeSet, HashMap};
use tracing::warn;

/// Identifier of the "no link found" sentinel candidate.
pub const NIL_ID: &str = "-1";
const NIL_NAME: &str = "none";

/// Surrogate id reserved for root concepts without a numeric suffix.
pub const ROOT_SURROGATE_ID: i64 = 10_000_000;
const NIL_SURROGATE_ID: i64 = -1;

/// A materialized knowledge base candidate for one mention.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub kb_id: String,
    pub name: String,
    pub in_degree: usize,
    pub out_degree: usize,
    /// Numeric id used by the downstream ranker in place of the KB id.
    pub surrogate_id: i64,
    /// Surrogate ids of related candidates for other mentions in the same
    /// document, filled in while writing the document.
    pub links: BTreeSet<i64>,
    pub score: f64,
}

impl Candidate {
    /// The "no link found" placeholder.
    pub fn nil() -> Self {
        Candidate {
            kb_id: NIL_ID.to_string(),
            name: NIL_NAME.to_string(),
            in_degree: 0,
            out_degree: 0,
            surrogate_id: NIL_SURROGATE_ID,
            links: BTreeSet::new(),
            score: 0.0,
        }
    }

    pub fn is_nil(&self) -> bool {
        self.kb_id == NIL_ID
    }
}

pub struct CandidateGenerator<'m> {
    model: &'m KbModel,
    min_score: f64,
    oracle: Option<Box<dyn NilOracle>>,
}

impl<'m> CandidateGenerator<'m> {
    pub fn new(model: &'m KbModel, min_score: f64) -> Self {
        Self {
            model,
            min_score,
            oracle: None,
        }
    }

    pub fn with_oracle(mut self, oracle: Box<dyn NilOracle>) -> Self {
        self.oracle = Some(oracle);
        self
    }

    /// Candidates for one mention, best match first. Returns the list and
    /// whether the cache gained an entry.
    ///
    /// Lookup order: document-local abbreviation expansion, exact
    /// name/synonym match (bypasses the cache entirely), cached entry for
    /// the plural stem, cached entry for the text itself, and finally a
    /// fresh dictionary search whose raw result is cached. Materialization
    /// drops matches at or below `min_score`; when nothing survives, the
    /// NIL oracle (if any) gets one shot before the sentinel is emitted.
    pub fn candidates_for(
        &self,
        mention_text: &str,
        doc_abbreviations: &HashMap<String, String>,
        cache: &mut CandidateCache,
    ) -> (Vec<Candidate>, bool) {
        let text = doc_abbreviations
            .get(mention_text)
            .map(String::as_str)
            .unwrap_or(mention_text);

        if let Some(id) = self.model.resolve(text) {
            return (vec![self.build(id, text, 1.0)], false);
        }

        let (raw, cache_changed) = if let Some(matches) = cache.get_plural_stem(text) {
            (matches.to_vec(), false)
        } else if let Some(matches) = cache.get(text) {
            (matches.to_vec(), false)
        } else {
            let matches = self.search(text);
            cache.put(text, matches.clone());
            (matches, true)
        };

        let mut candidates = self.materialize(&raw);
        if candidates.is_empty() || (candidates.len() == 1 && candidates[0].is_nil()) {
            candidates = self.nil_fallback(text);
        }
        (candidates, cache_changed)
    }

    /// Fresh dictionary search: the ten closest names, collapsed to a single
    /// entry on a perfect hit, otherwise augmented from the synonym table. A
    /// perfect synonym replaces the whole list; an imperfect one is appended
    /// when it beats the best name score.
    fn search(&self, text: &str) -> Vec<RawMatch> {
        let mut top = rank(
            text,
            self.model.name_to_id.keys().map(String::as_str),
            TOP_MATCHES,
        );
        let Some(best) = top.first() else {
            return top;
        };
        if best.score >= 100.0 {
            top.truncate(1);
            return top;
        }

        let synonyms = rank(
            text,
            self.model.synonym_to_id.keys().map(String::as_str),
            TOP_MATCHES,
        );
        for synonym in synonyms {
            if synonym.score >= 100.0 {
                top = vec![synonym];
            } else if synonym.score > top[0].score {
                top.push(synonym);
            }
        }
        top
    }

    fn materialize(&self, raw: &[RawMatch]) -> Vec<Candidate> {
        raw.iter()
            .filter_map(|m| {
                let score = m.score / 100.0;
                if score <= self.min_score {
                    return None;
                }
                let kb_id = self.model.resolve(&m.name)?;
                Some(self.build(kb_id, &m.name, score))
            })
            .collect()
    }

    fn nil_fallback(&self, text: &str) -> Vec<Candidate> {
        if let Some(oracle) = &self.oracle {
            match oracle.suggest(text) {
                Ok(suggestions) => {
                    let mut candidates = Vec::new();
                    for suggestion in &suggestions {
                        let score = token_sort_ratio(text, &suggestion.name) / 100.0;
                        if score <= self.min_score {
                            continue;
                        }
                        let kb_id = normalize_id(&suggestion.id);
                        if kb_id == NIL_ID {
                            continue;
                        }
                        candidates.push(self.build(kb_id, &suggestion.name, score));
                    }
                    if !candidates.is_empty() {
                        return candidates;
                    }
                }
                Err(err) => {
                    warn!(mention = text, error = %err, "nil oracle unavailable, emitting sentinel");
                }
            }
        }
        vec![Candidate::nil()]
    }

    fn build(&self, kb_id: &str, name: &str, score: f64) -> Candidate {
        Candidate {
            kb_id: kb_id.to_string(),
            name: name.to_string(),
            in_degree: self.model.hierarchy.in_degree(kb_id),
            out_degree: self.model.hierarchy.out_degree(kb_id),
            surrogate_id: surrogate_id(kb_id),
            links: BTreeSet::new(),
            score,
        }
    }
}

/// Numeric surrogate for a KB id: its trailing digits, capped at the last
/// six. Identifiers are ASCII. Root ids with no digits map to
/// [`ROOT_SURROGATE_ID`].
fn surrogate_id(kb_id: &str) -> i64 {
    let digits_start = kb_id
        .rfind(|c: char| !c.is_ascii_digit())
        .map(|i| i + 1)
        .unwrap_or(0);
    let digits = &kb_id[digits_start..];
    if digits.is_empty() {
        return ROOT_SURROGATE_ID;
    }
    let tail = &digits[digits.len().saturating_sub(6)..];
    tail.parse().unwrap_or(ROOT_SURROGATE_ID)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::NilSuggestion;
    use relink_common::{RelinkError, Result};
    use relink_kb::{KbModelBuilder, KbSource};

    fn sample_model() -> KbModel {
        let mut builder = KbModelBuilder::new(KbSource::Medic);
        builder.add_concept("D009369", "Neoplasms");
        builder.add_concept("D001943", "Breast Neoplasms");
        builder.add_concept("D008175", "Lung Neoplasms");
        builder.add_synonym("breast cancer", "D001943");
        builder.add_synonym("lung cancer", "D008175");
        builder.record_parents("D001943", &["D009369".to_string()]);
        builder.record_parents("D008175", &["D009369".to_string()]);
        builder.record_parents("D009369", &["C".to_string()]);
        builder.finish()
    }

    fn empty_cache() -> CandidateCache {
        let dir = tempfile::tempdir().unwrap();
        CandidateCache::open(dir.path().join("medic.json")).unwrap()
    }

    struct FixedOracle(Vec<NilSuggestion>);

    impl NilOracle for FixedOracle {
        fn suggest(&self, _text: &str) -> Result<Vec<NilSuggestion>> {
            Ok(self.0.clone())
        }
    }

    struct FailingOracle;

    impl NilOracle for FailingOracle {
        fn suggest(&self, _text: &str) -> Result<Vec<NilSuggestion>> {
            Err(RelinkError::OracleUnavailable("connection refused".into()))
        }
    }

    #[test]
    fn test_exact_name_short_circuits_without_cache() {
        let model = sample_model();
        let generator = CandidateGenerator::new(&model, 0.85);
        let mut cache = empty_cache();

        let (candidates, changed) =
            generator.candidates_for("Neoplasms", &HashMap::new(), &mut cache);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].kb_id, "D009369");
        assert_eq!(candidates[0].score, 1.0);
        assert!(!changed);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_exact_synonym_short_circuits() {
        let model = sample_model();
        let generator = CandidateGenerator::new(&model, 0.85);
        let mut cache = empty_cache();

        let (candidates, _) =
            generator.candidates_for("breast cancer", &HashMap::new(), &mut cache);
        assert_eq!(candidates[0].kb_id, "D001943");
        assert_eq!(candidates[0].score, 1.0);
    }

    #[test]
    fn test_abbreviation_expanded_before_matching() {
        let model = sample_model();
        let generator = CandidateGenerator::new(&model, 0.85);
        let mut cache = empty_cache();
        let abbreviations =
            HashMap::from([("BC".to_string(), "breast cancer".to_string())]);

        let (candidates, _) = generator.candidates_for("BC", &abbreviations, &mut cache);
        assert_eq!(candidates[0].kb_id, "D001943");
    }

    #[test]
    fn test_reordered_synonym_replaces_name_matches() {
        let model = sample_model();
        let generator = CandidateGenerator::new(&model, 0.85);
        let mut cache = empty_cache();

        // Not an exact string match, but token-sort-identical to a synonym
        let (candidates, changed) =
            generator.candidates_for("cancer breast", &HashMap::new(), &mut cache);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].kb_id, "D001943");
        assert_eq!(candidates[0].score, 1.0);
        assert!(changed);
    }

    #[test]
    fn test_cache_hit_skips_search() {
        let model = sample_model();
        let generator = CandidateGenerator::new(&model, 0.85);
        let mut cache = empty_cache();

        let (first, first_changed) =
            generator.candidates_for("Lung Neoplasm", &HashMap::new(), &mut cache);
        assert!(first_changed);
        let (second, second_changed) =
            generator.candidates_for("Lung Neoplasm", &HashMap::new(), &mut cache);
        assert!(!second_changed);
        assert_eq!(first, second);
    }

    #[test]
    fn test_plural_stem_reuses_cached_entry() {
        let model = sample_model();
        let generator = CandidateGenerator::new(&model, 0.85);
        let mut cache = empty_cache();
        cache.put(
            "lung neopl",
            vec![RawMatch {
                name: "Lung Neoplasms".to_string(),
                score: 96.0,
            }],
        );

        // "lung neopls" is no exact name, but its stem is cached
        let (candidates, changed) =
            generator.candidates_for("lung neopls", &HashMap::new(), &mut cache);
        assert_eq!(candidates[0].kb_id, "D008175");
        assert!(!changed);
    }

    #[test]
    fn test_no_match_without_oracle_emits_sentinel() {
        let model = sample_model();
        let generator = CandidateGenerator::new(&model, 0.85);
        let mut cache = empty_cache();

        let (candidates, _) =
            generator.candidates_for("zzzz qqqq xxxx", &HashMap::new(), &mut cache);
        assert_eq!(candidates.len(), 1);
        assert!(candidates[0].is_nil());
        assert_eq!(candidates[0].surrogate_id, -1);
        assert_eq!(candidates[0].score, 0.0);
    }

    #[test]
    fn test_oracle_suggestion_used_when_close_enough() {
        let model = sample_model();
        let oracle = FixedOracle(vec![NilSuggestion {
            id: "MESH_D008175".to_string(),
            name: "pulmonary cancers".to_string(),
        }]);
        let generator =
            CandidateGenerator::new(&model, 0.85).with_oracle(Box::new(oracle));
        let mut cache = empty_cache();

        let (candidates, _) =
            generator.candidates_for("pulmonary cancer", &HashMap::new(), &mut cache);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].kb_id, "D008175");
        assert!(candidates[0].score > 0.9 && candidates[0].score < 1.0);
        assert_eq!(candidates[0].surrogate_id, 8175);
    }

    #[test]
    fn test_low_scoring_oracle_suggestion_falls_back_to_sentinel() {
        let model = sample_model();
        let oracle = FixedOracle(vec![NilSuggestion {
            id: "MESH_D009369".to_string(),
            name: "unk".to_string(),
        }]);
        let generator =
            CandidateGenerator::new(&model, 0.85).with_oracle(Box::new(oracle));
        let mut cache = empty_cache();

        let (candidates, _) =
            generator.candidates_for("qqqq wwww", &HashMap::new(), &mut cache);
        assert!(candidates[0].is_nil());
    }

    #[test]
    fn test_oracle_failure_degrades_to_sentinel() {
        let model = sample_model();
        let generator =
            CandidateGenerator::new(&model, 0.85).with_oracle(Box::new(FailingOracle));
        let mut cache = empty_cache();

        let (candidates, _) =
            generator.candidates_for("qqqq wwww", &HashMap::new(), &mut cache);
        assert_eq!(candidates.len(), 1);
        assert!(candidates[0].is_nil());
    }

    #[test]
    fn test_degrees_come_from_hierarchy() {
        let model = sample_model();
        let generator = CandidateGenerator::new(&model, 0.85);
        let mut cache = empty_cache();

        let (candidates, _) =
            generator.candidates_for("Neoplasms", &HashMap::new(), &mut cache);
        assert_eq!(candidates[0].in_degree, 1);
        assert_eq!(candidates[0].out_degree, 2);
    }

    #[test]
    fn test_surrogate_ids() {
        assert_eq!(surrogate_id("D009369"), 9369);
        assert_eq!(surrogate_id("C537775"), 537775);
        assert_eq!(surrogate_id("144700"), 144700);
        assert_eq!(surrogate_id("C"), ROOT_SURROGATE_ID);
        assert_eq!(surrogate_id("D"), ROOT_SURROGATE_ID);
        assert_eq!(surrogate_id("A"), ROOT_SURROGATE_ID);
    }
}
