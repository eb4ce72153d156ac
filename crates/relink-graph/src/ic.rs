//! Information-content estimation over proposed candidates.
//!
//! The downstream ranker seeds its walk with an IC value per KB id. Two
//! estimators are supported: the extrinsic one derives a probability from
//! how often an id was proposed across the corpus, the intrinsic one from
//! how many descendants the id has in the concept hierarchy. Both map the
//! probability through -ln(p) and shift the result by a constant offset of
//! 2 so every value stays strictly positive.

use ahash::AHashMap;
use relink_candidates::Candidate;
use relink_common::{IcMode, Result};
use relink_kb::HierarchyGraph;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;
use tracing::info;

/// Probability floor for ids the hierarchy knows nothing about.
const FLOOR_PROBABILITY: f64 = 1e-6;

const IC_OFFSET: f64 = 2.0;

/// Tally one occurrence per proposed candidate, the NIL sentinel included.
pub fn accumulate_term_counts(counts: &mut AHashMap<String, u64>, candidates: &[Candidate]) {
    for candidate in candidates {
        *counts.entry(candidate.kb_id.clone()).or_insert(0) += 1;
    }
}

/// Estimate an IC value for every id in `counts`.
pub fn estimate(
    counts: &AHashMap<String, u64>,
    mode: IcMode,
    hierarchy: &HierarchyGraph,
) -> BTreeMap<String, f64> {
    match mode {
        IcMode::Extrinsic => extrinsic(counts),
        IcMode::Intrinsic => intrinsic(counts, hierarchy),
    }
}

/// p(id) = (count + 1) / (max count + 1), so the most frequent id lands
/// exactly on the offset.
fn extrinsic(counts: &AHashMap<String, u64>) -> BTreeMap<String, f64> {
    let Some(max_count) = counts.values().copied().max() else {
        return BTreeMap::new();
    };
    counts
        .iter()
        .map(|(id, &count)| {
            let p = (count + 1) as f64 / (max_count + 1) as f64;
            (id.clone(), -p.ln() + IC_OFFSET)
        })
        .collect()
}

/// p(id) = (descendants + 1) / total nodes; ids outside the hierarchy fall
/// back to the floor probability, which gives them the highest IC.
fn intrinsic(counts: &AHashMap<String, u64>, hierarchy: &HierarchyGraph) -> BTreeMap<String, f64> {
    let total_nodes = hierarchy.node_count();
    counts
        .keys()
        .map(|id| {
            let p = match hierarchy.descendant_count(id) {
                Some(descendants) if total_nodes > 0 => {
                    (descendants + 1) as f64 / total_nodes as f64
                }
                _ => FLOOR_PROBABILITY,
            };
            (id.clone(), -p.ln() + IC_OFFSET)
        })
        .collect()
}

/// Write one `id\tvalue` line per entry, sorted by id.
pub fn write_ic_file(path: &Path, values: &BTreeMap<String, f64>) -> Result<()> {
    let mut out = String::new();
    for (id, value) in values {
        let _ = writeln!(out, "{id}\t{value}");
    }
    std::fs::write(path, out)?;
    info!(path = %path.display(), entries = values.len(), "wrote information content file");
    Ok(())
}
