//! Pairwise candidate relatedness and per-document link sets.

use crate::relations::CorpusRelations;
use crate::serializer::DocumentEntry;
use ahash::AHashMap;
use relink_candidates::NIL_ID;
use relink_common::LinkPolicy;
use relink_kb::HierarchyGraph;
use std::collections::BTreeSet;

/// Whether two KB ids count as related under `policy`.
///
/// Sentinel ids and composite ids (containing the `|` separator) are never
/// related. Under `Kb` and `KbCorpus` an id is related to itself, to direct
/// hierarchy neighbors in either direction, and to anything reachable
/// through the hierarchy; `KbCorpus` falls back to the corpus table when the
/// hierarchy says no.
pub fn related(
    id1: &str,
    id2: &str,
    policy: LinkPolicy,
    corpus_relations: Option<&CorpusRelations>,
    hierarchy: &HierarchyGraph,
) -> bool {
    if id1 == NIL_ID || id2 == NIL_ID || id1.contains('|') || id2.contains('|') {
        return false;
    }

    let corpus_related =
        |a: &str, b: &str| corpus_relations.is_some_and(|table| table.related(a, b));

    match policy {
        LinkPolicy::Corpus => corpus_related(id1, id2),
        LinkPolicy::Kb | LinkPolicy::KbCorpus => {
            if id1 == id2 || hierarchy.has_edge(id1, id2) || hierarchy.has_edge(id2, id1) {
                return true;
            }
            if hierarchy.contains(id1)
                && hierarchy.contains(id2)
                && (hierarchy.ancestors(id1).contains(id2)
                    || hierarchy.descendants(id1).contains(id2))
            {
                return true;
            }
            policy == LinkPolicy::KbCorpus && corpus_related(id1, id2)
        }
    }
}

/// Fill in the link set of every candidate in a document.
///
/// A candidate links to the surrogate ids of related candidates belonging to
/// *other* mentions; candidates of the same mention are never linked. Link
/// sets are memoized per KB id within the document, so a KB id proposed for
/// several mentions reuses the set computed at its first occurrence. Sets
/// are numerically sorted, which keeps repeated runs byte-identical.
pub fn build_document_links(
    entries: &mut [DocumentEntry],
    policy: LinkPolicy,
    corpus_relations: Option<&CorpusRelations>,
    hierarchy: &HierarchyGraph,
) {
    let mut memo: AHashMap<String, BTreeSet<i64>> = AHashMap::new();

    for i in 0..entries.len() {
        for c in 0..entries[i].candidates.len() {
            let url = entries[i].candidates[c].kb_id.clone();
            if let Some(links) = memo.get(&url) {
                entries[i].candidates[c].links = links.clone();
                continue;
            }

            let mut links = BTreeSet::new();
            for (j, other_entry) in entries.iter().enumerate() {
                if j == i {
                    continue;
                }
                for other in &other_entry.candidates {
                    if related(&url, &other.kb_id, policy, corpus_relations, hierarchy) {
                        links.insert(other.surrogate_id);
                    }
                }
            }

            memo.insert(url, links.clone());
            entries[i].candidates[c].links = links;
        }
    }
}
