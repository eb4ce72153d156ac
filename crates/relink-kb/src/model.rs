//! Normalized in-memory knowledge base.
//!
//! All three source formats funnel into [`KbModelBuilder`], which accumulates
//! dictionaries and the raw edge list and applies the shared postconditions
//! when finished: the designated root concept exists, and the hierarchy graph
//! is built from the edge list with duplicates collapsed.

use crate::hierarchy::HierarchyGraph;
use crate::source::KbSource;
use ahash::AHashMap;
use tracing::info;

#[derive(Debug)]
pub struct KbModel {
    pub source: KbSource,
    pub name_to_id: AHashMap<String, String>,
    pub id_to_name: AHashMap<String, String>,
    pub synonym_to_id: AHashMap<String, String>,
    /// Alternate (merged/secondary) identifier → active identifier, with the
    /// prefix separator flattened to `_`.
    pub alt_id_to_id: AHashMap<String, String>,
    /// Fast path populated only for concepts with exactly one direct parent.
    pub child_to_parent: AHashMap<String, String>,
    pub hierarchy: HierarchyGraph,
}

impl KbModel {
    /// Resolve a surface form: canonical names first, synonyms second.
    pub fn resolve(&self, name: &str) -> Option<&str> {
        self.name_to_id
            .get(name)
            .or_else(|| self.synonym_to_id.get(name))
            .map(String::as_str)
    }

    /// True when the text is an exact canonical name or synonym.
    pub fn contains_exact(&self, text: &str) -> bool {
        self.name_to_id.contains_key(text) || self.synonym_to_id.contains_key(text)
    }

    pub fn concept_count(&self) -> usize {
        self.name_to_id.len()
    }
}

pub struct KbModelBuilder {
    source: KbSource,
    name_to_id: AHashMap<String, String>,
    id_to_name: AHashMap<String, String>,
    synonym_to_id: AHashMap<String, String>,
    alt_id_to_id: AHashMap<String, String>,
    child_to_parent: AHashMap<String, String>,
    edges: Vec<(String, String)>,
}

impl KbModelBuilder {
    pub fn new(source: KbSource) -> Self {
        Self {
            source,
            name_to_id: AHashMap::new(),
            id_to_name: AHashMap::new(),
            synonym_to_id: AHashMap::new(),
            alt_id_to_id: AHashMap::new(),
            child_to_parent: AHashMap::new(),
            edges: Vec::new(),
        }
    }

    pub fn add_concept(&mut self, id: &str, name: &str) {
        self.name_to_id.insert(name.to_string(), id.to_string());
        self.id_to_name.insert(id.to_string(), name.to_string());
    }

    /// Obsolete records remove themselves from the active maps.
    pub fn remove_concept(&mut self, id: &str, name: &str) {
        self.name_to_id.remove(name);
        self.id_to_name.remove(id);
    }

    pub fn add_synonym(&mut self, synonym: &str, id: &str) {
        self.synonym_to_id.insert(synonym.to_string(), id.to_string());
    }

    /// True once a concept with this identifier has been added.
    pub fn has_concept_id(&self, id: &str) -> bool {
        self.id_to_name.contains_key(id)
    }

    pub fn add_alt_id(&mut self, alt_id: &str, id: &str) {
        self.alt_id_to_id.insert(alt_id.to_string(), id.to_string());
    }

    /// Record the direct parents of a concept: one edge per parent, and the
    /// single-parent fast path when there is exactly one.
    pub fn record_parents(&mut self, id: &str, parents: &[String]) {
        if let [parent] = parents {
            self.child_to_parent.insert(id.to_string(), parent.clone());
        }
        for parent in parents {
            self.edges.push((parent.clone(), id.to_string()));
        }
    }

    pub fn add_edge(&mut self, parent: &str, child: &str) {
        self.edges.push((parent.to_string(), child.to_string()));
    }

    pub fn set_child_to_parent(&mut self, map: AHashMap<String, String>) {
        self.child_to_parent = map;
    }

    /// Apply the shared postconditions and assemble the model.
    pub fn finish(mut self) -> KbModel {
        let root_name = self.source.root_name();
        if !self.name_to_id.contains_key(root_name) {
            let root_id = self.source.root_id();
            self.name_to_id.insert(root_name.to_string(), root_id.to_string());
            self.id_to_name.insert(root_id.to_string(), root_name.to_string());
        }

        let hierarchy = HierarchyGraph::from_edges(self.edges.iter().map(|(p, c)| (p, c)));

        info!(
            kb = self.source.as_str(),
            concepts = self.name_to_id.len(),
            synonyms = self.synonym_to_id.len(),
            nodes = hierarchy.node_count(),
            edges = hierarchy.edge_count(),
            "knowledge base loaded"
        );

        KbModel {
            source: self.source,
            name_to_id: self.name_to_id,
            id_to_name: self.id_to_name,
            synonym_to_id: self.synonym_to_id,
            alt_id_to_id: self.alt_id_to_id,
            child_to_parent: self.child_to_parent,
            hierarchy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_synthesized_when_missing() {
        let builder = KbModelBuilder::new(KbSource::Medic);
        let model = builder.finish();
        assert_eq!(model.name_to_id.get("Diseases").map(String::as_str), Some("C"));
        assert_eq!(model.id_to_name.get("C").map(String::as_str), Some("Diseases"));
    }

    #[test]
    fn test_root_kept_when_present() {
        let mut builder = KbModelBuilder::new(KbSource::CtdChemicals);
        builder.add_concept("D", "Chemicals");
        let model = builder.finish();
        assert_eq!(model.name_to_id.len(), 1);
        assert_eq!(model.resolve("Chemicals"), Some("D"));
    }

    #[test]
    fn test_resolve_prefers_names_over_synonyms() {
        let mut builder = KbModelBuilder::new(KbSource::Medic);
        builder.add_concept("D001", "cancer");
        builder.add_synonym("cancer", "D002");
        builder.add_synonym("tumour", "D001");
        let model = builder.finish();
        assert_eq!(model.resolve("cancer"), Some("D001"));
        assert_eq!(model.resolve("tumour"), Some("D001"));
        assert_eq!(model.resolve("carcinoma"), None);
    }

    #[test]
    fn test_obsolete_removal() {
        let mut builder = KbModelBuilder::new(KbSource::Medic);
        builder.add_concept("D001", "cancer");
        builder.remove_concept("D001", "cancer");
        let model = builder.finish();
        assert!(!model.contains_exact("cancer"));
        assert!(model.id_to_name.get("D001").is_none());
    }

    #[test]
    fn test_single_parent_fast_path() {
        let mut builder = KbModelBuilder::new(KbSource::Medic);
        builder.add_concept("D001", "cancer");
        builder.add_concept("D002", "lung cancer");
        builder.add_concept("D003", "odd case");
        builder.record_parents("D002", &["D001".to_string()]);
        builder.record_parents("D003", &["D001".to_string(), "D002".to_string()]);
        let model = builder.finish();

        assert_eq!(model.child_to_parent.get("D002").map(String::as_str), Some("D001"));
        // Multi-parent concepts stay out of the fast path but keep all edges
        assert!(model.child_to_parent.get("D003").is_none());
        assert_eq!(model.hierarchy.in_degree("D003"), 2);
    }

    #[test]
    fn test_duplicate_edges_collapse_in_finish() {
        let mut builder = KbModelBuilder::new(KbSource::Medic);
        builder.add_edge("C", "D001");
        builder.add_edge("C", "D001");
        let model = builder.finish();
        assert_eq!(model.hierarchy.edge_count(), 1);
    }
}
