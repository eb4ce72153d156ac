//! Persisted dictionary artifacts, generated once per knowledge base and
//! reused across runs.

use crate::hierarchy::HierarchyGraph;
use crate::model::KbModel;
use crate::source::KbSource;
use ahash::AHashMap;
use relink_common::{RelinkError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Serialize, Deserialize)]
struct HierarchyFile {
    edges: Vec<(String, String)>,
}

/// Directory of per-KB dictionary files.
///
/// Each KB gets `<root>/<kb>/` holding `name_to_id.json`, `id_to_name.json`,
/// `synonym_to_id.json`, and `hierarchy.json`. Files are written atomically
/// and with sorted keys, so regenerating an unchanged KB is byte-stable.
pub struct KbStore {
    root: PathBuf,
}

impl KbStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn kb_dir(&self, source: KbSource) -> PathBuf {
        self.root.join(source.as_str())
    }

    pub fn save(&self, model: &KbModel) -> Result<()> {
        let dir = self.kb_dir(model.source);
        fs::create_dir_all(&dir)?;

        write_json(&dir.join("name_to_id.json"), &sorted(&model.name_to_id))?;
        write_json(&dir.join("id_to_name.json"), &sorted(&model.id_to_name))?;
        write_json(&dir.join("synonym_to_id.json"), &sorted(&model.synonym_to_id))?;

        let mut edges: Vec<(String, String)> = model
            .hierarchy
            .edge_list()
            .into_iter()
            .map(|(parent, child)| (parent.to_string(), child.to_string()))
            .collect();
        edges.sort();
        write_json(&dir.join("hierarchy.json"), &HierarchyFile { edges })?;

        info!(
            kb = model.source.as_str(),
            dir = %dir.display(),
            concepts = model.concept_count(),
            "dictionaries saved"
        );
        Ok(())
    }

    /// Rebuild a [`KbModel`] from saved dictionaries.
    ///
    /// The single-parent lookup is reconstructed from nodes with exactly one
    /// incoming hierarchy edge. Alternate identifiers are not persisted, so
    /// the reloaded model carries an empty alternate map.
    pub fn load(&self, source: KbSource) -> Result<KbModel> {
        let dir = self.kb_dir(source);
        let name_to_id: AHashMap<String, String> = read_json(&dir.join("name_to_id.json"))?;
        let id_to_name: AHashMap<String, String> = read_json(&dir.join("id_to_name.json"))?;
        let synonym_to_id: AHashMap<String, String> =
            read_json(&dir.join("synonym_to_id.json"))?;
        let hierarchy_file: HierarchyFile = read_json(&dir.join("hierarchy.json"))?;

        let hierarchy =
            HierarchyGraph::from_edges(hierarchy_file.edges.iter().map(|(p, c)| (p, c)));

        let mut child_to_parent = AHashMap::new();
        for id in hierarchy.node_ids() {
            if let [parent] = hierarchy.parents(id).as_slice() {
                child_to_parent.insert(id.to_string(), parent.to_string());
            }
        }

        info!(
            kb = source.as_str(),
            concepts = name_to_id.len(),
            "dictionaries loaded"
        );

        Ok(KbModel {
            source,
            name_to_id,
            id_to_name,
            synonym_to_id,
            alt_id_to_id: AHashMap::new(),
            child_to_parent,
            hierarchy,
        })
    }
}

fn sorted(map: &AHashMap<String, String>) -> BTreeMap<&str, &str> {
    map.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect()
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| RelinkError::Config(format!("no parent directory for {}", path.display())))?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(&serde_json::to_vec_pretty(value)?)?;
    tmp.persist(path).map_err(|e| RelinkError::Io(e.error))?;
    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = fs::read(path)?;
    Ok(serde_json::from_slice(&bytes)?)
}
