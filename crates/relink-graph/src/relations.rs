//! Corpus-derived relation table.
//!
//! The table maps each KB id to the set of ids it is related to, and is
//! symmetric by construction. It backs the `corpus` and `kb_corpus` link
//! policies; the plain `kb` policy runs without one.

use ahash::AHashMap;
use relink_common::{RelinkError, Result};
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::Path;
use tracing::info;

#[derive(Debug, Default, Clone)]
pub struct CorpusRelations {
    relations: AHashMap<String, BTreeSet<String>>,
}

impl CorpusRelations {
    /// Load a relation table from its JSON file (`{id: [related ids]}`).
    /// A missing file maps to [`RelinkError::MissingCorpusRelations`] since
    /// the caller only loads when the link policy requires the table.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = fs::read(path).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                RelinkError::MissingCorpusRelations(path.display().to_string())
            } else {
                RelinkError::Io(e)
            }
        })?;
        let relations: AHashMap<String, BTreeSet<String>> = serde_json::from_slice(&bytes)?;
        info!(entries = relations.len(), file = %path.display(), "corpus relations loaded");
        Ok(Self { relations })
    }

    /// Build the table from cross-type interaction pairs `(partner, target)`:
    /// two target-type ids are related iff they interact with a shared
    /// partner. The result is symmetric.
    pub fn from_interaction_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut by_partner: AHashMap<String, Vec<String>> = AHashMap::new();
        for (partner, target) in pairs {
            by_partner.entry(partner).or_default().push(target);
        }

        let mut relations: AHashMap<String, BTreeSet<String>> = AHashMap::new();
        for targets in by_partner.values() {
            for a in targets {
                for b in targets {
                    if a != b {
                        relations.entry(a.clone()).or_default().insert(b.clone());
                        relations.entry(b.clone()).or_default().insert(a.clone());
                    }
                }
            }
        }
        Self { relations }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let sorted: std::collections::BTreeMap<&str, &BTreeSet<String>> = self
            .relations
            .iter()
            .map(|(id, set)| (id.as_str(), set))
            .collect();
        fs::write(path, serde_json::to_vec_pretty(&sorted)?)?;
        Ok(())
    }

    pub fn related(&self, id1: &str, id2: &str) -> bool {
        self.relations
            .get(id1)
            .is_some_and(|related| related.contains(id2))
    }

    pub fn len(&self) -> usize {
        self.relations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.relations.is_empty()
    }
}
