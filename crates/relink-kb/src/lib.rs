//! relink-kb — Knowledge base loading and normalization.
//!
//! Three raw source encodings (OBO ontology, CTD tabular, MeSH
//! descriptor+supplement XML) are parsed into one normalized [`KbModel`]:
//! name→id, synonym→id, id→name dictionaries plus a directed hierarchy
//! graph with (parent, child) edges. Models are persisted once per KB by
//! [`KbStore`] and reloaded per run.

pub mod hierarchy;
pub mod mesh;
pub mod model;
pub mod obo;
pub mod source;
pub mod store;
pub mod tabular;

pub use hierarchy::HierarchyGraph;
pub use model::{KbModel, KbModelBuilder};
pub use source::{KbSource, SourceFormat};
pub use store::KbStore;

use relink_common::Result;
use std::path::Path;

/// Load a knowledge base from its raw distribution files under `raw_dir`.
///
/// `include_root_variants` keeps concepts outside the KB's identifier-prefix
/// range (the OMIM entries of MEDIC); it has no effect on the other sources.
pub fn load(source: KbSource, include_root_variants: bool, raw_dir: &Path) -> Result<KbModel> {
    match source.format() {
        SourceFormat::Obo => {
            obo::parse_obo(&raw_dir.join(source.raw_file()), source, include_root_variants)
        }
        SourceFormat::Tabular => tabular::parse_tabular(&raw_dir.join(source.raw_file()), source),
        SourceFormat::MeshXml => mesh::parse_mesh(
            &raw_dir.join(source.descriptor_file()),
            &raw_dir.join(source.supplement_file()),
            source,
        ),
    }
}
