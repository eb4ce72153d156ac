//! Supported knowledge bases and their source formats.

use relink_common::{EntityType, RelinkError, Result};
use serde::{Deserialize, Serialize};

/// Creation-year cutoff for MeSH records; later additions are ignored so the
/// vocabulary matches the evaluation corpora.
pub const MESH_CUTOFF_YEAR: i32 = 2014;

/// Raw encoding a knowledge base ships in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// Hierarchical ontology in OBO stanzas.
    Obo,
    /// Single tab-separated table with pipe-delimited multi-value columns.
    Tabular,
    /// MeSH descriptor + supplement XML pair.
    MeshXml,
}

/// One of the supported knowledge bases. Each variant fixes the source
/// format, the designated root concept, and the entity type tag written
/// into the candidate files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KbSource {
    /// MEDIC disease vocabulary (CTD_diseases.obo).
    Medic,
    /// CTD chemical vocabulary (CTD_chemicals.tsv).
    CtdChemicals,
    /// MeSH diseases subtree (letter C).
    MeshDiseases,
    /// MeSH chemicals and drugs subtree (letter D).
    MeshChemicals,
}

impl KbSource {
    pub fn parse(kb: &str) -> Result<Self> {
        match kb {
            "medic" => Ok(KbSource::Medic),
            "ctd_chem" => Ok(KbSource::CtdChemicals),
            "mesh_dis" => Ok(KbSource::MeshDiseases),
            "mesh_chem" => Ok(KbSource::MeshChemicals),
            other => Err(RelinkError::UnknownKb(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            KbSource::Medic => "medic",
            KbSource::CtdChemicals => "ctd_chem",
            KbSource::MeshDiseases => "mesh_dis",
            KbSource::MeshChemicals => "mesh_chem",
        }
    }

    pub fn format(&self) -> SourceFormat {
        match self {
            KbSource::Medic => SourceFormat::Obo,
            KbSource::CtdChemicals => SourceFormat::Tabular,
            KbSource::MeshDiseases | KbSource::MeshChemicals => SourceFormat::MeshXml,
        }
    }

    pub fn entity_type(&self) -> EntityType {
        match self {
            KbSource::Medic | KbSource::MeshDiseases => EntityType::Disease,
            KbSource::CtdChemicals | KbSource::MeshChemicals => EntityType::Chemical,
        }
    }

    /// Designated root concept id, also the parent substituted for MeSH tree
    /// numbers with no remainder.
    pub fn root_id(&self) -> &'static str {
        match self {
            KbSource::Medic | KbSource::MeshDiseases => "C",
            KbSource::CtdChemicals | KbSource::MeshChemicals => "D",
        }
    }

    pub fn root_name(&self) -> &'static str {
        match self {
            KbSource::Medic | KbSource::MeshDiseases => "Diseases",
            KbSource::CtdChemicals | KbSource::MeshChemicals => "Chemicals",
        }
    }

    /// Identifier prefixes a concept must carry to be kept, unless the
    /// caller opts into root variants. Only MEDIC mixes ranges (MeSH C/D
    /// ids next to OMIM numbers).
    pub fn restricted_id_prefixes(&self) -> Option<&'static [char]> {
        match self {
            KbSource::Medic => Some(&['C', 'D']),
            _ => None,
        }
    }

    /// Subtree letter selecting descriptors from the MeSH trees.
    pub fn subtree_letter(&self) -> Option<char> {
        match self {
            KbSource::MeshDiseases => Some('C'),
            KbSource::MeshChemicals => Some('D'),
            _ => None,
        }
    }

    // ── Raw distribution file names ───────────────────────────────────────

    pub fn raw_file(&self) -> &'static str {
        match self {
            KbSource::Medic => "CTD_diseases.obo",
            KbSource::CtdChemicals => "CTD_chemicals.tsv",
            KbSource::MeshDiseases | KbSource::MeshChemicals => "desc2014.xml",
        }
    }

    pub fn descriptor_file(&self) -> &'static str {
        "desc2014.xml"
    }

    pub fn supplement_file(&self) -> &'static str {
        "supp2014.xml"
    }
}

impl std::fmt::Display for KbSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
