//! The ENTITY/CANDIDATE line format consumed by the external ranking
//! solver. Field order, delimiters, and whitespace are a compatibility
//! contract and are rendered bit-for-bit by this module alone.

use relink_candidates::Candidate;
use relink_common::{EntityType, Result};
use std::fs;
use std::path::Path;

/// Header line for one mention of a document.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityLine {
    pub text: String,
    pub entity_type: EntityType,
    /// Position of the document in the run's document ordering.
    pub doc_ordinal: usize,
    pub doc_id: String,
    /// Gold KB id of the mention, or the sentinel used for unannotated input.
    pub true_id: String,
}

impl EntityLine {
    pub fn render(&self) -> String {
        format!(
            "ENTITY\ttext:{0}\tnormalName:{1}\tpredictedType:{2}\tq:true\tqid:Q{3}\tdocId:{4}\torigText:{0}\turl:{5}\n",
            self.text,
            self.text.to_lowercase(),
            self.entity_type,
            self.doc_ordinal,
            self.doc_id,
            self.true_id,
        )
    }
}

/// A mention header together with its materialized candidates.
#[derive(Debug, Clone)]
pub struct DocumentEntry {
    pub entity: EntityLine,
    pub candidates: Vec<Candidate>,
}

/// One CANDIDATE line. The tab followed by four spaces before
/// `predictedType` is part of the consumer's expected format.
pub fn render_candidate(candidate: &Candidate, entity_type: EntityType) -> String {
    let links = candidate
        .links
        .iter()
        .map(i64::to_string)
        .collect::<Vec<_>>()
        .join(";");
    let normal_name = candidate.name.to_lowercase();
    format!(
        "CANDIDATE\tid:{0}\tinCount:{1}\toutCount:{2}\tlinks:{3}\turl:{4}\tname:{5}\tnormalName:{6}\tnormalWikiTitle:{7}\t    predictedType:{8}\n",
        candidate.surrogate_id,
        candidate.in_degree,
        candidate.out_degree,
        links,
        candidate.kb_id,
        candidate.name,
        normal_name,
        normal_name,
        entity_type,
    )
}

/// Write one document's candidates file: an ENTITY line per mention,
/// each followed by its CANDIDATE lines.
pub fn write_candidates_file(
    path: &Path,
    entries: &[DocumentEntry],
    entity_type: EntityType,
) -> Result<()> {
    let mut out = String::new();
    for entry in entries {
        out.push_str(&entry.entity.render());
        for candidate in &entry.candidates {
            out.push_str(&render_candidate(candidate, entity_type));
        }
    }
    fs::write(path, out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn sample_candidate() -> Candidate {
        Candidate {
            kb_id: "D009369".to_string(),
            name: "Neoplasms".to_string(),
            in_degree: 1,
            out_degree: 7,
            surrogate_id: 9369,
            links: BTreeSet::from([42, 537775]),
            score: 0.95,
        }
    }

    #[test]
    fn test_entity_line_format() {
        let line = EntityLine {
            text: "Breast Cancer".to_string(),
            entity_type: EntityType::Disease,
            doc_ordinal: 3,
            doc_id: "227508".to_string(),
            true_id: "D001943".to_string(),
        };
        assert_eq!(
            line.render(),
            "ENTITY\ttext:Breast Cancer\tnormalName:breast cancer\tpredictedType:Disease\tq:true\tqid:Q3\tdocId:227508\torigText:Breast Cancer\turl:D001943\n"
        );
    }

    #[test]
    fn test_candidate_line_format() {
        let line = render_candidate(&sample_candidate(), EntityType::Disease);
        assert_eq!(
            line,
            "CANDIDATE\tid:9369\tinCount:1\toutCount:7\tlinks:42;537775\turl:D009369\tname:Neoplasms\tnormalName:neoplasms\tnormalWikiTitle:neoplasms\t    predictedType:Disease\n"
        );
    }

    #[test]
    fn test_candidate_line_with_empty_links() {
        let mut candidate = sample_candidate();
        candidate.links.clear();
        let line = render_candidate(&candidate, EntityType::Chemical);
        assert!(line.contains("\tlinks:\turl:"));
        assert!(line.ends_with("\t    predictedType:Chemical\n"));
    }

    #[test]
    fn test_sentinel_candidate_line() {
        let line = render_candidate(&Candidate::nil(), EntityType::Disease);
        assert_eq!(
            line,
            "CANDIDATE\tid:-1\tinCount:0\toutCount:0\tlinks:\turl:-1\tname:none\tnormalName:none\tnormalWikiTitle:none\t    predictedType:Disease\n"
        );
    }

    #[test]
    fn test_write_candidates_file_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("227508");
        let entries = vec![DocumentEntry {
            entity: EntityLine {
                text: "tumor".to_string(),
                entity_type: EntityType::Disease,
                doc_ordinal: 0,
                doc_id: "227508".to_string(),
                true_id: "D009369".to_string(),
            },
            candidates: vec![sample_candidate(), Candidate::nil()],
        }];
        write_candidates_file(&path, &entries, EntityType::Disease).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("ENTITY\ttext:tumor\t"));
        assert!(lines[1].starts_with("CANDIDATE\tid:9369\t"));
        assert!(lines[2].starts_with("CANDIDATE\tid:-1\t"));
    }
}
