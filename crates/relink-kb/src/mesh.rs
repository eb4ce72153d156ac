//! Parser for the MeSH descriptor and supplemental-record XML distributions.
//!
//! Loading is a two-pass affair. The descriptor pass keeps records with at
//! least one tree number inside the configured subtree and created no later
//! than [`MESH_CUTOFF_YEAR`]; every in-subtree tree number is indexed to its
//! descriptor regardless of year so that edges can resolve through excluded
//! descriptors. The supplement pass attaches supplementary concept records to
//! descriptors that survived the first pass. Edges are resolved at the end:
//! an empty parent key means the subtree root, a known tree number resolves to
//! its descriptor, and anything else is kept verbatim.

use crate::model::{KbModel, KbModelBuilder};
use crate::source::{KbSource, MESH_CUTOFF_YEAR};
use ahash::AHashMap;
use quick_xml::events::Event;
use quick_xml::Reader;
use relink_common::{RelinkError, Result};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::debug;

#[derive(Default)]
struct DescriptorRecord {
    ui: String,
    name: String,
    year: Option<i32>,
    tree_numbers: Vec<String>,
    synonyms: Vec<String>,
}

#[derive(Default)]
struct SupplementRecord {
    ui: String,
    name: String,
    year: Option<i32>,
    parents: Vec<String>,
    synonyms: Vec<String>,
}

pub fn parse_mesh(
    descriptor_path: &Path,
    supplement_path: &Path,
    source: KbSource,
) -> Result<KbModel> {
    let letter = source.subtree_letter().ok_or_else(|| {
        RelinkError::Config(format!("{source} is not backed by the MeSH XML distribution"))
    })?;

    let mut builder = KbModelBuilder::new(source);
    let mut tree_index: AHashMap<String, String> = AHashMap::new();
    // (parent key, child id) pairs, resolved once both passes are done
    let mut pending_edges: Vec<(String, String)> = Vec::new();

    let records = parse_descriptors(
        descriptor_path,
        letter,
        &mut builder,
        &mut tree_index,
        &mut pending_edges,
    )?;
    if records == 0 {
        return Err(RelinkError::MalformedKbFile(format!(
            "no descriptor records found in {}",
            descriptor_path.display()
        )));
    }
    parse_supplements(supplement_path, &mut builder, &mut pending_edges)?;

    for (parent_key, child_id) in pending_edges {
        let parent_id = if parent_key.is_empty() {
            source.root_id().to_string()
        } else if let Some(id) = tree_index.get(&parent_key) {
            id.clone()
        } else {
            parent_key
        };
        builder.add_edge(&parent_id, &child_id);
    }

    Ok(builder.finish())
}

fn parse_descriptors(
    path: &Path,
    letter: char,
    builder: &mut KbModelBuilder,
    tree_index: &mut AHashMap<String, String>,
    pending_edges: &mut Vec<(String, String)>,
) -> Result<usize> {
    let mut reader = Reader::from_reader(BufReader::new(File::open(path)?));
    reader.config_mut().trim_text(true);

    let mut current: Option<DescriptorRecord> = None;
    let mut in_descriptor_name = false;
    let mut in_date_created = false;
    let mut in_concept_list = false;
    let mut in_term = false;
    let mut current_text = String::new();
    let mut records = 0usize;

    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"DescriptorRecord" => current = Some(DescriptorRecord::default()),
                b"DescriptorName" => in_descriptor_name = true,
                // Terms carry their own DateCreated, which must not win
                b"DateCreated" if !in_concept_list => in_date_created = true,
                b"ConceptList" => in_concept_list = true,
                b"Term" => in_term = true,
                _ => {}
            },
            Ok(Event::Text(e)) => {
                current_text = e.unescape().unwrap_or_default().to_string();
            }
            Ok(Event::End(e)) => {
                match e.name().as_ref() {
                    b"DescriptorUI" => {
                        // SeeRelated and pharmacological-action references
                        // repeat this element; the record's own comes first
                        if let Some(rec) = current.as_mut() {
                            if rec.ui.is_empty() {
                                rec.ui = current_text.clone();
                            }
                        }
                    }
                    b"String" => {
                        if let Some(rec) = current.as_mut() {
                            if in_descriptor_name && rec.name.is_empty() {
                                rec.name = current_text.clone();
                            } else if in_term {
                                rec.synonyms.push(current_text.clone());
                            }
                        }
                    }
                    b"Year" => {
                        if in_date_created {
                            if let Some(rec) = current.as_mut() {
                                if rec.year.is_none() {
                                    rec.year = current_text.parse().ok();
                                }
                            }
                        }
                    }
                    b"TreeNumber" => {
                        if let Some(rec) = current.as_mut() {
                            rec.tree_numbers.push(current_text.clone());
                        }
                    }
                    b"DescriptorName" => in_descriptor_name = false,
                    b"DateCreated" => in_date_created = false,
                    b"ConceptList" => in_concept_list = false,
                    b"Term" => in_term = false,
                    b"DescriptorRecord" => {
                        if let Some(rec) = current.take() {
                            records += 1;
                            flush_descriptor(rec, letter, builder, tree_index, pending_edges);
                        }
                    }
                    _ => {}
                }
                current_text.clear();
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(RelinkError::MalformedKbFile(format!(
                    "{}: {e}",
                    path.display()
                )))
            }
            _ => {}
        }
        buf.clear();
    }

    debug!(records, file = %path.display(), "descriptor file parsed");
    Ok(records)
}

fn flush_descriptor(
    rec: DescriptorRecord,
    letter: char,
    builder: &mut KbModelBuilder,
    tree_index: &mut AHashMap<String, String>,
    pending_edges: &mut Vec<(String, String)>,
) {
    if rec.ui.is_empty() || rec.name.is_empty() {
        return;
    }

    let mut in_subtree = false;
    let mut parent_keys = Vec::new();
    for tree_number in &rec.tree_numbers {
        if tree_number.starts_with(letter) {
            in_subtree = true;
            tree_index.insert(tree_number.clone(), rec.ui.clone());
            parent_keys.push(parent_tree_key(tree_number).to_string());
        }
    }

    if in_subtree && rec.year.is_some_and(|year| year <= MESH_CUTOFF_YEAR) {
        builder.add_concept(&rec.ui, &rec.name);
        for key in parent_keys {
            pending_edges.push((key, rec.ui.clone()));
        }
        for synonym in &rec.synonyms {
            builder.add_synonym(synonym, &rec.ui);
        }
    }
}

fn parse_supplements(
    path: &Path,
    builder: &mut KbModelBuilder,
    pending_edges: &mut Vec<(String, String)>,
) -> Result<()> {
    let mut reader = Reader::from_reader(BufReader::new(File::open(path)?));
    reader.config_mut().trim_text(true);

    let mut current: Option<SupplementRecord> = None;
    let mut in_record_name = false;
    let mut in_date_created = false;
    let mut in_concept_list = false;
    let mut in_term = false;
    let mut in_heading_mapped = false;
    let mut current_text = String::new();
    let mut records = 0usize;

    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"SupplementalRecord" => current = Some(SupplementRecord::default()),
                b"SupplementalRecordName" => in_record_name = true,
                b"DateCreated" if !in_concept_list => in_date_created = true,
                b"ConceptList" => in_concept_list = true,
                b"Term" => in_term = true,
                b"HeadingMappedToList" => in_heading_mapped = true,
                _ => {}
            },
            Ok(Event::Text(e)) => {
                current_text = e.unescape().unwrap_or_default().to_string();
            }
            Ok(Event::End(e)) => {
                match e.name().as_ref() {
                    b"SupplementalRecordUI" => {
                        if let Some(rec) = current.as_mut() {
                            if rec.ui.is_empty() {
                                rec.ui = current_text.clone();
                            }
                        }
                    }
                    b"String" => {
                        if let Some(rec) = current.as_mut() {
                            if in_record_name && rec.name.is_empty() {
                                rec.name = current_text.clone();
                            } else if in_term {
                                rec.synonyms.push(current_text.clone());
                            }
                        }
                    }
                    b"Year" => {
                        if in_date_created {
                            if let Some(rec) = current.as_mut() {
                                if rec.year.is_none() {
                                    rec.year = current_text.parse().ok();
                                }
                            }
                        }
                    }
                    b"DescriptorUI" => {
                        // Indexing-information references repeat this element
                        // outside the mapped-heading list
                        if in_heading_mapped {
                            if let Some(rec) = current.as_mut() {
                                let parent_id = current_text.trim_matches('*');
                                if builder.has_concept_id(parent_id) {
                                    rec.parents.push(parent_id.to_string());
                                }
                            }
                        }
                    }
                    b"SupplementalRecordName" => in_record_name = false,
                    b"DateCreated" => in_date_created = false,
                    b"ConceptList" => in_concept_list = false,
                    b"Term" => in_term = false,
                    b"HeadingMappedToList" => in_heading_mapped = false,
                    b"SupplementalRecord" => {
                        if let Some(rec) = current.take() {
                            if flush_supplement(rec, builder, pending_edges) {
                                records += 1;
                            }
                        }
                    }
                    _ => {}
                }
                current_text.clear();
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(RelinkError::MalformedKbFile(format!(
                    "{}: {e}",
                    path.display()
                )))
            }
            _ => {}
        }
        buf.clear();
    }

    debug!(records, file = %path.display(), "supplemental records attached");
    Ok(())
}

fn flush_supplement(
    rec: SupplementRecord,
    builder: &mut KbModelBuilder,
    pending_edges: &mut Vec<(String, String)>,
) -> bool {
    if rec.ui.is_empty() || rec.name.is_empty() || rec.parents.is_empty() {
        return false;
    }
    if !rec.year.is_some_and(|year| year <= MESH_CUTOFF_YEAR) {
        return false;
    }

    builder.add_concept(&rec.ui, &rec.name);
    for parent_id in &rec.parents {
        pending_edges.push((parent_id.clone(), rec.ui.clone()));
    }
    for synonym in &rec.synonyms {
        builder.add_synonym(synonym, &rec.ui);
    }
    true
}

/// Parent key of a tree number: everything but the last dotted segment.
/// Tree numbers are ASCII, so byte slicing is safe; top-level numbers such
/// as `C04` shrink to the empty key, which later resolves to the root.
fn parent_tree_key(tree_number: &str) -> &str {
    &tree_number[..tree_number.len().saturating_sub(4)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const DESCRIPTORS: &str = r#"<?xml version="1.0"?>
<DescriptorRecordSet LanguageCode="eng">
  <DescriptorRecord DescriptorClass="1">
    <DescriptorUI>D009369</DescriptorUI>
    <DescriptorName><String>Neoplasms</String></DescriptorName>
    <DateCreated><Year>1999</Year><Month>01</Month><Day>01</Day></DateCreated>
    <DateRevised><Year>2020</Year><Month>06</Month><Day>08</Day></DateRevised>
    <TreeNumberList><TreeNumber>C04</TreeNumber></TreeNumberList>
    <ConceptList>
      <Concept PreferredConceptYN="Y">
        <ConceptName><String>Neoplasms</String></ConceptName>
        <TermList>
          <Term><TermUI>T000001</TermUI><String>Tumors</String>
            <DateCreated><Year>1999</Year></DateCreated>
          </Term>
        </TermList>
      </Concept>
    </ConceptList>
  </DescriptorRecord>
  <DescriptorRecord DescriptorClass="1">
    <DescriptorUI>D008175</DescriptorUI>
    <DescriptorName><String>Lung Neoplasms</String></DescriptorName>
    <DateCreated><Year>1999</Year></DateCreated>
    <TreeNumberList><TreeNumber>C04.588</TreeNumber></TreeNumberList>
    <SeeRelatedList>
      <SeeRelatedDescriptor>
        <DescriptorReferredTo>
          <DescriptorUI>D009369</DescriptorUI>
          <DescriptorName><String>Neoplasms</String></DescriptorName>
        </DescriptorReferredTo>
      </SeeRelatedDescriptor>
    </SeeRelatedList>
  </DescriptorRecord>
  <DescriptorRecord DescriptorClass="1">
    <DescriptorUI>D099999</DescriptorUI>
    <DescriptorName><String>Too Recent Disease</String></DescriptorName>
    <DateCreated><Year>2015</Year></DateCreated>
    <TreeNumberList><TreeNumber>C04.999</TreeNumber></TreeNumberList>
  </DescriptorRecord>
  <DescriptorRecord DescriptorClass="1">
    <DescriptorUI>D001241</DescriptorUI>
    <DescriptorName><String>Aspirin</String></DescriptorName>
    <DateCreated><Year>1999</Year></DateCreated>
    <TreeNumberList><TreeNumber>D02.455</TreeNumber></TreeNumberList>
  </DescriptorRecord>
</DescriptorRecordSet>
"#;

    const SUPPLEMENTS: &str = r#"<?xml version="1.0"?>
<SupplementalRecordSet LanguageCode="eng">
  <SupplementalRecord SCRClass="1">
    <SupplementalRecordUI>C537775</SupplementalRecordUI>
    <SupplementalRecordName><String>Rare Lung Syndrome</String></SupplementalRecordName>
    <DateCreated><Year>2004</Year></DateCreated>
    <HeadingMappedToList>
      <HeadingMappedTo>
        <DescriptorReferredTo>
          <DescriptorUI>*D008175</DescriptorUI>
          <DescriptorName><String>Lung Neoplasms</String></DescriptorName>
        </DescriptorReferredTo>
      </HeadingMappedTo>
    </HeadingMappedToList>
    <ConceptList>
      <Concept PreferredConceptYN="Y">
        <TermList>
          <Term><TermUI>T100001</TermUI><String>RLS variant</String></Term>
        </TermList>
      </Concept>
    </ConceptList>
  </SupplementalRecord>
  <SupplementalRecord SCRClass="1">
    <SupplementalRecordUI>C000001</SupplementalRecordUI>
    <SupplementalRecordName><String>Unmapped Record</String></SupplementalRecordName>
    <DateCreated><Year>2004</Year></DateCreated>
    <HeadingMappedToList>
      <HeadingMappedTo>
        <DescriptorReferredTo>
          <DescriptorUI>*D001241</DescriptorUI>
        </DescriptorReferredTo>
      </HeadingMappedTo>
    </HeadingMappedToList>
  </SupplementalRecord>
</SupplementalRecordSet>
"#;

    fn write_file(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_descriptor_subtree_and_cutoff() {
        let desc = write_file(DESCRIPTORS);
        let supp = write_file(SUPPLEMENTS);
        let model = parse_mesh(desc.path(), supp.path(), KbSource::MeshDiseases).unwrap();

        assert_eq!(model.resolve("Neoplasms"), Some("D009369"));
        assert_eq!(model.resolve("Tumors"), Some("D009369"));
        // Outside the C subtree
        assert!(!model.contains_exact("Aspirin"));
        // Created after the cutoff year
        assert!(!model.contains_exact("Too Recent Disease"));
    }

    #[test]
    fn test_see_related_does_not_clobber_record_fields() {
        let desc = write_file(DESCRIPTORS);
        let supp = write_file(SUPPLEMENTS);
        let model = parse_mesh(desc.path(), supp.path(), KbSource::MeshDiseases).unwrap();
        assert_eq!(
            model.id_to_name.get("D008175").map(String::as_str),
            Some("Lung Neoplasms")
        );
    }

    #[test]
    fn test_edges_resolve_through_tree_numbers() {
        let desc = write_file(DESCRIPTORS);
        let supp = write_file(SUPPLEMENTS);
        let model = parse_mesh(desc.path(), supp.path(), KbSource::MeshDiseases).unwrap();

        // C04 shrinks to the empty key, which maps to the root
        assert!(model.hierarchy.has_edge("C", "D009369"));
        // C04.588's parent key C04 resolves to D009369
        assert!(model.hierarchy.has_edge("D009369", "D008175"));
    }

    #[test]
    fn test_supplement_attaches_to_kept_descriptor() {
        let desc = write_file(DESCRIPTORS);
        let supp = write_file(SUPPLEMENTS);
        let model = parse_mesh(desc.path(), supp.path(), KbSource::MeshDiseases).unwrap();

        assert_eq!(model.resolve("Rare Lung Syndrome"), Some("C537775"));
        assert_eq!(model.resolve("RLS variant"), Some("C537775"));
        assert!(model.hierarchy.has_edge("D008175", "C537775"));
        // Mapped heading outside the subtree was never kept
        assert!(!model.contains_exact("Unmapped Record"));
    }

    #[test]
    fn test_root_synthesized() {
        let desc = write_file(DESCRIPTORS);
        let supp = write_file(SUPPLEMENTS);
        let model = parse_mesh(desc.path(), supp.path(), KbSource::MeshDiseases).unwrap();
        assert_eq!(model.resolve("Diseases"), Some("C"));
    }

    #[test]
    fn test_invalid_xml_is_malformed() {
        let desc = write_file("<DescriptorRecordSet><Broken");
        let supp = write_file(SUPPLEMENTS);
        let err = parse_mesh(desc.path(), supp.path(), KbSource::MeshDiseases).unwrap_err();
        assert!(matches!(err, RelinkError::MalformedKbFile(_)));
    }
}
