//! Parser for hierarchical ontologies in OBO stanza format.

use crate::model::{KbModel, KbModelBuilder};
use crate::source::KbSource;
use relink_common::{RelinkError, Result};
use std::fs;
use std::path::Path;
use tracing::debug;

#[derive(Default)]
struct TermRecord {
    id: String,
    name: String,
    alt_ids: Vec<String>,
    parents: Vec<String>,
    synonyms: Vec<String>,
    obsolete: bool,
}

/// Parse an `.obo` file into a [`KbModel`].
///
/// Stanza fields follow the format's `key: value` lines. Identifiers are
/// stored without their source prefix, so `MESH:D009369` becomes `D009369`.
/// When the source restricts identifier prefixes (MEDIC excludes OMIM
/// variants), records outside those prefixes are dropped unless
/// `include_root_variants` is set; their alternate identifiers are still
/// recorded either way.
pub fn parse_obo(
    path: &Path,
    source: KbSource,
    include_root_variants: bool,
) -> Result<KbModel> {
    let content = fs::read_to_string(path)?;
    let mut builder = KbModelBuilder::new(source);

    let mut in_term = false;
    let mut record = TermRecord::default();
    let mut terms = 0usize;

    for line in content.lines() {
        let line = line.trim();
        if line.starts_with('[') {
            if in_term {
                terms += flush_term(&mut builder, record, source, include_root_variants);
            }
            record = TermRecord::default();
            in_term = line == "[Term]";
            continue;
        }
        if !in_term || line.is_empty() {
            continue;
        }
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        match key {
            "id" => record.id = strip_prefix(value).to_string(),
            "name" => record.name = value.to_string(),
            "alt_id" => record.alt_ids.push(value.replace(':', "_")),
            "is_a" => {
                // "MESH:D009369 ! Neoplasms" carries a trailing comment
                let target = value.split('!').next().unwrap_or(value).trim();
                record.parents.push(strip_prefix(target).to_string());
            }
            "synonym" => {
                if let Some(text) = quoted_text(value) {
                    record.synonyms.push(text.to_string());
                }
            }
            "is_obsolete" => record.obsolete = value == "true",
            _ => {}
        }
    }
    if in_term {
        terms += flush_term(&mut builder, record, source, include_root_variants);
    }

    if terms == 0 {
        return Err(RelinkError::MalformedKbFile(format!(
            "no terms parsed from {}",
            path.display()
        )));
    }
    debug!(terms, file = %path.display(), "obo file parsed");

    Ok(builder.finish())
}

fn flush_term(
    builder: &mut KbModelBuilder,
    record: TermRecord,
    source: KbSource,
    include_root_variants: bool,
) -> usize {
    if record.id.is_empty() || record.name.is_empty() {
        return 0;
    }

    for alt_id in &record.alt_ids {
        builder.add_alt_id(alt_id, &record.id);
    }

    let in_range = match source.restricted_id_prefixes() {
        Some(prefixes) if !include_root_variants => record
            .id
            .chars()
            .next()
            .is_some_and(|first| prefixes.contains(&first)),
        _ => true,
    };
    if !in_range {
        return 0;
    }

    if record.obsolete {
        builder.remove_concept(&record.id, &record.name);
        return 0;
    }

    builder.add_concept(&record.id, &record.name);
    builder.record_parents(&record.id, &record.parents);
    for synonym in &record.synonyms {
        builder.add_synonym(synonym, &record.id);
    }
    1
}

/// Drop the source prefix of an identifier such as `MESH:D009369`.
fn strip_prefix(id: &str) -> &str {
    id.split_once(':').map(|(_, rest)| rest).unwrap_or(id)
}

/// Extract the text between the first pair of double quotes.
fn quoted_text(value: &str) -> Option<&str> {
    let start = value.find('"')? + 1;
    let end = start + value[start..].find('"')?;
    Some(&value[start..end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"format-version: 1.2

[Term]
id: MESH:C
name: Diseases

[Term]
id: MESH:D009369
name: Neoplasms
is_a: MESH:C ! Diseases
synonym: "Tumors" EXACT []
synonym: "Cancer" EXACT []

[Term]
id: MESH:D008175
name: Lung Neoplasms
alt_id: MESH:C538231
is_a: MESH:D009369 ! Neoplasms

[Term]
id: OMIM:144700
name: Renal cell carcinoma
is_a: MESH:D009369 ! Neoplasms

[Term]
id: MESH:D000008
name: Old Disease Name
is_obsolete: true

[Typedef]
id: part_of
name: part of
"#;

    fn write_sample() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_parse_strips_prefixes_and_maps_names() {
        let file = write_sample();
        let model = parse_obo(file.path(), KbSource::Medic, false).unwrap();
        assert_eq!(model.resolve("Neoplasms"), Some("D009369"));
        assert_eq!(model.resolve("Tumors"), Some("D009369"));
        assert_eq!(model.id_to_name.get("D008175").map(String::as_str), Some("Lung Neoplasms"));
    }

    #[test]
    fn test_omim_excluded_by_default() {
        let file = write_sample();
        let model = parse_obo(file.path(), KbSource::Medic, false).unwrap();
        assert!(!model.contains_exact("Renal cell carcinoma"));

        let model = parse_obo(file.path(), KbSource::Medic, true).unwrap();
        assert_eq!(model.resolve("Renal cell carcinoma"), Some("144700"));
    }

    #[test]
    fn test_obsolete_term_removed() {
        let file = write_sample();
        let model = parse_obo(file.path(), KbSource::Medic, false).unwrap();
        assert!(!model.contains_exact("Old Disease Name"));
        assert!(model.id_to_name.get("D000008").is_none());
    }

    #[test]
    fn test_alt_ids_flatten_separator() {
        let file = write_sample();
        let model = parse_obo(file.path(), KbSource::Medic, false).unwrap();
        assert_eq!(
            model.alt_id_to_id.get("MESH_C538231").map(String::as_str),
            Some("D008175")
        );
    }

    #[test]
    fn test_hierarchy_edges_and_fast_path() {
        let file = write_sample();
        let model = parse_obo(file.path(), KbSource::Medic, false).unwrap();
        assert!(model.hierarchy.has_edge("C", "D009369"));
        assert!(model.hierarchy.has_edge("D009369", "D008175"));
        assert_eq!(model.child_to_parent.get("D008175").map(String::as_str), Some("D009369"));
    }

    #[test]
    fn test_empty_file_is_malformed() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"format-version: 1.2\n").unwrap();
        let err = parse_obo(file.path(), KbSource::Medic, false).unwrap_err();
        assert!(matches!(err, RelinkError::MalformedKbFile(_)));
    }
}
