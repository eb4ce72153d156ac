//! Parser for tab-separated vocabulary exports.
//!
//! The export carries a 29-line comment header followed by one concept per
//! row. Column 0 is the canonical name, column 1 the prefixed identifier,
//! column 4 the pipe-delimited parent identifiers, and column 7 the
//! pipe-delimited synonyms.

use crate::model::{KbModel, KbModelBuilder};
use crate::source::KbSource;
use relink_common::{RelinkError, Result};
use std::fs;
use std::path::Path;
use tracing::debug;

const HEADER_LINES: usize = 29;
const MIN_COLUMNS: usize = 8;

pub fn parse_tabular(path: &Path, source: KbSource) -> Result<KbModel> {
    let content = fs::read_to_string(path)?;
    let mut builder = KbModelBuilder::new(source);
    let mut rows = 0usize;

    for (index, line) in content.lines().enumerate() {
        if index < HEADER_LINES || line.is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < MIN_COLUMNS {
            return Err(RelinkError::MalformedKbFile(format!(
                "{}: line {} has {} columns, expected at least {}",
                path.display(),
                index + 1,
                fields.len(),
                MIN_COLUMNS
            )));
        }

        let name = fields[0];
        let id = strip_prefix(fields[1]);
        let parents: Vec<String> = fields[4]
            .split('|')
            .filter(|p| !p.is_empty())
            .map(|p| strip_prefix(p).to_string())
            .collect();

        builder.add_concept(id, name);
        builder.record_parents(id, &parents);
        for synonym in fields[7].split('|').filter(|s| !s.is_empty()) {
            builder.add_synonym(synonym, id);
        }
        rows += 1;
    }

    if rows == 0 {
        return Err(RelinkError::MalformedKbFile(format!(
            "no concept rows found in {}",
            path.display()
        )));
    }
    debug!(rows, file = %path.display(), "tabular file parsed");

    Ok(builder.finish())
}

fn strip_prefix(id: &str) -> &str {
    id.split_once(':').map(|(_, rest)| rest).unwrap_or(id)
}
