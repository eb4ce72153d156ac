//! Persistent fuzzy-match cache, one JSON file per knowledge base.
//!
//! Dictionary searches dominate run time, so raw match lists are kept across
//! runs keyed by mention text. The cache is loaded once, mutated in memory,
//! and written back only when something was added.

use ahash::AHashMap;
use relink_common::{RelinkError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// A dictionary name with its similarity to the mention text, before any
/// threshold or id resolution is applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMatch {
    pub name: String,
    pub score: f64,
}

pub struct CandidateCache {
    path: PathBuf,
    entries: AHashMap<String, Vec<RawMatch>>,
    dirty: bool,
}

impl CandidateCache {
    /// Open the cache at `path`, starting empty when the file does not exist.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries: AHashMap<String, Vec<RawMatch>> = if path.exists() {
            serde_json::from_slice(&fs::read(&path)?)?
        } else {
            AHashMap::new()
        };
        debug!(entries = entries.len(), file = %path.display(), "candidate cache opened");
        Ok(Self {
            path,
            entries,
            dirty: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, text: &str) -> Option<&[RawMatch]> {
        self.entries.get(text).map(Vec::as_slice)
    }

    /// Entry stored under the text minus a trailing `s`, when one exists.
    pub fn get_plural_stem(&self, text: &str) -> Option<&[RawMatch]> {
        let stem = text.strip_suffix('s')?;
        self.entries.get(stem).map(Vec::as_slice)
    }

    pub fn put(&mut self, text: &str, matches: Vec<RawMatch>) {
        self.entries.insert(text.to_string(), matches);
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Write the cache back if anything was added since opening. Returns
    /// whether a write happened.
    pub fn flush_if_dirty(&mut self) -> Result<bool> {
        if !self.dirty {
            return Ok(false);
        }
        let parent = self.path.parent().ok_or_else(|| {
            RelinkError::Config(format!("no parent directory for {}", self.path.display()))
        })?;
        fs::create_dir_all(parent)?;

        let sorted: BTreeMap<&str, &Vec<RawMatch>> = self
            .entries
            .iter()
            .map(|(text, matches)| (text.as_str(), matches))
            .collect();
        let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
        tmp.write_all(&serde_json::to_vec(&sorted)?)?;
        tmp.persist(&self.path).map_err(|e| RelinkError::Io(e.error))?;

        self.dirty = false;
        info!(entries = self.entries.len(), file = %self.path.display(), "candidate cache flushed");
        Ok(true)
    }
}
