//! NIL-linking oracle, consulted when the dictionaries produce no usable
//! candidate for a mention.

use relink_common::{RelinkError, Result};
use serde::Deserialize;
use std::time::Duration;

const ORACLE_TIMEOUT: Duration = Duration::from_secs(30);

/// A name suggestion from the oracle. Identifiers may arrive qualified
/// (`MESH:D009369` or `MESH_D009369`); see [`normalize_id`].
#[derive(Debug, Clone, Deserialize)]
pub struct NilSuggestion {
    pub id: String,
    pub name: String,
}

/// Source of candidate suggestions for mentions with no dictionary match.
pub trait NilOracle: Send + Sync {
    fn suggest(&self, text: &str) -> Result<Vec<NilSuggestion>>;
}

/// Oracle backed by an HTTP prediction service.
///
/// Issues `GET <url>?text=<mention>&top_k=<k>` and expects a JSON array of
/// `{"id": ..., "name": ...}` objects. Every transport or decode failure
/// maps to [`RelinkError::OracleUnavailable`].
pub struct HttpNilOracle {
    url: String,
    top_k: usize,
    client: reqwest::blocking::Client,
}

impl HttpNilOracle {
    pub fn new(url: impl Into<String>, top_k: usize) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(ORACLE_TIMEOUT)
            .build()
            .map_err(|e| RelinkError::OracleUnavailable(e.to_string()))?;
        Ok(Self {
            url: url.into(),
            top_k,
            client,
        })
    }
}

impl NilOracle for HttpNilOracle {
    fn suggest(&self, text: &str) -> Result<Vec<NilSuggestion>> {
        let top_k = self.top_k.to_string();
        let response = self
            .client
            .get(&self.url)
            .query(&[("text", text), ("top_k", top_k.as_str())])
            .send()
            .and_then(reqwest::blocking::Response::error_for_status)
            .map_err(|e| RelinkError::OracleUnavailable(e.to_string()))?;
        let suggestions: Vec<NilSuggestion> = response
            .json()
            .map_err(|e| RelinkError::OracleUnavailable(e.to_string()))?;
        Ok(suggestions)
    }
}

/// Strip a `PREFIX_` or `PREFIX:` qualifier from a suggested identifier.
pub fn normalize_id(id: &str) -> &str {
    id.split_once(['_', ':'])
        .map(|(_, rest)| rest)
        .unwrap_or(id)
}
