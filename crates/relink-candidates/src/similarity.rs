//! Token-order-insensitive lexical similarity.

use crate::cache::RawMatch;
use std::cmp::Ordering;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// How many closest names a dictionary search keeps.
pub const TOP_MATCHES: usize = 10;

/// Similarity between two strings on a 0 to 100 scale, insensitive to word
/// order: both sides are tokenized on whitespace, sorted, rejoined, and
/// compared by normalized Levenshtein similarity.
pub fn token_sort_ratio(a: &str, b: &str) -> f64 {
    strsim::normalized_levenshtein(&sort_tokens(a), &sort_tokens(b)) * 100.0
}

/// Rank `names` by similarity to `query` and keep the `limit` best.
/// Ties break on the lexically smaller name so rankings are reproducible.
pub fn rank<'a, I>(query: &str, names: I, limit: usize) -> Vec<RawMatch>
where
    I: IntoIterator<Item = &'a str>,
{
    let query_sorted = sort_tokens(query);
    let names: Vec<&str> = names.into_iter().collect();

    #[cfg(feature = "parallel")]
    let mut scored: Vec<(&str, f64)> = names
        .par_iter()
        .map(|name| {
            let score = strsim::normalized_levenshtein(&query_sorted, &sort_tokens(name)) * 100.0;
            (*name, score)
        })
        .collect();

    #[cfg(not(feature = "parallel"))]
    let mut scored: Vec<(&str, f64)> = names
        .iter()
        .map(|name| {
            let score = strsim::normalized_levenshtein(&query_sorted, &sort_tokens(name)) * 100.0;
            (*name, score)
        })
        .collect();

    scored.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.0.cmp(b.0))
    });
    scored.truncate(limit);

    scored
        .into_iter()
        .map(|(name, score)| RawMatch {
            name: name.to_string(),
            score,
        })
        .collect()
}

fn sort_tokens(text: &str) -> String {
    let mut tokens: Vec<&str> = text.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}
