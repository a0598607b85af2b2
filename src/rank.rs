//! Order-aware ranking of records against decomposed query terms.
//!
//! # Scoring
//!
//! Each candidate starts at zero. For the term at position `p` of `n`
//! terms, every candidate whose keyword set contains the term gains
//! `n - p` when order matters and `1` otherwise. So with order on, a
//! record matching only the first term outranks one matching only the
//! last, and with order off a score is simply the number of distinct
//! query terms matched.
//!
//! Results are sorted by descending score, then ascending record id, and
//! records scoring zero are never returned.

use rayon::prelude::*;
use std::collections::HashSet;

use crate::error::{DocketError, Result};
use crate::models::{KeywordEntry, RankedDocument};

/// Entries of `index` whose keyword set shares at least one term with `terms`.
pub fn collect_candidates(index: Vec<KeywordEntry>, terms: &[String]) -> Vec<KeywordEntry> {
    let wanted: HashSet<&str> = terms.iter().map(String::as_str).collect();
    index
        .into_iter()
        .filter(|e| e.keywords.iter().any(|k| wanted.contains(k.as_str())))
        .collect()
}

/// Points contributed by a match on the term at `position`.
pub fn term_weight(position: usize, total_terms: usize, order_matters: bool) -> u64 {
    if order_matters {
        (total_terms - position) as u64
    } else {
        1
    }
}

/// Score of one keyword set against the ordered terms.
pub fn score(keywords: &[String], terms: &[String], order_matters: bool) -> u64 {
    let set: HashSet<&str> = keywords.iter().map(String::as_str).collect();
    let mut seen: HashSet<&str> = HashSet::new();
    terms
        .iter()
        .enumerate()
        .filter(|(_, t)| seen.insert(t.as_str()) && set.contains(t.as_str()))
        .map(|(p, _)| term_weight(p, terms.len(), order_matters))
        .sum()
}

/// Rank `candidates` and keep the best `top`.
///
/// Returns [`DocketError::NoResults`] when no candidate scores above zero.
pub fn rank(
    terms: &[String],
    order_matters: bool,
    top: usize,
    candidates: &[KeywordEntry],
) -> Result<Vec<RankedDocument>> {
    let mut ranked: Vec<RankedDocument> = candidates
        .par_iter()
        .map(|entry| RankedDocument {
            id: entry.id.clone(),
            score: score(&entry.keywords, terms, order_matters),
        })
        .filter(|r| r.score > 0)
        .collect();

    ranked.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
    ranked.truncate(top);

    if ranked.is_empty() {
        return Err(DocketError::NoResults);
    }
    Ok(ranked)
}
