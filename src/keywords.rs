//! Keyword selection: a distilled corpus in, at most `cap` keywords out.
//!
//! Every distinct corpus term gets a composite score built from three
//! signals, each in `[0, 1]`:
//!
//! | Signal | Meaning |
//! |--------|---------|
//! | frequency | occurrences / occurrences of the most frequent term |
//! | rarity | `1 - zipf / 8` from the reference table (unlisted words are 1) |
//! | salience | TextRank over the co-occurrence graph, divided by its maximum |
//!
//! `score = w_frequency * frequency + w_rarity * rarity + w_salience * salience`.
//! Ties are broken by the position of the term's first occurrence, so the
//! same corpus always yields the same keywords in the same order.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use crate::config::{KeywordsConfig, WeightsConfig};
use crate::reference::Lexicon;

const DAMPING: f64 = 0.85;
const ITERATIONS: usize = 30;

/// One candidate term with its composite score.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredTerm {
    pub term: String,
    pub score: f64,
    pub frequency: usize,
    /// Index of the term's first occurrence in the corpus.
    pub first_position: usize,
}

pub struct KeywordSelector {
    lexicon: Arc<Lexicon>,
    weights: WeightsConfig,
    window: usize,
}

impl KeywordSelector {
    pub fn new(lexicon: Arc<Lexicon>, config: &KeywordsConfig) -> Self {
        Self {
            lexicon,
            weights: config.weights,
            window: config.window,
        }
    }

    /// The `cap` best terms of `corpus`, best first.
    pub fn select(&self, corpus: &[String], cap: usize) -> Vec<String> {
        let mut scored = self.score_terms(corpus);
        scored.truncate(cap);
        scored.into_iter().map(|s| s.term).collect()
    }

    /// Every distinct term of `corpus`, sorted best first.
    pub fn score_terms(&self, corpus: &[String]) -> Vec<ScoredTerm> {
        let terms = distinct_terms(corpus);
        if terms.is_empty() {
            return Vec::new();
        }
        let max_frequency = terms.iter().map(|t| t.frequency).max().unwrap_or(1) as f64;
        let salience = salience(corpus, self.window);

        let mut scored: Vec<ScoredTerm> = terms
            .into_iter()
            .zip(salience)
            .map(|(t, (_, sal))| {
                let frequency = t.frequency as f64 / max_frequency;
                let rarity = self.lexicon.reference.rarity(t.term);
                let score = self.weights.frequency * frequency
                    + self.weights.rarity * rarity
                    + self.weights.salience * sal;
                ScoredTerm {
                    term: t.term.to_string(),
                    score,
                    frequency: t.frequency,
                    first_position: t.first_position,
                }
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then(a.first_position.cmp(&b.first_position))
        });
        scored
    }
}

struct DistinctTerm<'a> {
    term: &'a str,
    frequency: usize,
    first_position: usize,
}

/// Distinct terms in first-occurrence order.
fn distinct_terms(corpus: &[String]) -> Vec<DistinctTerm<'_>> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut terms: Vec<DistinctTerm> = Vec::new();
    for (pos, token) in corpus.iter().enumerate() {
        match index.get(token.as_str()) {
            Some(&i) => terms[i].frequency += 1,
            None => {
                index.insert(token.as_str(), terms.len());
                terms.push(DistinctTerm {
                    term: token.as_str(),
                    frequency: 1,
                    first_position: pos,
                });
            }
        }
    }
    terms
}

/// TextRank salience of every distinct term, in first-occurrence order,
/// normalized so the most salient term scores 1.0.
///
/// Two terms are linked when they occur within `window` tokens of each
/// other; repeated co-occurrence increases the edge weight.
pub fn salience(corpus: &[String], window: usize) -> Vec<(String, f64)> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut nodes: Vec<&str> = Vec::new();
    let ids: Vec<usize> = corpus
        .iter()
        .map(|t| {
            *index.entry(t.as_str()).or_insert_with(|| {
                nodes.push(t.as_str());
                nodes.len() - 1
            })
        })
        .collect();
    let n = nodes.len();
    if n == 0 {
        return Vec::new();
    }

    // BTreeMap keeps neighbor iteration order fixed across runs.
    let mut edges: Vec<BTreeMap<usize, f64>> = vec![BTreeMap::new(); n];
    let span = window.max(2);
    for i in 0..ids.len() {
        for j in (i + 1)..ids.len().min(i + span) {
            let (a, b) = (ids[i], ids[j]);
            if a == b {
                continue;
            }
            *edges[a].entry(b).or_insert(0.0) += 1.0;
            *edges[b].entry(a).or_insert(0.0) += 1.0;
        }
    }
    let out_weight: Vec<f64> = edges.iter().map(|e| e.values().sum()).collect();

    let mut scores = vec![1.0_f64; n];
    for _ in 0..ITERATIONS {
        let mut next = vec![1.0 - DAMPING; n];
        for (node, neighbors) in edges.iter().enumerate() {
            let rank: f64 = neighbors
                .iter()
                .map(|(&other, &w)| w / out_weight[other] * scores[other])
                .sum();
            next[node] += DAMPING * rank;
        }
        scores = next;
    }

    let max = scores.iter().copied().fold(0.0_f64, f64::max);
    nodes
        .into_iter()
        .zip(scores)
        .map(|(term, s)| {
            let normalized = if max > 0.0 { s / max } else { 0.0 };
            (term.to_string(), normalized)
        })
        .collect()
}

/// Manual keywords first (deduplicated, in given order), then automatic
/// keywords not already present.
pub fn merge_keywords(manual: &[String], automatic: Vec<String>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut merged = Vec::with_capacity(manual.len() + automatic.len());
    for kw in manual.iter().cloned().chain(automatic) {
        if seen.insert(kw.clone()) {
            merged.push(kw);
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::{CuratedTerms, ReferenceFrequencies, Stopwords};
    use proptest::prelude::*;

    fn selector(reference: ReferenceFrequencies) -> KeywordSelector {
        let lexicon = Lexicon {
            stopwords: Stopwords::default(),
            reference,
            curated: CuratedTerms::default(),
        };
        KeywordSelector::new(Arc::new(lexicon), &KeywordsConfig::default())
    }

    fn corpus(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn frequency_dominates_then_first_occurrence() {
        let sel = selector(ReferenceFrequencies::from_pairs([("court", 5.0)]));
        let c = corpus(&["contract", "breach", "damages", "contract"]);
        assert_eq!(sel.select(&c, 2), vec!["contract", "breach"]);
    }

    #[test]
    fn composite_scores_match_weights() {
        let sel = selector(ReferenceFrequencies::default());
        let c = corpus(&["contract", "breach", "damages", "contract"]);
        let scored = sel.score_terms(&c);
        assert_eq!(scored[0].term, "contract");
        assert!((scored[0].score - 1.0).abs() < 1e-9);
        assert!((scored[1].score - 0.7).abs() < 1e-9);
        assert!((scored[2].score - 0.7).abs() < 1e-9);
        assert_eq!(scored[1].term, "breach");
        assert_eq!(scored[2].term, "damages");
    }

    #[test]
    fn common_words_rank_below_rare_ones() {
        let sel = selector(ReferenceFrequencies::from_pairs([("people", 6.0)]));
        let c = corpus(&["people", "qisas"]);
        assert_eq!(sel.select(&c, 1), vec!["qisas"]);
    }

    #[test]
    fn empty_corpus_and_zero_cap() {
        let sel = selector(ReferenceFrequencies::default());
        assert!(sel.select(&[], 5).is_empty());
        assert!(sel.select(&corpus(&["appeal"]), 0).is_empty());
    }

    #[test]
    fn salience_prefers_hub_terms() {
        let c = corpus(&["alpha", "hub", "beta", "hub", "gamma", "hub", "delta"]);
        let sal: HashMap<String, f64> = salience(&c, 2).into_iter().collect();
        assert_eq!(sal["hub"], 1.0);
        assert!(sal["alpha"] < 1.0);
    }

    #[test]
    fn merge_puts_manual_first_and_dedupes() {
        let merged = merge_keywords(
            &corpus(&["bail", "murder", "bail"]),
            corpus(&["appeal", "murder", "sentence"]),
        );
        assert_eq!(merged, vec!["bail", "murder", "appeal", "sentence"]);
    }

    proptest! {
        #[test]
        fn selection_is_bounded_unique_and_deterministic(
            words in prop::collection::vec("[a-e]{3,5}", 0..60),
            cap in 0usize..10,
        ) {
            let sel = selector(ReferenceFrequencies::from_pairs([("abc", 4.0), ("bcd", 2.0)]));
            let first = sel.select(&words, cap);
            let second = sel.select(&words, cap);
            prop_assert_eq!(&first, &second);
            prop_assert!(first.len() <= cap);
            let unique: HashSet<&String> = first.iter().collect();
            prop_assert_eq!(unique.len(), first.len());
            prop_assert!(first.iter().all(|k| words.contains(k)));
        }

        #[test]
        fn merged_length_bounded_by_cap_plus_manual(
            words in prop::collection::vec("[a-d]{3}", 0..40),
            manual in prop::collection::vec("[a-z]{4}", 0..5),
            cap in 0usize..8,
        ) {
            let sel = selector(ReferenceFrequencies::default());
            let merged = merge_keywords(&manual, sel.select(&words, cap));
            prop_assert!(merged.len() <= cap + manual.len());
        }
    }
}
