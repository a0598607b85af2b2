//! Query decomposition: free text or a term list to ordered search terms.

use serde::Deserialize;
use std::collections::HashSet;

use crate::distill::Distiller;
use crate::error::{DocketError, Result};
use crate::keywords::salience;

/// A raw search key as supplied by a caller.
///
/// Deserializes from either a JSON string or a JSON array of strings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum QueryInput {
    Text(String),
    Terms(Vec<String>),
}

impl QueryInput {
    pub fn is_blank(&self) -> bool {
        match self {
            QueryInput::Text(text) => text.trim().is_empty(),
            QueryInput::Terms(terms) => terms.iter().all(|t| t.trim().is_empty()),
        }
    }
}

pub struct QueryDecomposer {
    distiller: Distiller,
    window: usize,
    max_terms: usize,
}

impl QueryDecomposer {
    pub fn new(distiller: Distiller, window: usize, max_terms: usize) -> Self {
        Self {
            distiller,
            window,
            max_terms,
        }
    }

    /// Ordered, deduplicated search terms, at most `max_terms` of them.
    ///
    /// Free text is ordered by salience (most salient first, ties by
    /// position). A term list keeps the caller's order.
    pub fn decompose(&self, input: &QueryInput) -> Result<Vec<String>> {
        if input.is_blank() {
            return Err(DocketError::BadQuery("search key is empty".to_string()));
        }

        let mut terms = match input {
            QueryInput::Text(text) => {
                let corpus = self.distiller.distill(text);
                let mut ranked = salience(&corpus, self.window);
                // Stable sort: equal salience keeps first-occurrence order.
                ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
                ranked.into_iter().map(|(term, _)| term).collect()
            }
            QueryInput::Terms(list) => {
                let mut seen = HashSet::new();
                list.iter()
                    .flat_map(|entry| self.distiller.distill(entry))
                    .filter(|t| seen.insert(t.clone()))
                    .collect::<Vec<_>>()
            }
        };

        if terms.is_empty() {
            return Err(DocketError::BadQuery(
                "search key has no searchable terms".to_string(),
            ));
        }
        terms.truncate(self.max_terms);
        tracing::debug!(?terms, "query decomposed");
        Ok(terms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::{CuratedTerms, Lexicon, ReferenceFrequencies, Stopwords};
    use std::sync::Arc;

    fn decomposer(max_terms: usize) -> QueryDecomposer {
        let lexicon = Lexicon {
            stopwords: Stopwords::from_words(["the", "for", "and", "with"]),
            reference: ReferenceFrequencies::default(),
            curated: CuratedTerms::default(),
        };
        QueryDecomposer::new(Distiller::new(Arc::new(lexicon), 3), 2, max_terms)
    }

    fn terms(list: &[&str]) -> QueryInput {
        QueryInput::Terms(list.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn term_list_keeps_order_and_normalizes() {
        let out = decomposer(10)
            .decompose(&terms(&["Injunction", "appeal,", "INJUNCTION"]))
            .unwrap();
        assert_eq!(out, vec!["injunction", "appeal"]);
    }

    #[test]
    fn multi_word_entries_expand_in_place() {
        let out = decomposer(10)
            .decompose(&terms(&["breach of contract", "damages"]))
            .unwrap();
        assert_eq!(out, vec!["breach", "contract", "damages"]);
    }

    #[test]
    fn free_text_ranks_hub_term_first() {
        let input = QueryInput::Text("bail for murder and bail with appeal".to_string());
        let out = decomposer(10).decompose(&input).unwrap();
        assert_eq!(out[0], "bail");
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn truncates_to_max_terms() {
        let out = decomposer(2)
            .decompose(&terms(&["alpha", "beta", "gamma"]))
            .unwrap();
        assert_eq!(out, vec!["alpha", "beta"]);
    }

    #[test]
    fn empty_and_stopword_queries_are_rejected() {
        let d = decomposer(10);
        for input in [
            QueryInput::Text(String::new()),
            QueryInput::Text("   ".to_string()),
            terms(&[]),
            terms(&["the", "for"]),
            QueryInput::Text("the and".to_string()),
        ] {
            assert!(matches!(d.decompose(&input), Err(DocketError::BadQuery(_))));
        }
    }

    #[test]
    fn deserializes_string_or_list() {
        let text: QueryInput = serde_json::from_str(r#""bail murder""#).unwrap();
        assert_eq!(text, QueryInput::Text("bail murder".to_string()));
        let list: QueryInput = serde_json::from_str(r#"["bail", "murder"]"#).unwrap();
        assert_eq!(list, terms(&["bail", "murder"]));
    }
}
