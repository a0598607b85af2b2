//! Corpus distillation: raw text to an ordered candidate-term corpus.
//!
//! Distillation is total. Any input, including the empty string, produces a
//! (possibly empty) corpus; nothing here can fail.

use std::sync::Arc;

use crate::reference::Lexicon;

/// Lowercase `text` and split it on every non-alphanumeric character.
///
/// Empty pieces are discarded. No other filtering is applied; see
/// [`Distiller::distill`] for the full rules.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Turns text into the token corpus consumed by keyword selection and query
/// decomposition.
#[derive(Debug, Clone)]
pub struct Distiller {
    lexicon: Arc<Lexicon>,
    min_term_len: usize,
}

impl Distiller {
    pub fn new(lexicon: Arc<Lexicon>, min_term_len: usize) -> Self {
        Self {
            lexicon,
            min_term_len,
        }
    }

    /// Ordered corpus of the tokens in `text` that survive [`Self::keeps`].
    pub fn distill(&self, text: &str) -> Vec<String> {
        tokenize(text)
            .into_iter()
            .filter(|t| self.keeps(t))
            .collect()
    }

    /// Whether an already lowercased token belongs in the corpus.
    pub fn keeps(&self, token: &str) -> bool {
        token.chars().count() >= self.min_term_len
            && !token.chars().all(|c| c.is_numeric())
            && !self.lexicon.stopwords.contains(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::{CuratedTerms, ReferenceFrequencies, Stopwords};

    fn distiller() -> Distiller {
        let lexicon = Lexicon {
            stopwords: Stopwords::from_words(["the", "and", "was"]),
            reference: ReferenceFrequencies::default(),
            curated: CuratedTerms::default(),
        };
        Distiller::new(Arc::new(lexicon), 3)
    }

    #[test]
    fn tokenize_splits_on_punctuation() {
        assert_eq!(
            tokenize("Breach-of-Contract, (2019) O'Neil"),
            vec!["breach", "of", "contract", "2019", "o", "neil"]
        );
        assert!(tokenize("  ...  ").is_empty());
    }

    #[test]
    fn distill_drops_short_numeric_and_stopwords() {
        let corpus = distiller().distill("The appeal was DISMISSED in 2019 and costs of 500 awarded.");
        assert_eq!(corpus, vec!["appeal", "dismissed", "costs", "awarded"]);
    }

    #[test]
    fn distill_keeps_order_and_duplicates() {
        let corpus = distiller().distill("contract breach damages contract");
        assert_eq!(corpus, vec!["contract", "breach", "damages", "contract"]);
    }

    #[test]
    fn empty_input_gives_empty_corpus() {
        assert!(distiller().distill("").is_empty());
        assert!(distiller().distill("the and was").is_empty());
    }

    #[test]
    fn mixed_alphanumeric_tokens_survive() {
        assert_eq!(distiller().distill("section 302b"), vec!["section", "302b"]);
    }
}
