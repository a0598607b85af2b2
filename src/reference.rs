//! Read-only reference data shared by every request.
//!
//! A [`Lexicon`] bundles the stopword set, the general-language frequency
//! table used for the rarity signal and spell correction, and the curated
//! legal vocabulary. It is built once at startup (from the embedded data
//! files or from paths in `[keywords]`) and injected into the distiller,
//! selector, and decomposer. Tests build their own tables.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;

use crate::config::KeywordsConfig;
use crate::distill::tokenize;

const BUILTIN_STOPWORDS: &str = include_str!("../data/stopwords.json");
const BUILTIN_REFERENCE: &str = include_str!("../data/zipf_en.tsv");
const BUILTIN_CURATED: &str = include_str!("../data/curated_terms.txt");

/// Zipf value at or above which a word counts as maximally common.
pub const ZIPF_CEILING: f64 = 8.0;

/// Words removed during distillation.
#[derive(Debug, Clone, Default)]
pub struct Stopwords {
    words: HashSet<String>,
}

#[derive(Deserialize)]
struct StopwordFile {
    stopwords: Vec<String>,
}

impl Stopwords {
    /// Parse `{"stopwords": [...]}`.
    pub fn from_json(json: &str) -> Result<Self> {
        let file: StopwordFile =
            serde_json::from_str(json).context("Failed to parse stopword list")?;
        Ok(Self::from_words(file.stopwords))
    }

    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            words: words
                .into_iter()
                .map(|w| w.as_ref().trim().to_lowercase())
                .filter(|w| !w.is_empty())
                .collect(),
        }
    }

    pub fn contains(&self, word: &str) -> bool {
        self.words.contains(word)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

/// General-language word frequencies on the Zipf scale.
#[derive(Debug, Clone, Default)]
pub struct ReferenceFrequencies {
    zipf: HashMap<String, f64>,
    /// Sorted, so iteration order never depends on hashing.
    vocabulary: Vec<String>,
}

impl ReferenceFrequencies {
    /// Parse `word<TAB>zipf` rows. Blank lines and `#` comments are skipped.
    pub fn from_tsv(tsv: &str) -> Result<Self> {
        let mut pairs = Vec::new();
        for (lineno, line) in tsv.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut fields = line.split_whitespace();
            let (Some(word), Some(value), None) = (fields.next(), fields.next(), fields.next())
            else {
                bail!("reference table line {}: expected `word zipf`", lineno + 1);
            };
            let zipf: f64 = value.parse().with_context(|| {
                format!("reference table line {}: invalid zipf '{}'", lineno + 1, value)
            })?;
            pairs.push((word.to_lowercase(), zipf));
        }
        Ok(Self::from_pairs(pairs))
    }

    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let zipf: HashMap<String, f64> = pairs
            .into_iter()
            .map(|(w, z)| (w.into(), z.max(0.0)))
            .collect();
        let mut vocabulary: Vec<String> = zipf.keys().cloned().collect();
        vocabulary.sort();
        Self { zipf, vocabulary }
    }

    /// Zipf frequency of `word`; 0.0 when the table does not list it.
    pub fn zipf(&self, word: &str) -> f64 {
        self.zipf.get(word).copied().unwrap_or(0.0)
    }

    /// Rarity in `[0, 1]`; unlisted words are maximally rare.
    pub fn rarity(&self, word: &str) -> f64 {
        (1.0 - self.zipf(word) / ZIPF_CEILING).clamp(0.0, 1.0)
    }

    pub fn contains(&self, word: &str) -> bool {
        self.zipf.contains_key(word)
    }

    pub fn vocabulary(&self) -> &[String] {
        &self.vocabulary
    }
}

/// Curated single-word legal vocabulary, in priority order.
#[derive(Debug, Clone, Default)]
pub struct CuratedTerms {
    terms: Vec<String>,
}

impl CuratedTerms {
    /// One word per line; `#` comments and blank lines are skipped. Lines that
    /// do not normalize to exactly one token are ignored with a warning.
    pub fn from_lines(text: &str) -> Self {
        let mut terms = Vec::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let tokens = tokenize(line);
            if tokens.len() != 1 {
                tracing::warn!(line, "skipping curated entry that is not a single word");
                continue;
            }
            terms.extend(tokens);
        }
        Self::from_words(terms)
    }

    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let terms = words
            .into_iter()
            .map(Into::into)
            .filter(|w: &String| seen.insert(w.clone()))
            .collect();
        Self { terms }
    }

    /// Curated terms occurring as whole words in `text`, in curated order.
    pub fn find_in(&self, text: &str) -> Vec<String> {
        let present: HashSet<String> = tokenize(text).into_iter().collect();
        self.terms
            .iter()
            .filter(|t| present.contains(t.as_str()))
            .cloned()
            .collect()
    }

    pub fn contains(&self, word: &str) -> bool {
        self.terms.iter().any(|t| t == word)
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }
}

/// All reference data used by the keyword pipeline.
#[derive(Debug, Clone, Default)]
pub struct Lexicon {
    pub stopwords: Stopwords,
    pub reference: ReferenceFrequencies,
    pub curated: CuratedTerms,
}

impl Lexicon {
    /// Lexicon built from the data files compiled into the binary.
    pub fn builtin() -> Result<Self> {
        Ok(Self {
            stopwords: Stopwords::from_json(BUILTIN_STOPWORDS)?,
            reference: ReferenceFrequencies::from_tsv(BUILTIN_REFERENCE)?,
            curated: CuratedTerms::from_lines(BUILTIN_CURATED),
        })
    }

    /// Lexicon honoring the override paths in `[keywords]`.
    pub fn from_config(config: &KeywordsConfig) -> Result<Self> {
        let stopwords = match &config.stopwords_path {
            Some(path) => Stopwords::from_json(&read(path)?)?,
            None => Stopwords::from_json(BUILTIN_STOPWORDS)?,
        };
        let reference = match &config.reference_path {
            Some(path) => ReferenceFrequencies::from_tsv(&read(path)?)?,
            None => ReferenceFrequencies::from_tsv(BUILTIN_REFERENCE)?,
        };
        let curated = match &config.curated_path {
            Some(path) => CuratedTerms::from_lines(&read(path)?),
            None => CuratedTerms::from_lines(BUILTIN_CURATED),
        };
        tracing::debug!(
            stopwords = stopwords.len(),
            reference_words = reference.vocabulary().len(),
            curated_terms = curated.terms().len(),
            "lexicon loaded"
        );
        Ok(Self {
            stopwords,
            reference,
            curated,
        })
    }

    /// Words the spell corrector must leave alone.
    pub fn is_known_word(&self, word: &str) -> bool {
        self.reference.contains(word)
            || self.curated.contains(word)
            || self.stopwords.contains(word)
    }
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read reference file: {}", path.display()))
}
