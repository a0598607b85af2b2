//! Optional spell correction applied to extracted text before distillation.
//!
//! Scanned judgements come back from OCR with single-character slips
//! ("contarct", "injuction"). Each alphabetic word that the lexicon does
//! not know is replaced by the most frequent reference word one
//! Damerau-Levenshtein edit away. Everything else in the text, including
//! punctuation and spacing, is left byte-for-byte as it was.

use std::collections::HashMap;
use std::sync::Arc;

use crate::reference::Lexicon;

/// Words shorter than this are never corrected.
const MIN_CORRECTABLE_LEN: usize = 4;

pub struct SpellCorrector {
    lexicon: Arc<Lexicon>,
    /// Correction candidates: reference vocabulary plus curated terms, sorted.
    candidates: Vec<String>,
}

impl SpellCorrector {
    pub fn new(lexicon: Arc<Lexicon>) -> Self {
        let mut candidates: Vec<String> = lexicon
            .reference
            .vocabulary()
            .iter()
            .chain(lexicon.curated.terms())
            .filter(|w| w.chars().all(char::is_alphabetic))
            .cloned()
            .collect();
        candidates.sort();
        candidates.dedup();
        Self {
            lexicon,
            candidates,
        }
    }

    /// Correct every unknown word in `text`.
    pub fn correct(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut memo: HashMap<String, Option<String>> = HashMap::new();
        let mut corrected = 0usize;
        let mut rest = text;

        while let Some(start) = rest.find(|c: char| c.is_alphanumeric()) {
            out.push_str(&rest[..start]);
            let after = &rest[start..];
            let end = after
                .find(|c: char| !c.is_alphanumeric())
                .unwrap_or(after.len());
            let word = &after[..end];

            match self.correct_word(word, &mut memo) {
                Some(replacement) => {
                    corrected += 1;
                    out.push_str(&replacement);
                }
                None => out.push_str(word),
            }
            rest = &after[end..];
        }
        out.push_str(rest);

        tracing::debug!(corrected, "spell correction applied");
        out
    }

    fn correct_word(
        &self,
        word: &str,
        memo: &mut HashMap<String, Option<String>>,
    ) -> Option<String> {
        if word.chars().count() < MIN_CORRECTABLE_LEN || !word.chars().all(char::is_alphabetic) {
            return None;
        }
        let lower = word.to_lowercase();
        if self.lexicon.is_known_word(&lower) {
            return None;
        }
        let suggestion = memo
            .entry(lower)
            .or_insert_with_key(|w| self.suggest(w))
            .clone()?;
        Some(match_first_letter_case(word, &suggestion))
    }

    /// Most frequent candidate at edit distance 1; ties go to the
    /// lexicographically smallest word.
    pub fn suggest(&self, word: &str) -> Option<String> {
        let len = word.chars().count();
        let mut best: Option<(&str, f64)> = None;
        for candidate in &self.candidates {
            if candidate.chars().count().abs_diff(len) > 1 {
                continue;
            }
            if strsim::damerau_levenshtein(word, candidate) != 1 {
                continue;
            }
            let zipf = self.lexicon.reference.zipf(candidate);
            // Candidates are sorted, so strict > keeps the smallest on ties.
            if best.map_or(true, |(_, z)| zipf > z) {
                best = Some((candidate, zipf));
            }
        }
        best.map(|(w, _)| w.to_string())
    }
}

fn match_first_letter_case(original: &str, replacement: &str) -> String {
    let upper = original.chars().next().is_some_and(char::is_uppercase);
    if !upper {
        return replacement.to_string();
    }
    let mut chars = replacement.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
