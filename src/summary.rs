//! Extractive summary used when no text generator is configured or the
//! generator fails: the sentences with the most keyword hits, in document
//! order.

use std::collections::HashSet;

use crate::distill::tokenize;

pub fn summarize(text: &str, keywords: &[String], max_sentences: usize) -> String {
    let sentences = split_sentences(text);
    if sentences.is_empty() || max_sentences == 0 {
        return String::new();
    }
    let wanted: HashSet<&str> = keywords.iter().map(String::as_str).collect();

    let mut scored: Vec<(usize, usize)> = sentences
        .iter()
        .enumerate()
        .map(|(i, s)| {
            let hits = tokenize(s)
                .iter()
                .filter(|t| wanted.contains(t.as_str()))
                .count();
            (i, hits)
        })
        .collect();
    scored.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

    let mut keep: Vec<usize> = scored
        .into_iter()
        .take(max_sentences)
        .map(|(i, _)| i)
        .collect();
    keep.sort_unstable();

    keep.into_iter()
        .map(|i| sentences[i])
        .collect::<Vec<_>>()
        .join(" ")
}

/// Split on `.`, `!` or `?` followed by whitespace or end of text.
fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if matches!(c, '.' | '!' | '?') {
            let at_boundary = chars.peek().map_or(true, |(_, next)| next.is_whitespace());
            if at_boundary {
                let end = i + c.len_utf8();
                let sentence = text[start..end].trim();
                if !sentence.is_empty() {
                    sentences.push(sentence);
                }
                start = end;
            }
        }
    }
    let tail = text[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail);
    }
    sentences
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kw(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn keeps_best_sentences_in_document_order() {
        let text = "The hearing opened. Bail was refused for murder. Costs follow. \
                    The murder appeal was dismissed and bail denied again.";
        let summary = summarize(text, &kw(&["bail", "murder", "appeal"]), 2);
        assert_eq!(
            summary,
            "Bail was refused for murder. The murder appeal was dismissed and bail denied again."
        );
    }

    #[test]
    fn falls_back_to_leading_sentences_without_hits() {
        let summary = summarize("One. Two. Three. Four.", &kw(&["bail"]), 2);
        assert_eq!(summary, "One. Two.");
    }

    #[test]
    fn abbreviations_inside_tokens_do_not_split() {
        assert_eq!(split_sentences("Section 3.2 applies. Done"), vec!["Section 3.2 applies.", "Done"]);
    }

    #[test]
    fn empty_text_gives_empty_summary() {
        assert_eq!(summarize("", &kw(&["bail"]), 3), "");
        assert_eq!(summarize("Text.", &kw(&[]), 0), "");
    }
}
