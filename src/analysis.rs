//! Pure text analysis utilities: keyword frequency, citation extraction,
//! and per-topic length distribution. No shared state.

use crate::paper::SectionMap;
use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Common English stop words filtered out of keyword counts.
const STOP_WORDS: [&str; 66] = [
    "the", "and", "is", "in", "it", "you", "that", "with", "for", "are", "on", "be", "at", "as",
    "by", "this", "had", "not", "but", "what", "all", "were", "when", "we", "there", "can", "an",
    "your", "which", "their", "if", "do", "will", "each", "about", "how", "up", "out", "them",
    "then", "she", "many", "some", "so", "these", "would", "other", "into", "has", "more", "her",
    "two", "him", "did", "its", "et", "al", "using", "from", "was", "have", "they", "been", "also",
    "our", "such",
];

fn word_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b[a-zA-Z]{4,}\b").unwrap())
}

fn bracket_citation_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // [1], [1, 2], [1-3]
    RE.get_or_init(|| Regex::new(r"\[\d+(?:[,\-\s]+\d+)*\]").unwrap())
}

fn author_year_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // (Smith, 2020) or (Smith et al., 2020)
    RE.get_or_init(|| Regex::new(r"\([A-Z][a-zA-Z]+(?:\s+et\s+al\.)?,\s+\d{4}\)").unwrap())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeywordCount {
    pub word: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopicLength {
    pub topic: String,
    pub length: usize,
}

/// Top-N most frequent keywords: lowercase alphabetic words of length ≥ 4,
/// stop words removed. Ties are broken by first-encounter order.
pub fn keyword_frequency(text: &str, top_n: usize) -> Vec<KeywordCount> {
    let lowered = text.to_lowercase();

    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut order: Vec<&str> = Vec::new();
    for m in word_pattern().find_iter(&lowered) {
        let word = m.as_str();
        if STOP_WORDS.contains(&word) {
            continue;
        }
        let entry = counts.entry(word).or_insert(0);
        if *entry == 0 {
            order.push(word);
        }
        *entry += 1;
    }

    // Stable sort over first-encounter order keeps ties deterministic
    let mut ranked: Vec<(&str, usize)> = order.into_iter().map(|w| (w, counts[w])).collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));

    ranked
        .into_iter()
        .take(top_n)
        .map(|(word, count)| KeywordCount {
            word: word.to_string(),
            count,
        })
        .collect()
}

/// Extract citations: numeric bracket style and (Author, Year) style,
/// deduplicated in first-seen order.
pub fn extract_citations(text: &str) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    let matches = bracket_citation_pattern()
        .find_iter(text)
        .chain(author_year_pattern().find_iter(text));

    for m in matches {
        let citation = m.as_str().to_string();
        if !seen.contains(&citation) {
            seen.push(citation);
        }
    }
    seen
}

/// Per-topic content length, sorted descending by length.
pub fn topic_distribution(sections: &SectionMap) -> Vec<TopicLength> {
    let mut distribution: Vec<TopicLength> = sections
        .iter()
        .map(|(name, content)| TopicLength {
            topic: name.to_string(),
            length: content.len(),
        })
        .collect();

    distribution.sort_by(|a, b| b.length.cmp(&a.length));
    distribution
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_rules() {
        let text = "Attention attention ATTENTION is all you need; the model uses attention and models.";
        let keywords = keyword_frequency(text, 10);
        for kw in &keywords {
            assert!(kw.word.len() >= 4);
            assert_eq!(kw.word, kw.word.to_lowercase());
            assert!(!STOP_WORDS.contains(&kw.word.as_str()));
        }
        assert_eq!(keywords[0].word, "attention");
        assert_eq!(keywords[0].count, 4);
    }

    #[test]
    fn test_keyword_output_length_is_min_of_top_n_and_distinct() {
        let text = "alpha beta gamma delta";
        assert_eq!(keyword_frequency(text, 10).len(), 4);
        assert_eq!(keyword_frequency(text, 2).len(), 2);
    }

    #[test]
    fn test_keyword_ties_keep_first_encounter_order() {
        let text = "zebra apple zebra apple mango";
        let keywords = keyword_frequency(text, 3);
        assert_eq!(keywords[0].word, "zebra");
        assert_eq!(keywords[1].word, "apple");
        assert_eq!(keywords[2].word, "mango");
    }

    #[test]
    fn test_citations_both_families_extracted() {
        let text = "As shown in [12] and also by (Smith et al., 2020), see [12] again.";
        let citations = extract_citations(text);
        assert_eq!(citations.len(), 2);
        assert!(citations.contains(&"[12]".to_string()));
        assert!(citations.contains(&"(Smith et al., 2020)".to_string()));
    }

    #[test]
    fn test_citation_variants() {
        let text = "Ranges [1-3], lists [1, 2], plain (Jones, 1999).";
        let citations = extract_citations(text);
        assert!(citations.contains(&"[1-3]".to_string()));
        assert!(citations.contains(&"[1, 2]".to_string()));
        assert!(citations.contains(&"(Jones, 1999)".to_string()));
    }

    #[test]
    fn test_non_citations_ignored() {
        let text = "array[i] indexing and (lowercase, 2020) are not citations";
        assert!(extract_citations(text).is_empty());
    }

    #[test]
    fn test_topic_distribution_sorted_descending() {
        let mut sections = SectionMap::new();
        sections.insert("Short", "ab".to_string());
        sections.insert("Long", "abcdefgh".to_string());
        sections.insert("Mid", "abcd".to_string());

        let dist = topic_distribution(&sections);
        let lengths: Vec<usize> = dist.iter().map(|d| d.length).collect();
        assert_eq!(lengths, vec![8, 4, 2]);
        assert_eq!(dist[0].topic, "Long");
    }
}
