//! Section detection and content splitting for academic papers
//!
//! Detects numbered headings like "1 Introduction" or "3.2.1 Scaled
//! Dot-Product Attention" plus the unnumbered "Abstract" marker, then
//! slices the full text between consecutive heading offsets into an
//! ordered topic → content mapping.

use super::{SectionMap, SectionRecord, FULL_PAPER_KEY};
use regex::Regex;
use std::sync::OnceLock;

/// Line-anchored heading pattern: dot-separated numbers followed by a title.
fn heading_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^(\d+(?:\.\d+)*)\s+([A-Za-z].+)").unwrap())
}

/// First case-sensitive whole-word "Abstract" occurrence.
fn abstract_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\bAbstract\b").unwrap())
}

/// Recover a parent section's title from its bare number.
///
/// Searches for the first line starting with exactly that number. Returns
/// an empty string when no such heading line exists (known gap: the
/// subsection is then filed under a nameless parent).
fn extract_parent_title(full_text: &str, parent_number: &str) -> String {
    let re = Regex::new(&format!(r"(?m)^{}\s+(.+)", parent_number)).unwrap();
    re.captures(full_text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default()
}

/// Scan the text for numbered section headings.
///
/// A number without dots starts a main section; a dotted number is a
/// subsection whose parent title is recovered from the leading numeral.
pub fn parse_sections(text: &str) -> Vec<SectionRecord> {
    let mut sections = Vec::new();

    for caps in heading_pattern().captures_iter(text) {
        let number = &caps[1];
        let title = caps[2].trim();
        let start = caps.get(0).map(|m| m.start()).unwrap_or(0);

        if let Some((parent, _)) = number.split_once('.') {
            let parent_title = extract_parent_title(text, parent);
            sections.push(SectionRecord::sub(
                parent_title,
                format!("{} {}", number, title),
                start,
            ));
        } else {
            sections.push(SectionRecord::main(title, start));
        }
    }

    sections
}

/// Locate the Abstract, which the numbered-heading scan cannot catch.
pub fn find_abstract(text: &str) -> Option<SectionRecord> {
    abstract_pattern()
        .find(text)
        .map(|m| SectionRecord::main("Abstract", m.start()))
}

/// Detect all sections including the Abstract (prepended when present).
pub fn extract_pdf_sections(full_text: &str) -> Vec<SectionRecord> {
    let mut sections = parse_sections(full_text);

    if let Some(abstract_record) = find_abstract(full_text) {
        sections.insert(0, abstract_record);
    }

    sections
}

/// Slice the full text between consecutive section start offsets.
///
/// Records are stable-sorted by start offset; each record's content spans
/// from its own start to the next record's start (the last one runs to
/// end-of-text). Topics are keyed by subsection name when present, else by
/// section name. A subsection entry replaces the entry previously filed
/// under its parent section within the same pass, so the last subsection
/// of a parent wins the key — accepted lossy behavior, kept as-is.
///
/// An empty record list collapses the document into a single
/// `Full_Paper` entry.
pub fn split_sections_with_content(text: &str, detected: &[SectionRecord]) -> SectionMap {
    let mut map = SectionMap::new();

    if detected.is_empty() {
        map.insert(FULL_PAPER_KEY, text.to_string());
        return map;
    }

    let mut sorted: Vec<&SectionRecord> = detected.iter().collect();
    sorted.sort_by_key(|r| r.start);

    for (i, record) in sorted.iter().enumerate() {
        let start = record.start.min(text.len());
        let end = sorted
            .get(i + 1)
            .map(|next| next.start.min(text.len()))
            .unwrap_or(text.len());
        let content = text[start..end.max(start)].to_string();

        map.insert(record.section.clone(), content);

        if let Some(subsection) = &record.subsection {
            if let Some(content) = map.remove(&record.section) {
                map.insert(subsection.clone(), content);
            }
        }
    }

    map
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "Abstract\nThis paper studies X.\n1 Introduction\nText.\n1.1 Background\nMore text.\n2 Conclusion\nEnd.";

    #[test]
    fn test_detects_main_and_subsections() {
        let sections = extract_pdf_sections(SAMPLE);
        let names: Vec<(&str, Option<&str>)> = sections
            .iter()
            .map(|s| (s.section.as_str(), s.subsection.as_deref()))
            .collect();
        assert_eq!(
            names,
            vec![
                ("Abstract", None),
                ("Introduction", None),
                ("Introduction", Some("1.1 Background")),
                ("Conclusion", None),
            ]
        );
        // Offsets ascend in document order
        let starts: Vec<usize> = sections.iter().map(|s| s.start).collect();
        let mut sorted = starts.clone();
        sorted.sort();
        assert_eq!(starts, sorted);
    }

    #[test]
    fn test_subsection_overwrites_parent_key() {
        let sections = extract_pdf_sections(SAMPLE);
        let map = split_sections_with_content(SAMPLE, &sections);
        let keys: Vec<_> = map.keys().collect();
        assert_eq!(keys, vec!["Abstract", "1.1 Background", "Conclusion"]);
        assert!(map.get("Introduction").is_none());
        assert!(map.get("Conclusion").unwrap().starts_with("2 Conclusion"));
    }

    #[test]
    fn test_no_sections_collapses_to_full_paper() {
        let text = "just some prose without any headings at all";
        let map = split_sections_with_content(text, &[]);
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(FULL_PAPER_KEY), Some(text));
    }

    #[test]
    fn test_concatenation_reconstructs_text() {
        let sections = vec![
            SectionRecord::main("Alpha", 0),
            SectionRecord::main("Beta", 20),
            SectionRecord::main("Gamma", 45),
        ];
        let text = "Alpha section text..Beta goes until here.Gamma runs to the end of the text.";
        let map = split_sections_with_content(text, &sections);
        let rebuilt: String = map.iter().map(|(_, v)| v).collect();
        assert_eq!(rebuilt, text);
    }

    #[test]
    fn test_sort_is_stable_on_equal_starts() {
        let sections = vec![
            SectionRecord::main("First", 5),
            SectionRecord::main("Second", 5),
        ];
        let text = "01234rest of the text here";
        let map = split_sections_with_content(text, &sections);
        let keys: Vec<_> = map.keys().collect();
        // "First" gets the empty [5,5) span, "Second" the rest
        assert_eq!(keys, vec!["First", "Second"]);
        assert_eq!(map.get("First"), Some(""));
        assert_eq!(map.get("Second"), Some("rest of the text here"));
    }

    #[test]
    fn test_missing_parent_yields_empty_title() {
        // "3.1" appears but there is no "3 <Title>" heading line
        let text = "3.1 Orphan Subsection\nBody text.";
        let sections = parse_sections(text);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].section, "");
        assert_eq!(sections[0].subsection.as_deref(), Some("3.1 Orphan Subsection"));
    }

    #[test]
    fn test_deeply_nested_numbering_uses_leading_numeral() {
        let text = "3 Model Architecture\nIntro.\n3.2.1 Scaled Dot-Product Attention\nDetails.";
        let sections = parse_sections(text);
        assert_eq!(sections[1].section, "Model Architecture");
        assert_eq!(
            sections[1].subsection.as_deref(),
            Some("3.2.1 Scaled Dot-Product Attention")
        );
    }

    #[test]
    fn test_abstract_is_case_sensitive() {
        assert!(find_abstract("the abstract notion of").is_none());
        let found = find_abstract("preamble\nAbstract\nWe study...").unwrap();
        assert_eq!(found.section, "Abstract");
        assert_eq!(found.start, 9);
    }

    #[test]
    fn test_heading_requires_line_start() {
        // An inline "5 items" mid-line must not become a heading
        let text = "we bought 5 items for the lab";
        assert!(parse_sections(text).is_empty());
    }
}
