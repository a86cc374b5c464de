//! Paper processing: PDF text extraction, section detection, content splitting
//!
//! The upload pipeline runs extract → detect → (optional LLM refinement) →
//! split, turning one PDF into an ordered topic → content mapping.

pub mod pdf_extractor;
pub mod refine;
pub mod section_parser;

use serde::{Deserialize, Serialize};

/// Key used when no sections could be detected and the whole document
/// collapses into a single topic.
pub const FULL_PAPER_KEY: &str = "Full_Paper";

/// A detected section heading with its byte offset into the full text.
///
/// Main sections carry only `section`; subsections carry the parent's
/// title in `section` and their own numbered title in `subsection`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionRecord {
    pub section: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subsection: Option<String>,
    pub start: usize,
}

impl SectionRecord {
    pub fn main(section: impl Into<String>, start: usize) -> Self {
        Self { section: section.into(), subsection: None, start }
    }

    pub fn sub(section: impl Into<String>, subsection: impl Into<String>, start: usize) -> Self {
        Self { section: section.into(), subsection: Some(subsection.into()), start }
    }

    /// Display name: subsection title when present, else the section title.
    pub fn display_name(&self) -> &str {
        self.subsection.as_deref().unwrap_or(&self.section)
    }
}

/// Insertion-ordered map from topic name to content slice.
///
/// Mirrors dict semantics: inserting an existing key replaces its value in
/// place, removing a key drops its slot, inserting a new key appends. The
/// splitter relies on this for its subsection-overwrite behavior.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SectionMap {
    entries: Vec<(String, String)>,
}

impl SectionMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: String) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, v)) => *v = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Remove an entry, returning its value (position is lost).
    pub fn remove(&mut self, key: &str) -> Option<String> {
        let pos = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(pos).1)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_replaces_in_place() {
        let mut map = SectionMap::new();
        map.insert("a", "1".to_string());
        map.insert("b", "2".to_string());
        map.insert("a", "3".to_string());
        let keys: Vec<_> = map.keys().collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(map.get("a"), Some("3"));
    }

    #[test]
    fn test_remove_then_insert_appends_at_end() {
        let mut map = SectionMap::new();
        map.insert("a", "1".to_string());
        map.insert("b", "2".to_string());
        let v = map.remove("a").unwrap();
        map.insert("a2", v);
        let keys: Vec<_> = map.keys().collect();
        assert_eq!(keys, vec!["b", "a2"]);
    }

    #[test]
    fn test_display_name_prefers_subsection() {
        let main = SectionRecord::main("Introduction", 0);
        let sub = SectionRecord::sub("Introduction", "1.1 Background", 40);
        assert_eq!(main.display_name(), "Introduction");
        assert_eq!(sub.display_name(), "1.1 Background");
    }

    #[test]
    fn test_section_record_serde_shape() {
        let main = SectionRecord::main("Results", 120);
        let json = serde_json::to_value(&main).unwrap();
        assert!(json.get("subsection").is_none());
        let sub = SectionRecord::sub("Results", "4.2 Ablations", 300);
        let json = serde_json::to_value(&sub).unwrap();
        assert_eq!(json["subsection"], "4.2 Ablations");
    }
}
