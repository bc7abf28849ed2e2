//! Grounding text lookup.
//!
//! The gateway only needs `lookup(query) -> String`; the knowledge base
//! behind it is configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// Produces grounding text for the latest user utterance.
///
/// Implementations must be synchronous and side-effect free. An empty string
/// means "no grounding".
pub trait ContextProvider: Send + Sync {
    fn lookup(&self, query: &str) -> String;
}

/// Provider that never returns grounding.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoContext;

impl ContextProvider for NoContext {
    fn lookup(&self, _query: &str) -> String {
        String::new()
    }
}

impl<F> ContextProvider for F
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn lookup(&self, query: &str) -> String {
        self(query)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaqEntry {
    pub question: String,
    pub answer: String,
    /// Case-insensitive substrings that select this entry.
    #[serde(default)]
    pub keywords: Vec<String>,
}

/// Keyword-matched FAQ list.
#[derive(Clone, Debug, Default)]
pub struct FaqContext {
    entries: Vec<FaqEntry>,
    max_entries: usize,
}

impl FaqContext {
    pub const DEFAULT_MAX_ENTRIES: usize = 3;

    pub fn new(entries: Vec<FaqEntry>) -> Self {
        let entries = entries
            .into_iter()
            .map(|mut entry| {
                entry.keywords = entry
                    .keywords
                    .iter()
                    .map(|k| k.trim().to_lowercase())
                    .filter(|k| !k.is_empty())
                    .collect();
                entry
            })
            .collect();
        Self {
            entries,
            max_entries: Self::DEFAULT_MAX_ENTRIES,
        }
    }

    /// Loads entries from a JSON array of `{question, answer, keywords}`.
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let entries: Vec<FaqEntry> =
            serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self::new(entries))
    }

    pub fn max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ContextProvider for FaqContext {
    fn lookup(&self, query: &str) -> String {
        let lowered = query.to_lowercase();
        if lowered.trim().is_empty() {
            return String::new();
        }
        self.entries
            .iter()
            .filter(|entry| entry.keywords.iter().any(|k| lowered.contains(k.as_str())))
            .take(self.max_entries)
            .map(|entry| format!("Q: {}\nA: {}", entry.question, entry.answer))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(question: &str, answer: &str, keywords: &[&str]) -> FaqEntry {
        FaqEntry {
            question: question.into(),
            answer: answer.into(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }

    fn faq() -> FaqContext {
        FaqContext::new(vec![
            entry("How long does shipping take?", "3-5 business days.", &["shipping", "deliver"]),
            entry("Do you offer refunds?", "Within 30 days of purchase.", &["Refund"]),
        ])
    }

    #[test]
    fn matches_keywords_case_insensitively() {
        assert_eq!(
            faq().lookup("I want a REFUND"),
            "Q: Do you offer refunds?\nA: Within 30 days of purchase."
        );
    }

    #[test]
    fn unmatched_or_blank_query_is_empty() {
        assert_eq!(faq().lookup("what is the weather"), "");
        assert_eq!(faq().lookup("   "), "");
    }

    #[test]
    fn caps_number_of_entries() {
        let text = faq().max_entries(1).lookup("refund after delivery");
        assert_eq!(text.lines().count(), 2);
    }

    #[test]
    fn closures_are_providers() {
        let provider = |query: &str| format!("ctx for {query}");
        assert_eq!(provider.lookup("x"), "ctx for x");
        assert_eq!(NoContext.lookup("anything"), "");
    }

    #[test]
    fn loads_entries_from_json_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("faq.json");
        std::fs::write(
            &path,
            r#"[{"question":"Q1","answer":"A1","keywords":["invoice"]}]"#,
        )
        .expect("write");
        let faq = FaqContext::from_json_file(&path).expect("load");
        assert_eq!(faq.len(), 1);
        assert_eq!(faq.lookup("where is my invoice"), "Q: Q1\nA: A1");
    }

    #[test]
    fn invalid_json_reports_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("faq.json");
        std::fs::write(&path, "{").expect("write");
        let err = FaqContext::from_json_file(&path).expect_err("should fail");
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("faq.json"));
    }
}
